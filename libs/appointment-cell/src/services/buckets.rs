// libs/appointment-cell/src/services/buckets.rs
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::{Appointment, AppointmentBuckets, AppointmentStatus, Party};

/// Partition appointments into the four buckets the appointment pages are
/// built from, as seen by one side of the relationship.
///
/// Rules, evaluated in order so the buckets stay disjoint:
/// - pending: awaiting confirmation, or carrying a reschedule proposal the
///   viewer still has to decide;
/// - upcoming: confirmed or rescheduled, dated in the future, and not
///   waiting on the viewer (the viewer's own outbound proposal keeps the
///   appointment here);
/// - completed: done;
/// - cancelled: cancelled or rejected.
///
/// A confirmed appointment whose date has passed without completion falls
/// into no bucket.
pub fn classify_appointments(
    appointments: Vec<Appointment>,
    now: DateTime<Utc>,
    viewer: Party,
) -> AppointmentBuckets {
    let mut buckets = AppointmentBuckets {
        pending: Vec::new(),
        upcoming: Vec::new(),
        completed: Vec::new(),
        cancelled: Vec::new(),
    };

    for appointment in appointments {
        if appointment.status == AppointmentStatus::Pending
            || appointment.has_counterparty_proposal(viewer)
        {
            buckets.pending.push(appointment);
        } else if matches!(
            appointment.status,
            AppointmentStatus::Confirmed | AppointmentStatus::Rescheduled
        ) && appointment.appointment_date > now
        {
            buckets.upcoming.push(appointment);
        } else if appointment.status == AppointmentStatus::Completed {
            buckets.completed.push(appointment);
        } else if matches!(
            appointment.status,
            AppointmentStatus::Cancelled | AppointmentStatus::Rejected
        ) {
            buckets.cancelled.push(appointment);
        } else {
            debug!(
                "Appointment {} ({} at {}) matched no bucket",
                appointment.id, appointment.status, appointment.appointment_date
            );
        }
    }

    // Soonest first where the viewer still has to act or attend, most
    // recent first in the history buckets.
    buckets.pending.sort_by_key(|a| a.appointment_date);
    buckets.upcoming.sort_by_key(|a| a.appointment_date);
    buckets.completed.sort_by_key(|a| std::cmp::Reverse(a.appointment_date));
    buckets.cancelled.sort_by_key(|a| std::cmp::Reverse(a.appointment_date));

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PendingReschedule;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn appointment(status: AppointmentStatus, date: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            slot_id: Uuid::new_v4(),
            appointment_date: date,
            status,
            reason_for_visit: Some("Checkup".to_string()),
            doctor_notes: None,
            rejection_reason: None,
            pending_reschedule: None,
            created_at: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
        }
    }

    fn with_proposal(
        mut appointment: Appointment,
        proposed_by: Party,
        proposed_date_time: DateTime<Utc>,
    ) -> Appointment {
        appointment.pending_reschedule = Some(PendingReschedule {
            proposed_by,
            proposed_date_time,
            reason: Some("Schedule conflict".to_string()),
            proposed_at: Utc.with_ymd_and_hms(2024, 12, 15, 0, 0, 0).unwrap(),
        });
        appointment
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn future(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn pending_appointments_always_classify_as_pending() {
        let past = Utc.with_ymd_and_hms(2024, 11, 1, 10, 0, 0).unwrap();
        let appointments = vec![
            appointment(AppointmentStatus::Pending, future(5, 10)),
            appointment(AppointmentStatus::Pending, past),
        ];

        for viewer in [Party::Patient, Party::Doctor] {
            let buckets = classify_appointments(appointments.clone(), now(), viewer);
            assert_eq!(buckets.pending.len(), 2);
            assert!(buckets.upcoming.is_empty());
            assert!(buckets.completed.is_empty());
            assert!(buckets.cancelled.is_empty());
        }
    }

    #[test]
    fn counterparty_proposal_moves_confirmed_into_pending() {
        let appointments = vec![with_proposal(
            appointment(AppointmentStatus::Confirmed, future(5, 10)),
            Party::Patient,
            future(10, 10),
        )];

        let doctor_view = classify_appointments(appointments.clone(), now(), Party::Doctor);
        assert_eq!(doctor_view.pending.len(), 1);
        assert!(doctor_view.upcoming.is_empty());
    }

    #[test]
    fn own_proposal_keeps_appointment_in_upcoming() {
        let appointments = vec![with_proposal(
            appointment(AppointmentStatus::Confirmed, future(5, 10)),
            Party::Patient,
            future(10, 10),
        )];

        let patient_view = classify_appointments(appointments, now(), Party::Patient);
        assert!(patient_view.pending.is_empty());
        assert_eq!(patient_view.upcoming.len(), 1);
    }

    #[test]
    fn past_confirmed_appointment_is_not_upcoming() {
        let past = Utc.with_ymd_and_hms(2024, 12, 20, 9, 0, 0).unwrap();
        let appointments = vec![appointment(AppointmentStatus::Confirmed, past)];

        let buckets = classify_appointments(appointments, now(), Party::Patient);
        assert!(buckets.upcoming.is_empty());
        // Never completed, so it surfaces nowhere.
        assert_eq!(buckets.counts().pending, 0);
        assert_eq!(buckets.counts().completed, 0);
        assert_eq!(buckets.counts().cancelled, 0);
    }

    #[test]
    fn completed_and_cancelled_and_rejected_land_in_history_buckets() {
        let appointments = vec![
            appointment(AppointmentStatus::Completed, future(2, 9)),
            appointment(AppointmentStatus::Cancelled, future(3, 9)),
            appointment(AppointmentStatus::Rejected, future(4, 9)),
        ];

        let buckets = classify_appointments(appointments, now(), Party::Doctor);
        assert_eq!(buckets.completed.len(), 1);
        assert_eq!(buckets.cancelled.len(), 2);
    }

    #[test]
    fn buckets_are_disjoint() {
        let appointments = vec![
            appointment(AppointmentStatus::Pending, future(2, 9)),
            appointment(AppointmentStatus::Confirmed, future(3, 9)),
            with_proposal(
                appointment(AppointmentStatus::Confirmed, future(4, 9)),
                Party::Doctor,
                future(11, 9),
            ),
            appointment(AppointmentStatus::Rescheduled, future(5, 9)),
            appointment(AppointmentStatus::Completed, future(2, 12)),
            appointment(AppointmentStatus::Cancelled, future(3, 12)),
            appointment(AppointmentStatus::Rejected, future(4, 12)),
        ];
        let total = appointments.len();

        let buckets = classify_appointments(appointments, now(), Party::Patient);
        let counts = buckets.counts();
        assert_eq!(
            counts.pending + counts.upcoming + counts.completed + counts.cancelled,
            total
        );

        let mut seen: Vec<Uuid> = buckets
            .pending
            .iter()
            .chain(buckets.upcoming.iter())
            .chain(buckets.completed.iter())
            .chain(buckets.cancelled.iter())
            .map(|a| a.id)
            .collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total);
    }

    #[test]
    fn pending_and_upcoming_sort_soonest_first_history_most_recent_first() {
        let appointments = vec![
            appointment(AppointmentStatus::Pending, future(9, 10)),
            appointment(AppointmentStatus::Pending, future(3, 10)),
            appointment(AppointmentStatus::Confirmed, future(8, 10)),
            appointment(AppointmentStatus::Confirmed, future(2, 10)),
            appointment(AppointmentStatus::Completed, future(1, 8)),
            appointment(AppointmentStatus::Completed, future(6, 8)),
        ];

        let buckets = classify_appointments(appointments, now(), Party::Patient);
        assert!(buckets.pending[0].appointment_date < buckets.pending[1].appointment_date);
        assert!(buckets.upcoming[0].appointment_date < buckets.upcoming[1].appointment_date);
        assert!(buckets.completed[0].appointment_date > buckets.completed[1].appointment_date);
    }

    // The worked example: a confirmed appointment with an active patient
    // proposal for 2025-01-10T10:00, evaluated on 2025-01-01, must sit in
    // the doctor's pending bucket and nowhere else.
    #[test]
    fn doctor_sees_patient_proposal_as_pending_never_upcoming() {
        let appointments = vec![with_proposal(
            appointment(
                AppointmentStatus::Confirmed,
                Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap(),
            ),
            Party::Patient,
            Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap(),
        )];

        let buckets = classify_appointments(
            appointments,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Party::Doctor,
        );

        assert_eq!(buckets.counts().pending, 1);
        assert_eq!(buckets.counts().upcoming, 0);
    }
}

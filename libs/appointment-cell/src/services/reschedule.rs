// libs/appointment-cell/src/services/reschedule.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, Party, PendingReschedule,
    ProposeRescheduleRequest, RescheduleDecision, RescheduleDecisionRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// Outcome of a reschedule decision. The decline reason travels in the
/// response only; once the proposal object is gone there is nowhere for it
/// to live on the appointment.
#[derive(Debug, Clone)]
pub struct RescheduleOutcome {
    pub appointment: Appointment,
    pub decision: RescheduleDecision,
    pub decline_reason: Option<String>,
}

pub struct RescheduleService {
    supabase: Arc<SupabaseClient>,
    lifecycle_service: AppointmentLifecycleService,
}

impl RescheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    /// Attach a reschedule proposal to a live appointment. Only one
    /// proposal can be active at a time; the counterparty must decide it
    /// before another one can be made.
    pub async fn propose(
        &self,
        appointment: &Appointment,
        proposer: Party,
        request: ProposeRescheduleRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Party {} proposing reschedule of appointment {} to {}",
            proposer, appointment.id, request.proposed_date_time
        );

        if !matches!(
            appointment.status,
            AppointmentStatus::Confirmed | AppointmentStatus::Rescheduled
        ) {
            return Err(AppointmentError::NotReschedulable(appointment.status.clone()));
        }
        if appointment.pending_reschedule.is_some() {
            return Err(AppointmentError::ReschedulePending);
        }
        if request.proposed_date_time <= Utc::now() {
            return Err(AppointmentError::InvalidTime(
                "Proposed time must be in the future".to_string(),
            ));
        }

        let proposal = PendingReschedule {
            proposed_by: proposer,
            proposed_date_time: request.proposed_date_time,
            reason: request.reason,
            proposed_at: Utc::now(),
        };

        // Guard both the status and the absence of a proposal so a racing
        // propose or status change loses cleanly
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}&pending_reschedule=is.null",
            appointment.id, appointment.status
        );

        let update_data = json!({
            "pending_reschedule": proposal,
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            warn!("Appointment {} changed while proposing a reschedule", appointment.id);
            return Err(AppointmentError::TransitionConflict);
        }

        let updated: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!(
            "Reschedule proposed on appointment {} by {} for {}",
            updated.id, proposer, request.proposed_date_time
        );
        Ok(updated)
    }

    /// Decide an active proposal. Approving moves the appointment to the
    /// proposed time; rejecting restores it to plain confirmed standing.
    /// Nothing is written unless the decision is valid, and the write is
    /// conditional so a failed decide mutates nothing.
    pub async fn decide(
        &self,
        appointment: &Appointment,
        decider: Party,
        request: RescheduleDecisionRequest,
        auth_token: &str,
    ) -> Result<RescheduleOutcome, AppointmentError> {
        let proposal = appointment
            .pending_reschedule
            .as_ref()
            .ok_or(AppointmentError::NoActiveReschedule)?;

        if proposal.proposed_by == decider {
            return Err(AppointmentError::NotProposalRecipient);
        }

        // Compute the resulting state first; this is where the decision
        // semantics live, independent of persistence
        let decided = appointment.apply_reschedule_decision(request.decision)?;

        if request.decision == RescheduleDecision::Approved {
            self.lifecycle_service
                .validate_status_transition(&appointment.status, &decided.status)?;
        }

        let update_data = match request.decision {
            RescheduleDecision::Approved => json!({
                "status": decided.status.to_string(),
                "appointment_date": decided.appointment_date.to_rfc3339(),
                "pending_reschedule": Value::Null,
                "updated_at": Utc::now().to_rfc3339()
            }),
            RescheduleDecision::Rejected => json!({
                "pending_reschedule": Value::Null,
                "updated_at": Utc::now().to_rfc3339()
            }),
        };

        // The filter requires the proposal to still be there
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}&pending_reschedule=not.is.null",
            appointment.id, appointment.status
        );

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            warn!("Appointment {} changed while deciding its reschedule", appointment.id);
            return Err(AppointmentError::TransitionConflict);
        }

        let updated: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        info!(
            "Reschedule on appointment {} {} by {}",
            updated.id,
            match request.decision {
                RescheduleDecision::Approved => "approved",
                RescheduleDecision::Rejected => "declined",
            },
            decider
        );

        Ok(RescheduleOutcome {
            appointment: updated,
            decision: request.decision,
            decline_reason: match request.decision {
                RescheduleDecision::Rejected => request.reason,
                RescheduleDecision::Approved => None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use assert_matches::assert_matches;
    use uuid::Uuid;

    fn confirmed_appointment(date: DateTime<Utc>) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            slot_id: Uuid::new_v4(),
            appointment_date: date,
            status: AppointmentStatus::Confirmed,
            reason_for_visit: Some("Back pain".to_string()),
            doctor_notes: None,
            rejection_reason: None,
            pending_reschedule: None,
            created_at: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
        }
    }

    fn proposal_from(party: Party, proposed: DateTime<Utc>) -> PendingReschedule {
        PendingReschedule {
            proposed_by: party,
            proposed_date_time: proposed,
            reason: Some("Running late that week".to_string()),
            proposed_at: Utc.with_ymd_and_hms(2024, 12, 20, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn approving_moves_date_and_clears_proposal() {
        let original_date = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        let proposed_date = Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap();

        let mut appointment = confirmed_appointment(original_date);
        appointment.pending_reschedule = Some(proposal_from(Party::Patient, proposed_date));

        let decided = appointment
            .apply_reschedule_decision(RescheduleDecision::Approved)
            .unwrap();

        assert_eq!(decided.status, AppointmentStatus::Rescheduled);
        assert_eq!(decided.appointment_date, proposed_date);
        assert!(decided.pending_reschedule.is_none());
    }

    #[test]
    fn approving_leaves_reason_for_visit_untouched() {
        let mut appointment =
            confirmed_appointment(Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap());
        appointment.pending_reschedule = Some(proposal_from(
            Party::Doctor,
            Utc.with_ymd_and_hms(2025, 1, 12, 9, 0, 0).unwrap(),
        ));
        let reason_before = appointment.reason_for_visit.clone();

        let decided = appointment
            .apply_reschedule_decision(RescheduleDecision::Approved)
            .unwrap();

        assert_eq!(decided.reason_for_visit, reason_before);
    }

    #[test]
    fn rejecting_clears_proposal_and_keeps_status_and_date() {
        let original_date = Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap();
        let mut appointment = confirmed_appointment(original_date);
        appointment.pending_reschedule = Some(proposal_from(
            Party::Patient,
            Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap(),
        ));

        let decided = appointment
            .apply_reschedule_decision(RescheduleDecision::Rejected)
            .unwrap();

        assert_eq!(decided.status, AppointmentStatus::Confirmed);
        assert_eq!(decided.appointment_date, original_date);
        assert!(decided.pending_reschedule.is_none());
    }

    #[test]
    fn deciding_without_proposal_fails() {
        let appointment =
            confirmed_appointment(Utc.with_ymd_and_hms(2025, 1, 5, 10, 0, 0).unwrap());

        let result = appointment.apply_reschedule_decision(RescheduleDecision::Approved);
        assert_matches!(result, Err(AppointmentError::NoActiveReschedule));
    }
}

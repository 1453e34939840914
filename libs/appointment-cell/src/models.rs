// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_id: Uuid,
    /// Denormalized from the slot at booking so an approved reschedule can
    /// move the appointment without re-linking slots.
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason_for_visit: Option<String>,
    pub doctor_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub pending_reschedule: Option<PendingReschedule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Which side of the appointment a user is on, if any.
    pub fn party_of(&self, user_id: &str) -> Option<Party> {
        if self.patient_id.to_string() == user_id {
            Some(Party::Patient)
        } else if self.doctor_id.to_string() == user_id {
            Some(Party::Doctor)
        } else {
            None
        }
    }

    /// True when a reschedule proposed by the viewer's counterparty is
    /// awaiting the viewer's decision.
    pub fn has_counterparty_proposal(&self, viewer: Party) -> bool {
        self.pending_reschedule
            .as_ref()
            .map(|proposal| proposal.proposed_by != viewer)
            .unwrap_or(false)
    }

    /// Pure reschedule decision: approving moves the appointment to the
    /// proposed time and clears the proposal; rejecting only clears the
    /// proposal. Everything else on the appointment is left untouched.
    pub fn apply_reschedule_decision(
        &self,
        decision: RescheduleDecision,
    ) -> Result<Appointment, AppointmentError> {
        let proposal = self
            .pending_reschedule
            .as_ref()
            .ok_or(AppointmentError::NoActiveReschedule)?;

        let mut updated = self.clone();
        match decision {
            RescheduleDecision::Approved => {
                updated.status = AppointmentStatus::Rescheduled;
                updated.appointment_date = proposal.proposed_date_time;
                updated.pending_reschedule = None;
            }
            RescheduleDecision::Rejected => {
                updated.pending_reschedule = None;
            }
        }

        Ok(updated)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rescheduled,
    Completed,
    Cancelled,
    Rejected,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// The two sides of an appointment. Used both for reschedule attribution
/// and for classifying buckets from the viewer's perspective.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Doctor,
    Patient,
}

impl Party {
    pub fn counterparty(&self) -> Party {
        match self {
            Party::Doctor => Party::Patient,
            Party::Patient => Party::Doctor,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Doctor => write!(f, "doctor"),
            Party::Patient => write!(f, "patient"),
        }
    }
}

/// An active reschedule proposal. Its presence on an appointment is the
/// "reschedule pending" flag; deciding it removes the object entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReschedule {
    pub proposed_by: Party,
    pub proposed_date_time: DateTime<Utc>,
    pub reason: Option<String>,
    pub proposed_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub slot_id: Uuid,
    pub reason_for_visit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectAppointmentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteAppointmentRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeRescheduleRequest {
    pub proposed_date_time: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleDecisionRequest {
    pub decision: RescheduleDecision,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// BUCKET MODELS
// ==============================================================================

/// The four disjoint buckets the appointment pages are built from,
/// recomputed from the viewer's perspective on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentBuckets {
    pub pending: Vec<Appointment>,
    pub upcoming: Vec<Appointment>,
    pub completed: Vec<Appointment>,
    pub cancelled: Vec<Appointment>,
}

impl AppointmentBuckets {
    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            pending: self.pending.len(),
            upcoming: self.upcoming.len(),
            completed: self.completed.len(),
            cancelled: self.cancelled.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucketCounts {
    pub pending: usize,
    pub upcoming: usize,
    pub completed: usize,
    pub cancelled: usize,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Slot is no longer available")]
    SlotNotAvailable,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Appointment cannot be modified in current status: {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Appointment was modified concurrently")]
    TransitionConflict,

    #[error("Appointment in status {0} cannot be rescheduled")]
    NotReschedulable(AppointmentStatus),

    #[error("A reschedule proposal is already pending")]
    ReschedulePending,

    #[error("No reschedule proposal is pending")]
    NoActiveReschedule,

    #[error("Only the receiving party can decide this proposal")]
    NotProposalRecipient,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

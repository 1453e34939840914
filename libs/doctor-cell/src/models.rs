use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub specialty: String,
    pub bio: Option<String>,
    pub years_experience: Option<i32>,
    pub timezone: Option<String>,
    pub is_verified: bool,
    pub is_available: bool,
    pub rating: f32,
    pub total_consultations: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A concrete bookable window published by a doctor. Slots are the unit
/// the booking flow consumes: one slot, one appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub slot_type: SlotType,
    pub is_available: bool,
    pub is_booked: bool,
    pub booked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slot {
    /// Interval overlap against a candidate window. Touching endpoints do
    /// not overlap, so back-to-back slots are allowed.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.date_time < end && self.end_time > start
    }

    pub fn is_bookable(&self, now: DateTime<Utc>) -> bool {
        self.is_available && !self.is_booked && self.date_time > now
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Consultation,
    FollowUp,
    Urgent,
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotType::Consultation => write!(f, "consultation"),
            SlotType::FollowUp => write!(f, "follow_up"),
            SlotType::Urgent => write!(f, "urgent"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub full_name: Option<String>,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub years_experience: Option<i32>,
    pub timezone: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub date_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub slot_type: Option<SlotType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSearchFilters {
    pub specialty: Option<String>,
    pub name: Option<String>,
    pub verified_only: Option<bool>,
}

// Error types specific to doctor and slot operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DoctorError {
    NotFound,
    SlotNotFound,
    SlotTaken,
    SlotOverlap,
    InvalidSlotTime(String),
    UnauthorizedAccess,
    ValidationError(String),
    DatabaseError(String),
}

impl fmt::Display for DoctorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoctorError::NotFound => write!(f, "Doctor not found"),
            DoctorError::SlotNotFound => write!(f, "Slot not found"),
            DoctorError::SlotTaken => write!(f, "Slot is currently booked"),
            DoctorError::SlotOverlap => write!(f, "Slot overlaps an existing slot"),
            DoctorError::InvalidSlotTime(msg) => write!(f, "Invalid slot time: {}", msg),
            DoctorError::UnauthorizedAccess => write!(f, "Unauthorized access to doctor data"),
            DoctorError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            DoctorError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for DoctorError {}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

/// A care-provider facility. Profile data only; doctors are not linked to
/// facilities in this product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: Uuid,
    pub name: String,
    pub facility_type: FacilityType,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FacilityType {
    Clinic,
    Hospital,
    Pharmacy,
    Laboratory,
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacilityType::Clinic => write!(f, "clinic"),
            FacilityType::Hospital => write!(f, "hospital"),
            FacilityType::Pharmacy => write!(f, "pharmacy"),
            FacilityType::Laboratory => write!(f, "laboratory"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFacilityRequest {
    pub name: Option<String>,
    pub facility_type: Option<FacilityType>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitySearchFilters {
    pub facility_type: Option<FacilityType>,
    pub name: Option<String>,
    pub verified_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum FacilityError {
    #[error("Facility not found")]
    NotFound,

    #[error("Unauthorized access to facility data")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

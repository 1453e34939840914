use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveTime};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthOverview {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub blood_type: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub medical_history: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateHealthOverviewRequest {
    pub blood_type: Option<String>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub medical_history: Option<Vec<String>>,
}

/// Where an intake sits relative to the day's meals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealRelation {
    BeforeBreakfast,
    WithBreakfast,
    AfterBreakfast,
    BeforeLunch,
    WithLunch,
    AfterLunch,
    BeforeDinner,
    WithDinner,
    AfterDinner,
}

/// One intake row of a medication schedule. All fields are optional; a row
/// the patient has not filled in yet is simply empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub time: Option<NaiveTime>,
    pub meal_relation: Option<MealRelation>,
    pub quantity: Option<String>,
}

impl ScheduleEntry {
    pub fn is_empty(&self) -> bool {
        self.time.is_none() && self.meal_relation.is_none() && self.quantity.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub frequency: i32,
    pub notes: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedicationRequest {
    pub name: String,
    pub frequency: i32,
    pub notes: Option<String>,
    pub schedule: Option<Vec<ScheduleEntry>>,
}

impl CreateMedicationRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Medication name cannot be empty".to_string());
        }

        if self.name.len() > 200 {
            return Err("Medication name is too long".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMedicationRequest {
    pub name: Option<String>,
    pub frequency: Option<i32>,
    pub notes: Option<String>,
    pub schedule: Option<Vec<ScheduleEntry>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Medication not found")]
    MedicationNotFound,

    #[error("Not authorized to access these health records")]
    Unauthorized,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

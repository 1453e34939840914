// ✅ Health Record Cell - Clean module organization
pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

// ✅ Re-export commonly used types for convenience
pub use models::{
    HealthOverview,
    UpdateHealthOverviewRequest,
    Medication,
    ScheduleEntry,
    MealRelation,
    CreateMedicationRequest,
    UpdateMedicationRequest,
};

// ✅ Re-export main router for integration
pub use router::health_record_routes;

// ✅ Re-export handlers for direct usage if needed
pub use handlers::*;

// ✅ Public services API
pub mod api {
    pub use crate::services::records::HealthRecordService;
    pub use crate::services::schedule::build_schedule_rows;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        // Verify that all important types are properly exported
        let _: ScheduleEntry = ScheduleEntry::default();
        let _: UpdateHealthOverviewRequest = UpdateHealthOverviewRequest {
            blood_type: None,
            height_cm: None,
            weight_kg: None,
            allergies: None,
            chronic_conditions: None,
            medical_history: None,
        };
    }
}

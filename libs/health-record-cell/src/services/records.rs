use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use headers::HeaderMap;
use headers::HeaderValue;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    HealthOverview, UpdateHealthOverviewRequest,
    Medication, CreateMedicationRequest, UpdateMedicationRequest,
    RecordError,
};
use crate::services::schedule::build_schedule_rows;

pub struct HealthRecordService {
    supabase: SupabaseClient,
}

impl HealthRecordService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Records are visible to the patient themselves, to admins, and to
    /// doctors who share appointment history with the patient.
    pub async fn ensure_record_access(
        &self,
        patient_id: &str,
        requester_id: &str,
        requester_role: &str,
        auth_token: &str,
    ) -> Result<(), RecordError> {
        if requester_id == patient_id || requester_role == "admin" {
            return Ok(());
        }

        if requester_role == "doctor" {
            let path = format!(
                "/rest/v1/appointments?doctor_id=eq.{}&patient_id=eq.{}&limit=1",
                requester_id, patient_id
            );
            let rows: Vec<Value> = self.supabase.request(
                Method::GET,
                &path,
                Some(auth_token),
                None,
            ).await.map_err(|e| RecordError::Database(e.to_string()))?;

            if !rows.is_empty() {
                return Ok(());
            }
        }

        Err(RecordError::Unauthorized)
    }

    pub async fn get_overview(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Option<HealthOverview>, RecordError> {
        debug!("Fetching health overview for patient: {}", patient_id);

        let path = format!("/rest/v1/health_overviews?patient_id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| RecordError::Database(e.to_string()))?;

        if result.is_empty() {
            return Ok(None);
        }

        let overview = match serde_json::from_value::<HealthOverview>(result[0].clone()) {
            Ok(overview) => overview,
            Err(e) => {
                debug!("Error deserializing overview: {}", e);
                debug!("Raw JSON: {}", result[0]);
                return Err(RecordError::Database(format!("Failed to deserialize health overview: {}", e)));
            }
        };

        Ok(Some(overview))
    }

    pub async fn list_medications(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Vec<Medication>, RecordError> {
        let path = format!(
            "/rest/v1/medications?patient_id=eq.{}&is_active=eq.true&order=created_at.asc",
            patient_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| RecordError::Database(e.to_string()))?;

        let medications: Vec<Medication> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RecordError::Database(e.to_string()))?;

        Ok(medications)
    }

    /// Partial overview update. Creates the row on a patient's first write.
    pub async fn update_overview(
        &self,
        patient_id: &str,
        request: UpdateHealthOverviewRequest,
        auth_token: &str,
    ) -> Result<HealthOverview, RecordError> {
        debug!("Updating health overview for patient: {}", patient_id);

        let mut update_json = serde_json::Map::new();
        if let Some(ref v) = request.blood_type { update_json.insert("blood_type".to_string(), json!(v)); }
        if let Some(v) = request.height_cm { update_json.insert("height_cm".to_string(), json!(v)); }
        if let Some(v) = request.weight_kg { update_json.insert("weight_kg".to_string(), json!(v)); }
        if let Some(ref v) = request.allergies { update_json.insert("allergies".to_string(), json!(v)); }
        if let Some(ref v) = request.chronic_conditions { update_json.insert("chronic_conditions".to_string(), json!(v)); }
        if let Some(ref v) = request.medical_history { update_json.insert("medical_history".to_string(), json!(v)); }
        update_json.insert("updated_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/health_overviews?patient_id=eq.{}", patient_id);

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_json.clone())),
            Some(headers),
        ).await.map_err(|e| RecordError::Database(e.to_string()))?;

        if !result.is_empty() {
            let updated = serde_json::from_value::<HealthOverview>(result[0].clone())
                .map_err(|e| RecordError::Database(format!("Failed to deserialize health overview: {}", e)))?;
            return Ok(updated);
        }

        // No row yet for this patient
        debug!("No health overview for patient {}, creating one", patient_id);

        update_json.insert("patient_id".to_string(), json!(patient_id));
        update_json.insert("created_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let created: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/health_overviews",
            Some(auth_token),
            Some(Value::Object(update_json)),
            Some(headers),
        ).await.map_err(|e| RecordError::Database(e.to_string()))?;

        if created.is_empty() {
            return Err(RecordError::Database("Failed to create health overview".to_string()));
        }

        let overview = serde_json::from_value::<HealthOverview>(created[0].clone())
            .map_err(|e| RecordError::Database(format!("Failed to deserialize health overview: {}", e)))?;
        Ok(overview)
    }

    pub async fn add_medication(
        &self,
        patient_id: &str,
        request: CreateMedicationRequest,
        auth_token: &str,
    ) -> Result<Medication, RecordError> {
        request.validate().map_err(RecordError::Validation)?;

        let schedule = build_schedule_rows(
            request.frequency,
            request.schedule.as_deref().unwrap_or(&[]),
        )?;

        debug!("Adding medication '{}' for patient: {}", request.name, patient_id);

        let medication_data = json!({
            "patient_id": patient_id,
            "name": request.name.trim(),
            "frequency": request.frequency,
            "notes": request.notes,
            "is_active": true,
            "schedule": schedule,
            "created_at": chrono::Utc::now().to_rfc3339(),
            "updated_at": chrono::Utc::now().to_rfc3339()
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/medications",
            Some(auth_token),
            Some(medication_data),
            Some(headers),
        ).await.map_err(|e| RecordError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(RecordError::Database("Failed to create medication".to_string()));
        }

        let medication = serde_json::from_value::<Medication>(result[0].clone())
            .map_err(|e| RecordError::Database(format!("Failed to deserialize medication: {}", e)))?;
        Ok(medication)
    }

    pub async fn get_medication(
        &self,
        patient_id: &str,
        medication_id: &str,
        auth_token: &str,
    ) -> Result<Medication, RecordError> {
        let path = format!(
            "/rest/v1/medications?id=eq.{}&patient_id=eq.{}",
            medication_id, patient_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| RecordError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(RecordError::MedicationNotFound);
        }

        let medication = serde_json::from_value::<Medication>(result[0].clone())
            .map_err(|e| RecordError::Database(format!("Failed to deserialize medication: {}", e)))?;
        Ok(medication)
    }

    pub async fn update_medication(
        &self,
        patient_id: &str,
        medication_id: &str,
        request: UpdateMedicationRequest,
        auth_token: &str,
    ) -> Result<Medication, RecordError> {
        let current = self.get_medication(patient_id, medication_id, auth_token).await?;

        if let Some(ref name) = request.name {
            if name.trim().is_empty() {
                return Err(RecordError::Validation("Medication name cannot be empty".to_string()));
            }
        }

        // The schedule is re-normalized against whichever frequency applies
        // after this update.
        let effective_frequency = request.frequency.unwrap_or(current.frequency);
        let schedule_source = request.schedule.as_deref().unwrap_or(&current.schedule);
        let schedule = build_schedule_rows(effective_frequency, schedule_source)?;

        let mut update_json = serde_json::Map::new();
        if let Some(ref name) = request.name { update_json.insert("name".to_string(), json!(name.trim())); }
        if let Some(ref notes) = request.notes { update_json.insert("notes".to_string(), json!(notes)); }
        if let Some(is_active) = request.is_active { update_json.insert("is_active".to_string(), json!(is_active)); }
        update_json.insert("frequency".to_string(), json!(effective_frequency));
        update_json.insert("schedule".to_string(), json!(schedule));
        update_json.insert("updated_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/medications?id=eq.{}&patient_id=eq.{}",
            medication_id, patient_id
        );

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_json)),
            Some(headers),
        ).await.map_err(|e| RecordError::Database(e.to_string()))?;

        if result.is_empty() {
            return Err(RecordError::MedicationNotFound);
        }

        let updated = serde_json::from_value::<Medication>(result[0].clone())
            .map_err(|e| RecordError::Database(format!("Failed to deserialize medication: {}", e)))?;
        Ok(updated)
    }

    pub async fn delete_medication(
        &self,
        patient_id: &str,
        medication_id: &str,
        auth_token: &str,
    ) -> Result<(), RecordError> {
        debug!("Deleting medication {} for patient: {}", medication_id, patient_id);

        let path = format!(
            "/rest/v1/medications?id=eq.{}&patient_id=eq.{}",
            medication_id, patient_id
        );

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(headers),
        ).await.map_err(|e| RecordError::Database(e.to_string()))?;

        if deleted.is_empty() {
            return Err(RecordError::MedicationNotFound);
        }

        Ok(())
    }
}

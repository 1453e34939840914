use std::collections::HashMap;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use chrono::{DateTime, Utc};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Patient, UpdatePatientRequest, RosterEntry, PatientError};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_patient(
        &self,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        let patient: Patient = serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;
        Ok(patient)
    }

    /// Profile read on behalf of a requester. Patients see themselves, admins
    /// see everyone, doctors see patients they share appointment history with.
    pub async fn get_patient_for(
        &self,
        patient_id: &str,
        requester_id: &str,
        requester_role: &str,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let allowed = requester_id == patient_id
            || requester_role == "admin"
            || (requester_role == "doctor"
                && self.has_appointment_history(requester_id, patient_id, auth_token).await?);

        if !allowed {
            return Err(PatientError::Unauthorized);
        }

        self.get_patient(patient_id, auth_token).await
    }

    pub async fn update_patient(
        &self,
        patient_id: &str,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient profile: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(full_name) = request.full_name {
            if full_name.trim().is_empty() {
                return Err(PatientError::ValidationError("Name cannot be empty".to_string()));
            }
            update_data.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(date_of_birth) = request.date_of_birth {
            update_data.insert(
                "date_of_birth".to_string(),
                json!(date_of_birth.format("%Y-%m-%d").to_string()),
            );
        }
        if let Some(gender) = request.gender {
            update_data.insert("gender".to_string(), json!(gender));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        let updated_patient: Patient = serde_json::from_value(result[0].clone())
            .map_err(|e| PatientError::DatabaseError(e.to_string()))?;
        Ok(updated_patient)
    }

    /// True when the doctor and patient share at least one appointment,
    /// whatever its status.
    pub async fn has_appointment_history(
        &self,
        doctor_id: &str,
        patient_id: &str,
        auth_token: &str,
    ) -> Result<bool, PatientError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&patient_id=eq.{}&limit=1",
            doctor_id, patient_id
        );
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        Ok(!rows.is_empty())
    }

    /// Derives a doctor's roster from their appointment history: one entry per
    /// distinct patient, most recently seen first.
    pub async fn patient_roster(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<Vec<RosterEntry>, PatientError> {
        debug!("Building patient roster for doctor: {}", doctor_id);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=appointment_date.desc",
            doctor_id
        );
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        // Rows arrive newest first, so the first sighting of a patient carries
        // their most recent appointment date.
        let mut order: Vec<String> = Vec::new();
        let mut summary: HashMap<String, (DateTime<Utc>, i64)> = HashMap::new();

        for row in &rows {
            let Some(patient_id) = row["patient_id"].as_str() else { continue };
            let Some(appointment_date) = row["appointment_date"]
                .as_str()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc))
            else {
                continue;
            };

            match summary.get_mut(patient_id) {
                Some(entry) => entry.1 += 1,
                None => {
                    order.push(patient_id.to_string());
                    summary.insert(patient_id.to_string(), (appointment_date, 1));
                }
            }
        }

        if order.is_empty() {
            return Ok(Vec::new());
        }

        let path = format!("/rest/v1/patients?id=in.({})", order.join(","));
        let patient_rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let mut profiles: HashMap<String, Patient> = HashMap::new();
        for row in patient_rows {
            match serde_json::from_value::<Patient>(row) {
                Ok(patient) => {
                    profiles.insert(patient.id.to_string(), patient);
                }
                Err(e) => warn!("Skipping malformed patient row: {}", e),
            }
        }

        let mut roster = Vec::new();
        for patient_id in order {
            let Some((last_appointment, total_appointments)) = summary.get(&patient_id).copied()
            else {
                continue;
            };
            match profiles.remove(&patient_id) {
                Some(patient) => roster.push(RosterEntry {
                    patient,
                    last_appointment,
                    total_appointments,
                }),
                None => warn!("Patient {} has appointments but no profile", patient_id),
            }
        }

        Ok(roster)
    }
}

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateSlotRequest, DoctorError, Slot, SlotType};

pub struct SlotService {
    supabase: SupabaseClient,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Publish a new slot for a doctor. The window must lie in the future
    /// and must not overlap any slot the doctor already has.
    pub async fn create_slot(
        &self,
        doctor_id: Uuid,
        request: CreateSlotRequest,
        auth_token: &str,
    ) -> Result<Slot, DoctorError> {
        if request.end_time <= request.date_time {
            return Err(DoctorError::InvalidSlotTime(
                "Slot must end after it starts".to_string(),
            ));
        }
        if request.date_time <= Utc::now() {
            return Err(DoctorError::InvalidSlotTime(
                "Slot is in the past".to_string(),
            ));
        }

        // Any existing slot whose window intersects the new one blocks it
        let start_enc = urlencoding::encode(&request.date_time.to_rfc3339()).into_owned();
        let end_enc = urlencoding::encode(&request.end_time.to_rfc3339()).into_owned();
        let overlap_path = format!(
            "/rest/v1/slots?doctor_id=eq.{}&date_time=lt.{}&end_time=gt.{}",
            doctor_id, end_enc, start_enc
        );

        let overlapping: Vec<Value> = self.supabase.request(
            Method::GET,
            &overlap_path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if !overlapping.is_empty() {
            debug!(
                "Slot creation for doctor {} blocked by {} overlapping slot(s)",
                doctor_id,
                overlapping.len()
            );
            return Err(DoctorError::SlotOverlap);
        }

        let now = Utc::now();
        let slot_data = json!({
            "doctor_id": doctor_id,
            "date_time": request.date_time.to_rfc3339(),
            "end_time": request.end_time.to_rfc3339(),
            "slot_type": request.slot_type.unwrap_or(SlotType::Consultation).to_string(),
            "is_available": true,
            "is_booked": false,
            "booked_by": Value::Null,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/slots",
            Some(auth_token),
            Some(slot_data),
            Some(headers),
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::DatabaseError(
                "Failed to create slot".to_string(),
            ));
        }

        let slot: Slot = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse created slot: {}", e)))?;

        info!("Slot {} created for doctor {}", slot.id, doctor_id);
        Ok(slot)
    }

    /// All slots belonging to a doctor, soonest first.
    pub async fn list_doctor_slots(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Slot>, DoctorError> {
        debug!("Listing slots for doctor {}", doctor_id);

        let path = format!(
            "/rest/v1/slots?doctor_id=eq.{}&order=date_time.asc",
            doctor_id
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let slots: Vec<Slot> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Slot>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse slots: {}", e)))?;

        Ok(slots)
    }

    /// Slots a patient could book right now: available, unclaimed and in
    /// the future. Anon access, this backs the public booking page.
    pub async fn list_bookable_slots(&self, doctor_id: Uuid) -> Result<Vec<Slot>, DoctorError> {
        debug!("Listing bookable slots for doctor {}", doctor_id);

        let now_enc = urlencoding::encode(&Utc::now().to_rfc3339()).into_owned();
        let path = format!(
            "/rest/v1/slots?doctor_id=eq.{}&is_available=eq.true&is_booked=eq.false&date_time=gt.{}&order=date_time.asc",
            doctor_id, now_enc
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let slots: Vec<Slot> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Slot>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse slots: {}", e)))?;

        Ok(slots)
    }

    /// Remove an unbooked slot. The delete is conditional on the slot still
    /// being free, so a booking racing this call wins and the delete fails.
    pub async fn delete_slot(
        &self,
        doctor_id: Uuid,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        let slot = self.get_slot(slot_id, auth_token).await?;

        if slot.doctor_id != doctor_id {
            return Err(DoctorError::UnauthorizedAccess);
        }
        if slot.is_booked {
            return Err(DoctorError::SlotTaken);
        }

        let path = format!("/rest/v1/slots?id=eq.{}&is_booked=eq.false", slot_id);

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(headers),
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            warn!("Slot {} was booked while being deleted", slot_id);
            return Err(DoctorError::SlotTaken);
        }

        info!("Slot {} deleted for doctor {}", slot_id, doctor_id);
        Ok(())
    }

    async fn get_slot(&self, slot_id: Uuid, auth_token: &str) -> Result<Slot, DoctorError> {
        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::SlotNotFound);
        }

        let slot: Slot = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse slot: {}", e)))?;

        Ok(slot)
    }
}

// libs/appointment-cell/src/services/booking.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use std::sync::Arc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use doctor_cell::models::Slot;

use crate::models::{
    Appointment, AppointmentError, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    lifecycle_service: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            lifecycle_service: AppointmentLifecycleService::new(),
        }
    }

    /// Book a slot for a patient. The slot is consumed with a conditional
    /// update so two patients racing for it cannot both win.
    pub async fn book_appointment(
        &self,
        patient_id: Uuid,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking slot {} for patient {}", request.slot_id, patient_id);

        // Step 1: Fetch the slot and validate it is bookable
        let slot = self.get_slot(request.slot_id, auth_token).await?;

        if !slot.is_available || slot.is_booked {
            return Err(AppointmentError::SlotNotAvailable);
        }
        if slot.date_time <= Utc::now() {
            return Err(AppointmentError::InvalidTime(
                "Slot is in the past".to_string(),
            ));
        }

        // Step 2: Consume the slot; an empty representation means someone
        // else took it between our read and this write
        self.consume_slot(request.slot_id, patient_id, auth_token).await?;

        // Step 3: Create the appointment record
        let now = Utc::now();
        let appointment_data = json!({
            "patient_id": patient_id,
            "doctor_id": slot.doctor_id,
            "slot_id": slot.id,
            "appointment_date": slot.date_time.to_rfc3339(),
            "status": AppointmentStatus::Pending.to_string(),
            "reason_for_visit": request.reason_for_visit,
            "pending_reschedule": Value::Null,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Result<Vec<Value>, _> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(headers),
        ).await;

        let rows = match result {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => {
                self.release_slot_best_effort(slot.id, auth_token).await;
                return Err(AppointmentError::DatabaseError(
                    "Failed to create appointment".to_string(),
                ));
            }
            Err(e) => {
                self.release_slot_best_effort(slot.id, auth_token).await;
                return Err(AppointmentError::DatabaseError(e.to_string()));
            }
        };

        let appointment: Appointment = serde_json::from_value(rows[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse created appointment: {}", e)))?;

        info!("Appointment {} created for slot {}", appointment.id, slot.id);
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        Ok(appointment)
    }

    /// Search appointments for one side of the relationship with optional
    /// status and date filters.
    pub async fn search_appointments(
        &self,
        patient_id: Option<Uuid>,
        doctor_id: Option<Uuid>,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(patient_id) = patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(from_date) = query.from_date {
            // Use URL-encoded RFC3339 format for the gateway
            let date_str = from_date.to_rfc3339();
            let encoded_date = urlencoding::encode(&date_str);
            query_parts.push(format!("appointment_date=gte.{}", encoded_date));
        }
        if let Some(to_date) = query.to_date {
            let date_str = to_date.to_rfc3339();
            let encoded_date = urlencoding::encode(&date_str);
            query_parts.push(format!("appointment_date=lte.{}", encoded_date));
        }

        let mut path = format!(
            "/rest/v1/appointments?{}&order=appointment_date.desc",
            query_parts.join("&")
        );

        if let Some(limit) = query.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(appointments)
    }

    /// Doctor approves a pending appointment.
    pub async fn approve_appointment(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.transition_status(appointment, AppointmentStatus::Confirmed, Map::new(), auth_token)
            .await
    }

    /// Doctor rejects a pending appointment. The slot is handed back.
    pub async fn reject_appointment(
        &self,
        appointment: &Appointment,
        reason: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut extra = Map::new();
        extra.insert("rejection_reason".to_string(), json!(reason));
        extra.insert("pending_reschedule".to_string(), Value::Null);

        let updated = self
            .transition_status(appointment, AppointmentStatus::Rejected, extra, auth_token)
            .await?;

        self.release_slot(appointment.slot_id, auth_token).await?;
        Ok(updated)
    }

    /// Doctor marks a visit as completed. Any open reschedule proposal is
    /// dropped; the visit happened.
    pub async fn complete_appointment(
        &self,
        appointment: &Appointment,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut extra = Map::new();
        if let Some(notes) = notes {
            extra.insert("doctor_notes".to_string(), json!(notes));
        }
        extra.insert("pending_reschedule".to_string(), Value::Null);

        self.transition_status(appointment, AppointmentStatus::Completed, extra, auth_token)
            .await
    }

    /// Either participant cancels. The slot is handed back.
    pub async fn cancel_appointment(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let mut extra = Map::new();
        extra.insert("pending_reschedule".to_string(), Value::Null);

        let updated = self
            .transition_status(appointment, AppointmentStatus::Cancelled, extra, auth_token)
            .await?;

        self.release_slot(appointment.slot_id, auth_token).await?;
        Ok(updated)
    }

    /// Apply a validated status transition with a conditional update. The
    /// filter on the current status makes concurrent mutations lose cleanly
    /// instead of overwriting each other.
    async fn transition_status(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        extra_fields: Map<String, Value>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.lifecycle_service
            .validate_status_transition(&appointment.status, &new_status)?;

        let mut update_data = extra_fields;
        update_data.insert("status".to_string(), json!(new_status.to_string()));
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment.id, appointment.status
        );

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            warn!(
                "Appointment {} no longer in status {} - concurrent update lost",
                appointment.id, appointment.status
            );
            return Err(AppointmentError::TransitionConflict);
        }

        let updated: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse updated appointment: {}", e)))?;

        info!(
            "Appointment {} transitioned {} -> {}",
            updated.id, appointment.status, updated.status
        );
        Ok(updated)
    }

    async fn get_slot(&self, slot_id: Uuid, auth_token: &str) -> Result<Slot, AppointmentError> {
        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::SlotNotFound);
        }

        let slot: Slot = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse slot: {}", e)))?;

        Ok(slot)
    }

    /// Mark the slot as taken, but only if nobody else got there first.
    async fn consume_slot(
        &self,
        slot_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let path = format!("/rest/v1/slots?id=eq.{}&is_booked=eq.false", slot_id);

        let update_data = json!({
            "is_booked": true,
            "booked_by": patient_id,
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
            warn!("Slot {} was booked concurrently", slot_id);
            return Err(AppointmentError::SlotNotAvailable);
        }

        Ok(())
    }

    async fn release_slot(&self, slot_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        debug!("Releasing slot {}", slot_id);

        let path = format!("/rest/v1/slots?id=eq.{}", slot_id);

        let update_data = json!({
            "is_booked": false,
            "booked_by": Value::Null,
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=minimal"));

        let _: () = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(headers),
        ).await.map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    /// Hand the slot back after a failed booking; the original failure is
    /// what the caller reports.
    async fn release_slot_best_effort(&self, slot_id: Uuid, auth_token: &str) {
        if let Err(e) = self.release_slot(slot_id, auth_token).await {
            warn!("Failed to release slot {} after booking failure: {}", slot_id, e);
        }
    }
}

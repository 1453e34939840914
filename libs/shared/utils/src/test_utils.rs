use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_gateway_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn care_provider(email: &str) -> Self {
        Self::new(email, "care_provider")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned gateway rows for wiremock-backed handler tests. Shapes mirror the
/// REST tables the cells read and write.
pub struct MockGatewayResponses;

impl MockGatewayResponses {
    pub fn patient_row(patient_id: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "full_name": "Test Patient",
            "email": "patient@example.com",
            "phone": "+15550100",
            "address": "1 Test Lane",
            "date_of_birth": "1990-01-01",
            "gender": "other",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_row(doctor_id: &str) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "full_name": "Dr. Test",
            "email": "doctor@example.com",
            "specialty": "General Practice",
            "bio": "Experienced general practitioner",
            "years_experience": 10,
            "timezone": "UTC",
            "is_verified": true,
            "is_available": true,
            "rating": 4.5,
            "total_consultations": 120,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn slot_row(slot_id: &str, doctor_id: &str, date_time: &str, end_time: &str) -> serde_json::Value {
        json!({
            "id": slot_id,
            "doctor_id": doctor_id,
            "date_time": date_time,
            "end_time": end_time,
            "slot_type": "consultation",
            "is_available": true,
            "is_booked": false,
            "booked_by": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn booked_slot_row(slot_id: &str, doctor_id: &str, patient_id: &str,
                           date_time: &str, end_time: &str) -> serde_json::Value {
        let mut row = Self::slot_row(slot_id, doctor_id, date_time, end_time);
        row["is_booked"] = json!(true);
        row["booked_by"] = json!(patient_id);
        row
    }

    pub fn appointment_row(id: &str, patient_id: &str, doctor_id: &str,
                           status: &str, appointment_date: &str) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "slot_id": Uuid::new_v4(),
            "appointment_date": appointment_date,
            "status": status,
            "reason_for_visit": "Recurring headaches",
            "doctor_notes": null,
            "rejection_reason": null,
            "pending_reschedule": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row_with_reschedule(id: &str, patient_id: &str, doctor_id: &str,
                                           status: &str, appointment_date: &str,
                                           proposed_by: &str, proposed_date_time: &str) -> serde_json::Value {
        let mut row = Self::appointment_row(id, patient_id, doctor_id, status, appointment_date);
        row["pending_reschedule"] = json!({
            "proposed_by": proposed_by,
            "proposed_date_time": proposed_date_time,
            "reason": "Schedule conflict",
            "proposed_at": "2024-01-02T00:00:00Z"
        });
        row
    }

    pub fn medication_row(id: &str, patient_id: &str, name: &str, frequency: i32) -> serde_json::Value {
        let schedule: Vec<serde_json::Value> = (0..frequency)
            .map(|_| json!({ "time": null, "meal_relation": null, "quantity": null }))
            .collect();

        json!({
            "id": id,
            "patient_id": patient_id,
            "name": name,
            "frequency": frequency,
            "notes": null,
            "is_active": true,
            "schedule": schedule,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn health_overview_row(patient_id: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "blood_type": "A+",
            "height_cm": 170.0,
            "weight_kg": 65.0,
            "allergies": ["penicillin"],
            "chronic_conditions": [],
            "medical_history": [],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn facility_row(facility_id: &str) -> serde_json::Value {
        json!({
            "id": facility_id,
            "name": "Test Clinic",
            "facility_type": "clinic",
            "address": "2 Care Street",
            "phone": "+15550200",
            "email": "clinic@example.com",
            "description": "Community clinic",
            "is_verified": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn token_grant_response(user_id: &str) -> serde_json::Value {
        json!({
            "access_token": "test-access-token",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "test-refresh-token",
            "user": {
                "id": user_id,
                "email": "test@example.com",
                "role": "authenticated"
            }
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor("doc@example.com");
        assert_eq!(user.email, "doc@example.com");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert_eq!(user_model.id, user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_mock_rows_carry_ids() {
        let id = Uuid::new_v4().to_string();
        let row = MockGatewayResponses::appointment_row(
            &id, "p1", "d1", "pending", "2025-06-01T10:00:00Z");

        assert_eq!(row["id"], id.as_str());
        assert_eq!(row["status"], "pending");
        assert!(row["pending_reschedule"].is_null());
    }
}

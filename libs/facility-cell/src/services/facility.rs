use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use chrono::Utc;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Facility, FacilityError, FacilitySearchFilters, UpdateFacilityRequest};

pub struct FacilityService {
    supabase: SupabaseClient,
}

impl FacilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Public facility directory with optional type and name filters.
    pub async fn search_facilities(
        &self,
        filters: FacilitySearchFilters,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<Facility>, FacilityError> {
        debug!("Searching facilities with filters: {:?}", filters);

        let mut query_parts = Vec::new();

        if let Some(facility_type) = filters.facility_type {
            query_parts.push(format!("facility_type=eq.{}", facility_type));
        }
        if let Some(name) = filters.name {
            query_parts.push(format!("name=ilike.%{}%", name));
        }
        if filters.verified_only.unwrap_or(true) {
            query_parts.push("is_verified=eq.true".to_string());
        }

        let mut path = format!("/rest/v1/facilities?{}", query_parts.join("&"));
        path.push_str("&order=name.asc");

        if let Some(limit_val) = limit {
            path.push_str(&format!("&limit={}", limit_val));
        }
        if let Some(offset_val) = offset {
            path.push_str(&format!("&offset={}", offset_val));
        }

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            None,
            None,
        ).await.map_err(|e| FacilityError::DatabaseError(e.to_string()))?;

        let facilities: Vec<Facility> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Facility>, _>>()
            .map_err(|e| FacilityError::DatabaseError(e.to_string()))?;

        Ok(facilities)
    }

    /// Public facility profile, no session required.
    pub async fn get_facility_public(&self, facility_id: &str) -> Result<Facility, FacilityError> {
        debug!("Fetching public facility profile: {}", facility_id);

        self.fetch_facility(facility_id, None).await
    }

    pub async fn get_facility(
        &self,
        facility_id: &str,
        auth_token: &str,
    ) -> Result<Facility, FacilityError> {
        debug!("Fetching facility profile: {}", facility_id);

        self.fetch_facility(facility_id, Some(auth_token)).await
    }

    pub async fn update_facility(
        &self,
        facility_id: &str,
        request: UpdateFacilityRequest,
        auth_token: &str,
    ) -> Result<Facility, FacilityError> {
        debug!("Updating facility profile: {}", facility_id);

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(FacilityError::ValidationError("Name cannot be empty".to_string()));
            }
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(facility_type) = request.facility_type {
            update_data.insert("facility_type".to_string(), json!(facility_type.to_string()));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(description) = request.description {
            update_data.insert("description".to_string(), json!(description));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/facilities?id=eq.{}", facility_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(headers),
        ).await.map_err(|e| FacilityError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(FacilityError::NotFound);
        }

        let updated: Facility = serde_json::from_value(result[0].clone())
            .map_err(|e| FacilityError::DatabaseError(e.to_string()))?;
        Ok(updated)
    }

    async fn fetch_facility(
        &self,
        facility_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Facility, FacilityError> {
        let path = format!("/rest/v1/facilities?id=eq.{}", facility_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| FacilityError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(FacilityError::NotFound);
        }

        let facility: Facility = serde_json::from_value(result[0].clone())
            .map_err(|e| FacilityError::DatabaseError(e.to_string()))?;
        Ok(facility)
    }
}

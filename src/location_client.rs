// src/location_client.rs
// Reverse geocoding + AI place description backend.
// Serves both page variants: /reverse_geocode ({address, ai_description})
// and /map/get_location_info ({info}).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coords::Coordinate;
use crate::transport::ApiTransport;

pub const ADDRESS_NOT_FOUND: &str = "Address not found";
pub const DESCRIPTION_NOT_RECEIVED: &str = "Description not received";
pub const LOOKUP_FAILED: &str = "Reverse geocoding failed";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    /// Non-2xx status or an `error` field in the body.
    #[error("{0}")]
    Rejected(String),
    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationInfo {
    pub address: Option<String>,
    pub description: Option<String>,
}

impl LocationInfo {
    pub fn address_or_placeholder(&self) -> &str {
        self.address.as_deref().unwrap_or(ADDRESS_NOT_FOUND)
    }

    pub fn description_or_placeholder(&self) -> &str {
        self.description.as_deref().unwrap_or(DESCRIPTION_NOT_RECEIVED)
    }
}

#[derive(Serialize, Debug)]
struct LookupRequest {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize, Debug, Default)]
struct LookupResponse {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    ai_description: Option<String>,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
pub trait LocationLookup: Send + Sync {
    async fn lookup(&self, at: Coordinate) -> Result<LocationInfo, LookupError>;
}

#[derive(Debug, Clone)]
pub struct LocationClient {
    transport: ApiTransport,
    endpoint: String,
}

impl LocationClient {
    pub fn new(transport: ApiTransport, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LocationLookup for LocationClient {
    async fn lookup(&self, at: Coordinate) -> Result<LocationInfo, LookupError> {
        tracing::info!(
            latitude = at.latitude,
            longitude = at.longitude,
            endpoint = %self.endpoint,
            "📍 Looking up location"
        );

        let request = self.transport.post(&self.endpoint).json(&LookupRequest {
            latitude: at.latitude,
            longitude: at.longitude,
        });

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let body: Option<LookupResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = body
                .and_then(|b| non_empty(b.error))
                .unwrap_or_else(|| LOOKUP_FAILED.to_string());
            tracing::warn!(status = %status.as_u16(), error = %message, "Location lookup rejected");
            return Err(LookupError::Rejected(message));
        }

        let body = body.ok_or_else(|| {
            tracing::error!("Location lookup returned a body that is not JSON");
            LookupError::Network("invalid JSON in lookup response".to_string())
        })?;

        if let Some(message) = non_empty(body.error) {
            tracing::warn!(error = %message, "Location lookup returned an error");
            return Err(LookupError::Rejected(message));
        }

        Ok(LocationInfo {
            address: non_empty(body.address),
            description: non_empty(body.ai_description).or_else(|| non_empty(body.info)),
        })
    }
}

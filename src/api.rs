// Flight search provider: trait, HTTP client and token handling

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::{ClientConfig, ClientError};
use crate::offer::{parse_offers, OfferSearchResults};
use crate::search::SearchParams;

const ACCEPT_AMADEUS: &str = "application/vnd.amadeus+json";
const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const OFFERS_PATH: &str = "/v2/shopping/flight-offers";
const LOCATIONS_PATH: &str = "/v1/reference-data/locations";
const AIRPORT_PAGE_LIMIT: u32 = 50;
const CITY_PAGE_LIMIT: u32 = 30;
// Used when the token response omits expires_in
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 1799;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Token exchange failed: {0}")]
    AuthError(String),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Unexpected response payload: {0}")]
    SchemaError(String),

    #[error("Client error: {0}")]
    ConfigError(#[from] ClientError),
}

// What a failed call was trying to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Flights,
    Airports,
    Cities,
}

impl ApiError {
    // Static message safe to show to the traveller.
    pub fn user_message(&self, resource: Resource) -> &'static str {
        match self {
            ApiError::AuthError(_) => "Failed to fetch access token",
            ApiError::ConfigError(_) => "Flight search is not configured",
            _ => match resource {
                Resource::Flights => "Failed to fetch flights",
                Resource::Airports => "Failed to fetch airports",
                Resource::Cities => "Failed to fetch cities",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    pub iata_code: String,
    pub name: String,
    pub city: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct City {
    pub name: String,
}

#[async_trait]
pub trait FlightSearchProvider: Send + Sync {
    async fn search_offers(&self, params: &SearchParams) -> Result<OfferSearchResults, ApiError>;

    async fn search_airports(&self, query: &str) -> Result<Vec<Airport>, ApiError>;

    async fn search_cities(&self, query: &str) -> Result<Vec<City>, ApiError>;
}

// Wire formats

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LocationsEnvelope {
    #[serde(default)]
    data: Vec<RawLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLocation {
    #[serde(default)]
    iata_code: Option<String>,
    name: String,
    #[serde(default)]
    address: Option<RawAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAddress {
    #[serde(default)]
    city_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ProviderIssue>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderIssue {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

pub fn parse_airports(body: &str) -> Result<Vec<Airport>, serde_json::Error> {
    let envelope: LocationsEnvelope = serde_json::from_str(body)?;
    Ok(envelope
        .data
        .into_iter()
        .filter_map(|location| {
            let Some(iata_code) = location.iata_code else {
                warn!(name = %location.name, "Skipping airport without IATA code");
                return None;
            };
            let city = location
                .address
                .and_then(|a| a.city_name)
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Unknown".to_string());
            Some(Airport {
                iata_code,
                name: location.name,
                city,
            })
        })
        .collect())
}

pub fn parse_cities(body: &str) -> Result<Vec<City>, serde_json::Error> {
    let envelope: LocationsEnvelope = serde_json::from_str(body)?;
    Ok(envelope
        .data
        .into_iter()
        .map(|location| City {
            name: location.name,
        })
        .collect())
}

// Pulls the most useful line out of a provider error body
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let issue = envelope
            .errors
            .into_iter()
            .find_map(|issue| issue.detail.or(issue.title));
        if let Some(message) = issue.or(envelope.error_description) {
            return message;
        }
    }
    status
        .canonical_reason()
        .unwrap_or("Unexpected status")
        .to_string()
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn new(value: String, expires_in_secs: u64, margin_secs: u64) -> Self {
        let now = Instant::now();
        let refresh_at = now
            .checked_add(Duration::from_secs(expires_in_secs.saturating_sub(margin_secs)))
            .or_else(|| {
                now.checked_add(Duration::from_secs(
                    DEFAULT_TOKEN_LIFETIME_SECS.saturating_sub(margin_secs),
                ))
            })
            .unwrap_or(now);
        Self { value, refresh_at }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

pub struct AmadeusClient {
    http: reqwest::Client,
    config: ClientConfig,
    token: Mutex<Option<CachedToken>>,
}

impl AmadeusClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.config.timeout_ms)
        } else {
            ApiError::NetworkError(e.to_string())
        }
    }

    fn cached_token(&self) -> Option<String> {
        self.token
            .lock()
            .as_ref()
            .filter(|t| t.is_fresh())
            .map(|t| t.value.clone())
    }

    pub fn clear_token(&self) {
        self.token.lock().take();
    }

    async fn access_token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        debug!("Requesting access token");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .form(&form)
            .send()
            .await
            .map_err(|e| ApiError::AuthError(self.transport_error(e).to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::AuthError(e.to_string()))?;
        if !status.is_success() {
            error!(status = status.as_u16(), "Token exchange rejected");
            return Err(ApiError::AuthError(error_message(status, &body)));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::AuthError(format!("malformed token response: {}", e)))?;
        let cached = CachedToken::new(
            token.access_token,
            token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
            self.config.token_expiry_margin_secs,
        );
        let value = cached.value.clone();
        *self.token.lock() = Some(cached);
        Ok(value)
    }

    // Authorized GET returning the raw body of a successful response
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, ApiError> {
        let token = self.access_token().await?;
        debug!(path, "Provider request");

        let response = self
            .http
            .get(self.url(path))
            .header(header::ACCEPT, ACCEPT_AMADEUS)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if status.is_success() {
            return Ok(body);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.clear_token();
        }
        let message = error_message(status, &body);
        error!(path, status = status.as_u16(), %message, "Provider request failed");
        Err(ApiError::ApiResponseError {
            status_code: status.as_u16(),
            message,
        })
    }

    async fn locations(&self, sub_type: &str, keyword: &str, limit: u32) -> Result<String, ApiError> {
        let query = [
            ("subType", sub_type.to_string()),
            ("keyword", keyword.to_string()),
            ("page[limit]", limit.to_string()),
        ];
        self.get(LOCATIONS_PATH, &query).await
    }
}

fn schema_error(e: serde_json::Error) -> ApiError {
    error!(error = %e, "Provider payload did not match the expected shape");
    ApiError::SchemaError(e.to_string())
}

#[async_trait]
impl FlightSearchProvider for AmadeusClient {
    async fn search_offers(&self, params: &SearchParams) -> Result<OfferSearchResults, ApiError> {
        let params = SearchParams {
            max: params.max.min(self.config.max_results),
            ..params.clone()
        };
        let body = self.get(OFFERS_PATH, &params.query_pairs()).await?;
        let results = parse_offers(&body).map_err(schema_error)?;
        debug!(
            offers = results.offers.len(),
            rejected = results.rejected,
            carriers = results.carriers.len(),
            "Flight offers received"
        );
        Ok(results)
    }

    async fn search_airports(&self, query: &str) -> Result<Vec<Airport>, ApiError> {
        let body = self.locations("AIRPORT", query, AIRPORT_PAGE_LIMIT).await?;
        parse_airports(&body).map_err(schema_error)
    }

    async fn search_cities(&self, query: &str) -> Result<Vec<City>, ApiError> {
        let body = self.locations("CITY", query, CITY_PAGE_LIMIT).await?;
        parse_cities(&body).map_err(schema_error)
    }
}

use crate::config::AppConfig;
use crate::reviews::{CreatedRequest, DispatchedRequest, RatingInput, RatingPage, ReviewError};
use crate::storage::{MemoryStore, Store};
use axum::{
    extract::{FromRequest, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// The store shared by all handlers. Each operation holds the lock for its
/// whole read-modify-write.
pub type SharedStore = Arc<RwLock<Box<dyn Store>>>;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self::with_store(config, Box::new(MemoryStore::new()))
    }

    /// Seed the configured company into `store` and wrap it for sharing
    pub fn with_store(config: AppConfig, mut store: Box<dyn Store>) -> Self {
        store.insert_company(config.company.to_company());
        Self {
            store: Arc::new(RwLock::new(store)),
            config: Arc::new(config),
        }
    }
}

/// Response after a contact upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub created: Vec<CreatedRequest>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SendAllResponse {
    pub ok: bool,
    pub sent: usize,
    pub items: Vec<DispatchedRequest>,
}

#[derive(Debug, Serialize)]
pub struct RatingPageResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub page: RatingPage,
}

/// Rating submission. Every field is optional.
///
/// Read from a JSON or urlencoded body. A body that cannot be read as either
/// yields the all-default request, which then fails token resolution.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RateRequest {
    pub token: Value,
    pub rating: Value,
    pub comment: Value,
}

impl<S: Send + Sync> FromRequest<S> for RateRequest {
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let parsed = if is_form {
            Form::<RateRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|e| e.body_text())
        } else {
            Json::<RateRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| e.body_text())
        };

        Ok(parsed.unwrap_or_else(|reason| {
            debug!(reason = %reason, "Unreadable rating body, using defaults");
            RateRequest::default()
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub ok: bool,
    pub public: bool,
    pub redirect: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub total_requests: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl RateRequest {
    /// Lenient conversion: missing or unusable values become 0 / ""
    pub fn into_input(self) -> (String, RatingInput) {
        let input = RatingInput {
            rating: coerce_rating(&self.rating),
            comment: coerce_text(self.comment),
        };
        (coerce_text(self.token), input)
    }
}

/// Numeric value with JavaScript `Number()` semantics; NaN and infinities become 0
fn coerce_rating(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        Value::String(s) => parse_number(s),
        // `[x]` converts through its string form; longer arrays are NaN
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [Value::Number(n)] => n.as_f64().unwrap_or(0.0),
            [Value::String(s)] => parse_number(s),
            [inner @ Value::Array(_)] => coerce_rating(inner),
            _ => 0.0,
        },
        _ => 0.0,
    }
}

/// Decimal, exponent and `0x`/`0o`/`0b` forms; blank is 0
fn parse_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }
    let radix = match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    let parsed = match (radix, s.get(2..)) {
        (Some(radix), Some(digits)) if !digits.starts_with('+') => {
            u64::from_str_radix(digits, radix).ok().map(|v| v as f64)
        }
        _ => s.parse::<f64>().ok(),
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Falsy values (null, false, 0, "") become ""; other non-strings are stringified
fn coerce_text(value: Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Internal(String),
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::InvalidToken => AppError::NotFound(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse {
            ok: false,
            error: message,
        }))
        .into_response()
    }
}

use crate::api::models::*;
use crate::reviews::{self, ReviewError, Stats};
use crate::storage::Snapshot;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderMap},
    Json,
};
use tracing::info;

/// Fields of the upload form
#[derive(Debug, Default)]
struct UploadForm {
    csv: Option<Bytes>,
    company_id: Option<String>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ReviewError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ReviewError::Multipart(e.to_string()))?
        {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("csv") => {
                    form.csv = Some(
                        field
                            .bytes()
                            .await
                            .map_err(|e| ReviewError::Multipart(e.to_string()))?,
                    );
                }
                Some("companyId") => {
                    form.company_id = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| ReviewError::Multipart(e.to_string()))?,
                    );
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::Internal(e.body_text()))?;
    let form = UploadForm::read(&mut multipart).await?;

    let company_id = form
        .company_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| state.config.company.id.clone());
    let csv = form.csv.ok_or(ReviewError::MissingUpload)?;
    // Undecodable bytes become U+FFFD rather than failing the batch
    let content = String::from_utf8_lossy(&csv);

    info!(company_id = %company_id, bytes = csv.len(), "Processing upload");

    // Ingest
    let created = {
        let mut store = state.store.write().await;
        reviews::ingest(&mut **store, &company_id, &content)?
    };

    Ok(Json(UploadResponse {
        total: created.len(),
        ok: true,
        created,
    }))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<Stats> {
    let store = state.store.read().await;
    Json(reviews::stats(&**store))
}

/// Link base: configured public URL, else the caller's Host
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.config.server.public_url {
        return url.clone();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("localhost:{}", state.config.server.port));
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}

pub async fn send_all_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SendAllResponse> {
    let base = base_url(&state, &headers);
    let items = {
        let mut store = state.store.write().await;
        reviews::dispatch(&mut **store, &base)
    };

    Json(SendAllResponse {
        ok: true,
        sent: items.len(),
        items,
    })
}

pub async fn dump_handler(State(state): State<AppState>) -> Json<Snapshot> {
    let store = state.store.read().await;
    Json(reviews::dump(&**store))
}

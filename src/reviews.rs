//! Review request lifecycle: created, then sent and/or rated.

use crate::ingest::ContactReader;
use crate::storage::{Company, Customer, NewReviewRequest, ReviewRequest, Snapshot, Store};
use crate::token;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Ratings at or above this go to the public review platform
pub const PUBLIC_RATING_THRESHOLD: f64 = 4.0;

/// How many requests the stats view lists
pub const RECENT_REQUESTS: usize = 10;

pub type Result<T> = std::result::Result<T, ReviewError>;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Unknown company: {0}")]
    UnknownCompany(String),

    #[error("No csv file uploaded")]
    MissingUpload,

    #[error("Failed to read upload: {0}")]
    Multipart(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Store integrity error: {0}")]
    Integrity(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRequest {
    pub request_id: String,
    pub customer_id: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchedRequest {
    pub request_id: String,
    pub token: String,
    pub link: String,
}

/// What the public rating page shows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPage {
    pub request: ReviewRequest,
    pub customer: Customer,
    pub company: Company,
    pub publish_link: String,
}

#[derive(Debug, Clone, Default)]
pub struct RatingInput {
    pub rating: f64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingOutcome {
    pub public: bool,
    pub redirect: Option<String>,
}

/// Request counts and rating average.
///
/// `avg_rating` serializes as a JSON number rounded to two places (`4.33`),
/// not a preformatted string, and is `null` until something is rated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub sent: usize,
    pub avg_rating: Option<f64>,
    pub requests: Vec<ReviewRequest>,
}

/// Create one customer, request and token per contact row.
///
/// Rows are committed as they are read: a CSV error part way through leaves
/// the earlier rows in the store.
pub fn ingest(store: &mut dyn Store, company_id: &str, content: &str) -> Result<Vec<CreatedRequest>> {
    if store.company(company_id).is_none() {
        return Err(ReviewError::UnknownCompany(company_id.to_string()));
    }

    let mut created = Vec::new();
    for row in ContactReader::new(content)? {
        let customer = store.insert_customer(row?.into_customer());
        let request = store.insert_request(NewReviewRequest {
            company_id: company_id.to_string(),
            customer_id: customer.id.clone(),
            scheduled_at: Utc::now(),
        });
        let token = token::encode(&request.id);
        store.bind_token(&token, &request.id);
        created.push(CreatedRequest {
            request_id: request.id,
            customer_id: customer.id,
            token,
        });
    }

    info!(company_id, created = created.len(), "Contacts ingested");
    Ok(created)
}

/// Mark every unsent request as sent and mint its share link
pub fn dispatch(store: &mut dyn Store, base_url: &str) -> Vec<DispatchedRequest> {
    let base_url = base_url.trim_end_matches('/');
    let mut items = Vec::new();

    for mut request in store.requests().into_iter().filter(|r| !r.sent) {
        request.sent = true;
        let token = token::encode(&request.id);
        store.bind_token(&token, &request.id);
        let request_id = request.id.clone();
        if !store.update_request(request) {
            warn!(request_id = %request_id, "Request vanished during dispatch");
            continue;
        }
        items.push(DispatchedRequest {
            link: format!("{}/r/{}", base_url, token),
            request_id,
            token,
        });
    }

    info!(sent = items.len(), "Dispatch complete");
    items
}

fn resolve(store: &dyn Store, token: &str) -> Result<ReviewRequest> {
    let Some(request_id) = store.resolve_token(token) else {
        debug!(token, decoded = ?token::decode(token), "Unknown token");
        return Err(ReviewError::InvalidToken);
    };
    store
        .request(&request_id)
        .ok_or_else(|| ReviewError::Integrity(format!("token points at missing request {}", request_id)))
}

fn company_of(store: &dyn Store, request: &ReviewRequest) -> Result<Company> {
    store.company(&request.company_id).ok_or_else(|| {
        ReviewError::Integrity(format!(
            "request {} references missing company {}",
            request.id, request.company_id
        ))
    })
}

/// Look up the public rating page for a token. Read only.
pub fn lookup(store: &dyn Store, token: &str) -> Result<RatingPage> {
    let request = resolve(store, token)?;
    let customer = store.customer(&request.customer_id).ok_or_else(|| {
        ReviewError::Integrity(format!(
            "request {} references missing customer {}",
            request.id, request.customer_id
        ))
    })?;
    let company = company_of(store, &request)?;

    Ok(RatingPage {
        request,
        customer,
        publish_link: company.publish_link.clone(),
        company,
    })
}

/// Record a rating. Resubmitting overwrites the previous one.
pub fn submit_rating(store: &mut dyn Store, token: &str, input: RatingInput) -> Result<RatingOutcome> {
    let mut request = resolve(store, token)?;
    let company = company_of(store, &request)?;

    let public = input.rating >= PUBLIC_RATING_THRESHOLD;
    request.rating = Some(input.rating);
    request.comment = Some(input.comment);
    request.completed_at = Some(Utc::now());
    request.public_requested = public;

    info!(
        company_id = %request.company_id,
        customer_id = %request.customer_id,
        rating = input.rating,
        public,
        "New rating received"
    );

    if !store.update_request(request) {
        return Err(ReviewError::Integrity("rated request disappeared".to_string()));
    }

    Ok(RatingOutcome {
        public,
        redirect: public.then_some(company.publish_link),
    })
}

pub fn stats(store: &dyn Store) -> Stats {
    let requests = store.requests();
    let sent = requests.iter().filter(|r| r.sent).count();
    let ratings: Vec<f64> = requests.iter().filter_map(|r| r.rating).collect();
    let avg_rating = (!ratings.is_empty())
        .then(|| round2(ratings.iter().sum::<f64>() / ratings.len() as f64));
    let recent = requests.len().saturating_sub(RECENT_REQUESTS);

    Stats {
        total: requests.len(),
        sent,
        avg_rating,
        requests: requests[recent..].to_vec(),
    }
}

pub fn dump(store: &dyn Store) -> Snapshot {
    store.snapshot()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A business collecting reviews
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    /// External review URL positive ratings are sent to
    pub publish_link: String,
    pub settings: CompanySettings,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettings {
    pub delay_hours: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service_date: String,
}

/// Customer fields before the store assigns an id
#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub id: String,
    pub company_id: String,
    pub customer_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub sent: bool,
    pub rating: Option<f64>,
    pub comment: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub public_requested: bool,
}

#[derive(Debug, Clone)]
pub struct NewReviewRequest {
    pub company_id: String,
    pub customer_id: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Everything the store holds, keyed by id
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub companies: BTreeMap<String, Company>,
    pub customers: BTreeMap<String, Customer>,
    pub requests: BTreeMap<String, ReviewRequest>,
}

/// Storage for companies, customers, review requests and their tokens.
///
/// Implementations own id assignment. Callers serialize access (the app keeps
/// the store behind a lock), so methods take `&mut self` for writes.
pub trait Store: Send + Sync {
    fn insert_company(&mut self, company: Company);

    fn company(&self, id: &str) -> Option<Company>;

    fn insert_customer(&mut self, customer: NewCustomer) -> Customer;

    fn customer(&self, id: &str) -> Option<Customer>;

    fn insert_request(&mut self, request: NewReviewRequest) -> ReviewRequest;

    fn request(&self, id: &str) -> Option<ReviewRequest>;

    /// Replace a stored request. Returns false if the id is unknown.
    fn update_request(&mut self, request: ReviewRequest) -> bool;

    /// All requests in creation order
    fn requests(&self) -> Vec<ReviewRequest>;

    fn bind_token(&mut self, token: &str, request_id: &str);

    fn resolve_token(&self, token: &str) -> Option<String>;

    fn snapshot(&self) -> Snapshot;
}

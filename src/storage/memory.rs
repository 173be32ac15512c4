use super::{Company, Customer, NewCustomer, NewReviewRequest, ReviewRequest, Snapshot, Store};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Monotonic id source, independent of collection sizes
#[derive(Debug)]
struct Sequence(AtomicU64);

impl Sequence {
    fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    fn next(&self) -> String {
        self.0.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

/// In-memory store. Nothing survives a restart.
#[derive(Debug)]
pub struct MemoryStore {
    companies: BTreeMap<String, Company>,
    customers: HashMap<String, Customer>,
    requests: Vec<ReviewRequest>,
    request_index: HashMap<String, usize>,
    tokens: HashMap<String, String>,
    customer_ids: Sequence,
    request_ids: Sequence,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            companies: BTreeMap::new(),
            customers: HashMap::new(),
            requests: Vec::new(),
            request_index: HashMap::new(),
            tokens: HashMap::new(),
            customer_ids: Sequence::new(),
            request_ids: Sequence::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn insert_company(&mut self, company: Company) {
        debug!(company_id = %company.id, "Storing company");
        self.companies.insert(company.id.clone(), company);
    }

    fn company(&self, id: &str) -> Option<Company> {
        self.companies.get(id).cloned()
    }

    fn insert_customer(&mut self, customer: NewCustomer) -> Customer {
        let customer = Customer {
            id: self.customer_ids.next(),
            name: customer.name,
            email: customer.email,
            phone: customer.phone,
            service_date: customer.service_date,
        };
        self.customers.insert(customer.id.clone(), customer.clone());
        customer
    }

    fn customer(&self, id: &str) -> Option<Customer> {
        self.customers.get(id).cloned()
    }

    fn insert_request(&mut self, request: NewReviewRequest) -> ReviewRequest {
        let request = ReviewRequest {
            id: self.request_ids.next(),
            company_id: request.company_id,
            customer_id: request.customer_id,
            scheduled_at: request.scheduled_at,
            sent: false,
            rating: None,
            comment: None,
            completed_at: None,
            public_requested: false,
        };
        self.request_index
            .insert(request.id.clone(), self.requests.len());
        self.requests.push(request.clone());
        request
    }

    fn request(&self, id: &str) -> Option<ReviewRequest> {
        self.request_index
            .get(id)
            .and_then(|&pos| self.requests.get(pos))
            .cloned()
    }

    fn update_request(&mut self, request: ReviewRequest) -> bool {
        match self
            .request_index
            .get(&request.id)
            .and_then(|&pos| self.requests.get_mut(pos))
        {
            Some(slot) => {
                *slot = request;
                true
            }
            None => false,
        }
    }

    fn requests(&self) -> Vec<ReviewRequest> {
        self.requests.clone()
    }

    fn bind_token(&mut self, token: &str, request_id: &str) {
        self.tokens.insert(token.to_string(), request_id.to_string());
    }

    fn resolve_token(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            companies: self.companies.clone(),
            customers: self
                .customers
                .iter()
                .map(|(id, c)| (id.clone(), c.clone()))
                .collect(),
            requests: self
                .requests
                .iter()
                .map(|r| (r.id.clone(), r.clone()))
                .collect(),
        }
    }
}

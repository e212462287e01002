//! Backend API client.
//!
//! Authenticated HTTP access to the shop backend: operator login, sales,
//! inventory, expenses, categories, customers, and staff accounts. Every
//! durable data operation the terminal performs goes through here; the
//! terminal itself keeps no business records.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::info;

use crate::models::{
    Category, Customer, ExpenseRecord, InventoryItem, NewCategory, NewCustomer, NewExpense,
    NewInventoryItem, NewSale, NewUser, SaleRecord, TokenResponse, UserAccount,
};
use crate::storage;

/// Default timeout for API requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout used specifically for the lightweight connectivity test.
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the backend URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment (requests add it back)
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_server_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /api
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    // Strip trailing slashes again (in case "/api/" was present)
    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Pairing code decoding
// ---------------------------------------------------------------------------

fn decode_connection_string_payload(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str::<Value>(trimmed).ok();
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.starts_with('{') {
        return serde_json::from_str::<Value>(&compact).ok();
    }
    if compact.len() < 20 {
        return None;
    }

    let base64 = compact.replace('-', "+").replace('_', "/");
    let padded = format!(
        "{}{}",
        base64,
        "=".repeat((4usize.wrapping_sub(base64.len() % 4)) % 4)
    );
    let decoded = BASE64_STANDARD.decode(padded).ok()?;
    serde_json::from_slice::<Value>(&decoded).ok()
}

/// Extract the backend URL from a pairing code, normalised.
pub fn extract_server_url_from_connection_string(raw: &str) -> Option<String> {
    decode_connection_string_payload(raw)
        .and_then(|v| {
            v.get("url")
                .and_then(Value::as_str)
                .map(normalize_server_url)
        })
        .filter(|s| !s.is_empty())
}

/// Extract the terminal id from a pairing code.
pub fn extract_terminal_id_from_connection_string(raw: &str) -> Option<String> {
    decode_connection_string_payload(raw)
        .and_then(|v| {
            v.get("tid")
                .or_else(|| v.get("terminalId"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_connect() {
        return format!("Cannot reach the backend at {url}");
    }
    if err.is_timeout() {
        return format!("Connection to {url} timed out");
    }
    if err.is_builder() {
        return format!("Invalid backend URL: {url}");
    }
    format!("Network error communicating with {url}: {err}")
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Session expired or invalid credentials - sign in again".to_string(),
        403 => "You do not have permission to do that".to_string(),
        404 => "Backend endpoint not found".to_string(),
        s if s >= 500 => format!("Backend server error (HTTP {s})"),
        s => format!("Unexpected response from backend (HTTP {s})"),
    }
}

// ---------------------------------------------------------------------------
// Connectivity test
// ---------------------------------------------------------------------------

/// Result of a connectivity test.
#[derive(serde::Serialize)]
pub struct ConnectivityResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Test connectivity to the backend with a lightweight health-check.
pub async fn test_connectivity(server_url: &str) -> ConnectivityResult {
    let url = normalize_server_url(server_url);
    let health_url = format!("{url}/api/health");

    let client = match Client::builder().timeout(CONNECTIVITY_TIMEOUT).build() {
        Ok(c) => c,
        Err(e) => {
            return ConnectivityResult {
                success: false,
                latency_ms: None,
                error: Some(format!("Failed to create HTTP client: {e}")),
            };
        }
    };

    let start = Instant::now();

    let resp = match client.get(&health_url).send().await {
        Ok(r) => r,
        Err(e) => {
            return ConnectivityResult {
                success: false,
                latency_ms: None,
                error: Some(friendly_error(&url, &e)),
            };
        }
    };

    let latency = start.elapsed().as_millis() as u64;
    let status = resp.status();

    if status.is_success() {
        info!(latency_ms = latency, "connectivity test passed");
        ConnectivityResult {
            success: true,
            latency_ms: Some(latency),
            error: None,
        }
    } else {
        ConnectivityResult {
            success: false,
            latency_ms: Some(latency),
            error: Some(status_error(status)),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated client for the shop backend.
///
/// Holds the normalised base URL and the operator's bearer token; the token
/// is set by [`crate::session::SessionState::login`] and cleared on logout.
pub struct ApiClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(server_url: &str) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?;

        Ok(ApiClient {
            base_url: normalize_server_url(server_url),
            client,
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Attach auth headers, send, and decode one response.
    ///
    /// Non-success responses prefer the backend's `detail` message when the
    /// body carries one, falling back to the generic status mapping.
    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, String> {
        let mut req = req;
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(terminal_id) = storage::get_terminal_id() {
            req = req.header("x-terminal-id", terminal_id);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| {
                    v.get("detail")
                        .and_then(Value::as_str)
                        .map(|s| s.to_string())
                })
                .filter(|s| !s.trim().is_empty());
            return Err(detail.unwrap_or_else(|| status_error(status)));
        }

        resp.json::<T>()
            .await
            .map_err(|e| format!("Invalid response from backend: {e}"))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, String> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        self.send(req).await
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    /// `POST /api/auth/token`: form-urlencoded credential exchange.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, String> {
        let req = self
            .client
            .post(self.url("/auth/token"))
            .form(&[("username", username), ("password", password)]);
        self.send(req).await
    }

    /// `GET /api/users/me`: the signed-in operator profile.
    pub async fn me(&self) -> Result<UserAccount, String> {
        self.request(Method::GET, "/users/me", None).await
    }

    // -----------------------------------------------------------------------
    // Sales
    // -----------------------------------------------------------------------

    pub async fn sales(&self) -> Result<Vec<SaleRecord>, String> {
        self.request(Method::GET, "/pos/", None).await
    }

    pub async fn create_sale(&self, sale: &NewSale) -> Result<SaleRecord, String> {
        let body = serde_json::to_value(sale).map_err(|e| format!("encode sale: {e}"))?;
        self.request(Method::POST, "/pos/", Some(&body)).await
    }

    // -----------------------------------------------------------------------
    // Inventory
    // -----------------------------------------------------------------------

    pub async fn inventory(&self) -> Result<Vec<InventoryItem>, String> {
        self.request(Method::GET, "/inventory/", None).await
    }

    pub async fn add_inventory_item(
        &self,
        item: &NewInventoryItem,
    ) -> Result<InventoryItem, String> {
        let body = serde_json::to_value(item).map_err(|e| format!("encode item: {e}"))?;
        self.request(Method::POST, "/inventory/", Some(&body)).await
    }

    /// Partial update; `updates` carries only the fields to change.
    pub async fn update_inventory_item(
        &self,
        id: &str,
        updates: &Value,
    ) -> Result<InventoryItem, String> {
        self.request(Method::PUT, &format!("/inventory/{id}"), Some(updates))
            .await
    }

    pub async fn delete_inventory_item(&self, id: &str) -> Result<Value, String> {
        self.request(Method::DELETE, &format!("/inventory/{id}"), None)
            .await
    }

    // -----------------------------------------------------------------------
    // Expenses
    // -----------------------------------------------------------------------

    pub async fn expenses(&self) -> Result<Vec<ExpenseRecord>, String> {
        self.request(Method::GET, "/expense/", None).await
    }

    pub async fn add_expense(&self, expense: &NewExpense) -> Result<ExpenseRecord, String> {
        let body = serde_json::to_value(expense).map_err(|e| format!("encode expense: {e}"))?;
        self.request(Method::POST, "/expense/", Some(&body)).await
    }

    pub async fn update_expense(
        &self,
        id: &str,
        updates: &Value,
    ) -> Result<ExpenseRecord, String> {
        self.request(Method::PUT, &format!("/expense/{id}"), Some(updates))
            .await
    }

    pub async fn delete_expense(&self, id: &str) -> Result<Value, String> {
        self.request(Method::DELETE, &format!("/expense/{id}"), None)
            .await
    }

    // -----------------------------------------------------------------------
    // Categories
    // -----------------------------------------------------------------------

    pub async fn categories(&self) -> Result<Vec<Category>, String> {
        self.request(Method::GET, "/category/", None).await
    }

    pub async fn add_category(&self, category: &NewCategory) -> Result<Category, String> {
        let body = serde_json::to_value(category).map_err(|e| format!("encode category: {e}"))?;
        self.request(Method::POST, "/category/", Some(&body)).await
    }

    pub async fn update_category(&self, id: &str, updates: &Value) -> Result<Category, String> {
        self.request(Method::PUT, &format!("/category/{id}"), Some(updates))
            .await
    }

    pub async fn delete_category(&self, id: &str) -> Result<Value, String> {
        self.request(Method::DELETE, &format!("/category/{id}"), None)
            .await
    }

    // -----------------------------------------------------------------------
    // Customers
    // -----------------------------------------------------------------------

    pub async fn customers(&self) -> Result<Vec<Customer>, String> {
        self.request(Method::GET, "/customer/", None).await
    }

    pub async fn customer(&self, id: &str) -> Result<Customer, String> {
        self.request(Method::GET, &format!("/customer/{id}"), None)
            .await
    }

    pub async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer, String> {
        let body = serde_json::to_value(customer).map_err(|e| format!("encode customer: {e}"))?;
        self.request(Method::POST, "/customer/", Some(&body)).await
    }

    pub async fn update_customer(&self, id: &str, updates: &Value) -> Result<Customer, String> {
        self.request(Method::PUT, &format!("/customer/{id}"), Some(updates))
            .await
    }

    pub async fn delete_customer(&self, id: &str) -> Result<Value, String> {
        self.request(Method::DELETE, &format!("/customer/{id}"), None)
            .await
    }

    pub async fn search_customers(&self, query: &str) -> Result<Vec<Customer>, String> {
        let req = self
            .client
            .get(self.url("/customers/"))
            .query(&[("search", query)]);
        self.send(req).await
    }

    pub async fn customer_purchases(&self, id: &str) -> Result<Vec<SaleRecord>, String> {
        self.request(Method::GET, &format!("/customer/{id}/purchases/"), None)
            .await
    }

    /// Purchase statistics for one customer. The shape is backend-defined, so
    /// it is passed through as raw JSON.
    pub async fn customer_stats(&self, id: &str) -> Result<Value, String> {
        self.request(Method::GET, &format!("/customer/{id}/stats/"), None)
            .await
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    pub async fn users(&self) -> Result<Vec<UserAccount>, String> {
        self.request(Method::GET, "/users/", None).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<UserAccount, String> {
        let body = serde_json::to_value(user).map_err(|e| format!("encode user: {e}"))?;
        self.request(Method::POST, "/users/", Some(&body)).await
    }

    pub async fn update_user(&self, id: &str, updates: &Value) -> Result<UserAccount, String> {
        self.request(Method::PUT, &format!("/users/{id}"), Some(updates))
            .await
    }

    pub async fn delete_user(&self, id: &str) -> Result<Value, String> {
        self.request(Method::DELETE, &format!("/users/{id}"), None)
            .await
    }
}

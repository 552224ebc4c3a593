//! Directus HTTP client.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use storsync_recon::{ItemStore, StoreError, SyncItem};

// ── Constants ───────────────────────────────────────────────────────

/// Identifiers per existence-probe request; keeps the filter query string
/// well below URL limits.
const ID_CHUNK: usize = 100;

/// Page size for the full identifier scan.
const SCAN_PAGE_SIZE: usize = 10_000;

/// Transient-failure retries per request (on top of the first attempt).
const MAX_RETRIES: u32 = 3;

/// Initial backoff, doubled per attempt.
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// How much of an error response body to keep in errors and logs.
const BODY_SNIPPET: usize = 500;

const USER_AGENT: &str = concat!("storsync/", env!("CARGO_PKG_VERSION"));

// ── Config ──────────────────────────────────────────────────────────

/// Connection settings for one Directus collection.
#[derive(Debug, Clone)]
pub struct DirectusConfig {
    pub base_url: String,
    pub token: String,
    pub collection: String,
    /// Initial retry backoff. Overridable for tests; production keeps the
    /// 2 s default.
    pub retry_delay: Duration,
}

impl DirectusConfig {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            collection: collection.into(),
            retry_delay: RETRY_DELAY,
        }
    }
}

// ── Error ───────────────────────────────────────────────────────────

/// Error type for destination operations.
#[derive(Debug)]
pub enum DirectusError {
    /// Credentials rejected (401/403).
    Auth(u16, String),
    /// Transport failure or 503 after the retry ceiling.
    Network(String),
    /// Non-retryable non-2xx response.
    Http(u16, String),
    /// Response body did not parse as the expected JSON shape.
    Parse(String),
}

impl std::fmt::Display for DirectusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectusError::Auth(code, msg) => write!(f, "auth rejected (HTTP {code}): {msg}"),
            DirectusError::Network(msg) => write!(f, "network error: {msg}"),
            DirectusError::Http(code, msg) => write!(f, "HTTP {code}: {msg}"),
            DirectusError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for DirectusError {}

impl From<DirectusError> for StoreError {
    fn from(err: DirectusError) -> Self {
        match err {
            DirectusError::Auth(code, msg) => StoreError::Auth(format!("HTTP {code}: {msg}")),
            other => StoreError::Failed(other.to_string()),
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Directus items API client (blocking).
#[derive(Clone)]
pub struct DirectusClient {
    http: reqwest::blocking::Client,
    base_url: String,
    token: String,
    collection: String,
    retry_delay: Duration,
}

impl DirectusClient {
    pub fn new(config: DirectusConfig) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            collection: config.collection,
            retry_delay: config.retry_delay,
        }
    }

    fn items_url(&self) -> String {
        format!("{}/items/{}", self.base_url, self.collection)
    }

    /// Which of the given ids exist, with their stored checksums. Queried
    /// in chunks of 100 ids per request.
    pub fn existing_items(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Option<String>>, DirectusError> {
        let mut existing = HashMap::new();

        for chunk in ids.chunks(ID_CHUNK) {
            let text = self.request_with_retry(|| {
                self.http.get(self.items_url()).query(&[
                    ("filter[id][_in]", chunk.join(",")),
                    ("fields", "id,checksum".to_string()),
                    ("limit", "-1".to_string()),
                ])
            })?;
            collect_id_rows(&parse_json(&text)?, &mut existing)?;
        }

        Ok(existing)
    }

    /// Every id in the collection with its stored checksum, paginated in
    /// pages of 10 000.
    pub fn known_items(&self) -> Result<HashMap<String, Option<String>>, DirectusError> {
        let mut all = HashMap::new();
        let mut offset = 0usize;

        loop {
            let text = self.request_with_retry(|| {
                self.http.get(self.items_url()).query(&[
                    ("fields", "id,checksum".to_string()),
                    ("limit", SCAN_PAGE_SIZE.to_string()),
                    ("offset", offset.to_string()),
                ])
            })?;
            let page = collect_id_rows(&parse_json(&text)?, &mut all)?;

            if page < SCAN_PAGE_SIZE {
                break;
            }
            offset += SCAN_PAGE_SIZE;
        }

        Ok(all)
    }

    /// Insert a batch of items in a single POST. Expects 200/201.
    pub fn create_batch(&self, items: &[SyncItem]) -> Result<usize, DirectusError> {
        if items.is_empty() {
            return Ok(0);
        }
        let payload: Vec<&serde_json::Value> = items.iter().map(|i| &i.payload).collect();
        self.request_with_retry(|| self.http.post(self.items_url()).json(&payload))?;
        Ok(items.len())
    }

    /// Update a batch of items in a single PATCH, matched by the embedded
    /// id. Expects 200/204.
    pub fn update_batch(&self, items: &[SyncItem]) -> Result<usize, DirectusError> {
        if items.is_empty() {
            return Ok(0);
        }
        let payload: Vec<&serde_json::Value> = items.iter().map(|i| &i.payload).collect();
        self.request_with_retry(|| self.http.patch(self.items_url()).json(&payload))?;
        Ok(items.len())
    }

    /// Delete a batch of ids in a single request. Expects 200/204.
    pub fn delete_batch(&self, ids: &[String]) -> Result<usize, DirectusError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.request_with_retry(|| self.http.delete(self.items_url()).json(&ids))?;
        Ok(ids.len())
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Send a request with retry and exponential backoff.
    ///
    /// 503 and transport errors are retried up to the ceiling; 401/403
    /// fails immediately as an auth error; any other non-2xx fails
    /// immediately with a snippet of the response body.
    fn request_with_retry(
        &self,
        build_request: impl Fn() -> reqwest::blocking::RequestBuilder,
    ) -> Result<String, DirectusError> {
        let mut backoff = self.retry_delay;

        for attempt in 0..=MAX_RETRIES {
            let result = build_request().bearer_auth(&self.token).send();

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status == 401 || status == 403 {
                        let body = resp.text().unwrap_or_default();
                        return Err(DirectusError::Auth(status, snippet(&body)));
                    }

                    if status == 503 {
                        if attempt == MAX_RETRIES {
                            return Err(DirectusError::Network(format!(
                                "destination unavailable (503) after {MAX_RETRIES} retries"
                            )));
                        }
                        eprintln!(
                            "warning: destination unavailable, retry {}/{} in {}s",
                            attempt + 1,
                            MAX_RETRIES,
                            backoff.as_secs(),
                        );
                        thread::sleep(backoff);
                        backoff *= 2;
                        continue;
                    }

                    if !resp.status().is_success() {
                        let body = resp.text().unwrap_or_default();
                        return Err(DirectusError::Http(status, snippet(&body)));
                    }

                    return resp
                        .text()
                        .map_err(|e| DirectusError::Network(e.to_string()));
                }
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(DirectusError::Network(format!(
                            "request failed after {MAX_RETRIES} retries: {e}"
                        )));
                    }
                    eprintln!(
                        "warning: retry {}/{} in {}s ({e})",
                        attempt + 1,
                        MAX_RETRIES,
                        backoff.as_secs(),
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }

        unreachable!()
    }
}

// ── ItemStore ───────────────────────────────────────────────────────

impl ItemStore for DirectusClient {
    fn existing_items(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Option<String>>, StoreError> {
        DirectusClient::existing_items(self, ids).map_err(StoreError::from)
    }

    fn known_items(&self) -> Result<HashMap<String, Option<String>>, StoreError> {
        DirectusClient::known_items(self).map_err(StoreError::from)
    }

    fn create_batch(&self, items: &[SyncItem]) -> Result<usize, StoreError> {
        DirectusClient::create_batch(self, items).map_err(StoreError::from)
    }

    fn update_batch(&self, items: &[SyncItem]) -> Result<usize, StoreError> {
        DirectusClient::update_batch(self, items).map_err(StoreError::from)
    }

    fn delete_batch(&self, ids: &[String]) -> Result<usize, StoreError> {
        DirectusClient::delete_batch(self, ids).map_err(StoreError::from)
    }
}

// ── Free functions ──────────────────────────────────────────────────

fn parse_json(text: &str) -> Result<serde_json::Value, DirectusError> {
    serde_json::from_str(text).map_err(|e| {
        DirectusError::Parse(format!("invalid JSON response: {e} (body: {})", snippet(text)))
    })
}

/// Read `{"data": [{"id": …, "checksum": …}, …]}` rows into the map.
/// Returns the number of rows on this page.
fn collect_id_rows(
    body: &serde_json::Value,
    into: &mut HashMap<String, Option<String>>,
) -> Result<usize, DirectusError> {
    let rows = body
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| DirectusError::Parse("missing data array in response".into()))?;

    for row in rows {
        let id = row
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DirectusError::Parse("row without string id".into()))?;
        let checksum = row.get("checksum").and_then(|v| v.as_str()).map(String::from);
        into.insert(id.to_string(), checksum);
    }

    Ok(rows.len())
}

fn snippet(body: &str) -> String {
    let mut end = body.len().min(BODY_SNIPPET);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_id_rows_reads_checksums() {
        let body = serde_json::json!({
            "data": [
                { "id": "a", "checksum": "blake3:aa" },
                { "id": "b", "checksum": null },
                { "id": "c" },
            ]
        });
        let mut map = HashMap::new();
        let n = collect_id_rows(&body, &mut map).unwrap();
        assert_eq!(n, 3);
        assert_eq!(map["a"].as_deref(), Some("blake3:aa"));
        assert_eq!(map["b"], None);
        assert_eq!(map["c"], None);
    }

    #[test]
    fn collect_id_rows_rejects_shapeless_bodies() {
        let mut map = HashMap::new();
        assert!(collect_id_rows(&serde_json::json!({"errors": []}), &mut map).is_err());
        assert!(collect_id_rows(&serde_json::json!({"data": [{"checksum": "x"}]}), &mut map).is_err());
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let long = "ä".repeat(BODY_SNIPPET);
        let s = snippet(&long);
        assert!(s.len() <= BODY_SNIPPET);
        assert!(long.starts_with(&s));
        assert_eq!(snippet("short"), "short");
    }
}

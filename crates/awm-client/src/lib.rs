//! ActivityWatch REST client.
//!
//! Provides the two store contracts a migration talks to:
//! - [`SourceStore`]: listing buckets and reading their events
//! - [`DestinationStore`]: resetting buckets and inserting events
//!
//! [`Client`] implements both against the `aw-server` HTTP API, and
//! [`MemoryStore`] implements both in process.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use awm_core::{Event, RawEvent};
use reqwest::{Method, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod memory;

pub use memory::MemoryStore;

/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const API_PATH: [&str; 2] = ["api", "0"];

/// Store client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server URL cannot address API endpoints.
    #[error("invalid server URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Bucket metadata as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub bucket_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Read side of a store.
#[expect(
    async_fn_in_trait,
    reason = "migrations run on a single-threaded runtime; no Send bound needed"
)]
pub trait SourceStore {
    /// All buckets, keyed by id.
    async fn list_buckets(&self) -> Result<BTreeMap<String, BucketInfo>, ClientError>;

    /// Every event of a bucket, in server order.
    async fn get_events(&self, bucket_id: &str) -> Result<Vec<RawEvent>, ClientError>;
}

/// Write side of a store.
#[expect(
    async_fn_in_trait,
    reason = "migrations run on a single-threaded runtime; no Send bound needed"
)]
pub trait DestinationStore: SourceStore {
    async fn delete_bucket(&self, bucket_id: &str) -> Result<(), ClientError>;

    async fn create_bucket(&self, bucket_id: &str, bucket_type: &str) -> Result<(), ClientError>;

    async fn insert_event<D: Serialize>(
        &self,
        bucket_id: &str,
        event: &Event<D>,
    ) -> Result<(), ClientError>;
}

/// `aw-server` API client.
///
/// Buckets created through this client are attributed to `client_name` on
/// `hostname`.
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    client_name: String,
    hostname: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("client_name", &self.client_name)
            .field("hostname", &self.hostname)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or used as a base, or if
    /// the HTTP client fails to build.
    pub fn new(
        base_url: &str,
        client_name: impl Into<String>,
        hostname: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|err| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: base_url.to_string(),
                reason: "URL cannot be a base".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: parsed,
            client_name: client_name.into(),
            hostname: hostname.into(),
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds `<base>/api/0/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PATH).extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<String, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: parse_api_error(&body).unwrap_or(body),
            });
        }
        Ok(body)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::trace!(%method, %url, "store request");
        self.http.request(method, url)
    }
}

impl SourceStore for Client {
    async fn list_buckets(&self) -> Result<BTreeMap<String, BucketInfo>, ClientError> {
        let url = self.endpoint(&["buckets", ""]);
        let body = self.send(self.request(Method::GET, url)).await?;
        let mut buckets: BTreeMap<String, BucketInfo> = serde_json::from_str(&body)
            .map_err(|err| ClientError::InvalidResponse(err.to_string()))?;
        for (id, bucket) in &mut buckets {
            if bucket.id.is_empty() {
                bucket.id.clone_from(id);
            }
        }
        Ok(buckets)
    }

    async fn get_events(&self, bucket_id: &str) -> Result<Vec<RawEvent>, ClientError> {
        let mut url = self.endpoint(&["buckets", bucket_id, "events"]);
        url.query_pairs_mut().append_pair("limit", "-1");
        let body = self.send(self.request(Method::GET, url)).await?;
        serde_json::from_str(&body).map_err(|err| ClientError::InvalidResponse(err.to_string()))
    }
}

impl DestinationStore for Client {
    async fn delete_bucket(&self, bucket_id: &str) -> Result<(), ClientError> {
        let mut url = self.endpoint(&["buckets", bucket_id]);
        url.query_pairs_mut().append_pair("force", "1");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn create_bucket(&self, bucket_id: &str, bucket_type: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["buckets", bucket_id]);
        let body = CreateBucket {
            client: &self.client_name,
            bucket_type,
            hostname: &self.hostname,
        };
        self.send(self.request(Method::POST, url).json(&body)).await?;
        Ok(())
    }

    async fn insert_event<D: Serialize>(
        &self,
        bucket_id: &str,
        event: &Event<D>,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["buckets", bucket_id, "events"]);
        self.send(self.request(Method::POST, url).json(&[event]))
            .await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct CreateBucket<'a> {
    client: &'a str,
    #[serde(rename = "type")]
    bucket_type: &'a str,
    hostname: &'a str,
}

fn parse_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.message)
}

//! Upstream search and profile client.
//!
//! Uses reqwest to stream the NDJSON search reply through a
//! [`StreamDecoder`] and to fetch single profiles.

use reqwest::{Response, StatusCode, Url};
use scout_core::config::UpstreamConfig;
use scout_core::ndjson::{ProfileStatus, Record, StreamDecoder, classify_profile};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::RelayError;

const SEARCH: &str = "search";
const PROFILE: &str = "profile";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    identity_type: &'static str,
}

/// Client for the upstream search stream and profile endpoints.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, RelayError> {
        // reqwest is built with rustls-no-provider; `Err` means a provider is
        // already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .user_agent(concat!("scout-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub const fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Run a people search and collect every record of the NDJSON reply.
    ///
    /// The timeout covers connect and the whole stream; on expiry the
    /// records gathered so far are dropped along with the connection.
    #[instrument(skip(self), fields(request_id = %uuid::Uuid::new_v4()))]
    pub async fn search_people(&self, query: &str) -> Result<Vec<Record>, RelayError> {
        let limit = self.config.search_timeout();
        let result = match self.validate_query(query) {
            Ok(query) => tokio::time::timeout(limit, self.stream_search(query))
                .await
                .unwrap_or_else(|_| Err(RelayError::Timeout(limit))),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            report_failure(SEARCH, e);
        }
        result
    }

    /// Fetch one profile, reinterpreting `errors` carried by a 2xx reply.
    #[instrument(skip(self))]
    pub async fn get_profile(&self, identifier: &str) -> Result<Value, RelayError> {
        let identifier = identifier.trim();
        let limit = self.config.profile_timeout();
        let result = if identifier.is_empty() {
            Err(RelayError::InvalidInput(
                "Profile identifier cannot be empty.".into(),
            ))
        } else {
            tokio::time::timeout(limit, self.fetch_profile(identifier))
                .await
                .unwrap_or_else(|_| Err(RelayError::Timeout(limit)))
        };
        if let Err(e) = &result {
            report_failure(PROFILE, e);
        }
        result
    }

    fn validate_query<'q>(&self, query: &'q str) -> Result<&'q str, RelayError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RelayError::InvalidInput("Query cannot be empty.".into()));
        }
        let min = self.config.min_query_chars;
        if query.chars().count() < min {
            return Err(RelayError::InvalidInput(format!(
                "Query must be at least {min} characters."
            )));
        }
        Ok(query)
    }

    async fn stream_search(&self, query: &str) -> Result<Vec<Record>, RelayError> {
        let payload = SearchRequest {
            query,
            identity_type: "person",
        };
        let response = self
            .http
            .post(&self.config.search_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(SEARCH, &e))?;
        let mut response = check_status(response).await?;

        let mut decoder = StreamDecoder::new();
        let mut records = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transport_error(SEARCH, &e))?
        {
            debug!(bytes = chunk.len(), "search chunk");
            records.extend(decoder.feed(&chunk));
        }
        let (last, stats) = decoder.finish();
        records.extend(last);

        info!(
            records = records.len(),
            malformed = stats.malformed,
            invalid_utf8 = stats.invalid_utf8,
            "Search stream complete"
        );
        Ok(records)
    }

    async fn fetch_profile(&self, identifier: &str) -> Result<Value, RelayError> {
        let url = self.profile_url(identifier)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(PROFILE, &e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RelayError::ProfileNotFound(identifier.to_string()));
        }
        let response = check_status(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| RelayError::InvalidUpstreamBody(e.to_string()))?;

        match classify_profile(&body) {
            ProfileStatus::Found => Ok(body),
            ProfileStatus::NotFound => Err(RelayError::ProfileNotFound(identifier.to_string())),
            ProfileStatus::Failed(entry) => Err(RelayError::UpstreamSemantic {
                code: entry.code,
                message: entry.message,
            }),
        }
    }

    /// `{profile_base_url}/{identifier}`, with the identifier encoded as a
    /// single path segment.
    pub(crate) fn profile_url(&self, identifier: &str) -> Result<Url, RelayError> {
        let mut url = Url::parse(&self.config.profile_base_url)
            .map_err(|e| RelayError::Client(format!("invalid profile base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| RelayError::Client("profile base URL cannot take a path".into()))?
            .pop_if_empty()
            .push(identifier);
        Ok(url)
    }
}

/// Turn a non-success reply into [`RelayError::UpstreamStatus`], keeping the
/// upstream body as the message.
async fn check_status(response: Response) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!(status = status.as_u16(), error = %e, "Failed to read upstream error body");
            String::new()
        }
    };
    Err(RelayError::UpstreamStatus {
        status: status.as_u16(),
        message: status_message(status, body),
    })
}

/// The upstream body, or the canonical reason phrase when it is blank.
fn status_message(status: StatusCode, body: String) -> String {
    if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("Unknown").to_string()
    } else {
        body
    }
}

fn transport_error(service: &'static str, err: &reqwest::Error) -> RelayError {
    warn!(service, error = %err, "Upstream transport error");
    RelayError::TransportUnavailable(service)
}

fn report_failure(service: &'static str, err: &RelayError) {
    match err {
        RelayError::InvalidInput(_) | RelayError::ProfileNotFound(_) => {
            info!(service, kind = err.kind(), error = %err, "Request rejected");
        }
        _ => {
            warn!(service, kind = err.kind(), error = %err, "Upstream call failed");
        }
    }
    #[cfg(feature = "metrics")]
    scout_core::metrics::record_upstream_failure(err.kind());
}

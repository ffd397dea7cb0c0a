//! REST client for the deduplication backend's HTTP endpoints.
//!
//! Wraps the `/api/dedup/*` surface (start, status, pending approvals,
//! approval submission, phase details) using [`reqwest`].

use serde::{Deserialize, Serialize};

use dedup_core::approval::{ApprovalRequest, PendingBatch};
use dedup_core::job::JobStatus;
use dedup_core::types::JobId;

/// HTTP client for one deduplication backend.
pub struct DedupApi {
    client: reqwest::Client,
    base_url: String,
}

/// Request body for `POST /api/dedup/start`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartJobRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_filter: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_approve: Option<bool>,
}

/// Response of `POST /api/dedup/start`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartJobResponse {
    pub job_id: JobId,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Response of `POST /api/dedup/approve`. Serialized back out to the
/// browser unchanged by the approvals route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub job_id: JobId,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum DedupApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl DedupApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `https://dedup.example.com`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Base HTTP URL of the backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start a new deduplication job (`POST /api/dedup/start`).
    pub async fn start_job(
        &self,
        request: &StartJobRequest,
    ) -> Result<StartJobResponse, DedupApiError> {
        let response = self
            .client
            .post(format!("{}/api/dedup/start", self.base_url))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the full status snapshot (`GET /api/dedup/status/{job_id}`).
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus, DedupApiError> {
        let response = self
            .client
            .get(format!("{}/api/dedup/status/{}", self.base_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the pending-approval batch (`GET /api/dedup/pending/{job_id}`).
    pub async fn pending_approvals(&self, job_id: &str) -> Result<PendingBatch, DedupApiError> {
        let response = self
            .client
            .get(format!("{}/api/dedup/pending/{}", self.base_url, job_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Submit an approval decision (`POST /api/dedup/approve`).
    pub async fn submit_approval(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalOutcome, DedupApiError> {
        let response = self
            .client
            .post(format!("{}/api/dedup/approve", self.base_url))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the phase-specific detail payload
    /// (`GET /api/dedup/{job_id}/phase/{phase}`).
    ///
    /// The payload shape varies per phase; it is passed through untyped.
    pub async fn phase_details(
        &self,
        job_id: &str,
        phase: &str,
    ) -> Result<serde_json::Value, DedupApiError> {
        let response = self
            .client
            .get(format!("{}/api/dedup/{}/phase/{}", self.base_url, job_id, phase))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure a success status. Returns the response unchanged, or a
    /// [`DedupApiError::Api`] carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, DedupApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DedupApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DedupApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

use std::time::Duration;

use reqwest::{header, Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, instrument, warn};

const USER_AGENT: &str = "WpReferenceCli/1.0";

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("unexpected status code: {0}")]
    Status(StatusCode),
}

/// Result of one GET against the documentation site.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Transport failure or a status other than 200.
    Error(ClientError),
    /// The request was redirected; `url` is where it landed.
    Redirect { url: String, body: String },
    /// Status 200 at the requested URL.
    Data { body: String },
}

impl FetchOutcome {
    #[must_use]
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }
}

/// Performs single, unretried page fetches and classifies the response.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    http: Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|err| ClientError::Http(err.to_string()))?;
        Ok(Self { http })
    }

    #[instrument(name = "page_fetcher.fetch", skip(self))]
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        match self.try_fetch(url).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(target: "wp_reference_http", url, error = %error, "reference request failed");
                FetchOutcome::Error(error)
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<FetchOutcome, ClientError> {
        let requested = Url::parse(url).map_err(|err| ClientError::Http(err.to_string()))?;
        let response = self
            .http
            .get(requested.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(ClientError::Status(response.status()));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;

        if final_url == requested {
            debug!(target: "wp_reference_http", url, bytes = body.len(), "fetched page");
            Ok(FetchOutcome::Data { body })
        } else {
            debug!(target: "wp_reference_http", url, redirected_to = %final_url, "request redirected");
            Ok(FetchOutcome::Redirect {
                url: final_url.to_string(),
                body,
            })
        }
    }
}

//! Bitbucket Server API client.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;

use super::api::with_start;
use crate::config::TraversalConfig;
use crate::error::FetchError;
use crate::http::reqwest_transport::ReqwestTransport;
use crate::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use crate::pagination::PageFetcher;

/// Per-request timeout of the default transport.
pub const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Authenticated page fetcher for a Bitbucket Server instance.
#[derive(Clone)]
pub struct BitbucketClient {
    transport: Arc<dyn HttpTransport>,
    authorization: String,
}

impl BitbucketClient {
    /// Create a client backed by reqwest.
    pub fn new(config: &TraversalConfig) -> Result<Self, HttpError> {
        let transport = ReqwestTransport::with_timeout(REQUEST_TIMEOUT)?;
        Ok(Self::new_with_transport(config, Arc::new(transport)))
    }

    pub fn new_with_transport(config: &TraversalConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            authorization: config.credentials().authorization_header(),
        }
    }

    fn request(&self, url: String) -> HttpRequest {
        HttpRequest {
            url,
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), "devcount".to_string()),
                ("Authorization".to_string(), self.authorization.clone()),
            ],
        }
    }
}

#[async_trait]
impl PageFetcher for BitbucketClient {
    async fn fetch_page(&self, url: &str, start: u64) -> Result<serde_json::Value, FetchError> {
        let full_url = with_start(url, start);
        tracing::debug!(url = %full_url, "GET");

        let response: HttpResponse = self
            .transport
            .get(self.request(full_url.clone()))
            .await
            .map_err(|source| FetchError::Network {
                url: full_url.clone(),
                source,
            })?;

        // Rejected credentials fail every later request too.
        if matches!(response.status, 401 | 403) {
            return Err(status_error(full_url, response));
        }

        // A JSON error body (404 on the commits of an empty repository) is handed
        // to the collector, which reads a page without `values` as malformed.
        match serde_json::from_slice::<serde_json::Value>(&response.body) {
            Ok(body) => {
                if !response.is_success() {
                    tracing::debug!(
                        url = %full_url,
                        status = response.status,
                        "Error status with JSON body"
                    );
                }
                Ok(body)
            }
            Err(_) if !response.is_success() => Err(status_error(full_url, response)),
            Err(source) => Err(FetchError::Parse {
                url: full_url,
                source,
            }),
        }
    }
}

fn status_error(url: String, response: HttpResponse) -> FetchError {
    FetchError::Status {
        url,
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    }
}

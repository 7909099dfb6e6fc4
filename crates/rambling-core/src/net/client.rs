//! HTTP network client for origin requests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use tracing::debug;

use super::{FetchOptions, NetError};
use crate::models::{Request, StoredResponse};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Issues requests to the network.
///
/// Non-2xx statuses are responses, not errors; an `Err` means no response
/// was obtained at all.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(
        &self,
        request: &Request,
        options: FetchOptions,
    ) -> Result<StoredResponse, NetError>;
}

/// Network client over reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    pub fn new(timeout: Duration) -> Result<Self, NetError> {
        // No cookie store: routed requests never carry credentials.
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, NetError> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| NetError::InvalidRequest(format!("bad header name: {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| NetError::InvalidRequest(format!("bad value for header {}", name)))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(
        &self,
        request: &Request,
        options: FetchOptions,
    ) -> Result<StoredResponse, NetError> {
        let headers = Self::header_map(&options.apply(&request.headers))?;

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    NetError::Offline(request.url.to_string())
                } else {
                    NetError::Transport(e)
                }
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        debug!(url = %request.url, status, bytes = body.len(), "Network response");

        Ok(StoredResponse {
            status,
            headers,
            body,
        })
    }
}

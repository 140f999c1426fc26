//! HTTP transport used by [`crate::WeatherApiClient`].

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::WeatherError;

/// Status line and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs GET requests for the gateway.
///
/// Implementations return `Err` only when no response was received. Non-2xx
/// responses come back as `Ok` so the caller decides how to report them.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: Url) -> Result<HttpResponse, WeatherError>;
}

/// Default transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, WeatherError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: Url) -> Result<HttpResponse, WeatherError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

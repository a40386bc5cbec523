//! HTTP transport backed by reqwest.

use futures::future::BoxFuture;
use std::time::Duration;
use suggest_core::TransportError;
use suggest_engine::{RawResponse, Transport, TransportRequest};

/// POSTs the JSON payload to the request endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// Use a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, Result<RawResponse, TransportError>> {
        let client = self.client.clone();

        Box::pin(async move {
            let mut builder = client.post(&request.endpoint);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder
                .json(&request.payload)
                .send()
                .await
                .map_err(|e| TransportError::Request(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::debug!(%status, endpoint = %request.endpoint, "suggestion service error");
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| TransportError::Decode(e.to_string()))?;
            Ok(RawResponse::new(body))
        })
    }
}

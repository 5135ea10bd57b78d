//! HTTP client for the ingestion endpoint.

mod dry_run;
mod types;

pub use dry_run::DryRunTransport;
pub use types::IngestParams;

use async_trait::async_trait;
use clickstream_core::{DeliveryBatch, DeliveryTransport, TransportError};
use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::io::Write;
use std::time::Duration;
use tracing::debug;

/// Client-side errors setting up the ingestion client.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Invalid endpoint `{0}`")]
    InvalidEndpoint(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Posts event batches to the ingestion endpoint.
///
/// Each delivery is one `POST` with the batch as a JSON array body and
/// [`IngestParams`] in the query string. With gzip enabled the body is
/// compressed and `compression=gzip` is sent.
#[derive(Clone)]
pub struct IngestClient {
    client: Client,
    endpoint: String,
    app_id: String,
    gzip: bool,
}

impl IngestClient {
    /// Create a client for `endpoint` with a 30 second request timeout.
    pub fn new(endpoint: impl Into<String>, app_id: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_timeout(endpoint, app_id, Duration::from_secs(30))
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        app_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let endpoint = endpoint.into();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(RpcError::InvalidEndpoint(endpoint));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            app_id: app_id.into(),
            gzip: false,
        })
    }

    /// Gzip request bodies.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    fn request(
        &self,
        batch: &DeliveryBatch<'_>,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let params = IngestParams::for_batch(&self.app_id, batch, self.gzip);
        let mut body =
            serde_json::to_vec(batch.events).map_err(|e| TransportError::Encode(e.to_string()))?;
        if self.gzip {
            body = gzip(&body).map_err(|e| TransportError::Encode(e.to_string()))?;
        }

        Ok(self
            .client
            .post(&self.endpoint)
            .query(&params)
            .header(CONTENT_TYPE, "application/json")
            .body(body))
    }
}

fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

#[async_trait]
impl DeliveryTransport for IngestClient {
    async fn deliver(&self, batch: DeliveryBatch<'_>) -> Result<(), TransportError> {
        let response = self
            .request(&batch)?
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            events = batch.len(),
            sequence_id = batch.sequence_id,
            "Ingest response"
        );
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

//! Wire types for the ingestion endpoint.

use clickstream_core::DeliveryBatch;
use serde::Serialize;

/// Query string sent with every ingestion request.
///
/// The body is the batch's events as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestParams {
    /// Platform of the batch's user; omitted for bulk batches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(rename = "appId")]
    pub app_id: String,

    /// Body compression: `gzip`, or empty for plain JSON.
    pub compression: String,

    /// Source address the sink should attribute the events to.
    #[serde(rename = "fakeIp", skip_serializing_if = "Option::is_none")]
    pub fake_ip: Option<String>,

    pub event_bundle_sequence_id: u64,
}

impl IngestParams {
    /// Parameters for `batch`.
    pub fn for_batch(app_id: &str, batch: &DeliveryBatch<'_>, gzip: bool) -> Self {
        let user = batch.user();
        Self {
            platform: user.map(|u| u.platform.as_str().to_string()),
            app_id: app_id.to_string(),
            compression: if gzip { "gzip" } else { "" }.to_string(),
            fake_ip: user.map(|u| u.device.ip_address.to_string()),
            event_bundle_sequence_id: batch.sequence_id,
        }
    }
}

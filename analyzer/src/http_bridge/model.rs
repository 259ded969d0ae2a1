use serde::{Deserialize, Serialize};
use tdrcore::telemetry::MetricsSnapshot;

/// Body of every non-200 reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusModel {
    pub status: &'static str,
    pub version: &'static str,
    pub analyses: MetricsSnapshot,
}

impl StatusModel {
    pub fn new(analyses: MetricsSnapshot) -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            analyses,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootMessage {
    pub message: String,
}

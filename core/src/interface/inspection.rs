use serde::{Deserialize, Serialize};

use crate::ingest::{IngestedWaveform, WaveformConfig};

/// Cleaned capture returned without running the analysis stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformInspection {
    pub time: Vec<f64>,
    pub magnitude: Vec<f64>,
    pub config: WaveformConfig,
}

impl From<IngestedWaveform> for WaveformInspection {
    fn from(ingested: IngestedWaveform) -> Self {
        let (time, magnitude) = ingested.waveform.into_parts();
        Self {
            time,
            magnitude,
            config: ingested.config,
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::prelude::{AnalysisError, AnalysisResult};

/// Oscilloscope settings recovered from the capture header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveformConfig {
    /// Seconds per sample.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_interval: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_scale: Option<f64>,
    /// Volts added to every sample during ingestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_offset: Option<f64>,
    /// Seconds per division.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_scale: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKey {
    SampleInterval,
    VerticalScale,
    VerticalOffset,
    HorizontalScale,
}

impl HeaderKey {
    fn recognize(key: &str) -> Option<Self> {
        let key = key.to_ascii_lowercase();
        if key.contains("sample interval") {
            Some(Self::SampleInterval)
        } else if key.contains("vertical scale") {
            Some(Self::VerticalScale)
        } else if key.contains("vertical offset") {
            Some(Self::VerticalOffset)
        } else if key.contains("horizontal scale") {
            Some(Self::HorizontalScale)
        } else {
            None
        }
    }
}

impl WaveformConfig {
    /// Parse `Key: value[,unit]` header lines. Lines without a colon and
    /// unknown keys are ignored; a known key with a non-numeric value is an error.
    pub fn parse_header<'a, I>(lines: I) -> AnalysisResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut config = Self::default();
        for line in lines {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let Some(field) = HeaderKey::recognize(key.trim()) else {
                continue;
            };

            let raw = value.trim().split(',').next().unwrap_or_default().trim();
            let parsed: f64 = raw.parse().map_err(|_| {
                AnalysisError::MalformedInput(format!(
                    "header field '{}' has non-numeric value '{}'",
                    key.trim(),
                    raw
                ))
            })?;

            match field {
                HeaderKey::SampleInterval => config.sample_interval = Some(parsed),
                HeaderKey::VerticalScale => config.vertical_scale = Some(parsed),
                HeaderKey::VerticalOffset => config.vertical_offset = Some(parsed),
                HeaderKey::HorizontalScale => config.horizontal_scale = Some(parsed),
            }
        }
        Ok(config)
    }
}

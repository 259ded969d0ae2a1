//! Capture ingestion: metadata header, numeric table, cleaning and smoothing.

pub mod header;
pub mod table;
pub mod waveform;

pub use header::WaveformConfig;
pub use table::{CleanedSamples, SampleTable};
pub use waveform::Waveform;

use crate::constants::{HEADER_LINES, SMOOTHING_MAX_WINDOW, SMOOTHING_POLY_ORDER};
use crate::math::smoothing::SavitzkyGolay;
use crate::prelude::{AnalysisResult, AnalysisStage};
use crate::telemetry::log::LogManager;

/// Output of the ingestion stage.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedWaveform {
    pub config: WaveformConfig,
    pub waveform: Waveform,
    pub dropped_rows: usize,
}

/// Window length and polynomial order used to smooth `n` samples, or `None`
/// when the capture is too short to smooth.
pub fn smoothing_parameters(n: usize) -> Option<(usize, usize)> {
    let largest_odd = if n % 2 == 0 { n.saturating_sub(1) } else { n };
    let window = SMOOTHING_MAX_WINDOW.min(n / 2 * 2 + 1).min(largest_odd);
    if window <= 2 {
        return None;
    }
    Some((window, SMOOTHING_POLY_ORDER.min(window - 1)))
}

pub struct WaveformIngest {
    logger: LogManager,
}

impl WaveformIngest {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("ingest"),
        }
    }
}

impl Default for WaveformIngest {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> AnalysisStage<'a> for WaveformIngest {
    type Input = &'a str;
    type Output = IngestedWaveform;

    fn name(&self) -> &'static str {
        self.logger.stage()
    }

    fn execute(&self, content: &'a str) -> AnalysisResult<IngestedWaveform> {
        let lines: Vec<&str> = content.split('\n').collect();
        let header_end = HEADER_LINES.min(lines.len());
        let config = WaveformConfig::parse_header(lines[..header_end].iter().copied())?;
        let body = lines[header_end..].join("\n");

        let table = SampleTable::parse(&body)?;
        let columns = table.columns;
        let cleaned = table.clean()?;
        if cleaned.dropped > 0 {
            self.logger.caution(&format!(
                "dropped {} rows with missing values, {} remain",
                cleaned.dropped,
                cleaned.time.len()
            ));
        }

        let mut voltage = cleaned.voltage;
        if let Some(offset) = config.vertical_offset {
            voltage.iter_mut().for_each(|v| *v += offset);
        }

        let voltage = match smoothing_parameters(voltage.len())
            .and_then(|(window, order)| SavitzkyGolay::new(window, order))
        {
            Some(filter) => {
                self.logger.trace_marker(&format!(
                    "smoothing window {} order {}",
                    filter.window(),
                    filter.order()
                ));
                filter.smooth(&voltage)
            }
            None => voltage,
        };

        let waveform = Waveform::new(cleaned.time, voltage)?;
        self.logger.record(&format!(
            "ingested {} samples from {} columns, config {:?}",
            waveform.len(),
            columns,
            config
        ));

        Ok(IngestedWaveform {
            config,
            waveform,
            dropped_rows: cleaned.dropped,
        })
    }
}

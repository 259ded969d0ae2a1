//! Waveform analysis core for time-domain reflectometry.
//!
//! A capture flows through ingestion, event detection, temporal, impedance,
//! attenuation and error stages; the resulting outcome is rendered to PNG and
//! packaged into a serializable report.

pub mod constants;
pub mod ingest;
pub mod interface;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod render;
pub mod telemetry;

pub use interface::{AnalysisReport, WaveformInspection};
pub use prelude::{AnalysisError, AnalysisInput, AnalysisResult, AnalysisStage};
pub use processing::{AnalysisOutcome, Pipeline};
pub use render::{render_waveform_png, PlotStyle};

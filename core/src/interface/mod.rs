//! Serializable records handed across the library boundary.

pub mod inspection;
pub mod report;

pub use inspection::WaveformInspection;
pub use report::{AnalysisReport, WaveformPoint};

pub mod attenuation;
pub mod error_analysis;
pub mod events;
pub mod impedance;
pub mod pipeline;
pub mod temporal;

pub use attenuation::{AttenuationEstimator, AttenuationResult};
pub use error_analysis::{ErrorAnalysis, ErrorAnalyzer};
pub use events::{EventDetector, EventSet, Plateau};
pub use impedance::{ImpedanceAnalyzer, ImpedanceResult, LoadType};
pub use pipeline::{AnalysisOutcome, Pipeline};
pub use temporal::{DelayMethod, TemporalCalculator, TemporalParams};

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_Z0;

/// User-supplied physical parameters for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// Physical cable length in meters.
    pub cable_length: f64,
    /// Expected characteristic impedance in ohms.
    #[serde(default = "default_z0")]
    pub z0_expected: f64,
}

fn default_z0() -> f64 {
    DEFAULT_Z0
}

impl AnalysisInput {
    pub fn new(cable_length: f64, z0_expected: f64) -> Self {
        Self {
            cable_length,
            z0_expected,
        }
    }

    /// Rejects non-positive (or non-finite) length and impedance.
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(self.cable_length.is_finite() && self.cable_length > 0.0) {
            return Err(AnalysisError::InvalidParameter(
                "cable_length must be greater than 0".into(),
            ));
        }
        if !(self.z0_expected.is_finite() && self.z0_expected > 0.0) {
            return Err(AnalysisError::InvalidParameter(
                "z0_expected must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Error taxonomy shared by every analysis stage.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("invalid file type: {0}")]
    InvalidFileType(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("CSV must have at least two columns, found {0}")]
    InsufficientColumns(usize),
    #[error("too many invalid values: {dropped}/{total} rows contain NaN")]
    ExcessiveInvalidData { dropped: usize, total: usize },
    #[error("no incident pulse detected")]
    NoPulseDetected,
    #[error("could not determine round-trip delay")]
    UndeterminedDelay,
    #[error("failed to render plot: {0}")]
    Render(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// True for failures caused by the caller's input rather than by the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidFileType(_)
                | AnalysisError::InvalidParameter(_)
                | AnalysisError::MalformedInput(_)
                | AnalysisError::InsufficientColumns(_)
                | AnalysisError::ExcessiveInvalidData { .. }
                | AnalysisError::NoPulseDetected
                | AnalysisError::UndeterminedDelay
        )
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// A single step of the analysis pipeline.
///
/// Stages hold no per-run state: `execute` borrows its inputs for `'a` and
/// returns a freshly owned record, so one stage value can serve any number
/// of runs.
pub trait AnalysisStage<'a> {
    type Input;
    type Output;

    /// Short name used in log records.
    fn name(&self) -> &'static str;

    fn execute(&self, input: Self::Input) -> AnalysisResult<Self::Output>;
}

use serde::Serialize;
use std::sync::Mutex;

use crate::prelude::AnalysisError;

/// Counters of analysis outcomes, shared by concurrent request handlers.
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub processed: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_processed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.processed += 1;
        }
    }

    /// Counts client-input rejections and internal failures separately.
    pub fn record_error(&self, error: &AnalysisError) {
        if let Ok(mut metrics) = self.inner.lock() {
            if error.is_client_error() {
                metrics.rejected += 1;
            } else {
                metrics.failed += 1;
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_separates_rejections_from_failures() {
        let recorder = MetricsRecorder::new();
        recorder.record_processed();
        recorder.record_error(&AnalysisError::NoPulseDetected);
        recorder.record_error(&AnalysisError::Internal("oops".into()));
        recorder.record_error(&AnalysisError::UndeterminedDelay);
        assert_eq!(
            recorder.snapshot(),
            MetricsSnapshot {
                processed: 1,
                rejected: 2,
                failed: 1,
            }
        );
    }
}

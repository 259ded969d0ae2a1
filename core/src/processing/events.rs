use serde::{Deserialize, Serialize};

use crate::constants::{
    FLATNESS_FACTOR, MIN_PLATEAU_DURATION, MIN_REFLECTION_WINDOW, ONSET_FRACTION,
    REFLECTION_DERIVATIVE_FRACTION, RISE_TIME_BANDWIDTH, RISE_UPPER_FRACTION,
};
use crate::ingest::Waveform;
use crate::math::gradient::gradient;
use crate::math::stats::StatsHelper;
use crate::prelude::{AnalysisError, AnalysisResult, AnalysisStage};
use crate::telemetry::log::LogManager;

/// Stable region following the incident edge, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plateau {
    pub start: f64,
    pub end: f64,
}

impl Plateau {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Time markers located in a cleaned waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventSet {
    /// Pulse onset: first sample strictly above 10% of `v_max`.
    pub t0: f64,
    /// 10%-90% rise time; zero or negative on non-monotonic edges.
    pub rise_time: f64,
    /// Effective pulse frequency, `0.35 / rise_time`, or 0.
    pub f_eff: f64,
    pub plateau: Option<Plateau>,
    pub reflection_start: Option<f64>,
    pub v_max: f64,
}

impl EventSet {
    pub fn plateau_start(&self) -> Option<f64> {
        self.plateau.map(|p| p.start)
    }

    pub fn plateau_end(&self) -> Option<f64> {
        self.plateau.map(|p| p.end)
    }
}

/// Run of consecutive flagged samples, as inclusive indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatRun {
    pub start: usize,
    pub end: usize,
    pub duration: f64,
}

/// Run-length encode `mask` into runs of `true` samples.
///
/// A run is emitted when a `false` sample closes it; a run still open at the
/// last sample is not emitted, so the settled tail of a capture never counts
/// as a plateau.
pub fn flat_runs(mask: &[bool], time: &[f64]) -> Vec<FlatRun> {
    let mut runs = Vec::new();
    let mut open: Option<usize> = None;
    for (i, &flat) in mask.iter().enumerate() {
        match (flat, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                runs.push(FlatRun {
                    start,
                    end: i - 1,
                    duration: time[i - 1] - time[start],
                });
                open = None;
            }
            _ => {}
        }
    }
    runs
}

pub struct EventDetector {
    logger: LogManager,
}

impl EventDetector {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("events"),
        }
    }

    fn find_plateau(&self, waveform: &Waveform, v_max: f64, t_90: f64) -> Option<Plateau> {
        let time = waveform.time();
        let derivative = gradient(waveform.voltage(), time);
        let limit = v_max / waveform.len() as f64 * FLATNESS_FACTOR;
        let mask: Vec<bool> = derivative.iter().map(|d| d.abs() < limit).collect();

        let runs = flat_runs(&mask, time);
        self.logger
            .trace_marker(&format!("{} flat runs below {:.3e} V/s", runs.len(), limit));

        runs.into_iter()
            .filter(|run| run.duration >= MIN_PLATEAU_DURATION && time[run.start] > t_90)
            .fold(None, |best: Option<FlatRun>, run| match best {
                Some(b) if b.duration >= run.duration => Some(b),
                _ => Some(run),
            })
            .map(|run| Plateau {
                start: time[run.start],
                end: time[run.end],
            })
    }

    fn find_reflection(&self, waveform: &Waveform, plateau_end: f64) -> Option<f64> {
        let (time, voltage) = waveform.select(|t| t > plateau_end);
        if time.len() <= MIN_REFLECTION_WINDOW {
            return None;
        }

        let magnitude: Vec<f64> = gradient(&voltage, &time).iter().map(|d| d.abs()).collect();
        let limit = StatsHelper::max(&magnitude)? * REFLECTION_DERIVATIVE_FRACTION;
        magnitude
            .iter()
            .position(|&m| m > limit)
            .map(|idx| time[idx])
    }
}

impl Default for EventDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> AnalysisStage<'a> for EventDetector {
    type Input = &'a Waveform;
    type Output = EventSet;

    fn name(&self) -> &'static str {
        self.logger.stage()
    }

    fn execute(&self, waveform: &'a Waveform) -> AnalysisResult<EventSet> {
        let time = waveform.time();
        let voltage = waveform.voltage();

        let v_max = StatsHelper::max(voltage).ok_or(AnalysisError::NoPulseDetected)?;
        let threshold = ONSET_FRACTION * v_max;
        let onset = voltage
            .iter()
            .position(|&v| v > threshold)
            .ok_or(AnalysisError::NoPulseDetected)?;
        let t0 = time[onset];

        let first_reaching = |level: f64| voltage.iter().position(|&v| v >= level);
        let (idx_10, idx_90) = first_reaching(ONSET_FRACTION * v_max)
            .zip(first_reaching(RISE_UPPER_FRACTION * v_max))
            .ok_or_else(|| {
                AnalysisError::Internal(format!("rise window not found below v_max {}", v_max))
            })?;
        let t_90 = time[idx_90];
        let rise_time = t_90 - time[idx_10];
        let f_eff = if rise_time > 0.0 {
            RISE_TIME_BANDWIDTH / rise_time
        } else {
            0.0
        };

        let plateau = self.find_plateau(waveform, v_max, t_90);
        let reflection_start = plateau.and_then(|p| self.find_reflection(waveform, p.end));

        let events = EventSet {
            t0,
            rise_time,
            f_eff,
            plateau,
            reflection_start,
            v_max,
        };
        self.logger.record(&format!(
            "t0 {:.4e}s rise {:.4e}s plateau {:?} reflection {:?} v_max {:.4}",
            events.t0, events.rise_time, events.plateau, events.reflection_start, events.v_max
        ));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f64 = 1e-9;

    /// Ideal step to 1 V at sample 100, held until sample 399, then 0.5 V.
    fn step_waveform() -> Waveform {
        let time: Vec<f64> = (0..1000).map(|i| i as f64 * STEP).collect();
        let voltage: Vec<f64> = (0..1000)
            .map(|i| match i {
                0..=99 => 0.0,
                100..=399 => 1.0,
                _ => 0.5,
            })
            .collect();
        Waveform::new(time, voltage).unwrap()
    }

    #[test]
    fn flat_runs_emit_only_closed_runs() {
        let time: Vec<f64> = (0..8).map(f64::from).collect();
        let mask = [true, true, false, true, true, true, false, true];
        let runs = flat_runs(&mask, &time);
        assert_eq!(
            runs,
            vec![
                FlatRun {
                    start: 0,
                    end: 1,
                    duration: 1.0
                },
                FlatRun {
                    start: 3,
                    end: 5,
                    duration: 2.0
                },
            ]
        );
    }

    #[test]
    fn step_recovers_onset_and_plateau() {
        let waveform = step_waveform();
        let events = EventDetector::new().execute(&waveform).unwrap();
        assert!((events.t0 - waveform.time()[100]).abs() <= STEP);
        assert_eq!(events.v_max, 1.0);
        assert_eq!(events.rise_time, 0.0);
        assert_eq!(events.f_eff, 0.0);

        let plateau = events.plateau.expect("plateau");
        assert!((plateau.duration() - 300.0 * STEP).abs() < 5.0 * STEP);
        assert!(plateau.start > waveform.time()[100]);
        assert!(plateau.end < waveform.time()[400]);

        let reflection = events.reflection_start.expect("reflection");
        assert_eq!(reflection, waveform.time()[399]);
    }

    #[test]
    fn ramp_gives_positive_rise_time_and_frequency() {
        let time: Vec<f64> = (0..200).map(|i| i as f64 * STEP).collect();
        let voltage: Vec<f64> = (0..200)
            .map(|i| ((i as f64 - 50.0) / 10.0).clamp(0.0, 1.0))
            .collect();
        let events = EventDetector::new()
            .execute(&Waveform::new(time, voltage).unwrap())
            .unwrap();
        assert!((events.rise_time - 8.0 * STEP).abs() < 1e-15);
        assert!((events.f_eff - 0.35 / (8.0 * STEP)).abs() < 1.0);
        // The settled top runs to the end of the capture and is never closed.
        assert!(events.plateau.is_none());
        assert!(events.reflection_start.is_none());
    }

    #[test]
    fn longest_plateau_after_rise_wins() {
        let time: Vec<f64> = (0..400).map(|i| i as f64 * STEP).collect();
        let voltage: Vec<f64> = (0..400)
            .map(|i| match i {
                0..=9 => 0.0,
                10..=59 => 1.0,
                60..=199 => 0.8,
                _ => 0.6,
            })
            .collect();
        let events = EventDetector::new()
            .execute(&Waveform::new(time.clone(), voltage).unwrap())
            .unwrap();
        let plateau = events.plateau.unwrap();
        assert_eq!(plateau.start, time[61]);
        assert_eq!(plateau.end, time[198]);
    }

    #[test]
    fn all_zero_waveform_has_no_pulse() {
        let waveform = Waveform::new(vec![0.0, 1e-9, 2e-9], vec![0.0; 3]).unwrap();
        assert!(matches!(
            EventDetector::new().execute(&waveform),
            Err(AnalysisError::NoPulseDetected)
        ));
    }

    #[test]
    fn empty_waveform_has_no_pulse() {
        let waveform = Waveform::new(Vec::new(), Vec::new()).unwrap();
        assert!(matches!(
            EventDetector::new().execute(&waveform),
            Err(AnalysisError::NoPulseDetected)
        ));
    }
}

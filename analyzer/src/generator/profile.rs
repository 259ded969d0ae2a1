use anyhow::{ensure, Context};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tdrcore::constants::{HEADER_LINES, SPEED_OF_LIGHT};

/// Parameters of a synthetic step-response capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Physical cable length in meters.
    pub cable_length: f64,
    /// Fraction of `c` at which the step travels (0, 1].
    pub velocity_factor: f64,
    /// Relative level change once the reflection returns.
    pub reflection_coefficient: f64,
    pub amplitude: f64,
    pub sample_interval: f64,
    pub samples: usize,
    /// Samples recorded before the incident step.
    pub pre_trigger: usize,
    /// Half-width of the uniform noise added to every sample.
    pub noise: f64,
    pub seed: u64,
    pub vertical_offset: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            cable_length: 30.0,
            velocity_factor: 0.66,
            reflection_coefficient: -0.5,
            amplitude: 1.0,
            sample_interval: 1e-9,
            samples: 1000,
            pre_trigger: 100,
            noise: 0.0,
            seed: 0,
            vertical_offset: 0.0,
        }
    }
}

impl GeneratorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading generator config {}", path_ref.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing generator config {}", path_ref.display()))
    }

    /// Round-trip delay of the reflection in seconds.
    pub fn round_trip(&self) -> f64 {
        2.0 * self.cable_length / (self.velocity_factor * SPEED_OF_LIGHT)
    }

    fn reflection_index(&self) -> usize {
        self.pre_trigger + (self.round_trip() / self.sample_interval).round() as usize
    }

    fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.cable_length > 0.0, "cable_length must be positive");
        ensure!(
            self.velocity_factor > 0.0 && self.velocity_factor <= 1.0,
            "velocity_factor must be in (0, 1]"
        );
        ensure!(self.sample_interval > 0.0, "sample_interval must be positive");
        ensure!(self.noise >= 0.0, "noise must not be negative");
        ensure!(
            self.pre_trigger < self.samples,
            "pre_trigger {} leaves no room in {} samples",
            self.pre_trigger,
            self.samples
        );
        Ok(())
    }

    /// Ideal voltage of sample `index` before noise.
    fn level(&self, index: usize, reflection_index: usize) -> f64 {
        if index < self.pre_trigger {
            0.0
        } else if index < reflection_index {
            self.amplitude
        } else {
            self.amplitude * (1.0 + self.reflection_coefficient)
        }
    }
}

/// Render a capture in the oscilloscope export layout: an 11-line
/// `Key:value` header followed by `time,voltage` rows. Stored voltages have
/// the vertical offset removed so ingestion restores the ideal levels.
pub fn build_capture_csv(config: &GeneratorConfig) -> anyhow::Result<String> {
    config.validate()?;
    let reflection_index = config.reflection_index();

    let header = [
        format!("Record Length:{}", config.samples),
        format!("Sample Interval:{:e},s", config.sample_interval),
        format!("Trigger Point:{}", config.pre_trigger),
        "Source:CH1".to_string(),
        "Vertical Units:V".to_string(),
        format!("Vertical Scale:{:e},V", config.amplitude.abs().max(1e-3) / 4.0),
        format!("Vertical Offset:{:e},V", config.vertical_offset),
        "Horizontal Units:s".to_string(),
        format!(
            "Horizontal Scale:{:e}",
            config.sample_interval * config.samples as f64 / 10.0
        ),
        "Pt Fmt:Y".to_string(),
        format!("Cable Length:{}", config.cable_length),
    ];
    debug_assert_eq!(header.len(), HEADER_LINES);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut csv = header.join("\n");
    for index in 0..config.samples {
        let jitter = if config.noise > 0.0 {
            rng.gen_range(-config.noise..config.noise)
        } else {
            0.0
        };
        let voltage = config.level(index, reflection_index) + jitter - config.vertical_offset;
        write!(
            csv,
            "\n{:e},{}",
            index as f64 * config.sample_interval,
            voltage
        )
        .context("formatting capture row")?;
    }
    csv.push('\n');
    Ok(csv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_has_header_and_one_row_per_sample() {
        let csv = build_capture_csv(&GeneratorConfig::default()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), HEADER_LINES + 1000);
        assert_eq!(lines[1], "Sample Interval:1e-9,s");
        assert_eq!(lines[HEADER_LINES], "0e0,0");
        assert!(lines[HEADER_LINES + 150].ends_with(",1"));
        assert!(lines[HEADER_LINES + 500].ends_with(",0.5"));
    }

    #[test]
    fn reflection_arrives_after_round_trip() {
        let config = GeneratorConfig::default();
        // 2 * 30 m / (0.66 c) is just over 303 ns.
        assert_eq!(config.reflection_index(), 403);
        assert_eq!(config.level(402, 403), 1.0);
        assert_eq!(config.level(403, 403), 0.5);
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let config = GeneratorConfig {
            noise: 0.01,
            seed: 13,
            ..Default::default()
        };
        let first = build_capture_csv(&config).unwrap();
        assert_eq!(first, build_capture_csv(&config).unwrap());
        assert_ne!(first, build_capture_csv(&GeneratorConfig::default()).unwrap());
    }

    #[test]
    fn offset_is_removed_from_stored_samples() {
        let config = GeneratorConfig {
            vertical_offset: 0.25,
            ..Default::default()
        };
        let csv = build_capture_csv(&config).unwrap();
        let first_row = csv.lines().nth(HEADER_LINES).unwrap();
        assert_eq!(first_row, "0e0,-0.25");
    }

    #[test]
    fn invalid_layout_is_rejected() {
        let config = GeneratorConfig {
            pre_trigger: 10,
            samples: 10,
            ..Default::default()
        };
        assert!(build_capture_csv(&config).is_err());
    }
}

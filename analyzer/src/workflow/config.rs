use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use tdrcore::constants::{DEFAULT_Z0, MAX_PLOT_DIMENSION, MIN_PLOT_DIMENSION};
use tdrcore::PlotStyle;
use warp::http::Uri;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
        }
    }
}

/// Runtime settings for the CLI and the HTTP bridge. Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub bind: SocketAddr,
    pub allowed_origins: Vec<String>,
    /// Characteristic impedance assumed when a request does not give one.
    pub default_z0: f64,
    pub max_upload_bytes: u64,
    pub plot: PlotConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
            default_z0: DEFAULT_Z0,
            max_upload_bytes: 16 * 1024 * 1024,
            plot: PlotConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading analyzer config {}", path_ref.display()))?;
        let config: AnalyzerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing analyzer config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating analyzer config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.default_z0.is_finite() && self.default_z0 > 0.0,
            "default_z0 must be greater than 0"
        );
        ensure!(self.max_upload_bytes > 0, "max_upload_bytes must be non-zero");
        let sides = MIN_PLOT_DIMENSION..=MAX_PLOT_DIMENSION;
        ensure!(
            sides.contains(&self.plot.width) && sides.contains(&self.plot.height),
            "plot dimensions {}x{} must each be within {}..={}",
            self.plot.width,
            self.plot.height,
            MIN_PLOT_DIMENSION,
            MAX_PLOT_DIMENSION
        );
        for origin in &self.allowed_origins {
            let uri: Uri = origin
                .parse()
                .with_context(|| format!("allowed origin '{}' is not a URI", origin))?;
            ensure!(
                uri.scheme().is_some() && uri.authority().is_some(),
                "allowed origin '{}' needs a scheme and host",
                origin
            );
        }
        Ok(())
    }

    pub fn to_plot_style(&self) -> PlotStyle {
        PlotStyle::with_size(self.plot.width, self.plot.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_allow_local_frontends() {
        let cfg = AnalyzerConfig::default();
        assert_eq!(cfg.bind.port(), 8000);
        assert_eq!(cfg.default_z0, 50.0);
        assert!(cfg
            .allowed_origins
            .contains(&"http://localhost:3001".to_string()));
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.to_plot_style().width, 900);
    }

    #[test]
    fn config_load_reads_yaml_and_fills_defaults() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"bind: 127.0.0.1:9100\ndefault_z0: 75.0\nplot:\n  width: 640\n")
            .unwrap();
        let path = temp.into_temp_path();
        let cfg = AnalyzerConfig::load(&path).unwrap();
        assert_eq!(cfg.bind, SocketAddr::from(([127, 0, 0, 1], 9100)));
        assert_eq!(cfg.default_z0, 75.0);
        assert_eq!(cfg.plot.width, 640);
        assert_eq!(cfg.plot.height, 400);
        assert_eq!(cfg.allowed_origins.len(), 2);
    }

    #[test]
    fn config_load_rejects_bad_values() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"default_z0: -50.0\n").unwrap();
        let path = temp.into_temp_path();
        assert!(AnalyzerConfig::load(&path).is_err());

        let cfg = AnalyzerConfig {
            allowed_origins: vec!["localhost".into()],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn plot_size_is_bounded() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"plot:\n  width: 40000\n  height: 40000\n").unwrap();
        let path = temp.into_temp_path();
        let err = AnalyzerConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("40000x40000"));

        for (width, height) in [
            (0, 400),
            (900, MIN_PLOT_DIMENSION - 1),
            (MAX_PLOT_DIMENSION + 1, 400),
        ] {
            let cfg = AnalyzerConfig {
                plot: PlotConfig { width, height },
                ..Default::default()
            };
            assert!(cfg.validate().is_err(), "{}x{} accepted", width, height);
        }
        let largest = AnalyzerConfig {
            plot: PlotConfig {
                width: MAX_PLOT_DIMENSION,
                height: MIN_PLOT_DIMENSION,
            },
            ..Default::default()
        };
        assert!(largest.validate().is_ok());
    }
}

use anyhow::Context;
use clap::Parser;
use generator::profile::{build_capture_csv, GeneratorConfig};
use http_bridge::bridge::HttpBridge;
use log::info;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::AnalyzerConfig;
use workflow::runner::{Runner, WorkflowResult};

mod generator;
mod http_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Time-domain reflectometry cable analyzer")]
struct Args {
    /// Oscilloscope CSV export to analyse
    #[arg(long)]
    input: Option<PathBuf>,
    /// Physical cable length in meters
    #[arg(long)]
    cable_length: Option<f64>,
    /// Expected characteristic impedance in ohms (defaults to the config value)
    #[arg(long)]
    z0: Option<f64>,
    /// Only ingest the capture and print its cleaned series summary
    #[arg(long, default_value_t = false)]
    inspect: bool,
    /// Write the rendered waveform plot to this PNG file
    #[arg(long)]
    plot_out: Option<PathBuf>,
    /// Write the JSON report (or inspection) to this file
    #[arg(long)]
    report_out: Option<PathBuf>,
    /// Write a synthetic capture to this CSV file
    #[arg(long)]
    generate: Option<PathBuf>,
    /// Load the synthetic capture settings from YAML
    #[arg(long)]
    generator: Option<PathBuf>,
    /// Keep the HTTP bridge alive until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Load analyzer settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the bridge bind address
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing report")?;
    fs::write(path, json).with_context(|| format!("writing report {}", path.display()))
}

fn print_summary(result: &WorkflowResult) {
    let outcome = &result.outcome;
    println!(
        "Capture -> {} samples ({} rows dropped)",
        outcome.ingested.waveform.len(),
        outcome.ingested.dropped_rows
    );
    println!(
        "Events -> t0 {:.3e}s, rise {:.3e}s, plateau {:?}, reflection {:?}",
        outcome.events.t0,
        outcome.events.rise_time,
        outcome.events.plateau.map(|p| (p.start, p.end)),
        outcome.events.reflection_start
    );
    println!(
        "Propagation -> dt {:.4e}s ({:?}), vp {:.4e} m/s, VF {:.2}% ± {:.2}%, eps_eff {:.3}",
        outcome.temporal.dt,
        outcome.temporal.method,
        outcome.temporal.vp,
        outcome.temporal.velocity_factor,
        outcome.errors.vf_error,
        outcome.temporal.epsilon_eff
    );
    println!(
        "Load -> gamma {:.4}, VSWR {:.4}, {} ({:.2} ohm, Z0 {:.1})",
        result.report.reflection_coefficient,
        result.report.vswr,
        result.report.load_type,
        result.report.load_value,
        result.report.z0
    );
    println!(
        "Losses -> alpha {:.4e}, beta {:.4e}, error {:.2}%",
        result.report.alpha, result.report.beta, result.report.error_percent
    );
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = &args.config {
        AnalyzerConfig::load(path)?
    } else {
        AnalyzerConfig::default()
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    let runner = Runner::new(config);

    if let Some(path) = &args.generate {
        let generator = match &args.generator {
            Some(profile) => GeneratorConfig::load(profile)?,
            None => GeneratorConfig::default(),
        };
        let csv = build_capture_csv(&generator)?;
        fs::write(path, csv).with_context(|| format!("writing capture {}", path.display()))?;
        println!(
            "Generated {} samples ({:.3e}s round trip) -> {}",
            generator.samples,
            generator.round_trip(),
            path.display()
        );
    }

    if let Some(path) = &args.input {
        let bytes = fs::read(path).with_context(|| format!("reading capture {}", path.display()))?;
        if args.inspect {
            let inspection = runner
                .inspect(&bytes)
                .with_context(|| format!("inspecting {}", path.display()))?;
            println!(
                "Inspection -> {} samples, config {:?}",
                inspection.time.len(),
                inspection.config
            );
            if let Some(out) = &args.report_out {
                write_json(out, &inspection)?;
            }
        } else {
            let cable_length = args
                .cable_length
                .context("--cable-length is required to analyse a capture")?;
            let result = runner
                .analyze(&file_name(path), &bytes, cable_length, args.z0)
                .with_context(|| format!("analysing {}", path.display()))?;
            print_summary(&result);
            if let Some(out) = &args.plot_out {
                fs::write(out, &result.plot_png)
                    .with_context(|| format!("writing plot {}", out.display()))?;
            }
            if let Some(out) = &args.report_out {
                write_json(out, &result.report)?;
            }
        }
    }

    if args.serve {
        let bridge = HttpBridge::new(Arc::new(runner));
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for the HTTP bridge")?;
        runtime.block_on(async {
            info!("HTTP bridge running (Ctrl+C to stop)...");
            bridge
                .serve(async {
                    if let Err(err) = signal::ctrl_c().await {
                        log::error!("awaiting Ctrl+C failed: {}", err);
                    }
                })
                .await
        })?;
    } else if args.input.is_none() && args.generate.is_none() {
        println!("Nothing to do: pass --input, --generate or --serve (see --help).");
    }

    Ok(())
}

//! PNG rendering of a processed capture with its detected events.

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use std::io::Cursor;

use crate::constants::{MAX_PLOT_DIMENSION, MIN_PLOT_DIMENSION};
use crate::ingest::Waveform;
use crate::prelude::{AnalysisError, AnalysisResult};
use crate::processing::events::EventSet;

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub trace: RGBColor,
    pub baseline: RGBColor,
    pub onset: RGBColor,
    pub plateau: RGBColor,
    pub reflection: RGBColor,
    pub text: RGBColor,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(255, 255, 255),
            trace: BLUE,
            baseline: RGBColor(160, 160, 160),
            onset: RED,
            plateau: GREEN,
            reflection: MAGENTA,
            text: BLACK,
        }
    }
}

impl PlotStyle {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

fn render_error<E: std::fmt::Display>(err: E) -> AnalysisError {
    AnalysisError::Render(err.to_string())
}

fn bounds(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - 0.5, hi + 0.5);
    }
    (lo, hi)
}

/// Draws the voltage trace over a labelled time axis, with a zero line and
/// vertical markers at the onset, plateau bounds and reflection start.
pub fn render_waveform_png(
    waveform: &Waveform,
    events: Option<&EventSet>,
    style: &PlotStyle,
) -> AnalysisResult<Vec<u8>> {
    if waveform.is_empty() {
        return Err(AnalysisError::Render("waveform has no samples".into()));
    }
    let sides = MIN_PLOT_DIMENSION..=MAX_PLOT_DIMENSION;
    if !sides.contains(&style.width) || !sides.contains(&style.height) {
        return Err(AnalysisError::Render(format!(
            "invalid plot size {}x{} (each side must be {}..={})",
            style.width, style.height, MIN_PLOT_DIMENSION, MAX_PLOT_DIMENSION
        )));
    }
    let len = (style.width as usize)
        .checked_mul(style.height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| {
            AnalysisError::Render(format!(
                "plot size {}x{} overflows the pixel buffer",
                style.width, style.height
            ))
        })?;

    let (t_min, t_max) = bounds(waveform.time());
    let (v_lo, v_hi) = bounds(waveform.voltage());
    let margin = (v_hi - v_lo) * 0.05;
    let (v_min, v_max) = (v_lo.min(0.0) - margin, v_hi.max(0.0) + margin);

    let mut buffer = vec![0u8; len];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background).map_err(render_error)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                "TDR Waveform",
                ("sans-serif", 20).into_font().color(&style.text),
            )
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(t_min..t_max, v_min..v_max)
            .map_err(render_error)?;
        chart
            .configure_mesh()
            .light_line_style(&style.text.mix(0.05))
            .x_labels(8)
            .x_label_formatter(&|t| format!("{:.1e}", t))
            .x_desc("Time (s)")
            .y_desc("Magnitude (V)")
            .label_style(("sans-serif", 12).into_font().color(&style.text))
            .axis_desc_style(("sans-serif", 14).into_font().color(&style.text))
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(LineSeries::new(
                [(t_min, 0.0), (t_max, 0.0)],
                &style.baseline,
            ))
            .map_err(render_error)?;
        chart
            .draw_series(LineSeries::new(waveform.points(), &style.trace))
            .map_err(render_error)?;

        if let Some(events) = events {
            let mut markers = vec![(events.t0, style.onset)];
            if let Some(plateau) = events.plateau {
                markers.push((plateau.start, style.plateau));
                markers.push((plateau.end, style.plateau));
            }
            if let Some(reflection) = events.reflection_start {
                markers.push((reflection, style.reflection));
            }
            for (t, color) in markers {
                chart
                    .draw_series(LineSeries::new(
                        [(t, v_min), (t, v_max)],
                        color.stroke_width(1),
                    ))
                    .map_err(render_error)?;
            }
        }
        root.present().map_err(render_error)?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> AnalysisResult<Vec<u8>> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| AnalysisError::Render("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)
        .map_err(render_error)?;
    Ok(output)
}

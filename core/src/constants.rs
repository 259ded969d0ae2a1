//! Physical constants, detection thresholds and numeric fallbacks.
//!
//! Values are kept exactly as the established analysis reports them so that
//! results stay comparable across tool versions.

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Characteristic impedance assumed when the caller gives none (ohms).
pub const DEFAULT_Z0: f64 = 50.0;

// --- ingestion -------------------------------------------------------------

/// Number of leading lines holding oscilloscope metadata.
pub const HEADER_LINES: usize = 11;

/// Share of table rows that must survive cleaning; losing more than 20% of
/// the rows rejects the capture.
pub const MIN_VALID_ROW_FRACTION: f64 = 0.8;

/// Upper bound of the Savitzky-Golay window length.
pub const SMOOTHING_MAX_WINDOW: usize = 51;

/// Polynomial order of the Savitzky-Golay filter.
pub const SMOOTHING_POLY_ORDER: usize = 3;

// --- event detection -------------------------------------------------------

/// Onset threshold and lower rise-time bound, as a fraction of `v_max`.
pub const ONSET_FRACTION: f64 = 0.1;

/// Upper rise-time bound, as a fraction of `v_max`.
pub const RISE_UPPER_FRACTION: f64 = 0.9;

/// Bandwidth/rise-time product of a single-pole response.
pub const RISE_TIME_BANDWIDTH: f64 = 0.35;

/// Flatness threshold factor: a sample is flat when `|dV/dt| < factor * v_max / N`.
pub const FLATNESS_FACTOR: f64 = 0.01;

/// Shortest run of flat samples accepted as a plateau (s).
pub const MIN_PLATEAU_DURATION: f64 = 20e-9;

/// Share of the post-plateau derivative peak that marks a reflection.
pub const REFLECTION_DERIVATIVE_FRACTION: f64 = 0.5;

/// Post-plateau samples needed before a reflection search is attempted.
pub const MIN_REFLECTION_WINDOW: usize = 10;

// --- temporal parameters ---------------------------------------------------

/// Time span of the linear-ramp delay fallback (s).
pub const RAMP_WINDOW: f64 = 1e-6;

/// Number of points walked by the linear-ramp delay fallback.
pub const RAMP_STEPS: usize = 1000;

// --- impedance -------------------------------------------------------------

/// Samples averaged for the incident level when no plateau exists.
pub const STABLE_WINDOW_SAMPLES: usize = 10;

/// Incident level used when nothing follows `t0 + dt`, as a fraction of `v_max`.
pub const FALLBACK_INCIDENT_FRACTION: f64 = 0.8;

/// `|Γ|` below which the load counts as matched.
pub const MATCHED_THRESHOLD: f64 = 0.1;

/// `|Γ|` above which the phasor classifier reports open/short.
pub const STRONG_REFLECTION_THRESHOLD: f64 = 0.9;

/// VSWR reported for total reflection, where the ratio diverges.
pub const VSWR_SENTINEL: f64 = 1e10;

// --- attenuation -----------------------------------------------------------

/// Attenuation reported when the decay fit cannot run (Np/m); typical of a
/// good-quality short cable.
pub const ATTENUATION_FALLBACK: f64 = 1e-3;

/// Phase constant reported when no wavelength can be formed (rad/m).
pub const PHASE_FALLBACK: f64 = 1e-3;

/// Floor applied to both alpha and beta.
pub const PROPAGATION_FLOOR: f64 = 1e-6;

/// Waveforms with this many samples or fewer skip the decay fit.
pub const MIN_ATTENUATION_SAMPLES: usize = 50;

/// Samples needed after `t0 + dt` to attempt the decay fit.
pub const MIN_DECAY_WINDOW: usize = 10;

/// Usable (positive, finite) samples needed for the decay fit.
pub const MIN_DECAY_FIT_POINTS: usize = 5;

// --- error analysis --------------------------------------------------------

/// Sampling interval assumed when the header does not provide one (s).
pub const DEFAULT_SAMPLE_INTERVAL: f64 = 1e-9;

/// Relative timing uncertainty added on top of one sample interval.
pub const TIMING_UNCERTAINTY_FRACTION: f64 = 0.05;

/// Relative uncertainty of the user-supplied cable length.
pub const LENGTH_UNCERTAINTY_FRACTION: f64 = 0.01;

// --- rendering -------------------------------------------------------------

/// Smallest plot side that still fits the caption and axis labels (px).
pub const MIN_PLOT_DIMENSION: u32 = 160;

/// Largest accepted plot width or height in pixels.
pub const MAX_PLOT_DIMENSION: u32 = 8192;

// --- report ----------------------------------------------------------------

/// Magnitude substituted for infinite report values.
pub const REPORT_INFINITY: f64 = 1e10;

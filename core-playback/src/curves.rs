//! Mapping of user-facing 0..1 controls onto node parameters.

/// Lowest cutoff reachable through [`filter_params`], in hertz.
pub const MIN_FILTER_FREQUENCY: f64 = 40.0;

/// Scale from a 0..1 quality fraction to the filter Q.
pub const QUALITY_MULTIPLIER: f64 = 30.0;

/// Gain for a volume fraction.
///
/// The fraction is clamped to `[0, 1]` (NaN counts as silence) and squared;
/// a linear ramp sounds too loud through the middle of its range.
pub fn volume_to_gain(fraction: f32) -> f32 {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    fraction * fraction
}

/// Cutoff frequency and Q for the filter controls.
///
/// The frequency fraction sweeps logarithmically from
/// [`MIN_FILTER_FREQUENCY`] at 0 up to `nyquist` at 1, so each step covers
/// the same number of octaves. The quality fraction is linear.
pub fn filter_params(frequency_fraction: f64, quality_fraction: f64, nyquist: f64) -> (f64, f64) {
    let octaves = (nyquist / MIN_FILTER_FREQUENCY).log2();
    let multiplier = 2f64.powf(octaves * (frequency_fraction - 1.0));
    (nyquist * multiplier, quality_fraction * QUALITY_MULTIPLIER)
}

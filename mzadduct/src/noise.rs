//! Noise floor estimation over an ion chromatogram
use crate::matrix::IonChromatogram;

/// The capability to estimate the intensity of the instrument noise in a trace
pub trait NoiseEstimator {
    fn noise_level(&self, trace: &IonChromatogram) -> f64;
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// The median absolute deviation of `values` from their median
pub fn median_absolute_deviation(values: &[f64]) -> f64 {
    let mut scratch = values.to_vec();
    let center = median(&mut scratch);
    scratch
        .iter_mut()
        .zip(values)
        .for_each(|(s, v)| *s = (v - center).abs());
    median(&mut scratch)
}

/// Estimates the noise floor as the smallest median absolute deviation of any
/// window of `window` consecutive scans.
///
/// The estimate never exceeds the range of the trace. A trace shorter than the
/// window is treated as a single window and an empty trace has no noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowAnalyzer {
    pub window: usize,
}

impl Default for WindowAnalyzer {
    fn default() -> Self {
        Self { window: 256 }
    }
}

impl WindowAnalyzer {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl NoiseEstimator for WindowAnalyzer {
    fn noise_level(&self, trace: &IonChromatogram) -> f64 {
        let values = trace.intensity_array();
        if values.is_empty() {
            return 0.0;
        }
        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        let window = self.window.clamp(1, values.len());
        values
            .windows(window)
            .map(median_absolute_deviation)
            .fold((hi - lo).abs(), f64::min)
    }
}

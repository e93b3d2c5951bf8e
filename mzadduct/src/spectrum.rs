//! Discretized mass spectra
use std::slice;

use mzpeaks::{CentroidPeak, MZPeakSetType};

use crate::isotopic_model::Isotopologue;

/// A single `(mass, intensity)` pair of a [`MassSpectrum`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpectrumPoint {
    pub mass: f64,
    pub intensity: f64,
}

impl SpectrumPoint {
    pub fn new(mass: f64, intensity: f64) -> Self {
        Self { mass, intensity }
    }
}

/// A mass spectrum ordered by ascending mass.
///
/// Intensities are either relative abundances, as produced by [`iso_dist_to_mass_spec`],
/// or raw signal, as produced by [`ExtractedIntensityMatrix::spectrum_at`](crate::matrix::ExtractedIntensityMatrix::spectrum_at).
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassSpectrum {
    points: Vec<SpectrumPoint>,
}

impl MassSpectrum {
    /// Create a spectrum from paired mass and intensity lists, sorting by mass.
    pub fn new(mass_list: &[f64], intensity_list: &[f64]) -> Self {
        mass_list
            .iter()
            .zip(intensity_list.iter())
            .map(|(m, i)| SpectrumPoint::new(*m, *i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, SpectrumPoint> {
        self.points.iter()
    }

    pub fn get(&self, index: usize) -> Option<&SpectrumPoint> {
        self.points.get(index)
    }

    pub fn mass_list(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mass).collect()
    }

    pub fn intensity_list(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.intensity).collect()
    }

    pub fn min_mass(&self) -> Option<f64> {
        self.points.first().map(|p| p.mass)
    }

    pub fn max_mass(&self) -> Option<f64> {
        self.points.last().map(|p| p.mass)
    }

    /// The most intense point, the first one on ties
    pub fn base_peak(&self) -> Option<&SpectrumPoint> {
        self.points.iter().reduce(|best, p| {
            if p.intensity > best.intensity {
                p
            } else {
                best
            }
        })
    }

    /// Rescale intensities so the most intense point equals `max_intensity`.
    ///
    /// A spectrum with no signal is returned unchanged.
    pub fn normalized(&self, max_intensity: f64) -> Self {
        match self.base_peak() {
            Some(base) if base.intensity > 0.0 => {
                let scale = max_intensity / base.intensity;
                Self {
                    points: self
                        .points
                        .iter()
                        .map(|p| SpectrumPoint::new(p.mass, p.intensity * scale))
                        .collect(),
                }
            }
            _ => self.clone(),
        }
    }

    /// Convert to an [`mzpeaks`] peak set. Intensities are narrowed to `f32`.
    pub fn to_peak_set(&self) -> MZPeakSetType<CentroidPeak> {
        let peaks: Vec<CentroidPeak> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| CentroidPeak::new(p.mass, p.intensity as f32, i as u32))
            .collect();
        MZPeakSetType::new(peaks)
    }
}

impl FromIterator<SpectrumPoint> for MassSpectrum {
    fn from_iter<T: IntoIterator<Item = SpectrumPoint>>(iter: T) -> Self {
        let mut points: Vec<SpectrumPoint> = iter.into_iter().collect();
        points.sort_by(|a, b| a.mass.total_cmp(&b.mass));
        Self { points }
    }
}

impl<'a> IntoIterator for &'a MassSpectrum {
    type Item = &'a SpectrumPoint;
    type IntoIter = slice::Iter<'a, SpectrumPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Build the [`MassSpectrum`] representation of an isotopic distribution.
///
/// Isotopologues whose abundance is not strictly greater than `min_abundance` are
/// dropped, so the default of `0.0` only excludes isotopologues with no abundance.
/// Intensities of the result are abundances relative to the most abundant kept
/// isotopologue, scaled to 100.
pub fn iso_dist_to_mass_spec(isotopologues: &[Isotopologue], min_abundance: f64) -> MassSpectrum {
    let kept: MassSpectrum = isotopologues
        .iter()
        .filter(|i| i.mass.is_finite() && i.abundance.is_finite())
        .filter(|i| i.abundance > min_abundance)
        .map(|i| SpectrumPoint::new(i.mass, i.abundance))
        .collect();
    kept.normalized(100.0)
}

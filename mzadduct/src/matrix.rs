//! Scan × mass intensity grids and their restriction to a set of target masses
use std::slice;

use thiserror::Error;
use tracing::debug;

use crate::adduct::{get_adduct_spectra, Adduct, AdductError};
use crate::formula::Formula;
use crate::interval::{indices_within, MassWindow};
use crate::isotopic_model::IsotopicDistributionGenerator;
use crate::spectrum::MassSpectrum;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatrixError {
    #[error("Expected {expected} {axis}, found {found}")]
    ShapeMismatch {
        axis: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("The {0} axis is not strictly ascending")]
    UnsortedAxis(&'static str),
    #[error("Invalid intensity {value} at scan {scan}, channel {channel}")]
    InvalidIntensity {
        scan: usize,
        channel: usize,
        value: f64,
    },
    #[error("The mass bin interval must be positive, got {0}")]
    InvalidBinInterval(f64),
}

/// The index of the value of an ascending `times` list closest to `time`, the earlier
/// one on ties.
fn nearest_index(times: &[f64], time: f64) -> Option<usize> {
    if times.is_empty() {
        return None;
    }
    let i = times.partition_point(|t| *t < time);
    if i == 0 {
        Some(0)
    } else if i == times.len() {
        Some(times.len() - 1)
    } else if (times[i] - time).abs() < (time - times[i - 1]).abs() {
        Some(i)
    } else {
        Some(i - 1)
    }
}

fn is_strictly_ascending(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// A single intensity value per scan, paired with the scan's retention time
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IonChromatogram {
    time_list: Vec<f64>,
    intensity_array: Vec<f64>,
}

impl IonChromatogram {
    pub fn new(time_list: Vec<f64>, intensity_array: Vec<f64>) -> Result<Self, MatrixError> {
        if time_list.len() != intensity_array.len() {
            return Err(MatrixError::ShapeMismatch {
                axis: "intensities",
                expected: time_list.len(),
                found: intensity_array.len(),
            });
        }
        if !is_strictly_ascending(&time_list) {
            return Err(MatrixError::UnsortedAxis("time"));
        }
        Ok(Self {
            time_list,
            intensity_array,
        })
    }

    pub fn len(&self) -> usize {
        self.time_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_list.is_empty()
    }

    pub fn time_list(&self) -> &[f64] {
        &self.time_list
    }

    pub fn intensity_array(&self) -> &[f64] {
        &self.intensity_array
    }

    pub fn time_at(&self, index: usize) -> Option<f64> {
        self.time_list.get(index).copied()
    }

    pub fn intensity_at(&self, index: usize) -> Option<f64> {
        self.intensity_array.get(index).copied()
    }

    /// The index of the scan nearest to `time`
    pub fn index_at_time(&self, time: f64) -> Option<usize> {
        nearest_index(&self.time_list, time)
    }
}

/// A scan-major grid of intensities over a mass axis.
///
/// Construction validates that the grid matches both axes, that both axes are strictly
/// ascending and that every intensity is finite and non-negative, so all derived
/// traces and areas are well defined.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IntensityMatrix {
    time_list: Vec<f64>,
    mass_list: Vec<f64>,
    intensity_array: Vec<Vec<f64>>,
}

impl IntensityMatrix {
    pub fn new(
        time_list: Vec<f64>,
        mass_list: Vec<f64>,
        intensity_array: Vec<Vec<f64>>,
    ) -> Result<Self, MatrixError> {
        if time_list.len() != intensity_array.len() {
            return Err(MatrixError::ShapeMismatch {
                axis: "scans",
                expected: time_list.len(),
                found: intensity_array.len(),
            });
        }
        if !is_strictly_ascending(&time_list) {
            return Err(MatrixError::UnsortedAxis("time"));
        }
        if !is_strictly_ascending(&mass_list) {
            return Err(MatrixError::UnsortedAxis("mass"));
        }
        for (scan, row) in intensity_array.iter().enumerate() {
            if row.len() != mass_list.len() {
                return Err(MatrixError::ShapeMismatch {
                    axis: "channels",
                    expected: mass_list.len(),
                    found: row.len(),
                });
            }
            if let Some((channel, value)) = row
                .iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite() || **v < 0.0)
            {
                return Err(MatrixError::InvalidIntensity {
                    scan,
                    channel,
                    value: *value,
                });
            }
        }
        Ok(Self {
            time_list,
            mass_list,
            intensity_array,
        })
    }

    /// The number of scans
    pub fn len(&self) -> usize {
        self.time_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_list.is_empty()
    }

    pub fn time_list(&self) -> &[f64] {
        &self.time_list
    }

    pub fn mass_list(&self) -> &[f64] {
        &self.mass_list
    }

    pub fn intensity_array(&self) -> &[Vec<f64>] {
        &self.intensity_array
    }

    pub fn time_at(&self, index: usize) -> Option<f64> {
        self.time_list.get(index).copied()
    }

    pub fn index_at_time(&self, time: f64) -> Option<usize> {
        nearest_index(&self.time_list, time)
    }

    /// The intensity of every mass channel at scan `index`
    pub fn intensity_at(&self, index: usize) -> Option<&[f64]> {
        self.intensity_array.get(index).map(|row| row.as_slice())
    }

    /// The total ion chromatogram
    pub fn tic(&self) -> IonChromatogram {
        IonChromatogram {
            time_list: self.time_list.clone(),
            intensity_array: self.intensity_array.iter().map(|r| r.iter().sum()).collect(),
        }
    }
}

/// Accumulates centroided scans into an [`IntensityMatrix`] with evenly spaced mass bins.
///
/// Bin centers are multiples of `bin_interval`. A point is assigned to its nearest
/// center `c` when it lies within `[c - bin_left, c + bin_right]`, otherwise it is dropped.
#[derive(Debug, Clone)]
pub struct IntensityMatrixBuilder {
    pub bin_interval: f64,
    pub bin_left: f64,
    pub bin_right: f64,
    scans: Vec<(f64, Vec<f64>, Vec<f64>)>,
}

impl Default for IntensityMatrixBuilder {
    fn default() -> Self {
        Self::new(1.0, 0.5, 0.5)
    }
}

impl IntensityMatrixBuilder {
    pub fn new(bin_interval: f64, bin_left: f64, bin_right: f64) -> Self {
        Self {
            bin_interval,
            bin_left,
            bin_right,
            scans: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// Add a scan acquired at `time`. Points with non-finite or negative values are skipped.
    pub fn add_scan(&mut self, time: f64, mzs: &[f64], intensities: &[f64]) {
        let (mzs, intensities): (Vec<f64>, Vec<f64>) = mzs
            .iter()
            .zip(intensities)
            .filter(|(mz, int)| mz.is_finite() && int.is_finite() && **int >= 0.0)
            .map(|(mz, int)| (*mz, *int))
            .unzip();
        self.scans.push((time, mzs, intensities));
    }

    fn bin_of(&self, mz: f64) -> i64 {
        (mz / self.bin_interval).round() as i64
    }

    pub fn build(mut self) -> Result<IntensityMatrix, MatrixError> {
        if self.bin_interval.is_nan() || self.bin_interval <= 0.0 {
            return Err(MatrixError::InvalidBinInterval(self.bin_interval));
        }
        self.scans.sort_by(|a, b| a.0.total_cmp(&b.0));

        let bounds = self
            .scans
            .iter()
            .flat_map(|(_, mzs, _)| mzs.iter())
            .fold(None, |acc: Option<(f64, f64)>, mz| match acc {
                Some((lo, hi)) => Some((lo.min(*mz), hi.max(*mz))),
                None => Some((*mz, *mz)),
            });
        let (first_bin, n_bins) = match bounds {
            Some((lo, hi)) => {
                let first = self.bin_of(lo);
                (first, (self.bin_of(hi) - first + 1) as usize)
            }
            None => (0, 0),
        };
        let mass_list: Vec<f64> = (0..n_bins)
            .map(|i| (first_bin + i as i64) as f64 * self.bin_interval)
            .collect();

        let mut time_list = Vec::with_capacity(self.scans.len());
        let mut intensity_array = Vec::with_capacity(self.scans.len());
        for (time, mzs, intensities) in self.scans.iter() {
            let mut row = vec![0.0; n_bins];
            for (mz, int) in mzs.iter().zip(intensities) {
                let k = (self.bin_of(*mz) - first_bin) as usize;
                let center = mass_list[k];
                if *mz >= center - self.bin_left && *mz <= center + self.bin_right {
                    row[k] += int;
                }
            }
            time_list.push(*time);
            intensity_array.push(row);
        }
        debug!(
            "Binned {} scans into {} mass channels",
            time_list.len(),
            mass_list.len()
        );
        IntensityMatrix::new(time_list, mass_list, intensity_array)
    }
}

/// An [`IntensityMatrix`] restricted to a list of target masses.
///
/// The mass axis is exactly the target list and the scan axis is that of the source
/// matrix.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedIntensityMatrix {
    time_list: Vec<f64>,
    mass_list: Vec<f64>,
    intensity_array: Vec<Vec<f64>>,
    eic: IonChromatogram,
}

impl ExtractedIntensityMatrix {
    /// The number of scans
    pub fn len(&self) -> usize {
        self.time_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_list.is_empty()
    }

    pub fn mass_list(&self) -> &[f64] {
        &self.mass_list
    }

    pub fn time_list(&self) -> &[f64] {
        &self.time_list
    }

    pub fn intensity_array(&self) -> &[Vec<f64>] {
        &self.intensity_array
    }

    pub fn intensity_at(&self, index: usize) -> Option<&[f64]> {
        self.intensity_array.get(index).map(|row| row.as_slice())
    }

    /// The target masses paired with their intensities at scan `index`
    pub fn spectrum_at(&self, index: usize) -> Option<MassSpectrum> {
        self.intensity_at(index)
            .map(|row| MassSpectrum::new(&self.mass_list, row))
    }

    pub fn time_at(&self, index: usize) -> Option<f64> {
        self.time_list.get(index).copied()
    }

    pub fn index_at_time(&self, time: f64) -> Option<usize> {
        nearest_index(&self.time_list, time)
    }

    /// The summed intensity of the target masses at each scan
    pub fn eic(&self) -> &IonChromatogram {
        &self.eic
    }

    pub fn iter(&self) -> slice::Iter<'_, Vec<f64>> {
        self.intensity_array.iter()
    }
}

/// Restrict `im` to `masses`, summing every source channel in the inclusive window
/// `[m - left_bound, m + right_bound]` around each target mass `m`.
pub fn build_extracted_intensity_matrix(
    im: &IntensityMatrix,
    masses: &[f64],
    left_bound: f64,
    right_bound: f64,
) -> ExtractedIntensityMatrix {
    let channels: Vec<Vec<usize>> = masses
        .iter()
        .map(|m| indices_within(&MassWindow::around(*m, left_bound, right_bound), im.mass_list()))
        .collect();

    let intensity_array: Vec<Vec<f64>> = im
        .intensity_array()
        .iter()
        .map(|row| {
            channels
                .iter()
                .map(|idxs| idxs.iter().map(|i| row[*i]).sum())
                .collect()
        })
        .collect();

    let eic = IonChromatogram {
        time_list: im.time_list().to_vec(),
        intensity_array: intensity_array.iter().map(|r| r.iter().sum()).collect(),
    };

    ExtractedIntensityMatrix {
        time_list: im.time_list().to_vec(),
        mass_list: masses.to_vec(),
        intensity_array,
        eic,
    }
}

/// Construct the [`ExtractedIntensityMatrix`] for `adducts` of `analyte`.
///
/// # Arguments
/// - `im`: The full intensity matrix
/// - `analyte`: The base formula
/// - `adducts`: The adducts whose isotopologue masses are extracted
/// - `left_bound`: How far below each target mass to match source channels
/// - `right_bound`: How far above each target mass to match source channels
/// - `model`: The source of isotopic distributions
/// - `min_abundance`: Isotopologues with an abundance at or below this are not extracted
pub fn make_im_for_adducts<'a, I, G>(
    im: &IntensityMatrix,
    analyte: &Formula,
    adducts: I,
    left_bound: f64,
    right_bound: f64,
    model: &mut G,
    min_abundance: f64,
) -> Result<ExtractedIntensityMatrix, AdductError>
where
    I: IntoIterator<Item = &'a Adduct>,
    G: IsotopicDistributionGenerator + ?Sized,
{
    let spectra = get_adduct_spectra(analyte, adducts, model, min_abundance)?;
    let masses = spectra.mass_list();
    debug!(
        "Constructing ExtractedIntensityMatrix for m/z {}",
        masses
            .iter()
            .map(|m| format!("{m:.4}"))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(build_extracted_intensity_matrix(
        im,
        &masses,
        left_bound,
        right_bound,
    ))
}

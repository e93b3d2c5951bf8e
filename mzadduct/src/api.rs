//! High level APIs for finding the peaks of an analyte's adducts
use std::iter::{FusedIterator, Rev};
use std::vec;

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    adduct::{get_adduct_spectra, Adduct, AdductError, AdductSpectra},
    area::{BoundaryGrower, DEFAULT_BOUNDARY_TOLERANCE},
    filter::{IonCountFilter, SizeFilter},
    formula::{Formula, FormulaError},
    isotopic_model::{ElementalIsotopicModel, IsotopicDistributionGenerator},
    matrix::{make_im_for_adducts, ExtractedIntensityMatrix, IntensityMatrix, MatrixError},
    maxima::{LocalMaxima, MaximaFinder},
    noise::{NoiseEstimator, WindowAnalyzer},
    peak::{Peak, PeakCandidate},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeakFinderError {
    #[error("{0}")]
    Formula(#[from] FormulaError),
    #[error("{0}")]
    Adduct(#[from] AdductError),
    #[error("{0}")]
    Matrix(#[from] MatrixError),
}

/// How the target masses of a set of adducts are derived and matched
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractionParams {
    /// How far below each target mass a source channel may lie
    pub left_tolerance: f64,
    /// How far above each target mass a source channel may lie
    pub right_tolerance: f64,
    /// Isotopologues with a fractional abundance at or below this, before rescaling, are
    /// not extracted
    pub min_abundance: f64,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            left_tolerance: 0.1,
            right_tolerance: 0.1,
            min_abundance: 0.0,
        }
    }
}

impl ExtractionParams {
    pub fn new(left_tolerance: f64, right_tolerance: f64, min_abundance: f64) -> Self {
        Self {
            left_tolerance,
            right_tolerance,
            min_abundance,
        }
    }

    /// Build the [`ExtractedIntensityMatrix`] of `adducts` of `analyte` from `im`
    pub fn extract<'a, I, G>(
        &self,
        im: &IntensityMatrix,
        analyte: &Formula,
        adducts: I,
        model: &mut G,
    ) -> Result<ExtractedIntensityMatrix, PeakFinderError>
    where
        I: IntoIterator<Item = &'a Adduct>,
        G: IsotopicDistributionGenerator + ?Sized,
    {
        let e_im = make_im_for_adducts(
            im,
            analyte,
            adducts,
            self.left_tolerance,
            self.right_tolerance,
            model,
            self.min_abundance,
        )?;
        Ok(e_im)
    }
}

/// The tunable thresholds of peak finding
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PeakFinderParams {
    /// The width of the window a maximum must dominate, in scans
    pub points: usize,
    /// The number of mass channels that must exceed the noise floor at an apex
    pub min_ions: usize,
    /// The fraction of the accumulated area a scan must exceed to extend a peak
    pub boundary_tolerance: f64,
    /// A peak must span strictly more scans than this
    pub min_width: usize,
    /// A peak's area must be strictly greater than this
    pub min_area: f64,
    /// The number of scans in each noise estimation window
    pub noise_window: usize,
}

impl Default for PeakFinderParams {
    fn default() -> Self {
        Self {
            points: 3,
            min_ions: 2,
            boundary_tolerance: DEFAULT_BOUNDARY_TOLERANCE,
            min_width: 3,
            min_area: 1000.0,
            noise_window: 256,
        }
    }
}

impl PeakFinderParams {
    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }
}

/// Detects, grows and filters peaks in an [`ExtractedIntensityMatrix`].
///
/// The maxima finding and noise estimation strategies are pluggable, the defaults
/// being [`LocalMaxima`] and [`WindowAnalyzer`].
#[derive(Debug, Clone)]
pub struct PeakFinder<M: MaximaFinder = LocalMaxima, N: NoiseEstimator = WindowAnalyzer> {
    pub params: PeakFinderParams,
    pub maxima_finder: M,
    pub noise_estimator: N,
}

impl Default for PeakFinder {
    fn default() -> Self {
        Self::new(PeakFinderParams::default())
    }
}

impl PeakFinder<LocalMaxima, WindowAnalyzer> {
    pub fn new(params: PeakFinderParams) -> Self {
        Self {
            params,
            maxima_finder: LocalMaxima,
            noise_estimator: WindowAnalyzer::new(params.noise_window),
        }
    }
}

impl<M: MaximaFinder, N: NoiseEstimator> PeakFinder<M, N> {
    pub fn with_strategies(params: PeakFinderParams, maxima_finder: M, noise_estimator: N) -> Self {
        Self {
            params,
            maxima_finder,
            noise_estimator,
        }
    }

    /// A zero-width candidate for every local maximum of the combined trace, in
    /// ascending scan order
    pub fn peaks_from_maxima(&self, e_im: &ExtractedIntensityMatrix) -> Vec<PeakCandidate> {
        let trace = e_im.eic();
        let mut candidates: Vec<PeakCandidate> = self
            .maxima_finder
            .maxima_indices(trace.intensity_array(), self.params.points)
            .into_iter()
            .filter_map(|apex| {
                let apex_time = e_im.time_at(apex)?;
                let apex_spectrum = e_im.spectrum_at(apex)?;
                Some(PeakCandidate::new(apex, apex_time, apex_spectrum))
            })
            .collect();
        // PeakIter emits in reverse of this order
        candidates.sort_by_key(|c| c.apex_index());
        candidates
    }

    pub fn noise_level(&self, e_im: &ExtractedIntensityMatrix) -> f64 {
        self.noise_estimator.noise_level(e_im.eic())
    }

    /// The candidates with enough mass channels above the noise floor, in ascending scan order
    pub fn filtered_candidates(&self, e_im: &ExtractedIntensityMatrix) -> Vec<PeakCandidate> {
        let candidates = self.peaks_from_maxima(e_im);
        let noise_level = self.noise_level(e_im);
        debug!(
            "Filtering {} candidates with fewer than {}/{} masses above noise level {noise_level}",
            candidates.len(),
            self.params.min_ions,
            e_im.mass_list().len()
        );
        let filtered = IonCountFilter::new(self.params.min_ions).filter(candidates, noise_level);
        debug!("{} candidates above the noise floor", filtered.len());
        filtered
    }

    /// Find the peaks of `e_im`.
    ///
    /// The returned iterator grows each candidate that passed the noise filter only when
    /// it is reached, and yields the peaks passing the size filter from the highest apex
    /// scan to the lowest.
    pub fn find_peaks<'a>(&self, e_im: &'a ExtractedIntensityMatrix) -> PeakIter<'a> {
        PeakIter::new(
            e_im,
            self.filtered_candidates(e_im),
            BoundaryGrower::new(self.params.boundary_tolerance),
            SizeFilter::new(self.params.min_width, self.params.min_area),
        )
    }

    /// Find the peaks of `e_im`, growing all candidates in parallel.
    ///
    /// The result is in the same order as [`PeakFinder::find_peaks`] yields.
    #[cfg(feature = "parallelism")]
    pub fn collect_peaks_parallel(&self, e_im: &ExtractedIntensityMatrix) -> Vec<Peak> {
        use rayon::prelude::*;

        let grower = BoundaryGrower::new(self.params.boundary_tolerance);
        let size_filter = SizeFilter::new(self.params.min_width, self.params.min_area);
        let mut candidates = self.filtered_candidates(e_im);
        candidates.reverse();
        let extents: Vec<_> = candidates
            .par_iter()
            .map(|c| {
                e_im.index_at_time(c.apex_time())
                    .map(|apex| grower.grow(apex, e_im))
            })
            .collect();
        candidates
            .into_iter()
            .zip(extents)
            .filter_map(|(c, extent)| {
                let extent = extent?;
                size_filter.accepts(&extent).then(|| c.resolve(extent))
            })
            .collect()
    }
}

/// A lazy, single pass sequence of the peaks found in an [`ExtractedIntensityMatrix`].
///
/// Candidates are visited in reverse of their ascending apex order. Each one's apex is
/// located from its apex time, grown into an extent, and yielded only if its extent
/// passes the [`SizeFilter`].
#[derive(Debug)]
pub struct PeakIter<'a> {
    e_im: &'a ExtractedIntensityMatrix,
    candidates: Rev<vec::IntoIter<PeakCandidate>>,
    grower: BoundaryGrower,
    size_filter: SizeFilter,
}

impl<'a> PeakIter<'a> {
    pub fn new(
        e_im: &'a ExtractedIntensityMatrix,
        candidates: Vec<PeakCandidate>,
        grower: BoundaryGrower,
        size_filter: SizeFilter,
    ) -> Self {
        Self {
            e_im,
            candidates: candidates.into_iter().rev(),
            grower,
            size_filter,
        }
    }
}

impl Iterator for PeakIter<'_> {
    type Item = Peak;

    fn next(&mut self) -> Option<Self::Item> {
        for candidate in self.candidates.by_ref() {
            let Some(apex_index) = self.e_im.index_at_time(candidate.apex_time()) else {
                continue;
            };
            let extent = self.grower.grow(apex_index, self.e_im);
            if self.size_filter.accepts(&extent) {
                return Some(candidate.resolve(extent));
            }
            trace!(
                "Rejected peak at {apex_index} spanning {} scans with area {}",
                extent.width(),
                extent.area
            );
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.candidates.size_hint().1)
    }
}

impl FusedIterator for PeakIter<'_> {}

/// Compute the spectrum of each of `adducts` of `formula` with the default isotopic model.
pub fn derive_adduct_spectra<'a, I: IntoIterator<Item = &'a Adduct>>(
    formula: &Formula,
    adducts: I,
) -> Result<AdductSpectra, AdductError> {
    let mut model = ElementalIsotopicModel::new();
    get_adduct_spectra(formula, adducts, &mut model, 0.0)
}

/// Restrict `im` to the isotopologue masses of `adducts` of `analyte`.
///
/// # Arguments
/// - `im`: The full intensity matrix
/// - `analyte`: The base formula
/// - `adducts`: The adducts to extract
/// - `left_tolerance`: How far below each target mass a source channel may lie, conventionally 0.1
/// - `right_tolerance`: How far above each target mass a source channel may lie, conventionally 0.1
///
/// # See also
/// [`ExtractionParams::extract`] to supply the isotopic model and abundance cutoff
pub fn build_extracted_matrix<'a, I: IntoIterator<Item = &'a Adduct>>(
    im: &IntensityMatrix,
    analyte: &Formula,
    adducts: I,
    left_tolerance: f64,
    right_tolerance: f64,
) -> Result<ExtractedIntensityMatrix, AdductError> {
    let mut model = ElementalIsotopicModel::new();
    make_im_for_adducts(
        im,
        analyte,
        adducts,
        left_tolerance,
        right_tolerance,
        &mut model,
        0.0,
    )
}

/// Find the peaks of `e_im` with maxima over `points` scans and default thresholds.
///
/// # See also
/// [`PeakFinder::find_peaks`]
pub fn find_peaks(e_im: &ExtractedIntensityMatrix, points: usize) -> PeakIter<'_> {
    PeakFinder::new(PeakFinderParams::default().with_points(points)).find_peaks(e_im)
}

//! Locate and quantify the chromatographic peaks of a set of adducts of an analyte in
//! LC-MS data.
//!
//! The adducts' isotopologue masses are predicted from their formulae, extracted from a
//! scan × mass [`IntensityMatrix`], and the combined trace is searched for local maxima.
//! Each maximum with enough mass channels above the noise floor is grown into a bounded
//! peak and kept when it is wide and large enough.
pub mod adduct;
pub mod area;
pub mod filter;
pub mod formula;
pub mod interval;
pub mod isotopic_model;
pub mod matrix;
pub mod maxima;
pub mod noise;
pub mod peak;
pub mod spectrum;

pub mod api;

pub use crate::adduct::{get_adduct_spectra, Adduct, AdductError, AdductOperation, AdductSpectra};
pub use crate::api::{
    build_extracted_matrix, derive_adduct_spectra, find_peaks, ExtractionParams, PeakFinder,
    PeakFinderError, PeakFinderParams, PeakIter,
};
pub use crate::formula::{Formula, FormulaError};
pub use crate::isotopic_model::{ElementalIsotopicModel, IsotopicDistributionGenerator};
pub use crate::matrix::{
    ExtractedIntensityMatrix, IntensityMatrix, IntensityMatrixBuilder, IonChromatogram,
    MatrixError,
};
pub use crate::peak::{Peak, PeakBounds, PeakCandidate, PeakExtent};
pub use crate::spectrum::MassSpectrum;

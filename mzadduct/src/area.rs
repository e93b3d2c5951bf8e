//! Peak boundary growth and area estimation
use tracing::trace;

use crate::matrix::ExtractedIntensityMatrix;
use crate::peak::PeakExtent;

/// The default fraction of the accumulated area a scan must exceed to extend a peak, half of 0.05%
pub const DEFAULT_BOUNDARY_TOLERANCE: f64 = 0.0005 / 2.0;

/// Walk `scans` away from the apex, accumulating each scan's intensity while it is no
/// greater than the previous one and greater than `tolerance` times the area accumulated
/// so far. Returns the accumulated area, including the apex, and the number of scans taken.
fn grow<I: Iterator<Item = f64>>(apex_intensity: f64, scans: I, tolerance: f64) -> (f64, usize) {
    let mut area = apex_intensity;
    let mut last_intensity = apex_intensity;
    let mut steps = 0;
    for scan_intensity in scans {
        if scan_intensity <= last_intensity && scan_intensity > area * tolerance {
            last_intensity = scan_intensity;
            area += scan_intensity;
            steps += 1;
        } else {
            break;
        }
    }
    (area, steps)
}

/// Compute the area and absolute scan bounds of the peak with its apex at `apex_index`.
///
/// Each side is grown independently from the apex. Because the stopping threshold is
/// relative to the area accumulated on that side, it rises as the peak widens. The apex
/// intensity is counted once in the returned area.
///
/// An `apex_index` outside of `e_im` yields an empty extent at that index.
pub fn sum_area(apex_index: usize, e_im: &ExtractedIntensityMatrix, tolerance: f64) -> PeakExtent {
    let trace = e_im.eic().intensity_array();
    let Some(apex_intensity) = trace.get(apex_index).copied() else {
        return PeakExtent::new(0.0, apex_index, apex_index, apex_index);
    };

    let (rhs_area, right_steps) = grow(
        apex_intensity,
        trace[apex_index + 1..].iter().copied(),
        tolerance,
    );
    let (lhs_area, left_steps) = grow(
        apex_intensity,
        trace[..apex_index].iter().rev().copied(),
        tolerance,
    );

    let area = lhs_area + rhs_area - apex_intensity;
    debug_assert!(
        area.is_finite() && area >= 0.0,
        "Area {area} at {apex_index} is undefined"
    );
    let extent = PeakExtent::new(
        area,
        apex_index - left_steps,
        apex_index,
        apex_index + right_steps,
    );
    trace!(
        "Grew peak at {apex_index} to {}-{} with area {area}",
        extent.left_bound,
        extent.right_bound
    );
    extent
}

/// Grows candidate apexes into bounded peaks with [`sum_area`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryGrower {
    pub tolerance: f64,
}

impl Default for BoundaryGrower {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_BOUNDARY_TOLERANCE,
        }
    }
}

impl BoundaryGrower {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn grow(&self, apex_index: usize, e_im: &ExtractedIntensityMatrix) -> PeakExtent {
        sum_area(apex_index, e_im, self.tolerance)
    }
}

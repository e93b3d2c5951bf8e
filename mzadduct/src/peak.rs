//! Chromatographic peaks, from candidate apex to resolved extent
use crate::spectrum::MassSpectrum;

/// A local maximum of the combined trace that has not yet been given an extent
#[derive(Debug, Clone, PartialEq)]
pub struct PeakCandidate {
    apex_index: usize,
    apex_time: f64,
    apex_spectrum: MassSpectrum,
}

impl PeakCandidate {
    pub fn new(apex_index: usize, apex_time: f64, apex_spectrum: MassSpectrum) -> Self {
        Self {
            apex_index,
            apex_time,
            apex_spectrum,
        }
    }

    pub fn apex_index(&self) -> usize {
        self.apex_index
    }

    pub fn apex_time(&self) -> f64 {
        self.apex_time
    }

    pub fn apex_spectrum(&self) -> &MassSpectrum {
        &self.apex_spectrum
    }

    /// The zero-width bounds a candidate carries before boundary growth
    pub fn bounds(&self) -> PeakBounds {
        PeakBounds::new(0, self.apex_index, 0)
    }

    /// Combine this candidate with the extent grown from its apex
    pub fn resolve(self, extent: PeakExtent) -> Peak {
        Peak {
            apex_time: self.apex_time,
            apex_spectrum: self.apex_spectrum,
            bounds: extent.bounds(),
            area: extent.area,
        }
    }
}

/// The area of a peak and the absolute scan indices it spans
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeakExtent {
    pub area: f64,
    pub left_bound: usize,
    pub apex_index: usize,
    pub right_bound: usize,
}

impl PeakExtent {
    pub fn new(area: f64, left_bound: usize, apex_index: usize, right_bound: usize) -> Self {
        Self {
            area,
            left_bound,
            apex_index,
            right_bound,
        }
    }

    /// The number of scans between the outermost bounds
    pub fn width(&self) -> usize {
        self.right_bound - self.left_bound
    }

    pub fn bounds(&self) -> PeakBounds {
        PeakBounds::new(
            self.apex_index - self.left_bound,
            self.apex_index,
            self.right_bound - self.apex_index,
        )
    }
}

/// The scan span of a peak, as offsets either side of its apex
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeakBounds {
    pub left_offset: usize,
    pub apex_index: usize,
    pub right_offset: usize,
}

impl PeakBounds {
    pub fn new(left_offset: usize, apex_index: usize, right_offset: usize) -> Self {
        Self {
            left_offset,
            apex_index,
            right_offset,
        }
    }
}

/// A peak with its full extent and area
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Peak {
    pub apex_time: f64,
    pub apex_spectrum: MassSpectrum,
    pub bounds: PeakBounds,
    pub area: f64,
}

impl Peak {
    pub fn apex_index(&self) -> usize {
        self.bounds.apex_index
    }

    pub fn left_index(&self) -> usize {
        self.bounds.apex_index - self.bounds.left_offset
    }

    pub fn right_index(&self) -> usize {
        self.bounds.apex_index + self.bounds.right_offset
    }

    pub fn width(&self) -> usize {
        self.bounds.left_offset + self.bounds.right_offset
    }
}

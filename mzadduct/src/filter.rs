//! Rejection of candidates that are indistinguishable from noise or too small to quantify
use crate::peak::{PeakCandidate, PeakExtent};

/// Keep the candidates whose apex spectrum has at least `n` channels with an intensity
/// strictly above `cutoff`, in their original order.
pub fn num_ions_threshold<I: IntoIterator<Item = PeakCandidate>>(
    candidates: I,
    n: usize,
    cutoff: f64,
) -> Vec<PeakCandidate> {
    candidates
        .into_iter()
        .filter(|c| {
            c.apex_spectrum()
                .iter()
                .filter(|p| p.intensity > cutoff)
                .count()
                >= n
        })
        .collect()
}

/// Requires a minimum number of mass channels above the noise floor at a candidate's apex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IonCountFilter {
    pub min_ions: usize,
}

impl Default for IonCountFilter {
    fn default() -> Self {
        Self { min_ions: 2 }
    }
}

impl IonCountFilter {
    pub fn new(min_ions: usize) -> Self {
        Self { min_ions }
    }

    pub fn filter<I: IntoIterator<Item = PeakCandidate>>(
        &self,
        candidates: I,
        noise_level: f64,
    ) -> Vec<PeakCandidate> {
        num_ions_threshold(candidates, self.min_ions, noise_level)
    }
}

/// Requires a grown peak to be both wider than `min_width` scans and larger than `min_area`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeFilter {
    pub min_width: usize,
    pub min_area: f64,
}

impl Default for SizeFilter {
    fn default() -> Self {
        Self {
            min_width: 3,
            min_area: 1000.0,
        }
    }
}

impl SizeFilter {
    pub fn new(min_width: usize, min_area: f64) -> Self {
        Self {
            min_width,
            min_area,
        }
    }

    pub fn accepts(&self, extent: &PeakExtent) -> bool {
        extent.width() > self.min_width && extent.area > self.min_area
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::spectrum::MassSpectrum;

    fn candidate(apex: usize, intensities: &[f64]) -> PeakCandidate {
        let masses: Vec<f64> = (0..intensities.len()).map(|i| 100.0 + i as f64).collect();
        PeakCandidate::new(apex, apex as f64, MassSpectrum::new(&masses, intensities))
    }

    #[test]
    fn test_ion_threshold() {
        let candidates = vec![
            candidate(1, &[5.0, 5.0, 0.0]),
            candidate(4, &[5.0, 0.0, 0.0]),
            candidate(9, &[10.0, 11.0, 12.0]),
            candidate(12, &[4.0, 4.0, 9.0]),
        ];
        let kept = IonCountFilter::default().filter(candidates.clone(), 4.0);
        let apexes: Vec<_> = kept.iter().map(|c| c.apex_index()).collect();
        assert_eq!(apexes, vec![1, 9]);

        assert!(num_ions_threshold(candidates.clone(), 4, 0.0).is_empty());
        assert_eq!(num_ions_threshold(candidates, 0, 100.0).len(), 4);
    }

    #[test]
    fn test_size_filter() {
        let filter = SizeFilter::default();
        assert!(filter.accepts(&PeakExtent::new(1001.0, 2, 4, 6)));
        assert!(!filter.accepts(&PeakExtent::new(1001.0, 2, 4, 5)));
        assert!(!filter.accepts(&PeakExtent::new(1000.0, 2, 4, 6)));
        assert!(SizeFilter::new(0, 0.0).accepts(&PeakExtent::new(1.0, 4, 4, 5)));
    }
}

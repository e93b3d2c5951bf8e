//! Local maxima of a one-dimensional trace

/// The capability to locate local maxima in a sequence of intensities
pub trait MaximaFinder {
    /// The indices of the local maxima of `values` over a window of `points`
    /// scans, in ascending order.
    fn maxima_indices(&self, values: &[f64], points: usize) -> Vec<usize>;
}

fn window_max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Finds maxima over a symmetric window centred on each index.
///
/// An even `points` is widened to the next odd number, and only indices whose whole
/// window fits inside `values` are considered. An index strictly greater than both
/// sides of its window is a maximum. A flat top is entered where a value is strictly
/// greater than its left side and equal to the highest value on its right, and its
/// centre is reported once the top falls away. A flat stretch that gives way to
/// higher values is a shoulder and is not reported.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LocalMaxima;

impl MaximaFinder for LocalMaxima {
    fn maxima_indices(&self, values: &[f64], points: usize) -> Vec<usize> {
        let half = points / 2;
        if half == 0 || values.len() < 2 * half + 1 {
            return Vec::new();
        }
        let mut maxima = Vec::new();
        let mut plateau_start: Option<usize> = None;
        for (start, window) in values.windows(2 * half + 1).enumerate() {
            let index = start + half;
            let mid = window[half];
            let left = window_max(&window[..half]);
            let right = window_max(&window[half + 1..]);
            if mid > left && mid > right {
                maxima.push(index);
                plateau_start = None;
            } else if mid > left && mid == right {
                plateau_start = Some(index);
            } else if mid == left && mid > right {
                if let Some(plateau) = plateau_start.take() {
                    maxima.push((plateau + index) / 2);
                }
            } else if mid < left || mid < right {
                plateau_start = None;
            }
        }
        maxima
    }
}

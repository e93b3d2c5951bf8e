use std::path::Path;

use mzdata::prelude::*;
use tracing::{debug, warn};

use mzadduct::{IntensityMatrix, IntensityMatrixBuilder};

use crate::driver::MZAdducterError;
use crate::time_range::TimeRange;

/// Read the spectra of `ms_level` acquired within `time_range` from `path` and bin them
/// into an [`IntensityMatrix`] with `builder`.
///
/// Spectra carrying neither signal arrays nor centroids are skipped.
pub fn read_intensity_matrix<P: AsRef<Path>>(
    path: P,
    time_range: TimeRange,
    ms_level: u8,
    mut builder: IntensityMatrixBuilder,
) -> Result<IntensityMatrix, MZAdducterError> {
    let reader = mzdata::MZReader::open_path(path.as_ref())?;
    let mut skipped = 0usize;
    for spectrum in reader {
        if spectrum.ms_level() != ms_level {
            continue;
        }
        let time = spectrum.start_time();
        if time < time_range.start {
            continue;
        }
        if time > time_range.end {
            break;
        }
        if let Some(arrays) = spectrum.arrays.as_ref() {
            let mzs = arrays.mzs()?;
            let intensities: Vec<f64> = arrays.intensities()?.iter().map(|i| *i as f64).collect();
            builder.add_scan(time, &mzs, &intensities);
        } else if let Some(peaks) = spectrum.peaks.as_ref() {
            let (mzs, intensities): (Vec<f64>, Vec<f64>) =
                peaks.iter().map(|p| (p.mz, p.intensity as f64)).unzip();
            builder.add_scan(time, &mzs, &intensities);
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        warn!("Skipped {skipped} spectra without signal");
    }
    debug!("Read {} MS{ms_level} spectra", builder.len());
    Ok(builder.build()?)
}

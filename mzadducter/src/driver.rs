use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use clap::parser::ValueSource;
use clap::{ArgMatches, FromArgMatches, Parser};
use figment::{providers::Serialized, value::Value, Figment};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use mzdata::spectrum::bindata::ArrayRetrievalError;

use mzadduct::{
    Adduct, ElementalIsotopicModel, ExtractionParams, Formula, FormulaError, IntensityMatrixBuilder,
    MatrixError, PeakFinder, PeakFinderError, PeakFinderParams,
};

use crate::args::{default_adducts, non_negative_float, ArgAdduct};
use crate::reader::read_intensity_matrix;
use crate::time_range::TimeRange;
use crate::write::{create_writer, OutputFormat, PeakRecord};

#[derive(Debug, Error)]
pub enum MZAdducterError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to read signal arrays: {0}")]
    ArrayRetrievalError(
        #[source]
        #[from]
        ArrayRetrievalError,
    ),
    #[error("Invalid analyte formula: {0}")]
    FormulaError(
        #[source]
        #[from]
        FormulaError,
    ),
    #[error("Failed to build the intensity matrix: {0}")]
    MatrixError(
        #[source]
        #[from]
        MatrixError,
    ),
    #[error("Peak finding failed: {0}")]
    PeakFinderError(
        #[source]
        #[from]
        PeakFinderError,
    ),
    #[error("Failed to read the configuration: {0}")]
    ConfigurationError(
        #[source]
        #[from]
        figment::Error,
    ),
    #[error("Failed to read the command line: {0}")]
    ArgumentError(
        #[source]
        #[from]
        clap::Error,
    ),
    #[error("Failed to configure logging: {0}")]
    LoggingError(String),
}

/// Find and quantify the chromatographic peaks of the adducts of an analyte.
///
/// Read an LC-MS run, extract the isotopologue masses of each adduct, and write out a
/// table of the peaks found.
#[derive(Parser, Debug, Clone, PartialEq, Deserialize, Serialize)]
#[command(author, version)]
#[serde(default)]
pub struct MZAdducter {
    /// The path to read the input spectra from
    #[arg()]
    pub input_file: String,

    /// The formula of the analyte, e.g. C12H11N
    #[arg(short = 'f', long = "formula")]
    pub analyte: String,

    /// An adduct to search for, either `plus-h`, `plus-sodium` or NAME:DELTA:OP.
    ///
    /// NAME is a label template holding one `%s` for the analyte, DELTA the formula added
    /// or removed and OP either `add` or `sub`, e.g. `[%s + K]⁺:K:add`.
    #[arg(
        short = 'a',
        long = "adduct",
        value_parser = ArgAdduct::from_str,
        default_values_t = default_adducts(),
    )]
    pub adducts: Vec<ArgAdduct>,

    /// The path to write the peak table to, or if '-' is passed, write to STDOUT
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// The format to write the peak table in
    #[arg(short = 'F', long = "output-format", default_value = "tsv")]
    pub output_format: OutputFormat,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mzadducter.toml` in the working directory.
    /// Environment variables prefixed with `MZADDUCTER_` will be read too.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// The time range to process, denoted (start?)-(stop?)
    #[arg(
        short='r',
        long="time-range",
        value_parser=TimeRange::from_str,
        value_name="BEGIN-END",
        long_help=r#"The time range to process, denoted (start?)-(stop?)

If a start is not specified, processing begins from the start of the run.
If a stop is not specified, processing stops at the end of the run.
"#
    )]
    pub time_range: Option<TimeRange>,

    /// The MS level of the spectra to build the intensity matrix from
    #[arg(long = "ms-level", default_value_t = 1)]
    pub ms_level: u8,

    /// The spacing of the intensity matrix's mass bins
    #[arg(long = "bin-interval", default_value_t = 1.0, value_parser = non_negative_float)]
    pub bin_interval: f64,

    /// How far below a mass bin's center a signal may lie and still be binned
    #[arg(long = "bin-left", default_value_t = 0.5, value_parser = non_negative_float)]
    pub bin_left: f64,

    /// How far above a mass bin's center a signal may lie and still be binned
    #[arg(long = "bin-right", default_value_t = 0.5, value_parser = non_negative_float)]
    pub bin_right: f64,

    /// How far below each adduct isotopologue mass a mass bin may lie
    #[arg(long = "left-tolerance", default_value_t = 0.1, value_parser = non_negative_float)]
    pub left_tolerance: f64,

    /// How far above each adduct isotopologue mass a mass bin may lie
    #[arg(long = "right-tolerance", default_value_t = 0.1, value_parser = non_negative_float)]
    pub right_tolerance: f64,

    /// Isotopologues with a fractional abundance at or below this are not extracted.
    ///
    /// The cutoff applies to the isotopic distribution before it is rescaled to the most
    /// abundant isotopologue
    #[arg(long = "min-abundance", default_value_t = 0.0, value_parser = non_negative_float)]
    pub min_abundance: f64,

    /// The number of scans a local maximum must dominate
    #[arg(short = 'p', long = "points", default_value_t = 3)]
    pub points: usize,

    /// The number of masses that must be above the noise level at a peak's apex
    #[arg(short = 'n', long = "min-ions", default_value_t = 2)]
    pub min_ions: usize,

    /// The number of scans a peak must span more than
    #[arg(long = "min-width", default_value_t = 3)]
    pub min_width: usize,

    /// The area a peak must exceed
    #[arg(long = "min-area", default_value_t = 1000.0, value_parser = non_negative_float)]
    pub min_area: f64,

    /// The fraction of a peak's accumulated area a scan must exceed to extend the peak
    #[arg(long = "boundary-tolerance", default_value_t = 0.00025, value_parser = non_negative_float)]
    pub boundary_tolerance: f64,

    /// The number of scans in each noise estimation window
    #[arg(long = "noise-window", default_value_t = 256)]
    pub noise_window: usize,
}

impl Default for MZAdducter {
    fn default() -> Self {
        let extraction = ExtractionParams::default();
        let params = PeakFinderParams::default();
        let binning = IntensityMatrixBuilder::default();
        Self {
            input_file: String::new(),
            analyte: String::new(),
            adducts: default_adducts(),
            output_file: PathBuf::from("-"),
            output_format: OutputFormat::default(),
            log_file: None,
            config_file: None,
            time_range: None,
            ms_level: 1,
            bin_interval: binning.bin_interval,
            bin_left: binning.bin_left,
            bin_right: binning.bin_right,
            left_tolerance: extraction.left_tolerance,
            right_tolerance: extraction.right_tolerance,
            min_abundance: extraction.min_abundance,
            points: params.points,
            min_ions: params.min_ions,
            min_width: params.min_width,
            min_area: params.min_area,
            boundary_tolerance: params.boundary_tolerance,
            noise_window: params.noise_window,
        }
    }
}

impl MZAdducter {
    /// Layer `config` over the built-in defaults, then the arguments given explicitly in
    /// `matches` over `config`.
    pub fn configure(matches: &ArgMatches, config: Figment) -> Result<Self, MZAdducterError> {
        let args = Self::from_arg_matches(matches)?;
        let explicit: figment::value::Dict = Value::serialize(&args)?
            .into_dict()
            .unwrap_or_default()
            .into_iter()
            .filter(|(id, _)| matches!(matches.value_source(id), Some(ValueSource::CommandLine)))
            .collect();
        debug!("Arguments given on the command line: {:?}", explicit.keys());
        let driver = Figment::from(Serialized::defaults(Self::default()))
            .merge(config)
            .merge(Serialized::defaults(explicit))
            .extract()?;
        Ok(driver)
    }

    pub fn adducts(&self) -> Vec<Adduct> {
        self.adducts.iter().map(|a| a.to_adduct()).collect()
    }

    pub fn extraction_params(&self) -> ExtractionParams {
        ExtractionParams::new(self.left_tolerance, self.right_tolerance, self.min_abundance)
    }

    pub fn peak_finder_params(&self) -> PeakFinderParams {
        PeakFinderParams {
            points: self.points,
            min_ions: self.min_ions,
            boundary_tolerance: self.boundary_tolerance,
            min_width: self.min_width,
            min_area: self.min_area,
            noise_window: self.noise_window,
        }
    }

    pub fn matrix_builder(&self) -> IntensityMatrixBuilder {
        IntensityMatrixBuilder::new(self.bin_interval, self.bin_left, self.bin_right)
    }

    pub fn main(&self) -> Result<(), MZAdducterError> {
        info!(
            "mzadducter v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Input: {}", self.input_file);
        info!("Output: {}", self.output_file.display());

        let analyte: Formula = self.analyte.parse()?;
        let adducts = self.adducts();
        let adduct_set = adducts.iter().map(|a| a.to_string()).join(";");
        info!("Analyte: {analyte} | Adducts: {adduct_set}");

        let im = read_intensity_matrix(
            &self.input_file,
            self.time_range.unwrap_or_default(),
            self.ms_level,
            self.matrix_builder(),
        )?;
        info!(
            "Intensity matrix: {} scans over {} masses",
            im.len(),
            im.mass_list().len()
        );
        if im.is_empty() {
            warn!("No MS{} spectra were found", self.ms_level);
        }

        let mut model = ElementalIsotopicModel::new();
        let e_im = self
            .extraction_params()
            .extract(&im, &analyte, &adducts, &mut model)?;
        debug!("Extracted {} masses", e_im.mass_list().len());

        let finder = PeakFinder::new(self.peak_finder_params());
        let mut writer = create_writer(&self.output_file, self.output_format)?;
        let mut n_peaks = 0usize;
        for peak in finder.find_peaks(&e_im) {
            writer.write_peak(&PeakRecord::new(&adduct_set, &peak))?;
            n_peaks += 1;
        }
        writer.flush()?;
        info!("Peaks: {n_peaks}");
        Ok(())
    }
}

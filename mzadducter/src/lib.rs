mod args;
mod driver;
mod reader;
mod time_range;
mod write;

pub use args::{ArgAdduct, ArgAdductParseError, BuiltinAdduct};
pub use driver::{MZAdducter, MZAdducterError};
pub use reader::read_intensity_matrix;
pub use time_range::{TimeRange, TimeRangeParseError};
pub use write::{create_writer, OutputFormat, PeakRecord, PeakWriter};

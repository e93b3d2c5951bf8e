use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use mzadduct::Peak;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tab separated values with a header row
    #[default]
    Tsv,
    /// One JSON object per line
    Json,
}

/// A flattened summary of one [`Peak`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeakRecord<'a> {
    pub adducts: &'a str,
    pub apex_time: f64,
    pub apex_index: usize,
    pub left_offset: usize,
    pub right_offset: usize,
    pub area: f64,
    pub base_peak_mass: Option<f64>,
    pub base_peak_intensity: Option<f64>,
}

impl<'a> PeakRecord<'a> {
    pub fn new(adducts: &'a str, peak: &Peak) -> Self {
        let base_peak = peak.apex_spectrum.base_peak();
        Self {
            adducts,
            apex_time: peak.apex_time,
            apex_index: peak.bounds.apex_index,
            left_offset: peak.bounds.left_offset,
            right_offset: peak.bounds.right_offset,
            area: peak.area,
            base_peak_mass: base_peak.map(|p| p.mass),
            base_peak_intensity: base_peak.map(|p| p.intensity),
        }
    }
}

pub trait PeakWriter {
    fn write_peak(&mut self, record: &PeakRecord) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

pub struct TsvPeakWriter<W: Write> {
    handle: csv::Writer<W>,
    wrote_header: bool,
}

impl<W: Write> TsvPeakWriter<W> {
    pub const HEADER: [&'static str; 8] = [
        "adducts",
        "apex_time",
        "apex_index",
        "left_offset",
        "right_offset",
        "area",
        "base_peak_mass",
        "base_peak_intensity",
    ];

    pub fn new(handle: W) -> Self {
        let handle = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(handle);
        Self {
            handle,
            wrote_header: false,
        }
    }

    /// The header is written even when no peaks are
    fn write_header(&mut self) -> io::Result<()> {
        if !self.wrote_header {
            self.handle.write_record(Self::HEADER)?;
            self.wrote_header = true;
        }
        Ok(())
    }
}

impl<W: Write> PeakWriter for TsvPeakWriter<W> {
    fn write_peak(&mut self, record: &PeakRecord) -> io::Result<()> {
        self.write_header()?;
        self.handle.serialize(record)?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_header()?;
        self.handle.flush()
    }
}

pub struct JsonLinesPeakWriter<W: Write> {
    handle: W,
}

impl<W: Write> JsonLinesPeakWriter<W> {
    pub fn new(handle: W) -> Self {
        Self { handle }
    }
}

impl<W: Write> PeakWriter for JsonLinesPeakWriter<W> {
    fn write_peak(&mut self, record: &PeakRecord) -> io::Result<()> {
        serde_json::to_writer(&mut self.handle, record)?;
        self.handle.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }
}

/// Open a [`PeakWriter`] over `path`, or STDOUT if `path` is `-`
pub fn create_writer(path: &Path, format: OutputFormat) -> io::Result<Box<dyn PeakWriter>> {
    let handle: Box<dyn Write> = if path == Path::new("-") {
        Box::new(io::BufWriter::new(io::stdout()))
    } else {
        Box::new(io::BufWriter::new(fs::File::create(path)?))
    };
    Ok(match format {
        OutputFormat::Tsv => Box::new(TsvPeakWriter::new(handle)),
        OutputFormat::Json => Box::new(JsonLinesPeakWriter::new(handle)),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use mzadduct::{MassSpectrum, PeakBounds};

    fn peak() -> Peak {
        Peak {
            apex_time: 12.5,
            apex_spectrum: MassSpectrum::new(&[170.1, 171.1], &[300.0, 40.0]),
            bounds: PeakBounds::new(2, 40, 3),
            area: 1500.0,
        }
    }

    fn read_tsv(buffer: &[u8]) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_reader(buffer)
            .records()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_tsv() -> io::Result<()> {
        let mut buffer = Vec::new();
        let mut writer = TsvPeakWriter::new(&mut buffer);
        let p = peak();
        writer.write_peak(&PeakRecord::new("[M + H]⁺", &p))?;
        writer.flush()?;
        drop(writer);
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], TsvPeakWriter::<Vec<u8>>::HEADER.join("\t"));
        assert_eq!(lines[1], "[M + H]⁺\t12.5\t40\t2\t3\t1500.0\t170.1\t300.0");
        Ok(())
    }

    #[test]
    fn test_tsv_quotes_labels() -> io::Result<()> {
        let mut buffer = Vec::new();
        let mut writer = TsvPeakWriter::new(&mut buffer);
        let p = peak();
        let label = "[M\t+ K]⁺;[M + \nNa]⁺";
        writer.write_peak(&PeakRecord::new(label, &p))?;
        writer.flush()?;
        drop(writer);
        let records = read_tsv(&buffer);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].len(), TsvPeakWriter::<Vec<u8>>::HEADER.len());
        assert_eq!(&records[1][0], label);
        assert_eq!(&records[1][5], "1500.0");
        Ok(())
    }

    #[test]
    fn test_tsv_header_without_peaks() -> io::Result<()> {
        let mut buffer = Vec::new();
        let mut writer = TsvPeakWriter::new(&mut buffer);
        writer.flush()?;
        drop(writer);
        let records = read_tsv(&buffer);
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "adducts");
        Ok(())
    }

    #[test]
    fn test_json() -> io::Result<()> {
        let mut buffer = Vec::new();
        let mut writer = JsonLinesPeakWriter::new(&mut buffer);
        let p = peak();
        writer.write_peak(&PeakRecord::new("[M + H]⁺", &p))?;
        writer.flush()?;
        drop(writer);
        let value: serde_json::Value = serde_json::from_slice(&buffer)?;
        assert_eq!(value["apex_index"], 40);
        assert_eq!(value["area"], 1500.0);
        assert_eq!(value["base_peak_mass"], 170.1);
        Ok(())
    }
}

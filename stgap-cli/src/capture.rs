//! Saleae Logic 2 SPI analyzer CSV capture parsing.
//!
//! The SPI analyzer must be configured for 16 bits per transfer, MSB first,
//! so every `result` row holds one STGAP word per direction (payload byte in
//! the high half, CRC byte in the low half).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use stgap_decoder::{SpiEvent, SpiWord};

/// Raw row from a Saleae Logic 2 SPI analyzer CSV export
#[derive(Debug, Clone, Deserialize)]
pub struct RawRow {
    pub name: String,
    #[serde(rename = "type")]
    pub row_type: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub start_time: f64,
    pub duration: f64,
    pub mosi: Option<String>,
    pub miso: Option<String>,
}

impl RawRow {
    /// Parse raw row into a decoder event
    ///
    /// Rows that carry no decoder event (`disable`, `error`, ...) yield `None`.
    pub fn parse(&self) -> Result<Option<SpiEvent>> {
        match self.row_type.as_str() {
            "enable" => Ok(Some(SpiEvent::Enable)),
            "result" => {
                let mosi = parse_word(self.mosi.as_deref(), "mosi")?;
                let miso = parse_word(self.miso.as_deref(), "miso")?;
                Ok(Some(SpiEvent::result(
                    mosi,
                    miso,
                    self.start_time,
                    self.start_time + self.duration,
                )))
            }
            other => {
                log::debug!("Skipping '{}' row at {:.9}", other, self.start_time);
                Ok(None)
            }
        }
    }
}

fn parse_word(value: Option<&str>, column: &str) -> Result<SpiWord> {
    let Some(text) = value.filter(|s| !s.trim().is_empty()) else {
        bail!("missing {} value", column);
    };
    SpiWord::parse(text).with_context(|| format!("Failed to parse {} value: {}", column, text))
}

/// CSV capture reader
pub struct CaptureReader<R: Read> {
    reader: csv::Reader<R>,
    analyzer: Option<String>,
}

impl CaptureReader<File> {
    /// Open a CSV capture file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open capture file: {:?}", path.as_ref()))?;
        Ok(Self::from_reader(file))
    }
}

impl<R: Read> CaptureReader<R> {
    /// Read a capture from any byte source
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader),
            analyzer: None,
        }
    }

    /// Only accept rows produced by the analyzer named `name`
    pub fn with_analyzer(mut self, name: Option<String>) -> Self {
        self.analyzer = name;
        self
    }

    /// Read and parse events in file order
    pub fn events(&mut self) -> impl Iterator<Item = Result<SpiEvent>> + '_ {
        let analyzer = self.analyzer.clone();
        self.reader
            .deserialize::<RawRow>()
            .enumerate()
            .filter_map(move |(index, result)| {
                // Line 1 is the header
                let line = index + 2;
                let row = match result {
                    Ok(row) => row,
                    Err(e) => {
                        return Some(Err(anyhow::Error::new(e)
                            .context(format!("Malformed capture row at line {}", line))))
                    }
                };
                if let Some(name) = &analyzer {
                    if &row.name != name {
                        return None;
                    }
                }
                match row.parse() {
                    Ok(Some(event)) => Some(Ok(event)),
                    Ok(None) => None,
                    Err(e) => {
                        Some(Err(e.context(format!("Invalid capture row at line {}", line))))
                    }
                }
            })
    }
}

/// Custom deserializer for timestamps that handles both numeric and ISO format
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TimeValue {
        Float(f64),
        String(String),
    }

    match TimeValue::deserialize(deserializer)? {
        TimeValue::Float(f) => Ok(f),
        TimeValue::String(s) => {
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&s) {
                // Seconds since the Unix epoch
                Ok(dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1_000_000_000.0)
            } else {
                s.parse::<f64>().map_err(D::Error::custom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "name,type,start_time,duration,mosi,miso\n";

    fn read_all(csv: &str) -> Result<Vec<SpiEvent>> {
        CaptureReader::from_reader(csv.as_bytes()).events().collect()
    }

    #[test]
    fn test_enable_and_result_rows() {
        let csv = format!(
            "{}{}{}{}",
            HEADER,
            "SPI,enable,0.0000100,0,,\n",
            "SPI,result,0.0000200,0.0000016,0xAC41,0x0000\n",
            "SPI,disable,0.0000300,0,,\n",
        );
        let events = read_all(&csv).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], SpiEvent::Enable);
        match events[1] {
            SpiEvent::Result {
                mosi,
                miso,
                start_time,
                end_time,
            } => {
                assert_eq!(mosi, SpiWord::new(0xAC, 0x41));
                assert_eq!(miso, SpiWord::new(0x00, 0x00));
                assert!((start_time - 0.00002).abs() < 1e-12);
                assert!((end_time - 0.0000216).abs() < 1e-12);
            }
            SpiEvent::Enable => panic!("expected a result event"),
        }
    }

    #[test]
    fn test_space_separated_bytes() {
        let csv = format!("{}{}", HEADER, "SPI,result,1.5,0.25,0x99 0xCA,0x00 0xF3\n");
        let events = read_all(&csv).unwrap();
        assert_eq!(
            events,
            vec![SpiEvent::result(
                SpiWord::new(0x99, 0xCA),
                SpiWord::new(0x00, 0xF3),
                1.5,
                1.75
            )]
        );
    }

    #[test]
    fn test_iso_timestamps() {
        let csv = format!(
            "{}{}",
            HEADER, "SPI,result,2024-01-01T00:00:00.5Z,0.25,0x000C,0x0000\n"
        );
        let events = read_all(&csv).unwrap();
        if let SpiEvent::Result { start_time, end_time, .. } = events[0] {
            assert_eq!(start_time, 1_704_067_200.5);
            assert_eq!(end_time, 1_704_067_200.75);
        } else {
            panic!("expected a result event");
        }
    }

    #[test]
    fn test_bad_word_reports_line() {
        let csv = format!(
            "{}{}{}",
            HEADER, "SPI,enable,0,0,,\n", "SPI,result,0.1,0.1,0xZZZZ,0x0000\n"
        );
        let err = read_all(&csv).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"), "{:#}", err);
    }

    #[test]
    fn test_missing_word_is_error() {
        let csv = format!("{}{}", HEADER, "SPI,result,0.1,0.1,,0x0000\n");
        assert!(read_all(&csv).is_err());
    }

    #[test]
    fn test_analyzer_filter() {
        let csv = format!(
            "{}{}{}",
            HEADER, "SPI,result,0.1,0.1,0x000C,0x0000\n", "Other,result,0.2,0.1,0x000C,0x0000\n"
        );
        let mut reader =
            CaptureReader::from_reader(csv.as_bytes()).with_analyzer(Some("Other".to_string()));
        let events: Vec<SpiEvent> = reader.events().collect::<Result<_>>().unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}SPI,enable,0,0,,", HEADER).unwrap();
        let mut reader = CaptureReader::open(file.path()).unwrap();
        assert_eq!(reader.events().count(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        assert!(CaptureReader::open("does-not-exist.csv").is_err());
    }
}

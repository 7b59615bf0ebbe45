//! Output formatting for decoded SPI words.

use crate::config::OutputFormat;
use anyhow::Result;
use std::io::Write;
use stgap_decoder::{DecodedResult, DecoderStats, Timestamp};

/// Output formatter configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub format: OutputFormat,
    pub show_raw: bool,
    pub use_relative_time: bool,
    pub start_time: Option<Timestamp>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Txt,
            show_raw: false,
            use_relative_time: true,
            start_time: None,
        }
    }
}

/// Streams decoded words to a writer in the configured format
pub struct ReportWriter<W: Write> {
    out: W,
    config: ReportConfig,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W, config: ReportConfig) -> Self {
        Self { out, config }
    }

    /// Begin a new capture; relative times restart from its first word
    pub fn start_capture(&mut self) {
        self.config.start_time = None;
    }

    pub fn write(&mut self, result: &DecodedResult) -> Result<()> {
        if self.config.use_relative_time && self.config.start_time.is_none() {
            self.config.start_time = Some(result.start_time);
        }
        let line = match self.config.format {
            OutputFormat::Txt => format_text(result, &self.config),
            OutputFormat::Json => serde_json::to_string(result)?,
        };
        writeln!(self.out, "{}", line)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Format one decoded word as a text line
pub fn format_text(result: &DecodedResult, config: &ReportConfig) -> String {
    let mut line = format!(
        "{} dev{} {}",
        format_timestamp(result.start_time, config),
        result.device,
        result.text
    );

    if config.show_raw {
        line.push_str(&format!("    [MOSI {} | MISO {}]", result.mosi, result.miso));
    }

    line
}

/// Format timestamp
fn format_timestamp(timestamp: Timestamp, config: &ReportConfig) -> String {
    let relative = match (config.use_relative_time, config.start_time) {
        (true, Some(start)) => timestamp - start,
        _ => timestamp,
    };
    format!("{:12.6}", relative)
}

/// One-line summary of a finished capture
pub fn summary_line(stats: &DecoderStats) -> String {
    format!(
        "{} words in {} cycles, chain length {}, {} CRC errors, {} unknown commands, {} unknown registers",
        stats.words,
        stats.cycles,
        stats.chain_length,
        stats.crc_errors,
        stats.unknown_commands,
        stats.unknown_registers
    )
}

use std::io::{self, BufWriter, Stdout, Write};

use dagmc_core::{ErrorInfo, McmcError};

use crate::config::OutputConfig;

/// Buffer size used for sample output.
pub const DEFAULT_BUFFER_SIZE: usize = 131_072;

/// Writes one delimited header row and then one row per sample.
///
/// With a concise symbol, a column whose value equals the previous sample's
/// value is written as the symbol instead.
pub struct SampleWriter<W: Write> {
    out: BufWriter<W>,
    delimiter: String,
    concise: Option<String>,
    flush_after_sample: bool,
    last: Option<Vec<String>>,
    samples_written: u64,
}

impl SampleWriter<Stdout> {
    /// Writer on standard output, flushed after every sample.
    pub fn stdout() -> Self {
        let mut writer = SampleWriter::new(io::stdout());
        writer.flush_after_sample = true;
        writer
    }
}

impl<W: Write> SampleWriter<W> {
    /// Tab-delimited writer over `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            out: BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, inner),
            delimiter: "\t".to_string(),
            concise: None,
            flush_after_sample: false,
            last: None,
            samples_written: 0,
        }
    }

    /// Writer over `inner` configured from an output section.
    pub fn from_config(inner: W, config: &OutputConfig) -> Result<Self, McmcError> {
        Ok(Self::new(inner)
            .with_delimiter(config.delimiter.clone())?
            .with_concise(config.concise_symbol.clone())
            .with_flush_after_sample(config.flush_after_sample))
    }

    /// Sets the column delimiter.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Result<Self, McmcError> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(McmcError::config("empty-delimiter", "sample delimiter must not be empty"));
        }
        self.delimiter = delimiter;
        Ok(self)
    }

    /// Enables or disables concise output.
    pub fn with_concise(mut self, symbol: Option<String>) -> Self {
        self.concise = symbol;
        self
    }

    /// Flushes the buffer after every sample row.
    pub fn with_flush_after_sample(mut self, flush: bool) -> Self {
        self.flush_after_sample = flush;
        self
    }

    /// Column delimiter.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Number of sample rows written so far.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Writes the header row.
    pub fn write_header(&mut self, headers: &[String]) -> Result<(), McmcError> {
        self.write_row(headers.iter().map(String::as_str))
            .map_err(|err| McmcError::io("sample-header", &err))
    }

    /// Writes one sample row.
    pub fn write_sample(&mut self, values: &[String]) -> Result<(), McmcError> {
        let previous = self.last.take();
        let symbol = self.concise.clone();
        let result = match (&symbol, &previous) {
            (Some(symbol), Some(last)) if last.len() == values.len() => {
                let row: Vec<&str> = values
                    .iter()
                    .zip(last.iter())
                    .map(|(value, prev)| if value == prev { symbol.as_str() } else { value.as_str() })
                    .collect();
                self.write_row(row.into_iter())
            }
            _ => self.write_row(values.iter().map(String::as_str)),
        };
        result.map_err(|err| McmcError::io("sample-write", &err))?;
        if self.concise.is_some() {
            self.last = Some(values.to_vec());
        }
        self.samples_written += 1;
        if self.flush_after_sample {
            self.flush()?;
        }
        Ok(())
    }

    /// Flushes buffered rows.
    pub fn flush(&mut self) -> Result<(), McmcError> {
        self.out.flush().map_err(|err| McmcError::io("sample-flush", &err))
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W, McmcError> {
        self.out.into_inner().map_err(|err| {
            McmcError::Io(
                ErrorInfo::new("sample-flush", err.error().to_string())
                    .with_context("kind", format!("{:?}", err.error().kind())),
            )
        })
    }

    fn write_row<'a>(&mut self, columns: impl Iterator<Item = &'a str>) -> io::Result<()> {
        for (idx, column) in columns.enumerate() {
            if idx > 0 {
                self.out.write_all(self.delimiter.as_bytes())?;
            }
            self.out.write_all(column.as_bytes())?;
        }
        self.out.write_all(b"\n")
    }
}

// result_sink.rs - Streaming persistence of extraction records
//
// Records are appended as they complete, in completion order. The output file
// is always created fresh (truncated), the header (CSV) is written at creation
// time, and buffered data is flushed every FLUSH_INTERVAL records and on
// finalize. Sinks are not synchronized: the dispatcher owns the only handle
// and writes from a single consumer task.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::record::ExtractionResult;

const FLUSH_INTERVAL: usize = 50;

/// Column headers of the CSV output, in `ExtractionResult::as_row` order.
pub const CSV_HEADER: [&str; 4] = ["URL", "ICP", "TechSupport", "Copyright"];

/// Destination for extraction records.
pub trait ResultSink: Send {
    /// Append one record.
    fn write_result(&mut self, result: &ExtractionResult) -> Result<()>;

    /// Flush everything written so far. Called once after the batch completes.
    fn finalize(&mut self) -> Result<()>;

    /// Number of records written so far.
    fn count(&self) -> usize;
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn write_result(&mut self, result: &ExtractionResult) -> Result<()> {
        (**self).write_result(result)
    }

    fn finalize(&mut self) -> Result<()> {
        (**self).finalize()
    }

    fn count(&self) -> usize {
        (**self).count()
    }
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Create the sink for `format` at `path`, replacing any existing file.
pub fn create_sink(format: OutputFormat, path: &Path) -> Result<Box<dyn ResultSink>> {
    Ok(match format {
        OutputFormat::Csv => Box::new(CsvResultSink::create(path)?),
        OutputFormat::Jsonl => Box::new(JsonLinesSink::create(path)?),
    })
}

fn create_output_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// CSV output with columns URL, ICP, TechSupport, Copyright.
pub struct CsvResultSink {
    writer: csv::Writer<BufWriter<File>>,
    path: PathBuf,
    count: usize,
    unflushed: usize,
}

impl CsvResultSink {
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(create_output_file(path)?);
        writer
            .write_record(CSV_HEADER)
            .context("Failed to write CSV header")?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            count: 0,
            unflushed: 0,
        })
    }
}

impl ResultSink for CsvResultSink {
    fn write_result(&mut self, result: &ExtractionResult) -> Result<()> {
        self.writer
            .write_record(result.as_row())
            .with_context(|| format!("Failed to write CSV row for {}", result.url))?;
        self.count += 1;
        self.unflushed += 1;

        if self.unflushed >= FLUSH_INTERVAL {
            self.finalize()?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        self.unflushed = 0;
        Ok(())
    }

    fn count(&self) -> usize {
        self.count
    }
}

/// One JSON object per line.
pub struct JsonLinesSink {
    writer: BufWriter<File>,
    path: PathBuf,
    count: usize,
    unflushed: usize,
}

impl JsonLinesSink {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self {
            writer: create_output_file(path)?,
            path: path.to_path_buf(),
            count: 0,
            unflushed: 0,
        })
    }
}

impl ResultSink for JsonLinesSink {
    fn write_result(&mut self, result: &ExtractionResult) -> Result<()> {
        let json = serde_json::to_string(result).context("Failed to serialize ExtractionResult")?;
        writeln!(self.writer, "{}", json)
            .with_context(|| format!("Failed to write JSON line for {}", result.url))?;
        self.count += 1;
        self.unflushed += 1;

        if self.unflushed >= FLUSH_INTERVAL {
            self.finalize()?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        self.unflushed = 0;
        Ok(())
    }

    fn count(&self) -> usize {
        self.count
    }
}

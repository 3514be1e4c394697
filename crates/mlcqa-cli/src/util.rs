use std::{
    fs::{self, File},
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use mlcqa_analysis::{config::AnalysisConfig, progress::ProgressSink};

/// Destination of a command's result: a file, or stdout when no path was given.
#[derive(Debug)]
pub enum Output {
    Stdout(StdoutLock<'static>),
    File { path: PathBuf, writer: BufWriter<File> },
}

impl Output {
    pub fn create(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Output::Stdout(io::stdout().lock()));
        };
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            path: path.to_owned(),
            writer: BufWriter::new(file),
        })
    }

    /// Human-readable destination for messages.
    pub fn target(&self) -> String {
        match self {
            Output::Stdout(_) => "stdout".to_owned(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    /// Writes `value` as pretty-printed JSON followed by a newline.
    pub fn write_json<T>(mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut self, value)
            .with_context(|| format!("Failed to write JSON to {}", self.target()))?;
        writeln!(self)
            .and_then(|()| self.flush())
            .with_context(|| format!("Failed to write output to {}", self.target()))
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(writer) => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(writer) => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

/// Loads an analysis configuration file. Missing fields take their defaults.
pub fn read_config_file(path: &Path) -> anyhow::Result<AnalysisConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read analysis config: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid analysis config JSON in {}", path.display()))
}

/// Forwards pipeline progress messages to the log.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, message: &str) {
        tracing::info!("{message}");
    }
}

/// Formats an optional millimeter value with 3 decimals, `N/A` if undefined.
pub fn format_mm(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_owned(), |v| format!("{v:.3}"))
}

//! The forward pipeline: parse → aggregate → statistics → ranking
//!
//! [`parse`] and [`analyze`] are the two entry points. Neither keeps state
//! between calls, and both report progress synchronously to the given sink.

use std::path::PathBuf;

use serde::Serialize;

use crate::{
    aggregate::{AggregatedSamples, aggregate_runs},
    config::AnalysisConfig,
    parser::{ParseError, ParsedRuns, parse_runs_file, parse_runs_str},
    progress::ProgressSink,
    ranking::Leaderboards,
    statistics::{AnalysisRow, compute_rows},
};

/// Samples of a parsed export, aligned across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedExport {
    pub samples: AggregatedSamples,
    pub run_count: usize,
}

/// Output of [`analyze`]: the per-leaf table and the three leaderboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub tolerance_mm: f64,
    pub rows: Vec<AnalysisRow>,
    pub leaderboards: Leaderboards,
}

impl Analysis {
    fn empty(tolerance_mm: f64) -> Self {
        Self {
            tolerance_mm,
            rows: vec![],
            leaderboards: Leaderboards::from_rows(&[]),
        }
    }

    pub fn out_of_tolerance(&self) -> impl Iterator<Item = &AnalysisRow> {
        self.rows.iter().filter(|r| r.out_of_tolerance)
    }
}

fn organize(parsed: &ParsedRuns, progress: &mut dyn ProgressSink) -> ParsedExport {
    if parsed.runs.is_empty() {
        progress.report("Warning: No data blocks parsed.");
        return ParsedExport::default();
    }

    let run_count = parsed.run_count();
    progress.report(&format!("Parsed data for {run_count} runs."));
    let samples = aggregate_runs(&parsed.runs, parsed.num_leaves);
    if samples.is_empty() {
        progress.report("Warning: No valid run data to organize.");
        return ParsedExport::default();
    }
    progress.report("CSV parsing complete.");
    ParsedExport { samples, run_count }
}

/// Reads an export file and aligns its samples across runs.
///
/// Fails only if the file cannot be read. An export without any run block
/// yields an empty result with a run count of 0.
pub fn parse<P>(
    path: P,
    config: &AnalysisConfig,
    progress: &mut dyn ProgressSink,
) -> Result<ParsedExport, ParseError>
where
    P: Into<PathBuf>,
{
    progress.report("Parsing CSV data...");
    let parsed = parse_runs_file(path, config, progress).inspect_err(|e| {
        progress.report(&format!("Failed to read or parse CSV: {e}"));
    })?;
    Ok(organize(&parsed, progress))
}

/// Like [`parse`], for export text already in memory.
pub fn parse_str(
    text: &str,
    config: &AnalysisConfig,
    progress: &mut dyn ProgressSink,
) -> ParsedExport {
    progress.report("Parsing CSV data...");
    let parsed = parse_runs_str(text, config, progress);
    organize(&parsed, progress)
}

/// Computes per-leaf statistics and leaderboards.
///
/// Returns empty structures when `run_count` is 0.
pub fn analyze(
    samples: &AggregatedSamples,
    run_count: usize,
    tolerance_mm: f64,
    progress: &mut dyn ProgressSink,
) -> Analysis {
    progress.report("Analyzing data...");
    if run_count == 0 {
        progress.report("No runs to analyze.");
        return Analysis::empty(tolerance_mm);
    }

    let rows = compute_rows(samples, tolerance_mm, progress);
    let leaderboards = Leaderboards::from_rows(&rows);
    tracing::debug!(
        rows = rows.len(),
        out_of_tolerance = rows.iter().filter(|r| r.out_of_tolerance).count(),
        "analysis complete"
    );
    progress.report("Data analysis complete.");
    Analysis {
        tolerance_mm,
        rows,
        leaderboards,
    }
}

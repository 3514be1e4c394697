use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use mlcqa_analysis::{ranking::Leaderboards, statistics::AnalysisRow};
use serde::Serialize;

use crate::{
    command::{AnalysisOutcome, InputArg},
    util::Output,
};

#[derive(Debug, Clone, Args)]
pub(crate) struct ExportArg {
    #[command(flatten)]
    pub input: InputArg,

    /// Output file path (stdout if omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Everything one analysis produced, as written by `export`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnalysisReport<'a> {
    pub metadata: ReportMetadata,
    pub rows: &'a [AnalysisRow],
    pub leaderboards: &'a Leaderboards,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReportMetadata {
    /// Export file the analysis was computed from
    pub source: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub run_count: usize,
    pub num_leaves: usize,
    pub tolerance_mm: f64,
    pub out_of_tolerance_count: usize,
}

impl<'a> AnalysisReport<'a> {
    fn new(source: PathBuf, outcome: &'a AnalysisOutcome, generated_at: DateTime<Utc>) -> Self {
        let analysis = &outcome.analysis;
        Self {
            metadata: ReportMetadata {
                source,
                generated_at,
                run_count: outcome.parsed.run_count,
                num_leaves: outcome.config.num_leaves,
                tolerance_mm: analysis.tolerance_mm,
                out_of_tolerance_count: analysis.out_of_tolerance().count(),
            },
            rows: &analysis.rows,
            leaderboards: &analysis.leaderboards,
        }
    }
}

pub(crate) fn run(arg: &ExportArg) -> anyhow::Result<()> {
    let outcome = arg.input.run_analysis()?;
    let report = AnalysisReport::new(arg.input.input.clone(), &outcome, Utc::now());
    Output::create(arg.output.as_deref())?.write_json(&report)?;
    if let Some(path) = &arg.output {
        tracing::info!("Analysis exported to {}", path.display());
    }
    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use mlcqa_analysis::matrix::{BankLeafMatrix, MatrixMetric};

use crate::{command::InputArg, util::Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct MatrixArg {
    #[command(flatten)]
    pub input: InputArg,

    /// Statistic to pivot: deviation, stddev or range
    #[arg(long, default_value = "deviation")]
    pub metric: MatrixMetric,

    /// Output CSV file path (stdout if omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &MatrixArg) -> anyhow::Result<()> {
    let outcome = arg.input.run_analysis()?;
    let matrix = BankLeafMatrix::from_rows(
        arg.metric,
        &outcome.analysis.rows,
        outcome.config.num_leaves,
    );
    if matrix.rows.is_empty() {
        tracing::warn!("no bank data, writing header only");
    }

    let mut output = Output::create(arg.output.as_deref())?;
    matrix
        .write_csv(&mut output)
        .with_context(|| format!("Failed to write matrix CSV to {}", output.target()))?;
    tracing::info!(
        "{} matrix ({} banks x {} leaves) written to {}",
        matrix.metric,
        matrix.rows.len(),
        matrix.num_leaves,
        output.target()
    );
    Ok(())
}

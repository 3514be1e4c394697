//! Text report
//!
//! Prints the out-of-tolerance table, a short summary of the accuracy and
//! reproducibility distributions, and the top entries of each leaderboard.

use std::{
    io::{self, Write},
    path::Path,
};

use anyhow::Context;
use clap::Args;
use mlcqa_analysis::{Analysis, ranking::Leaderboard};
use mlcqa_stats::{descriptive::DescriptiveStats, percentiles::Percentiles};

use crate::{
    command::{AnalysisOutcome, InputArg},
    util::format_mm,
};

#[derive(Debug, Clone, Args)]
pub(crate) struct ReportArg {
    #[command(flatten)]
    pub input: InputArg,

    /// Number of leaves to list per leaderboard
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

pub(crate) fn run(arg: &ReportArg) -> anyhow::Result<()> {
    let outcome = arg.input.run_analysis()?;
    let mut stdout = io::stdout().lock();
    write_report(&mut stdout, &arg.input.input, &outcome, arg.top)
        .and_then(|()| stdout.flush())
        .context("Failed to write report to stdout")?;
    Ok(())
}

fn write_report<W>(
    w: &mut W,
    source: &Path,
    outcome: &AnalysisOutcome,
    top: usize,
) -> io::Result<()>
where
    W: Write,
{
    let analysis = &outcome.analysis;
    writeln!(w, "MLC QA Report")?;
    writeln!(w, "=============")?;
    writeln!(w, "Source:    {}", source.display())?;
    writeln!(w, "Runs:      {}", outcome.parsed.run_count)?;
    writeln!(w, "Tolerance: {:.3} mm", analysis.tolerance_mm)?;
    writeln!(w)?;

    if analysis.rows.is_empty() {
        writeln!(w, "No leaf data to report.")?;
        return Ok(());
    }

    write_out_of_tolerance(w, analysis)?;
    writeln!(w)?;
    write_summary(w, analysis)?;
    for board in analysis.leaderboards.iter() {
        writeln!(w)?;
        write_leaderboard(w, board, top)?;
    }
    Ok(())
}

fn write_out_of_tolerance<W>(w: &mut W, analysis: &Analysis) -> io::Result<()>
where
    W: Write,
{
    writeln!(
        w,
        "Out-of-Tolerance Leaves (|deviation| > {:.3} mm)",
        analysis.tolerance_mm
    )?;
    let rows = analysis.out_of_tolerance().collect::<Vec<_>>();
    if rows.is_empty() {
        writeln!(w, "  None")?;
        return Ok(());
    }

    writeln!(
        w,
        "  {:<20} {:>6} {:>8} {:>10} {:>10}",
        "Bank", "Leaf", "Nominal", "Mean", "Deviation"
    )?;
    writeln!(w, "  {}", "-".repeat(58))?;
    for row in rows {
        writeln!(
            w,
            "  {:<20} {:>6} {:>8} {:>10} {:>10}",
            row.bank,
            row.leaf_id,
            row.nominal_mm,
            format_mm(row.mean_mm),
            format_mm(row.deviation_mm),
        )?;
    }
    Ok(())
}

fn write_summary<W>(w: &mut W, analysis: &Analysis) -> io::Result<()>
where
    W: Write,
{
    writeln!(w, "Summary")?;
    writeln!(
        w,
        "  {:<20} {:>6} {:>8} {:>8} {:>8} {:>8}",
        "Statistic (mm)", "Leaves", "Mean", "P50", "P95", "Max"
    )?;
    writeln!(w, "  {}", "-".repeat(63))?;

    let columns = [
        (
            "|Deviation|",
            analysis
                .rows
                .iter()
                .filter_map(|r| r.abs_deviation_mm())
                .collect::<Vec<_>>(),
        ),
        (
            "Std. Deviation",
            analysis
                .rows
                .iter()
                .filter_map(|r| r.std_dev_mm)
                .collect::<Vec<_>>(),
        ),
    ];
    for (name, values) in columns {
        let Some(stats) = DescriptiveStats::new(values.iter().copied()) else {
            writeln!(w, "  {name:<20} {:>6} {:>8} {:>8} {:>8} {:>8}", 0, "N/A", "N/A", "N/A", "N/A")?;
            continue;
        };
        let percentiles = Percentiles::new(&values, &[50.0, 95.0]);
        writeln!(
            w,
            "  {name:<20} {:>6} {:>8} {:>8} {:>8} {:>8}",
            stats.count,
            format_mm(Some(stats.mean)),
            format_mm(percentiles.get(50.0)),
            format_mm(percentiles.get(95.0)),
            format_mm(Some(stats.max)),
        )?;
    }
    Ok(())
}

fn write_leaderboard<W>(w: &mut W, board: &Leaderboard, top: usize) -> io::Result<()>
where
    W: Write,
{
    writeln!(w, "Top {top} by {}", board.key)?;
    if board.is_empty() {
        writeln!(w, "  None")?;
        return Ok(());
    }
    writeln!(w, "  {:>4} {:>6} {:<20} {:>10}", "Rank", "Leaf", "Bank", "Value")?;
    writeln!(w, "  {}", "-".repeat(43))?;
    for (rank, entry) in board.top(top).iter().enumerate() {
        writeln!(
            w,
            "  {:>4} {:>6} {:<20} {:>10.3}",
            rank + 1,
            entry.leaf_id,
            entry.bank,
            entry.value
        )?;
    }
    Ok(())
}

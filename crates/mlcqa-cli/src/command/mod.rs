use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mlcqa_analysis::{Analysis, ParsedExport, analyze, config::AnalysisConfig, parse};

use crate::{
    logging,
    util::{self, LogProgress},
};

use self::{export::ExportArg, matrix::MatrixArg, report::ReportArg};

mod export;
mod matrix;
mod report;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Increase log verbosity (-v: debug, -vv: trace). `RUST_LOG` overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// What to produce from the export
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Print out-of-tolerance leaves and worst-offender leaderboards
    Report(#[clap(flatten)] ReportArg),
    /// Write the full per-leaf analysis as JSON
    Export(#[clap(flatten)] ExportArg),
    /// Write a bank x leaf matrix of one statistic as CSV
    Matrix(#[clap(flatten)] MatrixArg),
}

/// Input file and analysis parameters shared by all subcommands.
#[derive(Debug, Clone, Args)]
pub(crate) struct InputArg {
    /// Path to the MLC QA export CSV file
    pub input: PathBuf,

    /// Analysis configuration JSON file; command-line flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Out-of-tolerance threshold in mm [default: 1.0]
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Number of leaves per bank [default: 80]
    #[arg(long)]
    pub leaves: Option<usize>,
}

impl InputArg {
    pub(crate) fn load_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_config_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(tolerance_mm) = self.tolerance {
            config.tolerance_mm = tolerance_mm;
        }
        if let Some(num_leaves) = self.leaves {
            config.num_leaves = num_leaves;
        }
        config.validate().context("Invalid analysis configuration")?;
        Ok(config)
    }

    /// Runs the whole pipeline on the input file.
    pub(crate) fn run_analysis(&self) -> anyhow::Result<AnalysisOutcome> {
        let config = self.load_config()?;
        let mut progress = LogProgress;
        let parsed = parse(&self.input, &config, &mut progress)?;
        let analysis = analyze(
            &parsed.samples,
            parsed.run_count,
            config.tolerance_mm,
            &mut progress,
        );
        Ok(AnalysisOutcome {
            config,
            parsed,
            analysis,
        })
    }
}

#[derive(Debug)]
pub(crate) struct AnalysisOutcome {
    pub config: AnalysisConfig,
    pub parsed: ParsedExport,
    pub analysis: Analysis,
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    logging::init(args.verbose)?;
    match args.mode {
        Mode::Report(arg) => report::run(&arg)?,
        Mode::Export(arg) => export::run(&arg)?,
        Mode::Matrix(arg) => matrix::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn input_arg(config: Option<PathBuf>, tolerance: Option<f64>) -> InputArg {
        InputArg {
            input: PathBuf::from("export.csv"),
            config,
            tolerance,
            leaves: None,
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = CommandArgs::try_parse_from([
            "mlcqa", "-vv", "matrix", "qa.csv", "--metric", "range", "--tolerance", "0.5",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        assert!(matches!(args.mode, Mode::Matrix(_)));

        assert!(CommandArgs::try_parse_from(["mlcqa", "report"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "tolerance_mm": 0.5, "num_leaves": 60 }"#).unwrap();

        let config = input_arg(Some(path.clone()), None).load_config().unwrap();
        assert_eq!(config.tolerance_mm, 0.5);
        assert_eq!(config.num_leaves, 60);
        assert_eq!(config.bank_labels.len(), 10);

        let config = input_arg(Some(path), Some(2.0)).load_config().unwrap();
        assert_eq!(config.tolerance_mm, 2.0);
        assert_eq!(config.num_leaves, 60);
    }

    #[test]
    fn test_invalid_tolerance_is_rejected() {
        assert!(input_arg(None, Some(-1.0)).load_config().is_err());
        assert!(input_arg(None, Some(f64::NAN)).load_config().is_err());
    }
}

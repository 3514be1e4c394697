//! Accuracy and reproducibility analysis of MLC leaf-position QA exports
//!
//! A QA export contains the same leaf-bank positioning test repeated N times.
//! This crate turns such an export into per-leaf statistics and three
//! worst-offender leaderboards.
//!
//! # Pipeline
//!
//! 1. **Parse** ([`parser`]): split the export into run blocks and extract one
//!    leaf-position vector per recognized bank per run
//! 2. **Aggregate** ([`aggregate`]): align same-bank, same-leaf samples across runs
//! 3. **Statistics** ([`statistics`]): mean, deviation from nominal, population
//!    standard deviation, range and tolerance flag per leaf
//! 4. **Rank** ([`ranking`]): leaderboards by |deviation|, standard deviation and range
//!
//! [`matrix`] additionally pivots the per-leaf table into bank × leaf matrices
//! for heatmap rendering.
//!
//! Only an unreadable input file is an error. Malformed rows, unparsable values
//! and unknown setpoints degrade to missing data and are reported through a
//! [`ProgressSink`](progress::ProgressSink).
//!
//! # Examples
//!
//! ```
//! use mlcqa_analysis::{analyze, config::AnalysisConfig, parse_str};
//!
//! let export = "\
//! Name,Value,Unit,Type,InputId
//! Left MLC Bank +20,20.1,18.0,mm,String,1
//! ,,,,
//! Name,Value,Unit,Type,InputId
//! Left MLC Bank +20,20.3,19.0,mm,String,1
//! ";
//! let config = AnalysisConfig {
//!     num_leaves: 2,
//!     ..AnalysisConfig::default()
//! };
//!
//! let mut messages = Vec::new();
//! let parsed = parse_str(export, &config, &mut messages);
//! assert_eq!(parsed.run_count, 2);
//!
//! let analysis = analyze(&parsed.samples, parsed.run_count, config.tolerance_mm, &mut messages);
//! let worst = &analysis.leaderboards.spread.entries[0];
//! assert_eq!(worst.leaf_id, "L2");
//! assert!(analysis.rows[1].out_of_tolerance);
//! ```

pub use self::pipeline::{Analysis, ParsedExport, analyze, parse, parse_str};

pub mod aggregate;
pub mod bank;
pub mod config;
pub mod matrix;
pub mod parser;
mod pipeline;
pub mod progress;
pub mod ranking;
pub mod statistics;

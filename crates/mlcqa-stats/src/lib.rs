//! Statistical utilities for MLC leaf-position analysis.
//!
//! - [`descriptive`]: mean, population standard deviation and peak-to-peak range
//! - [`percentiles`]: nearest-rank percentile computation and storage
//!
//! # Examples
//!
//! ```
//! use mlcqa_stats::descriptive::DescriptiveStats;
//!
//! let runs = [20.1, 20.3, 19.9, 20.0, 20.2];
//! let stats = DescriptiveStats::new(runs).unwrap();
//! assert!((stats.mean - 20.1).abs() < 1e-9);
//! assert!((stats.range - 0.4).abs() < 1e-9);
//! ```

pub mod descriptive;
pub mod percentiles;

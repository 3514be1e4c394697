//! Per-leaf accuracy and reproducibility statistics
//!
//! For every leaf of every bank the valid (non-missing) samples are summarized:
//!
//! | valid samples | mean       | deviation         | std dev    | range       |
//! |---------------|------------|-------------------|------------|-------------|
//! | 0             | undefined  | undefined         | undefined  | undefined   |
//! | 1             | the value  | value − nominal   | 0          | 0           |
//! | ≥ 2           | mean       | mean − nominal    | population | max − min   |
//!
//! A leaf is out of tolerance when its deviation is defined and
//! `|deviation| > tolerance`.

use mlcqa_stats::descriptive::DescriptiveStats;
use serde::Serialize;

use crate::{
    aggregate::AggregatedSamples,
    bank::{extract_nominal, leaf_id},
    progress::ProgressSink,
};

/// Statistics of one leaf of one bank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    pub bank: String,
    /// 0-based leaf index.
    pub leaf_index: usize,
    /// Display ID, e.g. `L3` or `R77`.
    pub leaf_id: String,
    pub nominal_mm: i64,
    /// Valid measurements in run order.
    pub measurements: Vec<f64>,
    pub mean_mm: Option<f64>,
    pub std_dev_mm: Option<f64>,
    pub deviation_mm: Option<f64>,
    pub range_mm: Option<f64>,
    pub out_of_tolerance: bool,
}

impl AnalysisRow {
    #[must_use]
    pub fn num_valid_runs(&self) -> usize {
        self.measurements.len()
    }

    /// `|deviation|`, the inaccuracy of the leaf.
    #[must_use]
    pub fn abs_deviation_mm(&self) -> Option<f64> {
        self.deviation_mm.map(f64::abs)
    }
}

#[expect(clippy::cast_precision_loss)]
fn leaf_row(
    bank: &str,
    leaf_index: usize,
    nominal: i64,
    samples: &[Option<f64>],
    tolerance_mm: f64,
) -> AnalysisRow {
    let measurements = samples.iter().flatten().copied().collect::<Vec<_>>();
    let stats = DescriptiveStats::new(measurements.iter().copied());

    let mean_mm = stats.as_ref().map(|s| s.mean);
    let deviation_mm = mean_mm.map(|mean| mean - nominal as f64);
    let out_of_tolerance = deviation_mm.is_some_and(|d| d.abs() > tolerance_mm);

    AnalysisRow {
        bank: bank.to_owned(),
        leaf_index,
        leaf_id: leaf_id(bank, leaf_index),
        nominal_mm: nominal,
        measurements,
        mean_mm,
        std_dev_mm: stats.as_ref().map(|s| s.std_dev),
        deviation_mm,
        range_mm: stats.as_ref().map(|s| s.range),
        out_of_tolerance,
    }
}

/// Computes one [`AnalysisRow`] per (bank, leaf).
///
/// Banks whose nominal setpoint cannot be derived from the label are skipped
/// with a diagnostic; the remaining banks are still analyzed.
pub fn compute_rows(
    samples: &AggregatedSamples,
    tolerance_mm: f64,
    progress: &mut dyn ProgressSink,
) -> Vec<AnalysisRow> {
    let mut rows = Vec::with_capacity(samples.banks.len() * samples.num_leaves);
    for bank in &samples.banks {
        let nominal = match extract_nominal(&bank.label) {
            Ok(nominal) => nominal,
            Err(e) => {
                tracing::debug!(bank = %bank.label, error = %e, "bank skipped");
                progress.report(&format!("Skipping bank '{}': {e}", bank.label));
                continue;
            }
        };
        rows.extend(bank.leaves.iter().enumerate().map(|(leaf_index, leaf)| {
            leaf_row(&bank.label, leaf_index, nominal, leaf, tolerance_mm)
        }));
    }
    rows
}

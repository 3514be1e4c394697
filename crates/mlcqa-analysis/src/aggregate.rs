//! Cross-run aggregation
//!
//! Reorganizes run-major parser output into bank → leaf → run samples. The set
//! of banks is fixed by the first run: a bank that only shows up in later runs
//! is dropped.

use crate::parser::RunBlock;

/// Samples of every leaf of one bank, one entry per run (`None` = missing).
#[derive(Debug, Clone, PartialEq)]
pub struct BankSamples {
    pub label: String,
    /// Indexed by leaf; each inner vector is indexed by run.
    pub leaves: Vec<Vec<Option<f64>>>,
}

/// Per-bank, per-leaf sample sets aligned across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedSamples {
    pub num_leaves: usize,
    pub run_count: usize,
    /// Banks in the order they appeared in the first run.
    pub banks: Vec<BankSamples>,
}

impl AggregatedSamples {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    #[must_use]
    pub fn bank(&self, label: &str) -> Option<&BankSamples> {
        self.banks.iter().find(|b| b.label == label)
    }
}

/// Aligns same-bank, same-leaf samples of all runs.
///
/// A run that lacks a bank, or whose vector is shorter than `num_leaves`,
/// contributes `None` for the affected leaves.
#[must_use]
pub fn aggregate_runs(runs: &[RunBlock], num_leaves: usize) -> AggregatedSamples {
    let Some(first) = runs.first() else {
        return AggregatedSamples::default();
    };
    if first.is_empty() {
        return AggregatedSamples::default();
    }

    for (run_idx, run) in runs.iter().enumerate().skip(1) {
        for label in run.labels().filter(|l| first.get(l).is_none()) {
            tracing::debug!(
                run = run_idx + 1,
                bank = label,
                "bank missing from run 1, samples dropped"
            );
        }
    }

    let banks = first
        .labels()
        .map(|label| {
            let leaves = (0..num_leaves)
                .map(|leaf_idx| {
                    runs.iter()
                        .map(|run| run.get(label).and_then(|v| v.get(leaf_idx)))
                        .collect()
                })
                .collect();
            BankSamples {
                label: label.to_owned(),
                leaves,
            }
        })
        .collect();

    AggregatedSamples {
        num_leaves,
        run_count: runs.len(),
        banks,
    }
}

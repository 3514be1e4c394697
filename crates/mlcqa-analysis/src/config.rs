//! Analysis parameters
//!
//! All tunables of a pipeline invocation live in [`AnalysisConfig`]; nothing is
//! global. The struct deserializes from a partial JSON document, with missing
//! fields taking their defaults:
//!
//! ```json
//! { "tolerance_mm": 0.5 }
//! ```

use serde::{Deserialize, Serialize};

use crate::bank::{DEFAULT_BANK_LABELS, DEFAULT_NUM_LEAVES};

/// Default out-of-tolerance threshold in mm.
pub const DEFAULT_TOLERANCE_MM: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// A leaf is out of tolerance when `|deviation| > tolerance_mm`.
    pub tolerance_mm: f64,
    /// Number of leaves per bank; every leaf-position vector is normalized to this length.
    pub num_leaves: usize,
    /// Row labels treated as leaf banks. Rows with any other first cell are ignored.
    pub bank_labels: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tolerance_mm: DEFAULT_TOLERANCE_MM,
            num_leaves: DEFAULT_NUM_LEAVES,
            bank_labels: DEFAULT_BANK_LABELS.iter().map(|&s| s.to_owned()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("tolerance must be a finite, non-negative number of mm (got {tolerance_mm})")]
    InvalidTolerance { tolerance_mm: f64 },
    #[display("number of leaves per bank must be at least 1")]
    NoLeaves,
    #[display("at least one bank label must be configured")]
    NoBankLabels,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance_mm.is_finite() || self.tolerance_mm < 0.0 {
            return Err(ConfigError::InvalidTolerance {
                tolerance_mm: self.tolerance_mm,
            });
        }
        if self.num_leaves == 0 {
            return Err(ConfigError::NoLeaves);
        }
        if self.bank_labels.is_empty() {
            return Err(ConfigError::NoBankLabels);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_bank_label(&self, label: &str) -> bool {
        self.bank_labels.iter().any(|l| l == label)
    }
}

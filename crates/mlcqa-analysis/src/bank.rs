//! Bank labels, nominal setpoints and leaf identifiers
//!
//! A bank label such as `Left MLC Bank -20` encodes two things: the side of the
//! collimator (used for the leaf ID prefix) and the commanded setpoint in mm
//! (the trailing signed integer).

use std::sync::LazyLock;

use regex::Regex;

/// Number of leaves per bank on the supported collimator.
pub const DEFAULT_NUM_LEAVES: usize = 80;

/// Bank labels recognized in a QA export, in the order the device writes them.
pub const DEFAULT_BANK_LABELS: [&str; 10] = [
    "Left MLC Bank +20",
    "Left MLC Bank +60",
    "Left MLC Bank 100",
    "Left MLC Bank -20",
    "Left MLC Bank -60",
    "Right MLC Bank +20",
    "Right MLC Bank +60",
    "Right MLC Bank 100",
    "Right MLC Bank -20",
    "Right MLC Bank -60",
];

static TRAILING_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?[0-9]+$").expect("trailing integer pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum NominalError {
    #[display("could not extract nominal value from bank name: {label}")]
    InvalidBankName { label: String },
}

/// Extracts the commanded setpoint (mm) from a bank label.
///
/// The setpoint is the signed integer at the very end of the label. Labels of
/// the `... Bank 100 ...` form without a trailing number resolve to `100`.
///
/// ```
/// use mlcqa_analysis::bank::extract_nominal;
///
/// assert_eq!(extract_nominal("Right MLC Bank -60"), Ok(-60));
/// assert_eq!(extract_nominal("Left MLC Bank +20"), Ok(20));
/// assert!(extract_nominal("Left MLC Bank").is_err());
/// ```
pub fn extract_nominal(label: &str) -> Result<i64, NominalError> {
    if let Some(value) = TRAILING_INTEGER
        .find(label)
        .and_then(|m| m.as_str().parse::<i64>().ok())
    {
        return Ok(value);
    }
    if label.contains("100") && label.contains("Bank 100") {
        return Ok(100);
    }
    Err(NominalError::InvalidBankName {
        label: label.to_owned(),
    })
}

/// Returns `true` if the label belongs to the left-hand bank.
#[must_use]
pub fn is_left_bank(label: &str) -> bool {
    label.contains("Left")
}

/// Display ID of a leaf: `L`/`R` followed by the 1-based leaf number.
///
/// The side is taken from the label text only, never from the setpoint.
#[must_use]
pub fn leaf_id(label: &str, leaf_index: usize) -> String {
    let prefix = if is_left_bank(label) { 'L' } else { 'R' };
    format!("{prefix}{}", leaf_index + 1)
}

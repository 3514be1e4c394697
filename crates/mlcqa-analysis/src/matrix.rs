//! Bank × leaf matrices of a single statistic
//!
//! This is the data behind a heatmap: one row per bank, one column per leaf.
//! Banks are ordered left side first, then by ascending nominal setpoint.

use std::io;

use serde::Serialize;

use crate::{bank::is_left_bank, statistics::AnalysisRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::FromStr, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum MatrixMetric {
    #[display("Deviation (mm)")]
    Deviation,
    #[display("Std Dev (mm)")]
    StdDev,
    #[display("Range (mm)")]
    Range,
}

impl MatrixMetric {
    #[must_use]
    pub fn value_of(self, row: &AnalysisRow) -> Option<f64> {
        match self {
            MatrixMetric::Deviation => row.deviation_mm,
            MatrixMetric::StdDev => row.std_dev_mm,
            MatrixMetric::Range => row.range_mm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub bank: String,
    pub nominal_mm: i64,
    /// Indexed by leaf; `None` where the statistic is undefined.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankLeafMatrix {
    pub metric: MatrixMetric,
    pub num_leaves: usize,
    pub rows: Vec<MatrixRow>,
}

impl BankLeafMatrix {
    #[must_use]
    pub fn from_rows(metric: MatrixMetric, rows: &[AnalysisRow], num_leaves: usize) -> Self {
        let mut matrix_rows: Vec<MatrixRow> = vec![];
        for row in rows {
            let idx = match matrix_rows.iter().position(|r| r.bank == row.bank) {
                Some(idx) => idx,
                None => {
                    matrix_rows.push(MatrixRow {
                        bank: row.bank.clone(),
                        nominal_mm: row.nominal_mm,
                        values: vec![None; num_leaves],
                    });
                    matrix_rows.len() - 1
                }
            };
            if let Some(cell) = matrix_rows[idx].values.get_mut(row.leaf_index) {
                *cell = metric.value_of(row);
            }
        }
        matrix_rows.sort_by_key(|r| (!is_left_bank(&r.bank), r.nominal_mm));
        Self {
            metric,
            num_leaves,
            rows: matrix_rows,
        }
    }

    /// Writes the matrix as CSV: a `bank` column followed by leaf numbers `1..=num_leaves`.
    /// Undefined cells are left empty.
    pub fn write_csv<W>(&self, writer: W) -> Result<(), csv::Error>
    where
        W: io::Write,
    {
        let mut writer = csv::Writer::from_writer(writer);
        let mut header = vec!["bank".to_owned()];
        header.extend((1..=self.num_leaves).map(|n| n.to_string()));
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.bank.clone()];
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(bank: &str, nominal: i64, leaf_index: usize, deviation: Option<f64>) -> AnalysisRow {
        AnalysisRow {
            bank: bank.to_owned(),
            leaf_index,
            leaf_id: String::new(),
            nominal_mm: nominal,
            measurements: vec![],
            mean_mm: None,
            std_dev_mm: deviation.map(f64::abs),
            deviation_mm: deviation,
            range_mm: None,
            out_of_tolerance: false,
        }
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("deviation".parse::<MatrixMetric>().ok(), Some(MatrixMetric::Deviation));
        assert_eq!("stddev".parse::<MatrixMetric>().ok(), Some(MatrixMetric::StdDev));
        assert_eq!("Range".parse::<MatrixMetric>().ok(), Some(MatrixMetric::Range));
        assert!("heat".parse::<MatrixMetric>().is_err());
    }

    #[test]
    fn test_bank_order_left_first_then_nominal() {
        let rows = [
            row("Right MLC Bank -20", -20, 0, Some(0.1)),
            row("Left MLC Bank 100", 100, 0, Some(0.2)),
            row("Left MLC Bank -60", -60, 0, Some(0.3)),
            row("Right MLC Bank -60", -60, 0, Some(0.4)),
        ];
        let matrix = BankLeafMatrix::from_rows(MatrixMetric::Deviation, &rows, 2);
        let banks = matrix.rows.iter().map(|r| r.bank.as_str()).collect::<Vec<_>>();
        assert_eq!(
            banks,
            [
                "Left MLC Bank -60",
                "Left MLC Bank 100",
                "Right MLC Bank -60",
                "Right MLC Bank -20"
            ]
        );
        assert_eq!(matrix.rows[0].values, [Some(0.3), None]);
    }

    #[test]
    fn test_csv_output() {
        let rows = [
            row("Left MLC Bank +20", 20, 0, Some(-1.5)),
            row("Left MLC Bank +20", 20, 2, None),
            row("Left MLC Bank +20", 20, 1, Some(0.25)),
        ];
        let matrix = BankLeafMatrix::from_rows(MatrixMetric::StdDev, &rows, 3);
        let mut out = Vec::new();
        matrix.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "bank,1,2,3\nLeft MLC Bank +20,1.5,0.25,\n"
        );
    }
}

//! Worst-offender leaderboards
//!
//! Each leaderboard ranks leaves by one key in descending order. Leaves whose
//! key is undefined are left out, and leaves with equal keys keep the order of
//! the analysis rows.

use serde::Serialize;

use crate::statistics::AnalysisRow;

/// The statistic a leaderboard ranks by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum RankingKey {
    /// `|deviation|` from nominal.
    #[display("Abs. Deviation (mm)")]
    Inaccuracy,
    /// Standard deviation across runs.
    #[display("Std. Deviation (mm)")]
    Imprecision,
    /// Peak-to-peak range across runs.
    #[display("Range (mm)")]
    Spread,
}

impl RankingKey {
    #[must_use]
    pub fn value_of(self, row: &AnalysisRow) -> Option<f64> {
        match self {
            RankingKey::Inaccuracy => row.abs_deviation_mm(),
            RankingKey::Imprecision => row.std_dev_mm,
            RankingKey::Spread => row.range_mm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub leaf_id: String,
    pub bank: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub key: RankingKey,
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    #[must_use]
    pub fn from_rows(key: RankingKey, rows: &[AnalysisRow]) -> Self {
        let mut entries = rows
            .iter()
            .filter_map(|row| {
                key.value_of(row)
                    .filter(|v| !v.is_nan())
                    .map(|value| LeaderboardEntry {
                        leaf_id: row.leaf_id.clone(),
                        bank: row.bank.clone(),
                        value,
                    })
            })
            .collect::<Vec<_>>();
        // `sort_by` is stable
        entries.sort_by(|a, b| b.value.total_cmp(&a.value));
        Self { key, entries }
    }

    /// The `n` highest-ranked entries.
    #[must_use]
    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboards {
    pub inaccuracy: Leaderboard,
    pub imprecision: Leaderboard,
    pub spread: Leaderboard,
}

impl Leaderboards {
    #[must_use]
    pub fn from_rows(rows: &[AnalysisRow]) -> Self {
        Self {
            inaccuracy: Leaderboard::from_rows(RankingKey::Inaccuracy, rows),
            imprecision: Leaderboard::from_rows(RankingKey::Imprecision, rows),
            spread: Leaderboard::from_rows(RankingKey::Spread, rows),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Leaderboard> {
        [&self.inaccuracy, &self.imprecision, &self.spread].into_iter()
    }
}

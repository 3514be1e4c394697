//! Run block parser for MLC QA exports
//!
//! An export is a CSV file in which the same test report is repeated once per
//! run. Every repetition contains a two-column `Name,Value` header followed by
//! one row per leaf bank:
//!
//! ```text
//! Test Inputs Report,,,,
//! Name,Value,Unit,Type,InputId
//! Left MLC Bank +20,20.1,20.0,...,19.9,mm,String,1
//! Right MLC Bank -60,-59.9,...,-60.1,mm,String,2
//! ,,,,
//! Test Inputs Report,,,,
//! Name,Value,Unit,Type,InputId
//! Left MLC Bank +20,20.2,...
//! ```
//!
//! Runs are identified only by their position in the file. A run is emitted
//! when the next header arrives or the input ends, and only if it collected at
//! least one bank row; the first header therefore never emits anything.
//!
//! Row-level problems never abort parsing. They are reported as [`RowIssue`]s
//! and degrade to missing data.

use std::{fs, io, path::PathBuf};

use crate::{config::AnalysisConfig, progress::ProgressSink};

/// Leaf positions of one bank in one run.
///
/// Always exactly `num_leaves` entries long; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafVector(Vec<Option<f64>>);

impl LeafVector {
    /// A vector in which every leaf is missing.
    #[must_use]
    pub fn missing(num_leaves: usize) -> Self {
        Self(vec![None; num_leaves])
    }

    /// Pads with missing values or truncates so that the result has `num_leaves` entries.
    ///
    /// `NaN` values are stored as missing.
    #[must_use]
    pub fn normalized(values: &[f64], num_leaves: usize) -> Self {
        let mut leaves = values
            .iter()
            .take(num_leaves)
            .map(|v| (!v.is_nan()).then_some(*v))
            .collect::<Vec<_>>();
        leaves.resize(num_leaves, None);
        Self(leaves)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of the leaf at `leaf_index`, `None` if missing or out of range.
    #[must_use]
    pub fn get(&self, leaf_index: usize) -> Option<f64> {
        self.0.get(leaf_index).copied().flatten()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Option<f64>] {
        &self.0
    }
}

/// Bank vectors collected from one run block, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunBlock {
    banks: Vec<(String, LeafVector)>,
}

impl RunBlock {
    /// Stores the vector for `label`, replacing an earlier one from the same run.
    pub fn insert(&mut self, label: &str, leaves: LeafVector) {
        match self.banks.iter_mut().find(|(l, _)| l == label) {
            Some((_, existing)) => *existing = leaves,
            None => self.banks.push((label.to_owned(), leaves)),
        }
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&LeafVector> {
        self.banks.iter().find(|(l, _)| l == label).map(|(_, v)| v)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.banks.iter().map(|(l, _)| l.as_str())
    }
}

/// Fatal parse failure. Nothing is returned when this occurs.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ParseError {
    #[display("failed to read MLC export {}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// A recoverable problem with a single row.
///
/// `line` is the 1-based line of the row in the input, `run` the 1-based run
/// the row belongs to.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum RowIssue {
    #[display("Skipping malformed CSV row {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[display(
        "Error converting value '{token}' for Bank {bank}, Run {run} (CSV row {line}). All leaves set to missing."
    )]
    ValueConversion {
        line: u64,
        run: usize,
        bank: String,
        token: String,
    },
    #[display("Warning: Run {run}, Bank {bank} (CSV row {line}) - No numeric values found.")]
    NoValues { line: u64, run: usize, bank: String },
    #[display(
        "Warning: Run {run}, Bank {bank} - Expected {expected}, found {found}. Padding/truncating."
    )]
    LengthMismatch {
        run: usize,
        bank: String,
        expected: usize,
        found: usize,
    },
    #[display("Warning: Bank {bank} (CSV row {line}) appears before any 'Name,Value' header. Ignored.")]
    OutsideRun { line: u64, bank: String },
}

fn report_issue(progress: &mut dyn ProgressSink, issue: &RowIssue) {
    tracing::debug!(%issue, "row issue");
    progress.report(&issue.to_string());
}

/// Result of scanning an export: one [`RunBlock`] per run, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRuns {
    pub num_leaves: usize,
    pub runs: Vec<RunBlock>,
}

impl ParsedRuns {
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }
}

/// Scan-and-flush state machine over the rows of an export.
#[derive(Debug)]
pub struct RunBlockParser<'a> {
    config: &'a AnalysisConfig,
    current: RunBlock,
    runs: Vec<RunBlock>,
    header_seen: bool,
}

impl<'a> RunBlockParser<'a> {
    #[must_use]
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            current: RunBlock::default(),
            runs: vec![],
            header_seen: false,
        }
    }

    fn current_run_number(&self) -> usize {
        self.runs.len() + 1
    }

    /// Feeds one row of cells. `line` is only used in diagnostics.
    pub fn feed_row<S>(&mut self, line: u64, cells: &[S], progress: &mut dyn ProgressSink)
    where
        S: AsRef<str>,
    {
        let Some(first) = cells.first() else {
            return;
        };
        if cells.iter().all(|c| c.as_ref().is_empty()) {
            return;
        }

        let first = first.as_ref();
        if first == "Name" {
            match cells.get(1).map(S::as_ref) {
                Some("Value") => {
                    self.flush();
                    self.header_seen = true;
                    return;
                }
                Some(_) => {}
                None => {
                    report_issue(
                        progress,
                        &RowIssue::MalformedRow {
                            line,
                            reason: "header row has a single cell".to_owned(),
                        },
                    );
                    return;
                }
            }
        }

        if !self.config.is_bank_label(first) {
            return;
        }
        if !self.header_seen {
            report_issue(
                progress,
                &RowIssue::OutsideRun {
                    line,
                    bank: first.to_owned(),
                },
            );
            return;
        }

        let leaves = self.extract_leaf_vector(line, first, &cells[1..], progress);
        self.current.insert(first, leaves);
    }

    fn extract_leaf_vector<S>(
        &self,
        line: u64,
        bank: &str,
        cells: &[S],
        progress: &mut dyn ProgressSink,
    ) -> LeafVector
    where
        S: AsRef<str>,
    {
        let num_leaves = self.config.num_leaves;
        let run = self.current_run_number();

        // the unit marker is matched untrimmed, so " mm" is a (non-numeric) value
        let candidates = cells
            .iter()
            .map(S::as_ref)
            .take_while(|c| !c.eq_ignore_ascii_case("mm"))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>();

        if candidates.is_empty() {
            report_issue(
                progress,
                &RowIssue::NoValues {
                    line,
                    run,
                    bank: bank.to_owned(),
                },
            );
            return LeafVector::missing(num_leaves);
        }

        let values = match candidates
            .iter()
            .map(|token| token.parse::<f64>().map_err(|_| *token))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(values) => values,
            Err(token) => {
                report_issue(
                    progress,
                    &RowIssue::ValueConversion {
                        line,
                        run,
                        bank: bank.to_owned(),
                        token: token.to_owned(),
                    },
                );
                return LeafVector::missing(num_leaves);
            }
        };

        if values.len() != num_leaves {
            report_issue(
                progress,
                &RowIssue::LengthMismatch {
                    run,
                    bank: bank.to_owned(),
                    expected: num_leaves,
                    found: values.len(),
                },
            );
        }
        LeafVector::normalized(&values, num_leaves)
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            tracing::debug!(
                run = self.current_run_number(),
                banks = self.current.len(),
                "run block complete"
            );
            self.runs.push(std::mem::take(&mut self.current));
        }
    }

    /// Emits the trailing run, if any, and returns all runs.
    #[must_use]
    pub fn finish(mut self) -> ParsedRuns {
        self.flush();
        ParsedRuns {
            num_leaves: self.config.num_leaves,
            runs: self.runs,
        }
    }
}

/// Parses export text that has already been loaded into memory.
///
/// A leading byte-order mark is ignored.
pub fn parse_runs_str(
    text: &str,
    config: &AnalysisConfig,
    progress: &mut dyn ProgressSink,
) -> ParsedRuns {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut parser = RunBlockParser::new(config);
    let mut record = csv::StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {
                let line = record.position().map_or(0, csv::Position::line);
                let cells = record.iter().collect::<Vec<_>>();
                parser.feed_row(line, cells.as_slice(), progress);
            }
            Ok(false) => break,
            Err(e) => {
                let line = e.position().map_or(0, csv::Position::line);
                report_issue(
                    progress,
                    &RowIssue::MalformedRow {
                        line,
                        reason: e.to_string(),
                    },
                );
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    break;
                }
            }
        }
    }
    parser.finish()
}

/// Reads and parses an export file.
///
/// The file is read completely and closed before any row is interpreted.
pub fn parse_runs_file<P>(
    path: P,
    config: &AnalysisConfig,
    progress: &mut dyn ProgressSink,
) -> Result<ParsedRuns, ParseError>
where
    P: Into<PathBuf>,
{
    let path = path.into();
    let text = fs::read_to_string(&path).map_err(|source| ParseError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(parse_runs_str(&text, config, progress))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = "Left MLC Bank +20";

    fn bank_row(label: &str, values: &[&str]) -> Vec<String> {
        let mut row = vec![label.to_owned()];
        row.extend(values.iter().map(|&v| v.to_owned()));
        row.extend(["mm", "String", "1"].map(str::to_owned));
        row
    }

    fn header() -> Vec<String> {
        ["Name", "Value", "Unit", "Type", "InputId"]
            .map(str::to_owned)
            .to_vec()
    }

    fn run_rows(config: &AnalysisConfig, rows: &[Vec<String>]) -> (ParsedRuns, Vec<String>) {
        let mut messages = Vec::new();
        let mut parser = RunBlockParser::new(config);
        for (i, row) in rows.iter().enumerate() {
            parser.feed_row(i as u64 + 1, row.as_slice(), &mut messages);
        }
        (parser.finish(), messages)
    }

    #[test]
    fn test_normalized_length_is_fixed() {
        for len in [0, 1, 3, 79, 80, 81, 200] {
            let values = vec![1.5; len];
            let leaves = LeafVector::normalized(&values, 80);
            assert_eq!(leaves.len(), 80);
            assert_eq!(leaves.as_slice().iter().flatten().count(), len.min(80));
        }
    }

    #[test]
    fn test_normalized_nan_is_missing() {
        let leaves = LeafVector::normalized(&[1.0, f64::NAN, 3.0], 4);
        assert_eq!(leaves.as_slice(), &[Some(1.0), None, Some(3.0), None]);
        assert_eq!(leaves.get(1), None);
        assert_eq!(leaves.get(2), Some(3.0));
        assert_eq!(leaves.get(10), None);
    }

    #[test]
    fn test_run_block_overwrites_duplicate_label() {
        let mut run = RunBlock::default();
        run.insert("A", LeafVector::normalized(&[1.0], 1));
        run.insert("B", LeafVector::normalized(&[2.0], 1));
        run.insert("A", LeafVector::normalized(&[3.0], 1));
        assert_eq!(run.len(), 2);
        assert_eq!(run.labels().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(run.get("A").and_then(|v| v.get(0)), Some(3.0));
    }

    #[test]
    fn test_first_header_emits_nothing() {
        let config = AnalysisConfig::default();
        let (parsed, _) = run_rows(&config, &[header(), header(), header()]);
        assert_eq!(parsed.run_count(), 0);
    }

    #[test]
    fn test_rows_before_header_are_ignored() {
        let config = AnalysisConfig::default();
        let (parsed, messages) = run_rows(&config, &[bank_row(BANK, &["20.0"])]);
        assert_eq!(parsed.run_count(), 0);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("before any 'Name,Value' header"));
    }

    #[test]
    fn test_runs_split_on_header() {
        let config = AnalysisConfig::default();
        let (parsed, _) = run_rows(
            &config,
            &[
                header(),
                bank_row(BANK, &["20.1"; 80]),
                vec![String::new(); 5],
                header(),
                bank_row(BANK, &["20.2"; 80]),
            ],
        );
        assert_eq!(parsed.run_count(), 2);
        assert_eq!(parsed.runs[0].get(BANK).and_then(|v| v.get(79)), Some(20.1));
        assert_eq!(parsed.runs[1].get(BANK).and_then(|v| v.get(0)), Some(20.2));
    }

    #[test]
    fn test_empty_block_between_headers_is_not_a_run() {
        let config = AnalysisConfig::default();
        let (parsed, _) = run_rows(
            &config,
            &[
                header(),
                bank_row(BANK, &["20.1"; 80]),
                header(),
                header(),
                bank_row(BANK, &["20.2"; 80]),
            ],
        );
        assert_eq!(parsed.run_count(), 2);
    }

    #[test]
    fn test_unit_marker_stops_collection() {
        let config = AnalysisConfig::default();
        let mut row = bank_row(BANK, &["1", "2"]);
        // trailing columns after the unit marker look numeric but are not leaves
        row.extend(["7", "8"].map(str::to_owned));
        let row_upper = vec![BANK.to_owned(), "3".to_owned(), "MM".to_owned(), "9".to_owned()];

        let (parsed, messages) = run_rows(&config, &[header(), row]);
        let leaves = parsed.runs[0].get(BANK).unwrap();
        assert_eq!(leaves.get(0), Some(1.0));
        assert_eq!(leaves.get(1), Some(2.0));
        assert_eq!(leaves.get(2), None);
        assert!(messages[0].contains("Expected 80, found 2"));

        let (parsed, _) = run_rows(&config, &[header(), row_upper]);
        let leaves = parsed.runs[0].get(BANK).unwrap();
        assert_eq!(leaves.as_slice().iter().flatten().count(), 1);
    }

    #[test]
    fn test_blank_cells_are_skipped_not_missing() {
        let config = AnalysisConfig::default();
        let (parsed, _) = run_rows(&config, &[header(), bank_row(BANK, &["1", "", " ", "2"])]);
        let leaves = parsed.runs[0].get(BANK).unwrap();
        assert_eq!(leaves.get(0), Some(1.0));
        assert_eq!(leaves.get(1), Some(2.0));
    }

    #[test]
    fn test_long_vector_is_truncated() {
        let config = AnalysisConfig::default();
        let mut values = vec!["1.0"; 80];
        values.extend(["99.0"; 5]);
        let (parsed, messages) = run_rows(&config, &[header(), bank_row(BANK, &values)]);
        let leaves = parsed.runs[0].get(BANK).unwrap();
        assert_eq!(leaves.len(), 80);
        assert!(leaves.as_slice().iter().all(|v| *v == Some(1.0)));
        assert!(messages[0].contains("found 85"));
    }

    #[test]
    fn test_non_numeric_token_invalidates_whole_vector() {
        let config = AnalysisConfig::default();
        let mut values = vec!["20.1", "invalid"];
        values.extend(["20.4"; 78]);
        let (parsed, messages) = run_rows(
            &config,
            &[
                header(),
                bank_row(BANK, &values),
                bank_row("Right MLC Bank -60", &["-59.9"; 80]),
            ],
        );
        let run = &parsed.runs[0];
        assert!(run.get(BANK).unwrap().as_slice().iter().all(Option::is_none));
        assert_eq!(run.get(BANK).unwrap().len(), 80);
        assert_eq!(
            run.get("Right MLC Bank -60").and_then(|v| v.get(79)),
            Some(-59.9)
        );
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("'invalid'"));
    }

    #[test]
    fn test_no_values_gives_missing_vector() {
        let config = AnalysisConfig::default();
        let (parsed, messages) = run_rows(
            &config,
            &[header(), vec![BANK.to_owned(), String::new(), "mm".to_owned()]],
        );
        let leaves = parsed.runs[0].get(BANK).unwrap();
        assert_eq!(leaves.len(), 80);
        assert!(leaves.as_slice().iter().all(Option::is_none));
        assert!(messages[0].contains("No numeric values found"));
    }

    #[test]
    fn test_single_cell_name_row_is_malformed() {
        let config = AnalysisConfig::default();
        let (parsed, messages) = run_rows(
            &config,
            &[
                header(),
                bank_row(BANK, &["20.0"; 80]),
                vec!["Name".to_owned()],
                bank_row(BANK, &["21.0"; 80]),
            ],
        );
        // the malformed row is not a header, so both bank rows share one run
        assert_eq!(parsed.run_count(), 1);
        assert_eq!(parsed.runs[0].get(BANK).and_then(|v| v.get(0)), Some(21.0));
        assert!(messages[0].contains("malformed CSV row 3"));
    }

    #[test]
    fn test_unrecognized_label_is_ignored() {
        let config = AnalysisConfig::default();
        let (parsed, messages) = run_rows(
            &config,
            &[header(), bank_row("Left MLC Bank +40", &["40.0"; 80])],
        );
        assert_eq!(parsed.run_count(), 0);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_configured_leaf_count() {
        let config = AnalysisConfig {
            num_leaves: 4,
            ..AnalysisConfig::default()
        };
        let (parsed, _) = run_rows(&config, &[header(), bank_row(BANK, &["1", "2"])]);
        assert_eq!(parsed.num_leaves, 4);
        assert_eq!(
            parsed.runs[0].get(BANK).unwrap().as_slice(),
            &[Some(1.0), Some(2.0), None, None]
        );
    }

    #[test]
    fn test_padded_unit_marker_invalidates_vector() {
        let config = AnalysisConfig::default();
        let row = vec![
            BANK.to_owned(),
            "20.0".to_owned(),
            "20.1".to_owned(),
            " mm".to_owned(),
        ];
        let (parsed, messages) = run_rows(&config, &[header(), row]);
        let leaves = parsed.runs[0].get(BANK).unwrap();
        assert_eq!(leaves.len(), 80);
        assert!(leaves.as_slice().iter().all(Option::is_none));
        assert!(messages[0].contains("'mm'"), "{}", messages[0]);
    }

    #[test]
    fn test_padded_header_and_label_are_not_matched() {
        let config = AnalysisConfig::default();
        let padded_header = [" Name ", " Value "].map(str::to_owned).to_vec();
        let (parsed, _) = run_rows(
            &config,
            &[padded_header, bank_row("Left MLC Bank +20 ", &["20.0"; 80])],
        );
        assert_eq!(parsed.run_count(), 0);

        let (parsed, messages) = run_rows(
            &config,
            &[header(), bank_row("Left MLC Bank +20 ", &["20.0"; 80])],
        );
        assert_eq!(parsed.run_count(), 0);
        assert!(messages.is_empty());

        let text = " Name , Value \nLeft MLC Bank +20 ,20.0,mm\n";
        assert_eq!(parse_runs_str(text, &config, &mut ()).run_count(), 0);
    }

    #[test]
    fn test_parse_str_strips_bom() {
        let config = AnalysisConfig {
            num_leaves: 2,
            ..AnalysisConfig::default()
        };
        let text = "\u{feff}Name,Value\n\nLeft MLC Bank +20,1,x,mm\n";
        let mut messages = Vec::new();
        let parsed = parse_runs_str(text, &config, &mut messages);
        assert_eq!(parsed.run_count(), 1);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("'x'"), "{}", messages[0]);
        assert!(parsed.runs[0].get(BANK).unwrap().as_slice().iter().all(Option::is_none));
    }
}

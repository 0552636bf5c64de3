//! In-memory views over the parsed source exports.
//!
//! A [`SourceTable`] keeps every CSV row as text. The header-mapped view
//! ([`SourceTable::records`]) treats row 0 as the header; the raw positional
//! view ([`SourceTable::raw_rows`]) makes no such assumption and includes it.
//! Joins go through a [`KeyIndex`] built once per pass.

use std::collections::HashMap;

use log::{debug, warn};

use crate::config::ColumnRef;
use crate::model::{ReconInput, SourceKind};
use crate::normalize::normalize;

#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    rows: Vec<Vec<String>>,
    header_index: HashMap<String, usize>,
}

impl SourceTable {
    /// Parse decoded CSV text. Never fails: records the CSV reader rejects
    /// are skipped with a warning.
    pub fn parse(kind: SourceKind, text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let delimiter = sniff_delimiter(text);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            match result {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect::<Vec<_>>()),
                Err(e) => warn!("{kind}: skipping record {}: {e}", line + 1),
            }
        }

        let mut header_index = HashMap::new();
        if let Some(header) = rows.first() {
            for (i, name) in header.iter().enumerate() {
                header_index.entry(name.trim().to_string()).or_insert(i);
            }
        }

        Self { rows, header_index }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Trimmed header names (row 0), empty for an empty table.
    pub fn headers(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|h| h.iter().map(|s| s.trim()).collect())
            .unwrap_or_default()
    }

    /// Header-mapped records: every row after the header.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().skip(1).map(move |cells| Record { table: self, cells })
    }

    pub fn record_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Header-mapped record by position in [`SourceTable::records`].
    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows
            .get(index + 1)
            .map(|cells| Record { table: self, cells })
    }

    /// All rows, header row included.
    pub fn raw_rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn raw_row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Index header-mapped records by the normalized value of `candidates`.
    pub fn index_records(&self, candidates: &[ColumnRef]) -> KeyIndex {
        KeyIndex::build(
            self.records()
                .enumerate()
                .map(|(i, r)| (i, normalize(r.first(candidates).unwrap_or("")))),
        )
    }

    /// Index raw rows by the normalized value at `column`.
    pub fn index_raw(&self, column: usize) -> KeyIndex {
        KeyIndex::build(
            self.rows
                .iter()
                .enumerate()
                .map(|(i, row)| (i, normalize(row.get(column).map(String::as_str).unwrap_or("")))),
        )
    }
}

// ---------------------------------------------------------------------------
// Source set
// ---------------------------------------------------------------------------

/// The six tables of one pass. A source absent from the input is an empty table.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    pub status: SourceTable,
    pub timing_log: SourceTable,
    pub driver_assignment: SourceTable,
    pub invoices: SourceTable,
    pub payment_confirmations: SourceTable,
    pub condition_lookup: SourceTable,
    /// Sources that were present in the input, in [`SourceKind::ALL`] order.
    pub loaded: Vec<SourceKind>,
}

impl SourceSet {
    pub fn from_input(input: &ReconInput) -> Self {
        let mut set = Self::default();
        for kind in SourceKind::ALL {
            let Some(text) = input.get(kind) else {
                continue;
            };
            let table = SourceTable::parse(kind, text);
            debug!("{kind}: {} rows, header {:?}", table.raw_rows().len(), table.headers());
            *set.table_mut(kind) = table;
            set.loaded.push(kind);
        }
        set
    }

    pub fn table(&self, kind: SourceKind) -> &SourceTable {
        match kind {
            SourceKind::Status => &self.status,
            SourceKind::TimingLog => &self.timing_log,
            SourceKind::DriverAssignment => &self.driver_assignment,
            SourceKind::Invoices => &self.invoices,
            SourceKind::PaymentConfirmations => &self.payment_confirmations,
            SourceKind::ConditionLookup => &self.condition_lookup,
        }
    }

    fn table_mut(&mut self, kind: SourceKind) -> &mut SourceTable {
        match kind {
            SourceKind::Status => &mut self.status,
            SourceKind::TimingLog => &mut self.timing_log,
            SourceKind::DriverAssignment => &mut self.driver_assignment,
            SourceKind::Invoices => &mut self.invoices,
            SourceKind::PaymentConfirmations => &mut self.payment_confirmations,
            SourceKind::ConditionLookup => &mut self.condition_lookup,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One data row addressed through the table's header.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    table: &'a SourceTable,
    cells: &'a [String],
}

impl<'a> Record<'a> {
    /// Cell addressed by header or position, `None` when the column is absent.
    pub fn get(&self, column: &ColumnRef) -> Option<&'a str> {
        let idx = match column {
            ColumnRef::Position(i) => *i,
            ColumnRef::Header(name) => *self.table.header_index.get(name.as_str())?,
        };
        self.cells.get(idx).map(String::as_str)
    }

    /// First non-empty cell among `candidates`, in priority order.
    pub fn first(&self, candidates: &[ColumnRef]) -> Option<&'a str> {
        candidates
            .iter()
            .filter_map(|c| self.get(c))
            .find(|v| !v.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Key index
// ---------------------------------------------------------------------------

/// Normalized key → row positions in source order. Empty keys are never
/// indexed, so they never join.
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    positions: HashMap<String, Vec<usize>>,
}

impl KeyIndex {
    pub fn build(keys: impl IntoIterator<Item = (usize, String)>) -> Self {
        let mut positions: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, key) in keys {
            if key.is_empty() {
                continue;
            }
            positions.entry(key).or_default().push(i);
        }
        Self { positions }
    }

    /// First row carrying `key`.
    pub fn first(&self, key: &str) -> Option<usize> {
        self.all(key).first().copied()
    }

    /// Every row carrying `key`, in source order.
    pub fn all(&self, key: &str) -> &[usize] {
        if key.is_empty() {
            return &[];
        }
        self.positions.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Delimiter detection
// ---------------------------------------------------------------------------

/// Guess the delimiter of an export from its first ten non-blank lines.
///
/// Tab, `;`, `,` and `|` are tried in turn. A candidate must split the first
/// line into at least two fields; among those, the highest score wins, ties
/// going to the earlier candidate. Falls back to `,`.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    if lines.is_empty() {
        return b',';
    }

    let mut chosen = b',';
    let mut top_score = 0u64;

    for &delim in candidates {
        let widths: Vec<usize> = lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // A single field on the first line rules the candidate out
        if widths.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines with the first line's width, times that width
        let width = widths[0];
        let matching = widths.iter().filter(|&&w| w == width).count() as u64;
        let score = matching * width as u64;

        if score > top_score {
            top_score = score;
            chosen = delim;
        }
    }

    chosen
}

use serde::Deserialize;

use crate::error::ReconError;
use crate::model::SourceKind;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine configuration. Every section is optional; an empty document is
/// equivalent to [`ReconConfig::default`], which matches the layout of the
/// ERP exports the engine was built against.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub sources: SourcePatterns,
    pub columns: ColumnTables,
    pub timing_log: TimingLayout,
    pub labels: Labels,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// File-name fragment identifying each logical source inside a folder.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcePatterns {
    pub status: String,
    pub timing_log: String,
    pub driver_assignment: String,
    pub invoices: String,
    pub payment_confirmations: String,
    pub condition_lookup: String,
}

impl Default for SourcePatterns {
    fn default() -> Self {
        Self {
            status: "03.03.12".into(),
            timing_log: "03.11.40".into(),
            driver_assignment: "03.11.29".into(),
            invoices: "03.02.37".into(),
            payment_confirmations: "cora".into(),
            condition_lookup: "01.20.01.27".into(),
        }
    }
}

impl SourcePatterns {
    pub fn pattern(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Status => &self.status,
            SourceKind::TimingLog => &self.timing_log,
            SourceKind::DriverAssignment => &self.driver_assignment,
            SourceKind::Invoices => &self.invoices,
            SourceKind::PaymentConfirmations => &self.payment_confirmations,
            SourceKind::ConditionLookup => &self.condition_lookup,
        }
    }

    /// Every source whose fragment occurs in `file_name` (case-insensitive).
    pub fn classify(&self, file_name: &str) -> Vec<SourceKind> {
        let name = file_name.to_lowercase();
        SourceKind::ALL
            .into_iter()
            .filter(|kind| name.contains(&self.pattern(*kind).to_lowercase()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Column candidates
// ---------------------------------------------------------------------------

/// One way of addressing a cell: by trimmed header text or by 0-based position.
///
/// In TOML a string is a header and an integer is a position, so a candidate
/// list reads `["Condição", 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Position(usize),
    Header(String),
}

impl ColumnRef {
    pub fn header(name: &str) -> Self {
        Self::Header(name.to_string())
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Position(i) => write!(f, "#{i}"),
            Self::Header(h) => write!(f, "\"{h}\""),
        }
    }
}

/// Ordered candidates for one logical field; the first non-empty cell wins.
pub type Candidates = Vec<ColumnRef>;

fn headers(names: &[&str]) -> Candidates {
    names.iter().map(|n| ColumnRef::header(n)).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnTables {
    pub status: StatusColumns,
    pub driver_assignment: AssignmentColumns,
    pub invoices: InvoiceColumns,
    pub payment_confirmations: ConfirmationColumns,
    pub condition_lookup: LookupColumns,
}

/// Status source. `raw_key` and `issue_date` address the raw positional view,
/// since the issue-date header text differs between export versions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusColumns {
    pub map_id: Candidates,
    pub situation: Candidates,
    pub total_value: Candidates,
    pub raw_key: usize,
    pub issue_date: usize,
}

impl Default for StatusColumns {
    fn default() -> Self {
        Self {
            map_id: headers(&["Mapa"]),
            situation: headers(&["Situacao", "Situação"]),
            total_value: headers(&["Valor Total"]),
            raw_key: 0,
            issue_date: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssignmentColumns {
    pub map_id: Candidates,
    pub driver: Candidates,
    pub plate: Candidates,
}

impl Default for AssignmentColumns {
    fn default() -> Self {
        Self {
            map_id: headers(&["Mapa"]),
            driver: headers(&["Nome Motorista"]),
            plate: headers(&["Placa"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InvoiceColumns {
    pub map_id: Candidates,
    pub number: Candidates,
    pub customer: Candidates,
    pub legal_name: Candidates,
    pub condition: Candidates,
    pub cancellation: Candidates,
    pub total: Candidates,
}

impl Default for InvoiceColumns {
    fn default() -> Self {
        Self {
            map_id: headers(&["Mapa"]),
            number: headers(&["Nota"]),
            customer: headers(&["Cliente"]),
            legal_name: headers(&["Nome", "Razão Social"]),
            condition: headers(&["Cond. pagt", "Cond. pag"]),
            cancellation: headers(&["Mot. Cancelamento"]),
            total: headers(&["Total"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfirmationColumns {
    pub invoice_number: Candidates,
    pub status: Candidates,
}

impl Default for ConfirmationColumns {
    fn default() -> Self {
        Self {
            invoice_number: headers(&["Nota fiscal"]),
            status: headers(&["Status"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupColumns {
    pub code: Candidates,
    pub description: Candidates,
}

impl Default for LookupColumns {
    fn default() -> Self {
        Self {
            code: vec![ColumnRef::header("Condição"), ColumnRef::Position(1)],
            description: vec![ColumnRef::header("Descrição"), ColumnRef::Position(2)],
        }
    }
}

// ---------------------------------------------------------------------------
// Timing log
// ---------------------------------------------------------------------------

/// Positional layout of the timing-log export, which is read without headers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingLayout {
    pub key: usize,
    pub load: usize,
    pub depart: usize,
    pub arrive: usize,
    pub physical_confirm: usize,
    pub financial_confirm: usize,
    pub physical_duration: usize,
    pub financial_duration: usize,
    pub internal_duration: usize,
    /// Columns that must all be recorded for a map in "aberto" to count as
    /// auto-reopened. Column 11 is not surfaced as a timing field but is
    /// part of the check.
    pub auto_reopen_columns: Vec<usize>,
}

impl Default for TimingLayout {
    fn default() -> Self {
        Self {
            key: 0,
            load: 6,
            depart: 7,
            arrive: 8,
            physical_confirm: 9,
            financial_confirm: 10,
            physical_duration: 12,
            financial_duration: 13,
            internal_duration: 14,
            auto_reopen_columns: vec![7, 8, 9, 10, 11, 13, 14],
        }
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Labels {
    /// Prefix of the future label, followed by the earliest future date.
    pub future_prefix: String,
    /// Future label when no map is future-dated.
    pub future_default: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            future_prefix: "FAT".into(),
            future_default: "FAT FUTUROS".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for kind in SourceKind::ALL {
            if self.sources.pattern(kind).trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "sources.{}: file name pattern must not be empty",
                    kind.config_key()
                )));
            }
        }

        let c = &self.columns;
        let tables: [(&str, &Candidates); 17] = [
            ("status.map_id", &c.status.map_id),
            ("status.situation", &c.status.situation),
            ("status.total_value", &c.status.total_value),
            ("driver_assignment.map_id", &c.driver_assignment.map_id),
            ("driver_assignment.driver", &c.driver_assignment.driver),
            ("driver_assignment.plate", &c.driver_assignment.plate),
            ("invoices.map_id", &c.invoices.map_id),
            ("invoices.number", &c.invoices.number),
            ("invoices.customer", &c.invoices.customer),
            ("invoices.legal_name", &c.invoices.legal_name),
            ("invoices.condition", &c.invoices.condition),
            ("invoices.cancellation", &c.invoices.cancellation),
            ("invoices.total", &c.invoices.total),
            ("payment_confirmations.invoice_number", &c.payment_confirmations.invoice_number),
            ("payment_confirmations.status", &c.payment_confirmations.status),
            ("condition_lookup.code", &c.condition_lookup.code),
            ("condition_lookup.description", &c.condition_lookup.description),
        ];
        for (name, candidates) in tables {
            if candidates.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "columns.{name}: at least one candidate column is required"
                )));
            }
        }

        if self.timing_log.auto_reopen_columns.is_empty() {
            return Err(ReconError::ConfigValidation(
                "timing_log.auto_reopen_columns must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

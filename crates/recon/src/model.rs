use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The six logical sources a pass consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    Status,
    TimingLog,
    DriverAssignment,
    Invoices,
    PaymentConfirmations,
    ConditionLookup,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        Self::Status,
        Self::TimingLog,
        Self::DriverAssignment,
        Self::Invoices,
        Self::PaymentConfirmations,
        Self::ConditionLookup,
    ];

    /// Logical name used at the input boundary.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::TimingLog => "timingLog",
            Self::DriverAssignment => "driverAssignment",
            Self::Invoices => "invoices",
            Self::PaymentConfirmations => "paymentConfirmations",
            Self::ConditionLookup => "conditionLookup",
        }
    }

    /// Key of this source in the `[sources]` config table.
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::TimingLog => "timing_log",
            Self::DriverAssignment => "driver_assignment",
            Self::Invoices => "invoices",
            Self::PaymentConfirmations => "payment_confirmations",
            Self::ConditionLookup => "condition_lookup",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s) || k.config_key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown source: {s}"))
    }
}

/// Decoded CSV text per logical source. Any subset may be present.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub sources: HashMap<SourceKind, String>,
}

impl ReconInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: SourceKind, text: impl Into<String>) -> Self {
        self.sources.insert(kind, text.into());
        self
    }

    pub fn get(&self, kind: SourceKind) -> Option<&str> {
        self.sources.get(&kind).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceCategory {
    Paid,
    Deferred,
    Pending,
    Returned,
    Other,
}

impl InvoiceCategory {
    /// Human label shown next to the invoice.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Paid => "PAGO",
            Self::Deferred => "VENDA A PRAZO",
            Self::Pending => "PENDENTE",
            Self::Returned => "NF DEVOLVIDA",
            Self::Other => "NÃO FINANCEIRO",
        }
    }
}

impl std::fmt::Display for InvoiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paid => write!(f, "PAID"),
            Self::Deferred => write!(f, "DEFERRED"),
            Self::Pending => write!(f, "PENDING"),
            Self::Returned => write!(f, "RETURNED"),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceRecord {
    pub number: String,
    pub customer_code: String,
    pub legal_name: String,
    pub payment_condition: String,
    pub total_display: String,
    pub status_label: String,
    pub category: InvoiceCategory,
}

/// Per-map sums by invoice outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub paid: f64,
    pub deferred: f64,
    pub pending: f64,
}

impl FinancialSummary {
    /// Add an invoice amount to the sum its category feeds. Returned and
    /// non-financial invoices feed nothing.
    pub fn add(&mut self, category: InvoiceCategory, amount: f64) {
        match category {
            InvoiceCategory::Paid => self.paid += amount,
            InvoiceCategory::Deferred => self.deferred += amount,
            InvoiceCategory::Pending => self.pending += amount,
            InvoiceCategory::Returned | InvoiceCategory::Other => {}
        }
    }

    pub fn is_zero(&self) -> bool {
        self.paid == 0.0 && self.deferred == 0.0 && self.pending == 0.0
    }
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

/// Time-of-day trail of a map. Unrecorded cells hold `"--:--"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingLog {
    pub load: String,
    pub depart: String,
    pub arrive: String,
    pub physical_confirm: String,
    pub financial_confirm: String,
    pub physical_duration: String,
    pub financial_duration: String,
    pub internal_duration: String,
}

impl Default for TimingLog {
    fn default() -> Self {
        let empty = || crate::normalize::EMPTY_TIME.to_string();
        Self {
            load: empty(),
            depart: empty(),
            arrive: empty(),
            physical_confirm: empty(),
            financial_confirm: empty(),
            physical_duration: empty(),
            financial_duration: empty(),
            internal_duration: empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapRecord {
    pub id: String,
    pub status: String,
    pub total_value: String,
    /// Issue date as exported, `"---"` when the cell is missing.
    pub issue_date_label: String,
    /// Parsed issue date; `None` when missing or malformed.
    pub issue_date: Option<NaiveDate>,
    pub driver: String,
    pub plate: String,
    pub timing: TimingLog,
    pub financial: FinancialSummary,
    pub invoices: Vec<InvoiceRecord>,
    pub is_auto_reopened: bool,
    pub is_pickup_only: bool,
}

impl MapRecord {
    pub fn status_lower(&self) -> String {
        self.status.to_lowercase()
    }

    /// Display badges: `REABERTO AUTO` and `RECOLHA`.
    pub fn badges(&self) -> Vec<&'static str> {
        let mut badges = Vec::new();
        if self.is_auto_reopened {
            badges.push("REABERTO AUTO");
        }
        if self.is_pickup_only {
            badges.push("RECOLHA");
        }
        badges
    }

    /// No invoices, or only non-financial ones.
    pub fn is_non_financial(&self) -> bool {
        self.invoices.iter().all(|i| i.category == InvoiceCategory::Other)
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Triage categories. Membership is independent per category; every category
/// except [`Category::Future`] excludes future-dated maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    All,
    PriorDays,
    Open,
    Released,
    FinanceReleased,
    NotDeparted,
    EnRoute,
    PhysicalDelay,
    AutoReopened,
    NonFinancial,
    Future,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Self::All,
        Self::PriorDays,
        Self::Open,
        Self::Released,
        Self::FinanceReleased,
        Self::NotDeparted,
        Self::EnRoute,
        Self::PhysicalDelay,
        Self::AutoReopened,
        Self::NonFinancial,
        Self::Future,
    ];

    /// Filter key used by the triage screens and in the count map.
    pub fn key(&self) -> &'static str {
        match self {
            Self::All => "Todos",
            Self::PriorDays => "Anteriores",
            Self::Open => "Aberto",
            Self::Released => "Liberado",
            Self::FinanceReleased => "Financeiro Liberado",
            Self::NotDeparted => "NaoSairam",
            Self::EnRoute => "EmRota",
            Self::PhysicalDelay => "AtrasoFisico",
            Self::AutoReopened => "Reabertos",
            Self::NonFinancial => "NaoFinanceiro",
            Self::Future => "Futuros",
        }
    }

    fn english(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::PriorDays => "prior_days",
            Self::Open => "open",
            Self::Released => "released",
            Self::FinanceReleased => "finance_released",
            Self::NotDeparted => "not_departed",
            Self::EnRoute => "en_route",
            Self::PhysicalDelay => "physical_delay",
            Self::AutoReopened => "auto_reopened",
            Self::NonFinancial => "non_financial",
            Self::Future => "future",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(wanted) || c.english().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown category: {wanted}"))
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub meta: ReconMeta,
    pub maps: Vec<MapRecord>,
    /// Count per category key; every category is present.
    pub counts: BTreeMap<String, usize>,
    pub future_label: String,
}

impl AggregateResult {
    pub fn count(&self, category: Category) -> usize {
        self.counts.get(category.key()).copied().unwrap_or(0)
    }
}

/// Pass metadata. Holds nothing time-of-invocation dependent, so two passes
/// over identical input compare equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub today: NaiveDate,
    pub sources_loaded: Vec<SourceKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_accepts_both_names() {
        assert_eq!("Reabertos".parse::<Category>().unwrap(), Category::AutoReopened);
        assert_eq!("reabertos".parse::<Category>().unwrap(), Category::AutoReopened);
        assert_eq!("auto_reopened".parse::<Category>().unwrap(), Category::AutoReopened);
        assert_eq!("financeiro liberado".parse::<Category>().unwrap(), Category::FinanceReleased);
        assert!("whatever".parse::<Category>().is_err());
    }

    #[test]
    fn source_kind_parse() {
        assert_eq!("timingLog".parse::<SourceKind>().unwrap(), SourceKind::TimingLog);
        assert_eq!("timing_log".parse::<SourceKind>().unwrap(), SourceKind::TimingLog);
        assert!("ledger".parse::<SourceKind>().is_err());
    }

    #[test]
    fn financial_summary_routes_amounts() {
        let mut s = FinancialSummary::default();
        s.add(InvoiceCategory::Paid, 10.0);
        s.add(InvoiceCategory::Deferred, 20.0);
        s.add(InvoiceCategory::Pending, 5.5);
        s.add(InvoiceCategory::Returned, 100.0);
        s.add(InvoiceCategory::Other, 100.0);
        assert_eq!(s, FinancialSummary { paid: 10.0, deferred: 20.0, pending: 5.5 });
        assert!(!s.is_zero());
        assert!(FinancialSummary::default().is_zero());
    }

    #[test]
    fn invoice_labels() {
        assert_eq!(InvoiceCategory::Returned.label(), "NF DEVOLVIDA");
        assert_eq!(InvoiceCategory::Other.label(), "NÃO FINANCEIRO");
        assert_eq!(InvoiceCategory::Deferred.to_string(), "DEFERRED");
    }

    #[test]
    fn timing_defaults_to_empty_sentinel() {
        let t = TimingLog::default();
        assert_eq!(t.depart, "--:--");
        assert_eq!(t.internal_duration, "--:--");
    }
}

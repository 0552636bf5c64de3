//! Invoice classification.
//!
//! Priority, first match wins:
//! 1. cancellation reason present → Returned
//! 2. description has "CREDITO EM CONTA", or a payment confirmation says PAGO → Paid
//! 3. description has "BOLETO" → Deferred
//! 4. description has a cash-like term → Pending
//! 5. anything else → Other
//!
//! Descriptions often satisfy several substring tests ("CREDITO EM CONTA"
//! contains both "CREDITO" and "CONTA"); the order above is the tie-break.

use std::collections::{HashMap, HashSet};

use crate::config::{ColumnTables, InvoiceColumns};
use crate::model::{InvoiceCategory, InvoiceRecord};
use crate::normalize::{normalize, parse_currency, to_upper_or_default};
use crate::table::{Record, SourceTable};

const PAID_TERM: &str = "CREDITO EM CONTA";
const DEFERRED_TERM: &str = "BOLETO";
const PENDING_TERMS: [&str; 6] = ["PIX", "DINHEIRO", "CREDITO", "À VISTA", "A VISTA", "CONTA"];
const CONFIRMED_STATUS: &str = "PAGO";

/// Category for an invoice given its resolved (uppercased) payment condition.
pub fn categorize(description: &str, cancelled: bool, confirmed_paid: bool) -> InvoiceCategory {
    if cancelled {
        InvoiceCategory::Returned
    } else if description.contains(PAID_TERM) || confirmed_paid {
        InvoiceCategory::Paid
    } else if description.contains(DEFERRED_TERM) {
        InvoiceCategory::Deferred
    } else if PENDING_TERMS.iter().any(|t| description.contains(t)) {
        InvoiceCategory::Pending
    } else {
        InvoiceCategory::Other
    }
}

/// An invoice plus the amount it contributes to its map's summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedInvoice {
    pub record: InvoiceRecord,
    pub amount: f64,
}

/// Classifies invoice rows against the payment-condition lookup and the
/// payment confirmations. Built once per pass.
#[derive(Debug, Clone)]
pub struct InvoiceClassifier {
    columns: InvoiceColumns,
    /// Normalized condition code → description cell (first lookup row wins).
    conditions: HashMap<String, Option<String>>,
    /// Normalized invoice numbers confirmed as paid.
    confirmed_paid: HashSet<String>,
}

impl InvoiceClassifier {
    pub fn new(columns: &ColumnTables, lookup: &SourceTable, confirmations: &SourceTable) -> Self {
        let mut conditions = HashMap::new();
        for row in lookup.records() {
            let code = normalize(row.first(&columns.condition_lookup.code).unwrap_or(""));
            if code.is_empty() {
                continue;
            }
            let description = row.first(&columns.condition_lookup.description).map(str::to_string);
            conditions.entry(code).or_insert(description);
        }

        let confirmed_paid = confirmations
            .records()
            .filter(|row| {
                to_upper_or_default(row.first(&columns.payment_confirmations.status))
                    .contains(CONFIRMED_STATUS)
            })
            .map(|row| normalize(row.first(&columns.payment_confirmations.invoice_number).unwrap_or("")))
            .filter(|key| !key.is_empty())
            .collect();

        Self {
            columns: columns.invoices.clone(),
            conditions,
            confirmed_paid,
        }
    }

    /// Resolve a raw condition code to its uppercased description, falling
    /// back to the raw text when the code is not in the lookup table.
    pub fn resolve_condition(&self, raw: Option<&str>) -> String {
        let code = normalize(raw.unwrap_or(""));
        match self.conditions.get(&code).filter(|_| !code.is_empty()) {
            Some(description) => to_upper_or_default(description.as_deref()),
            None => to_upper_or_default(raw),
        }
    }

    pub fn is_confirmed_paid(&self, invoice_number: &str) -> bool {
        let key = normalize(invoice_number);
        !key.is_empty() && self.confirmed_paid.contains(&key)
    }

    pub fn classify(&self, row: &Record<'_>) -> ClassifiedInvoice {
        let c = &self.columns;
        let number = row.first(&c.number).unwrap_or("").trim().to_string();
        let total_display = row.first(&c.total).unwrap_or("").to_string();
        let payment_condition = self.resolve_condition(row.first(&c.condition));
        let cancelled = row
            .first(&c.cancellation)
            .is_some_and(|reason| !reason.trim().is_empty());

        let category = categorize(&payment_condition, cancelled, self.is_confirmed_paid(&number));
        let amount = match category {
            InvoiceCategory::Paid | InvoiceCategory::Deferred | InvoiceCategory::Pending => {
                parse_currency(Some(&total_display))
            }
            InvoiceCategory::Returned | InvoiceCategory::Other => 0.0,
        };

        ClassifiedInvoice {
            record: InvoiceRecord {
                number,
                customer_code: to_upper_or_default(row.first(&c.customer)),
                legal_name: to_upper_or_default(row.first(&c.legal_name)),
                payment_condition,
                total_display,
                status_label: category.label().to_string(),
                category,
            },
            amount,
        }
    }
}

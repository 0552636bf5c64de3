//! Map reconciliation: one [`MapRecord`] per distinct key of the status source.
//!
//! Every secondary source is a left join on the normalized map key. A missing
//! join target degrades to defaults (placeholder driver/plate, `--:--` timing
//! cells, an empty invoice list) and is never an error.

use std::collections::HashSet;

use log::{debug, warn};

use crate::classify::InvoiceClassifier;
use crate::config::{ReconConfig, TimingLayout};
use crate::model::{FinancialSummary, MapRecord, TimingLog};
use crate::normalize::{
    is_blank, is_time_empty, normalize, parse_currency, to_upper_or_default, try_parse_local_date,
    EMPTY_TIME, PLACEHOLDER,
};
use crate::table::{KeyIndex, Record, SourceSet};

const OPEN_STATUS: &str = "aberto";

pub struct MapReconciler<'a> {
    config: &'a ReconConfig,
    sources: &'a SourceSet,
    status_raw: KeyIndex,
    timing: KeyIndex,
    assignment: KeyIndex,
    invoices: KeyIndex,
    classifier: InvoiceClassifier,
}

impl<'a> MapReconciler<'a> {
    /// Build every join index for the pass.
    pub fn new(config: &'a ReconConfig, sources: &'a SourceSet) -> Self {
        let columns = &config.columns;
        let timing = sources.timing_log.index_raw(config.timing_log.key);
        if timing.is_empty() && !sources.timing_log.is_empty() {
            warn!("timing log: no map keys in column {}", config.timing_log.key);
        }
        let invoices = sources.invoices.index_records(&columns.invoices.map_id);
        debug!("join keys: {} timing, {} invoice", timing.len(), invoices.len());

        Self {
            config,
            sources,
            status_raw: sources.status.index_raw(columns.status.raw_key),
            timing,
            assignment: sources.driver_assignment.index_records(&columns.driver_assignment.map_id),
            invoices,
            classifier: InvoiceClassifier::new(
                columns,
                &sources.condition_lookup,
                &sources.payment_confirmations,
            ),
        }
    }

    /// Reconcile every status row, in status-source order. Rows without a
    /// usable key are dropped; a repeated key keeps its first row.
    pub fn reconcile_all(&self) -> Vec<MapRecord> {
        let mut seen = HashSet::new();
        let mut maps = Vec::new();

        for row in self.sources.status.records() {
            let key = normalize(row.first(&self.config.columns.status.map_id).unwrap_or(""));
            if key.is_empty() {
                continue;
            }
            if !seen.insert(key.clone()) {
                debug!("status: duplicate map key {key}, keeping first row");
                continue;
            }
            maps.push(self.reconcile(&key, &row));
        }

        maps
    }

    /// Assemble the record for one status row whose normalized key is `key`.
    pub fn reconcile(&self, key: &str, status_row: &Record<'_>) -> MapRecord {
        let cols = &self.config.columns;

        let id = status_row
            .first(&cols.status.map_id)
            .unwrap_or("")
            .trim()
            .replace('.', "");
        let status = status_row.first(&cols.status.situation).unwrap_or("").trim().to_string();
        let total_value = status_row
            .first(&cols.status.total_value)
            .unwrap_or("0,00")
            .to_string();

        let issue_date_label = self
            .status_raw
            .first(key)
            .and_then(|i| self.sources.status.raw_row(i))
            .and_then(|row| row.get(cols.status.issue_date))
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
            .unwrap_or(PLACEHOLDER)
            .to_string();
        let issue_date = try_parse_local_date(&issue_date_label);

        let timing_row = self
            .timing
            .first(key)
            .and_then(|i| self.sources.timing_log.raw_row(i));
        let timing = timing_row
            .map(|row| read_timing(row, &self.config.timing_log))
            .unwrap_or_default();

        let assignment = self
            .assignment
            .first(key)
            .and_then(|i| self.sources.driver_assignment.record(i));
        let driver = to_upper_or_default(assignment.and_then(|r| r.first(&cols.driver_assignment.driver)));
        let plate = to_upper_or_default(assignment.and_then(|r| r.first(&cols.driver_assignment.plate)));

        let mut financial = FinancialSummary::default();
        let mut invoices = Vec::new();
        for &i in self.invoices.all(key) {
            let Some(row) = self.sources.invoices.record(i) else {
                continue;
            };
            let classified = self.classifier.classify(&row);
            financial.add(classified.record.category, classified.amount);
            invoices.push(classified.record);
        }

        let is_open = status.to_lowercase() == OPEN_STATUS;
        let is_auto_reopened = is_open
            && timing_row.is_some_and(|row| {
                trail_complete(row, &self.config.timing_log.auto_reopen_columns)
            });
        let is_pickup_only = is_blank(&driver)
            && is_blank(&plate)
            && parse_currency(Some(&total_value)) == 0.0;

        MapRecord {
            id,
            status,
            total_value,
            issue_date_label,
            issue_date,
            driver,
            plate,
            timing,
            financial,
            invoices,
            is_auto_reopened,
            is_pickup_only,
        }
    }
}

fn time_cell(row: &[String], column: usize) -> String {
    row.get(column)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .unwrap_or(EMPTY_TIME)
        .to_string()
}

fn read_timing(row: &[String], layout: &TimingLayout) -> TimingLog {
    TimingLog {
        load: time_cell(row, layout.load),
        depart: time_cell(row, layout.depart),
        arrive: time_cell(row, layout.arrive),
        physical_confirm: time_cell(row, layout.physical_confirm),
        financial_confirm: time_cell(row, layout.financial_confirm),
        physical_duration: time_cell(row, layout.physical_duration),
        financial_duration: time_cell(row, layout.financial_duration),
        internal_duration: time_cell(row, layout.internal_duration),
    }
}

/// Every checked column of the timing row holds a recorded value.
fn trail_complete(row: &[String], columns: &[usize]) -> bool {
    columns
        .iter()
        .all(|&c| !is_time_empty(row.get(c).map(String::as_str).unwrap_or("")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InvoiceCategory, ReconInput, SourceKind};

    const STATUS: &str = "\
Mapa,Situacao,Valor Total,Data Emissao
0001,Aberto,\"1.500,00\",10/03/2026
0.002,Liberado,\"0,00\",11/03/2026
0001,Concluido,\"9,00\",12/03/2026
,Aberto,\"1,00\",12/03/2026
";

    // Columns: key, 5 filler columns, then load..internal at 6..14
    const TIMING: &str = "\
0001,a,b,c,d,e,06:00,07:00,12:00,13:00,14:00,15:00,01:00,02:00,03:00
0002,a,b,c,d,e,06:30,00:00,--:--,,,,,,
";

    const ESCALA: &str = "\
Mapa,Nome Motorista,Placa
1,joão da silva,abc1d23
";

    const FAT: &str = "\
Mapa,Nota,Cliente,Nome,Cond. pagt,Mot. Cancelamento,Total
0001,100,c1,Loja A,boleto,,\"1.000,00\"
0001,101,c2,Loja B,pix,,\"250,50\"
0001,102,c3,Loja C,pix,avaria,\"80,00\"
0009,900,c9,Loja Z,pix,,\"1,00\"
";

    fn sources() -> SourceSet {
        SourceSet::from_input(
            &ReconInput::new()
                .with(SourceKind::Status, STATUS)
                .with(SourceKind::TimingLog, TIMING)
                .with(SourceKind::DriverAssignment, ESCALA)
                .with(SourceKind::Invoices, FAT),
        )
    }

    #[test]
    fn one_record_per_distinct_key() {
        let config = ReconConfig::default();
        let sources = sources();
        let maps = MapReconciler::new(&config, &sources).reconcile_all();
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].id, "0001");
        assert_eq!(maps[0].status, "Aberto");
        assert_eq!(maps[1].id, "0002");
    }

    #[test]
    fn joins_all_sources() {
        let config = ReconConfig::default();
        let sources = sources();
        let maps = MapReconciler::new(&config, &sources).reconcile_all();
        let m = &maps[0];

        assert_eq!(m.issue_date_label, "10/03/2026");
        assert_eq!(m.issue_date, chrono::NaiveDate::from_ymd_opt(2026, 3, 10));
        assert_eq!(m.total_value, "1.500,00");
        assert_eq!(m.driver, "JOÃO DA SILVA");
        assert_eq!(m.plate, "ABC1D23");
        assert_eq!(m.timing.load, "06:00");
        assert_eq!(m.timing.depart, "07:00");
        assert_eq!(m.timing.financial_confirm, "14:00");
        assert_eq!(m.timing.physical_duration, "01:00");
        assert_eq!(m.timing.internal_duration, "03:00");

        assert_eq!(m.invoices.len(), 3);
        assert_eq!(m.invoices[0].number, "100");
        assert_eq!(m.invoices[0].category, InvoiceCategory::Deferred);
        assert_eq!(m.invoices[1].category, InvoiceCategory::Pending);
        assert_eq!(m.invoices[2].category, InvoiceCategory::Returned);
        assert_eq!(m.financial.deferred, 1000.0);
        assert_eq!(m.financial.pending, 250.5);
        assert_eq!(m.financial.paid, 0.0);

        assert!(m.is_auto_reopened);
        assert!(!m.is_pickup_only);
    }

    #[test]
    fn missing_join_targets_degrade_to_defaults() {
        let config = ReconConfig::default();
        let sources = sources();
        let maps = MapReconciler::new(&config, &sources).reconcile_all();
        let m = &maps[1];

        assert_eq!(m.id, "0002");
        assert_eq!(m.driver, "---");
        assert_eq!(m.plate, "---");
        assert!(m.invoices.is_empty());
        assert!(m.financial.is_zero());
        assert_eq!(m.timing.load, "06:30");
        assert_eq!(m.timing.depart, "00:00");
        assert_eq!(m.timing.arrive, "--:--");
        assert_eq!(m.timing.physical_confirm, "--:--");
        assert!(!m.is_auto_reopened);
        assert!(m.is_pickup_only);
    }

    #[test]
    fn absent_timing_row_is_not_auto_reopened() {
        let config = ReconConfig::default();
        let sources = SourceSet::from_input(
            &ReconInput::new().with(SourceKind::Status, "Mapa,Situacao\n7,Aberto\n"),
        );
        let maps = MapReconciler::new(&config, &sources).reconcile_all();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].timing, TimingLog::default());
        assert!(!maps[0].is_auto_reopened);
        assert_eq!(maps[0].issue_date_label, "---");
        assert_eq!(maps[0].issue_date, None);
        assert_eq!(maps[0].total_value, "0,00");
        assert!(maps[0].is_pickup_only);
    }

    #[test]
    fn timing_log_without_keys_joins_nothing() {
        let config = ReconConfig::default();
        let sources = SourceSet::from_input(
            &ReconInput::new()
                .with(SourceKind::Status, "Mapa,Situacao\n7,Aberto\n")
                .with(SourceKind::TimingLog, ",06:00,07:00\n,08:00,09:00\n"),
        );
        let reconciler = MapReconciler::new(&config, &sources);
        assert!(reconciler.timing.is_empty());
        assert_eq!(reconciler.timing.len(), 0);

        let maps = reconciler.reconcile_all();
        assert_eq!(maps[0].timing, TimingLog::default());
        assert!(!maps[0].is_auto_reopened);
    }

    #[test]
    fn auto_reopen_requires_open_status() {
        let config = ReconConfig::default();
        let status = "Mapa,Situacao\n1,Liberado\n";
        let sources = SourceSet::from_input(
            &ReconInput::new()
                .with(SourceKind::Status, status)
                .with(SourceKind::TimingLog, TIMING),
        );
        let maps = MapReconciler::new(&config, &sources).reconcile_all();
        assert!(!maps[0].is_auto_reopened);
    }

    #[test]
    fn auto_reopen_checks_configured_columns() {
        let mut config = ReconConfig::default();
        // Column 11 empty breaks the default trail...
        let timing = "1,a,b,c,d,e,06:00,07:00,12:00,13:00,14:00,,01:00,02:00,03:00\n";
        let status = "Mapa,Situacao\n1,ABERTO\n";
        let sources = SourceSet::from_input(
            &ReconInput::new()
                .with(SourceKind::Status, status)
                .with(SourceKind::TimingLog, timing),
        );
        assert!(!MapReconciler::new(&config, &sources).reconcile_all()[0].is_auto_reopened);

        // ...unless it is dropped from the checked set
        config.timing_log.auto_reopen_columns = vec![7, 8, 9, 10, 13, 14];
        assert!(MapReconciler::new(&config, &sources).reconcile_all()[0].is_auto_reopened);
    }

    #[test]
    fn pickup_needs_zero_total_and_no_crew() {
        let config = ReconConfig::default();
        let status = "Mapa,Situacao,Valor Total\n1,Aberto,\"0,00\"\n2,Aberto,\"0,00\"\n3,Aberto,\"5,00\"\n";
        let escala = "Mapa,Nome Motorista,Placa\n1, , \n2,,XYZ9876\n";
        let sources = SourceSet::from_input(
            &ReconInput::new()
                .with(SourceKind::Status, status)
                .with(SourceKind::DriverAssignment, escala),
        );
        let maps = MapReconciler::new(&config, &sources).reconcile_all();
        assert!(maps[0].is_pickup_only);
        assert!(!maps[1].is_pickup_only);
        assert!(!maps[2].is_pickup_only);
    }
}

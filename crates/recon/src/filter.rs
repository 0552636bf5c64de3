//! Category filtering and free-text search over reconciled maps.

use chrono::NaiveDate;

use crate::aggregate::{belongs_to, DateStanding};
use crate::model::{Category, MapRecord};
use crate::normalize::format_local_date;

/// Maps in `category` that match `search`, in input order.
///
/// A category selects exactly the maps it counts. The search term is
/// uppercased and matched as a substring of the map id, driver, plate and of
/// each invoice's number, customer code and legal name. An empty or
/// whitespace-only term matches everything.
pub fn filter_maps<'a>(
    maps: &'a [MapRecord],
    category: Category,
    search: &str,
    today: NaiveDate,
) -> Vec<&'a MapRecord> {
    let today_label = format_local_date(today);
    let term = search.trim().to_uppercase();

    maps.iter()
        .filter(|m| belongs_to(category, m, DateStanding::of(m, today, &today_label)))
        .filter(|m| term.is_empty() || matches_search(m, &term))
        .collect()
}

/// `term` must already be uppercased.
pub fn matches_search(map: &MapRecord, term: &str) -> bool {
    map.id.contains(term)
        || map.driver.contains(term)
        || map.plate.contains(term)
        || map.invoices.iter().any(|i| {
            i.number.contains(term) || i.customer_code.contains(term) || i.legal_name.contains(term)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FinancialSummary, InvoiceCategory, InvoiceRecord, TimingLog};
    use crate::normalize::try_parse_local_date;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn map(id: &str, status: &str, issue: &str, driver: &str) -> MapRecord {
        MapRecord {
            id: id.into(),
            status: status.into(),
            total_value: "1,00".into(),
            issue_date_label: issue.into(),
            issue_date: try_parse_local_date(issue),
            driver: driver.into(),
            plate: "ABC1234".into(),
            timing: TimingLog::default(),
            financial: FinancialSummary::default(),
            invoices: vec![InvoiceRecord {
                number: format!("9{id}"),
                customer_code: "C77".into(),
                legal_name: format!("MERCADO {id}"),
                payment_condition: "PIX".into(),
                total_display: "1,00".into(),
                status_label: "PENDENTE".into(),
                category: InvoiceCategory::Pending,
            }],
            is_auto_reopened: false,
            is_pickup_only: false,
        }
    }

    fn fleet() -> Vec<MapRecord> {
        vec![
            map("100", "Aberto", "10/03/2026", "ANA"),
            map("200", "Liberado", "09/03/2026", "BRUNO"),
            map("300", "Aberto", "11/03/2026", "CARLA"),
        ]
    }

    fn ids(maps: Vec<&MapRecord>) -> Vec<&str> {
        maps.into_iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn category_selects_counted_maps() {
        let maps = fleet();
        assert_eq!(ids(filter_maps(&maps, Category::All, "", today())), ["100", "200"]);
        assert_eq!(ids(filter_maps(&maps, Category::Open, "", today())), ["100"]);
        assert_eq!(ids(filter_maps(&maps, Category::PriorDays, "", today())), ["200"]);
        assert_eq!(ids(filter_maps(&maps, Category::Future, "", today())), ["300"]);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let maps = fleet();
        assert_eq!(ids(filter_maps(&maps, Category::All, "bru", today())), ["200"]);
        assert_eq!(ids(filter_maps(&maps, Category::All, "mercado 1", today())), ["100"]);
        assert_eq!(ids(filter_maps(&maps, Category::All, "9200", today())), ["200"]);
        assert_eq!(ids(filter_maps(&maps, Category::All, "c77", today())), ["100", "200"]);
        assert_eq!(ids(filter_maps(&maps, Category::All, "  ", today())), ["100", "200"]);
        assert!(filter_maps(&maps, Category::All, "zzz", today()).is_empty());
    }

    #[test]
    fn search_composes_with_category() {
        let maps = fleet();
        assert!(filter_maps(&maps, Category::Open, "bruno", today()).is_empty());
        assert_eq!(ids(filter_maps(&maps, Category::Future, "carla", today())), ["300"]);
    }
}

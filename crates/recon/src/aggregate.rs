use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::Labels;
use crate::model::{AggregateResult, Category, MapRecord, ReconMeta};
use crate::normalize::{format_local_date, is_time_empty};

/// Where a map's issue date falls relative to the anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateStanding {
    pub is_today: bool,
    pub is_future: bool,
}

impl DateStanding {
    /// An unknown issue date is neither today nor future.
    pub fn of(map: &MapRecord, today: NaiveDate, today_label: &str) -> Self {
        let is_today = map.issue_date_label == today_label || map.issue_date == Some(today);
        let is_future = map.issue_date.is_some_and(|d| d > today);
        Self { is_today, is_future }
    }
}

/// Whether `map` is counted under `category`. Every category but
/// [`Category::Future`] excludes future-dated maps.
pub fn belongs_to(category: Category, map: &MapRecord, standing: DateStanding) -> bool {
    if standing.is_future {
        return category == Category::Future;
    }

    let status = map.status_lower();
    let t = &map.timing;
    match category {
        Category::All => true,
        Category::PriorDays => !standing.is_today,
        Category::Open => status == "aberto",
        Category::Released => status == "liberado" || status == "concluido",
        Category::FinanceReleased => status == "financeiro liberado",
        Category::NotDeparted => is_time_empty(&t.depart),
        Category::EnRoute => {
            !is_time_empty(&t.depart)
                && is_time_empty(&t.arrive)
                && is_time_empty(&t.physical_confirm)
                && is_time_empty(&t.financial_confirm)
        }
        Category::PhysicalDelay => {
            !is_time_empty(&t.arrive) && is_time_empty(&t.physical_confirm) && status == "aberto"
        }
        Category::AutoReopened => map.is_auto_reopened,
        Category::NonFinancial => map.is_non_financial(),
        Category::Future => false,
    }
}

/// Categories `map` is counted under, in [`Category::ALL`] order.
pub fn categories_of(map: &MapRecord, standing: DateStanding) -> impl Iterator<Item = Category> + '_ {
    Category::ALL
        .into_iter()
        .filter(move |c| belongs_to(*c, map, standing))
}

/// Accumulates category counts and the earliest future issue date over a
/// pass's maps.
#[derive(Debug)]
pub struct Aggregator {
    today: NaiveDate,
    today_label: String,
    maps: Vec<MapRecord>,
    counts: BTreeMap<Category, usize>,
    earliest_future: Option<(NaiveDate, String)>,
}

impl Aggregator {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            today_label: format_local_date(today),
            maps: Vec::new(),
            counts: Category::ALL.into_iter().map(|c| (c, 0)).collect(),
            earliest_future: None,
        }
    }

    pub fn push(&mut self, map: MapRecord) {
        let standing = DateStanding::of(&map, self.today, &self.today_label);

        for category in categories_of(&map, standing) {
            *self.counts.entry(category).or_insert(0) += 1;
        }

        if standing.is_future {
            if let Some(date) = map.issue_date {
                let earlier = self.earliest_future.as_ref().map_or(true, |(d, _)| date < *d);
                if earlier {
                    self.earliest_future = Some((date, map.issue_date_label.clone()));
                }
            }
        }

        self.maps.push(map);
    }

    pub fn finish(self, labels: &Labels, meta: ReconMeta) -> AggregateResult {
        let future_label = match self.earliest_future {
            Some((_, label)) => format!("{} {label}", labels.future_prefix),
            None => labels.future_default.clone(),
        };

        AggregateResult {
            meta,
            maps: self.maps,
            counts: self
                .counts
                .into_iter()
                .map(|(c, n)| (c.key().to_string(), n))
                .collect(),
            future_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FinancialSummary, InvoiceCategory, InvoiceRecord, TimingLog};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn map(status: &str, issue: &str) -> MapRecord {
        MapRecord {
            id: "1".into(),
            status: status.into(),
            total_value: "10,00".into(),
            issue_date_label: issue.into(),
            issue_date: crate::normalize::try_parse_local_date(issue),
            driver: "FULANO".into(),
            plate: "ABC1234".into(),
            timing: TimingLog::default(),
            financial: FinancialSummary::default(),
            invoices: Vec::new(),
            is_auto_reopened: false,
            is_pickup_only: false,
        }
    }

    fn invoice(category: InvoiceCategory) -> InvoiceRecord {
        InvoiceRecord {
            number: "1".into(),
            customer_code: "C".into(),
            legal_name: "L".into(),
            payment_condition: "X".into(),
            total_display: "1,00".into(),
            status_label: category.label().into(),
            category,
        }
    }

    fn categories(map: &MapRecord) -> Vec<Category> {
        let standing = DateStanding::of(map, today(), &format_local_date(today()));
        categories_of(map, standing).collect()
    }

    fn meta() -> ReconMeta {
        ReconMeta {
            engine_version: "test".into(),
            today: today(),
            sources_loaded: vec![],
        }
    }

    #[test]
    fn today_open_map() {
        let cats = categories(&map("Aberto", "10/03/2026"));
        assert_eq!(
            cats,
            vec![Category::All, Category::Open, Category::NotDeparted, Category::NonFinancial]
        );
    }

    #[test]
    fn prior_day_released_map() {
        let cats = categories(&map("CONCLUIDO", "09/03/2026"));
        assert!(cats.contains(&Category::All));
        assert!(cats.contains(&Category::PriorDays));
        assert!(cats.contains(&Category::Released));
        assert!(!cats.contains(&Category::Open));
    }

    #[test]
    fn future_map_is_only_future() {
        let mut m = map("Aberto", "11/03/2026");
        m.is_auto_reopened = true;
        assert_eq!(categories(&m), vec![Category::Future]);
    }

    #[test]
    fn unknown_issue_date_counts_as_prior() {
        let cats = categories(&map("financeiro liberado", "---"));
        assert!(cats.contains(&Category::PriorDays));
        assert!(cats.contains(&Category::FinanceReleased));
        assert!(!cats.contains(&Category::Future));
    }

    #[test]
    fn unpadded_labels_compare_by_calendar_date() {
        let same_day = map("Aberto", "10/3/2026");
        let cats = categories(&same_day);
        assert!(cats.contains(&Category::All));
        assert!(!cats.contains(&Category::PriorDays));

        assert_eq!(categories(&map("Aberto", "11/3/2026")), vec![Category::Future]);
        assert!(categories(&map("Aberto", "9/3/2026")).contains(&Category::PriorDays));

        let mut agg = Aggregator::new(today());
        agg.push(same_day);
        agg.push(map("Aberto", "11/3/2026"));
        agg.push(map("Aberto", "---"));
        let result = agg.finish(&Labels::default(), meta());
        assert_eq!(result.count(Category::All), 2);
        assert_eq!(result.count(Category::PriorDays), 1);
        assert_eq!(result.count(Category::Future), 1);
        assert_eq!(result.future_label, "FAT 11/3/2026");
    }

    #[test]
    fn timing_categories() {
        let mut en_route = map("Aberto", "10/03/2026");
        en_route.timing.depart = "07:00".into();
        let cats = categories(&en_route);
        assert!(cats.contains(&Category::EnRoute));
        assert!(!cats.contains(&Category::NotDeparted));
        assert!(!cats.contains(&Category::PhysicalDelay));

        let mut delayed = en_route.clone();
        delayed.timing.arrive = "12:00".into();
        let cats = categories(&delayed);
        assert!(cats.contains(&Category::PhysicalDelay));
        assert!(!cats.contains(&Category::EnRoute));

        delayed.status = "Liberado".into();
        assert!(!categories(&delayed).contains(&Category::PhysicalDelay));
    }

    #[test]
    fn non_financial_requires_only_other_invoices() {
        let mut m = map("Aberto", "10/03/2026");
        m.invoices = vec![invoice(InvoiceCategory::Other), invoice(InvoiceCategory::Other)];
        assert!(categories(&m).contains(&Category::NonFinancial));

        m.invoices.push(invoice(InvoiceCategory::Returned));
        assert!(!categories(&m).contains(&Category::NonFinancial));
    }

    #[test]
    fn counts_and_earliest_future_label() {
        let mut agg = Aggregator::new(today());
        agg.push(map("Aberto", "10/03/2026"));
        agg.push(map("Liberado", "01/03/2026"));
        agg.push(map("Aberto", "20/03/2026"));
        agg.push(map("Aberto", "12/03/2026"));
        let result = agg.finish(&Labels::default(), meta());

        assert_eq!(result.maps.len(), 4);
        assert_eq!(result.count(Category::All), 2);
        assert_eq!(result.count(Category::PriorDays), 1);
        assert_eq!(result.count(Category::Open), 1);
        assert_eq!(result.count(Category::Released), 1);
        assert_eq!(result.count(Category::Future), 2);
        assert_eq!(result.count(Category::AutoReopened), 0);
        assert_eq!(result.counts.len(), Category::ALL.len());
        assert_eq!(result.future_label, "FAT 12/03/2026");
    }

    #[test]
    fn default_future_label() {
        let mut agg = Aggregator::new(today());
        agg.push(map("Aberto", "10/03/2026"));
        let result = agg.finish(&Labels::default(), meta());
        assert_eq!(result.future_label, "FAT FUTUROS");
        assert_eq!(result.count(Category::Future), 0);
    }
}

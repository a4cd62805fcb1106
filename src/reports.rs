use crate::features::DeriveReport;
use crate::filter::Filter;
use crate::loader::CleanReport;
use crate::types::{
    AggregateSummary, CorrelationPair, CorrelationPairRow, DerivedRecord, DerivedRow,
    GroupMetrics, GroupSummaryRow, Insights, KeyMetricDelta, KeyMetricRow,
};
use crate::util::{
    average, format_delta, format_int, format_metric, format_number, median, std_dev, NO_DATA,
};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct Acc {
    prices: Vec<f64>,
    sizes: Vec<f64>,
    pps: Vec<f64>,
}

impl Acc {
    fn push(&mut self, d: &DerivedRecord) {
        self.prices.push(d.record.price);
        self.sizes.push(d.record.size_sqft);
        self.pps.push(d.price_per_sqft);
    }

    fn finish(self, key: String) -> GroupMetrics {
        GroupMetrics {
            key,
            count: self.prices.len(),
            mean_price: average(&self.prices),
            mean_size: average(&self.sizes),
            mean_price_per_sqft: average(&self.pps),
            std_price: std_dev(&self.prices),
            median_price: median(self.prices),
        }
    }
}

/// Group rows by `key`, keeping groups in order of first appearance.
fn group_by<F>(rows: &[&DerivedRecord], key: F) -> Vec<GroupMetrics>
where
    F: Fn(&DerivedRecord) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Acc)> = Vec::new();
    for &d in rows {
        let k = key(d);
        let slot = match index.get(&k) {
            Some(&i) => i,
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, Acc::default()));
                groups.len() - 1
            }
        };
        groups[slot].1.push(d);
    }
    groups.into_iter().map(|(k, acc)| acc.finish(k)).collect()
}

/// Most frequent BHK; ties go to the smaller value.
fn modal_bhk(rows: &[&DerivedRecord]) -> Option<u32> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for d in rows {
        *counts.entry(d.record.bhk).or_default() += 1;
    }
    let mut best: Option<(u32, usize)> = None;
    for (bhk, n) in counts {
        if best.map_or(true, |(_, m)| n > m) {
            best = Some((bhk, n));
        }
    }
    best.map(|(bhk, _)| bhk)
}

/// The Aggregator. With a filter, only matching rows contribute.
pub fn aggregate(data: &[DerivedRecord], filter: Option<&Filter>) -> AggregateSummary {
    let rows: Vec<&DerivedRecord> = data
        .iter()
        .filter(|d| filter.map_or(true, |f| f.matches(&d.record)))
        .collect();

    let prices: Vec<f64> = rows.iter().map(|d| d.record.price).collect();
    let sizes: Vec<f64> = rows.iter().map(|d| d.record.size_sqft).collect();
    let pps: Vec<f64> = rows.iter().map(|d| d.price_per_sqft).collect();

    AggregateSummary {
        total_count: rows.len(),
        mean_price: average(&prices),
        mean_size: average(&sizes),
        mean_price_per_sqft: average(&pps),
        modal_bhk: modal_bhk(&rows),
        good_investment_count: rows.iter().filter(|d| d.good_investment).count(),
        by_city: group_by(&rows, |d| d.record.city.clone()),
        by_property_type: group_by(&rows, |d| d.record.property_type.clone()),
        by_bhk: group_by(&rows, |d| d.record.bhk.to_string()),
    }
}

// ---- Presentation helpers -------------------------------------------------

pub fn group_rows(groups: &[GroupMetrics]) -> Vec<GroupSummaryRow> {
    groups
        .iter()
        .map(|g| GroupSummaryRow {
            group: g.key.clone(),
            count: g.count,
            avg_price: format_metric(g.mean_price, 2),
            median_price: format_metric(g.median_price, 2),
            std_price: format_metric(g.std_price, 2),
            avg_size: format_metric(g.mean_size, 2),
            avg_price_per_sqft: format_metric(g.mean_price_per_sqft, 2),
        })
        .collect()
}

pub fn derived_rows(data: &[DerivedRecord]) -> Vec<DerivedRow> {
    data.iter()
        .map(|d| DerivedRow {
            city: d.record.city.clone(),
            property_type: d.record.property_type.clone(),
            bhk: d.record.bhk,
            size_sqft: format_number(d.record.size_sqft, 2),
            price: format_number(d.record.price, 2),
            price_per_sqft: format_number(d.price_per_sqft, 2),
            age_of_property: format_number(d.age_of_property, 1),
            amenities_count: d.record.amenities_count,
            investment_score: format!("{:.4}", d.investment_score),
            good_investment: if d.good_investment { "Yes" } else { "No" }.to_string(),
        })
        .collect()
}

pub const METRIC_COUNT: &str = "Total Properties";
pub const METRIC_PRICE: &str = "Avg Price";
pub const METRIC_SIZE: &str = "Avg Size (sq ft)";
pub const METRIC_PPSF: &str = "Avg Price/Sq Ft";

/// Headline metrics of `current` against the same metrics over `baseline`
/// (normally the unfiltered dataset).
pub fn key_metric_deltas(
    current: &AggregateSummary,
    baseline: &AggregateSummary,
) -> Vec<KeyMetricDelta> {
    let delta = |metric: &str, current: Option<f64>, baseline: Option<f64>| KeyMetricDelta {
        metric: metric.to_string(),
        current,
        baseline,
        delta: current.zip(baseline).map(|(c, b)| c - b),
    };
    vec![
        delta(
            METRIC_COUNT,
            Some(current.total_count as f64),
            Some(baseline.total_count as f64),
        ),
        delta(METRIC_PRICE, current.mean_price, baseline.mean_price),
        delta(METRIC_SIZE, current.mean_size, baseline.mean_size),
        delta(
            METRIC_PPSF,
            current.mean_price_per_sqft,
            baseline.mean_price_per_sqft,
        ),
    ]
}

/// Headline metric table. The change column is left blank when the view
/// covers the same rows as the baseline.
pub fn key_metric_rows(s: &AggregateSummary, deltas: &[KeyMetricDelta]) -> Vec<KeyMetricRow> {
    let unchanged = deltas
        .iter()
        .find(|d| d.metric == METRIC_COUNT)
        .map_or(true, |d| d.delta == Some(0.0));
    let change = |metric: &str, decimals: usize| -> String {
        if unchanged {
            return String::new();
        }
        deltas
            .iter()
            .find(|d| d.metric == metric)
            .map(|d| format_delta(d.delta, decimals))
            .unwrap_or_default()
    };
    let row = |metric: &str, value: String, change: String| KeyMetricRow {
        metric: metric.to_string(),
        value,
        change,
    };
    vec![
        row(METRIC_COUNT, format_int(s.total_count), change(METRIC_COUNT, 0)),
        row(METRIC_PRICE, format_metric(s.mean_price, 2), change(METRIC_PRICE, 2)),
        row(METRIC_SIZE, format_metric(s.mean_size, 2), change(METRIC_SIZE, 2)),
        row(METRIC_PPSF, format_metric(s.mean_price_per_sqft, 2), change(METRIC_PPSF, 2)),
        row(
            "Most Common BHK",
            s.modal_bhk
                .map(|b| b.to_string())
                .unwrap_or_else(|| NO_DATA.to_string()),
            String::new(),
        ),
        row(
            "Good Investments",
            format_int(s.good_investment_count),
            String::new(),
        ),
    ]
}

pub fn correlation_rows(pairs: &[CorrelationPair]) -> Vec<CorrelationPairRow> {
    pairs
        .iter()
        .map(|p| CorrelationPairRow {
            variables: format!("{} / {}", p.left, p.right),
            coefficient: format!("{:.3}", p.coefficient),
        })
        .collect()
}

/// Everything written to `summary.json`.
#[derive(Debug, Serialize)]
pub struct SummaryReport<'a> {
    pub generated_at: DateTime<Local>,
    pub filter: &'a Filter,
    pub cleaning: &'a CleanReport,
    pub derivation: &'a DeriveReport,
    pub summary: &'a AggregateSummary,
    pub key_metrics: &'a [KeyMetricDelta],
    pub insights: &'a Insights,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{derive_features, ScoringParams};
    use crate::types::PropertyRecord;

    fn rec(city: &str, ptype: &str, bhk: u32, price: f64, size: f64) -> PropertyRecord {
        PropertyRecord {
            city: city.to_string(),
            property_type: ptype.to_string(),
            bhk,
            size_sqft: size,
            price,
            age_years: 2.0,
            amenities_count: 1,
        }
    }

    fn derived(records: &[PropertyRecord]) -> Vec<DerivedRecord> {
        derive_features(records, &ScoringParams::default()).0
    }

    #[test]
    fn pune_example_means() {
        let data = derived(&[
            rec("Pune", "Flat", 2, 5_000_000.0, 1000.0),
            rec("Pune", "Flat", 2, 7_000_000.0, 1000.0),
        ]);
        let s = aggregate(&data, None);
        let pune = s.city("Pune").unwrap();
        assert_eq!(pune.count, 2);
        assert_eq!(pune.mean_price_per_sqft, Some(6000.0));
        assert_eq!(pune.median_price, Some(6_000_000.0));
        assert_eq!(s.mean_price_per_sqft, Some(6000.0));
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let data = derived(&[
            rec("Delhi", "Villa", 3, 10.0, 1.0),
            rec("Agra", "Flat", 1, 10.0, 1.0),
            rec("Delhi", "Flat", 2, 20.0, 1.0),
            rec("Chennai", "Villa", 3, 10.0, 1.0),
        ]);
        let s = aggregate(&data, None);
        let cities: Vec<&str> = s.by_city.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(cities, vec!["Delhi", "Agra", "Chennai"]);
        let types: Vec<&str> = s.by_property_type.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(types, vec!["Villa", "Flat"]);
        let bhk: Vec<&str> = s.by_bhk.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(bhk, vec!["3", "1", "2"]);
        assert_eq!(s.modal_bhk, Some(3));
    }

    #[test]
    fn modal_bhk_tie_prefers_smaller() {
        let data = derived(&[
            rec("A", "Flat", 3, 10.0, 1.0),
            rec("A", "Flat", 1, 11.0, 1.0),
        ]);
        assert_eq!(aggregate(&data, None).modal_bhk, Some(1));
    }

    #[test]
    fn empty_input_is_no_data() {
        let s = aggregate(&[], None);
        assert!(s.is_empty());
        assert_eq!(s.mean_price, None);
        assert_eq!(s.mean_size, None);
        assert_eq!(s.mean_price_per_sqft, None);
        assert_eq!(s.modal_bhk, None);
        assert!(s.by_city.is_empty());
    }

    #[test]
    fn unknown_city_filter_yields_empty_summary() {
        let data = derived(&[rec("Pune", "Flat", 2, 5_000_000.0, 1000.0)]);
        let s = aggregate(&data, Some(&Filter::new().cities(["Atlantis"])));
        assert_eq!(s.total_count, 0);
        assert_eq!(s.mean_price, None);
        assert_eq!(s.mean_price_per_sqft, None);
        let rows = key_metric_rows(&s, &[]);
        assert!(rows.iter().skip(1).take(4).all(|r| r.value == "N/A"));
        assert!(rows.iter().all(|r| r.change.is_empty()));
    }

    #[test]
    fn filter_restricts_rows() {
        let data = derived(&[
            rec("Pune", "Flat", 2, 100.0, 10.0),
            rec("Pune", "Flat", 3, 300.0, 10.0),
            rec("Goa", "Villa", 2, 500.0, 10.0),
        ]);
        let s = aggregate(&data, Some(&Filter::new().bhk([2])));
        assert_eq!(s.total_count, 2);
        assert_eq!(s.mean_price, Some(300.0));
    }

    #[test]
    fn deltas_against_full_dataset() {
        let data = derived(&[
            rec("Pune", "Flat", 2, 100.0, 10.0),
            rec("Pune", "Flat", 3, 300.0, 10.0),
            rec("Goa", "Villa", 2, 500.0, 20.0),
        ]);
        let full = aggregate(&data, None);
        let goa = aggregate(&data, Some(&Filter::new().cities(["goa"])));
        let deltas = key_metric_deltas(&goa, &full);
        assert_eq!(deltas[0].metric, METRIC_COUNT);
        assert_eq!(deltas[0].delta, Some(-2.0));
        assert_eq!(deltas[1].delta, Some(200.0));
        assert_eq!(deltas[2].current, Some(20.0));

        let rows = key_metric_rows(&goa, &deltas);
        assert_eq!(rows[0].change, "-2");
        assert_eq!(rows[1].change, "+200.00");

        let same = key_metric_rows(&full, &key_metric_deltas(&full, &full));
        assert!(same.iter().all(|r| r.change.is_empty()));
    }

    #[test]
    fn empty_slice_has_no_metric_deltas() {
        let data = derived(&[rec("Pune", "Flat", 2, 100.0, 10.0)]);
        let full = aggregate(&data, None);
        let none = aggregate(&data, Some(&Filter::new().cities(["Atlantis"])));
        let deltas = key_metric_deltas(&none, &full);
        assert_eq!(deltas[0].delta, Some(-1.0));
        assert!(deltas[1..].iter().all(|d| d.delta.is_none()));
        let rows = key_metric_rows(&none, &deltas);
        assert_eq!(rows[1].change, "N/A");
    }

    #[test]
    fn bhk_groups_report_price_spread() {
        let data = derived(&[
            rec("Pune", "Flat", 2, 100.0, 10.0),
            rec("Pune", "Flat", 2, 300.0, 10.0),
            rec("Goa", "Villa", 3, 500.0, 20.0),
        ]);
        let s = aggregate(&data, None);
        let two = s.by_bhk.iter().find(|g| g.key == "2").unwrap();
        let expected = 20_000f64.sqrt();
        assert!((two.std_price.unwrap() - expected).abs() < 1e-9);
        let three = s.by_bhk.iter().find(|g| g.key == "3").unwrap();
        assert_eq!(three.std_price, None);
        assert_eq!(group_rows(&s.by_bhk)[1].std_price, "N/A");
    }

    #[test]
    fn formats_group_rows() {
        let data = derived(&[rec("Pune", "Flat", 2, 5_000_000.0, 1000.0)]);
        let rows = group_rows(&aggregate(&data, None).by_city);
        assert_eq!(rows[0].avg_price, "5,000,000.00");
        assert_eq!(rows[0].avg_price_per_sqft, "5,000.00");
    }
}

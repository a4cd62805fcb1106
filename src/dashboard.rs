// The dataset plus a memo of computed views.
//
// Every view is a pure function of (dataset, scoring params, filter). The
// dataset carries a process-unique version, so cache entries from a previous
// load can never be served for a new one.
use crate::error::Result;
use crate::features::{derive_features, DeriveReport, ScoringParams};
use crate::filter::Filter;
use crate::insights::{generate_insights, DEFAULT_TOP_CITIES};
use crate::loader::{self, CleanReport};
use crate::reports::{aggregate, key_metric_deltas};
use crate::types::{AggregateSummary, DerivedRecord, Insights, KeyMetricDelta, PropertyRecord};
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Cleaned records from a single load.
#[derive(Debug, Clone)]
pub struct Dataset {
    version: u64,
    records: Vec<PropertyRecord>,
    report: CleanReport,
}

impl Dataset {
    pub fn new(records: Vec<PropertyRecord>, report: CleanReport) -> Self {
        Dataset {
            version: NEXT_VERSION.fetch_add(1, Ordering::Relaxed),
            records,
            report,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let (records, report) = loader::load_and_clean(path)?;
        Ok(Dataset::new(records, report))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let (records, report) = loader::load_and_clean_from(reader)?;
        Ok(Dataset::new(records, report))
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    pub fn clean_report(&self) -> &CleanReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Everything the display layer needs for one filter selection.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub filter: Filter,
    pub derived: Vec<DerivedRecord>,
    pub derive_report: DeriveReport,
    pub summary: AggregateSummary,
    /// Headline metrics against the unfiltered dataset.
    pub deltas: Vec<KeyMetricDelta>,
    pub insights: Insights,
}

/// Compute a view from scratch: filter, derive, aggregate. Normalization
/// inside the derive step sees only the filtered slice. Deltas are taken
/// against `baseline`, or against the view itself when there is none.
pub fn compute_view(
    dataset: &Dataset,
    filter: &Filter,
    params: &ScoringParams,
    top_cities: usize,
    baseline: Option<&AggregateSummary>,
) -> DashboardView {
    let selected: Vec<PropertyRecord> = dataset
        .records()
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();
    let (derived, derive_report) = derive_features(&selected, params);
    let summary = aggregate(&derived, None);
    let insights = generate_insights(
        &derived,
        &summary,
        selected.len(),
        dataset.len(),
        top_cities,
    );
    let deltas = key_metric_deltas(&summary, baseline.unwrap_or(&summary));
    DashboardView {
        filter: filter.clone(),
        derived,
        derive_report,
        summary,
        deltas,
        insights,
    }
}

type CacheKey = (u64, String);

pub struct Dashboard {
    dataset: Dataset,
    params: ScoringParams,
    top_cities: usize,
    capacity: usize,
    cache: HashMap<CacheKey, Arc<DashboardView>>,
    order: VecDeque<CacheKey>,
}

impl Dashboard {
    pub fn new(dataset: Dataset, params: ScoringParams) -> Self {
        Dashboard {
            dataset,
            params,
            top_cities: DEFAULT_TOP_CITIES,
            capacity: 32,
            cache: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_top_cities(mut self, n: usize) -> Self {
        self.top_cities = n;
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Swap in a freshly loaded dataset. Old cache entries are dropped.
    pub fn replace_dataset(&mut self, dataset: Dataset) {
        info!(
            old = self.dataset.version(),
            new = dataset.version(),
            "dataset replaced"
        );
        self.dataset = dataset;
        self.cache.clear();
        self.order.clear();
    }

    pub fn cached_views(&self) -> usize {
        self.cache.len()
    }

    /// Memoized [`compute_view`].
    pub fn view(&mut self, filter: &Filter) -> Arc<DashboardView> {
        let key = (self.dataset.version(), filter.cache_key());
        if let Some(hit) = self.cache.get(&key) {
            debug!(filter = %key.1, "view cache hit");
            return Arc::clone(hit);
        }

        let baseline = if filter.is_empty() {
            None
        } else {
            Some(self.view(&Filter::new()))
        };
        let view = Arc::new(compute_view(
            &self.dataset,
            filter,
            &self.params,
            self.top_cities,
            baseline.as_ref().map(|b| &b.summary),
        ));
        debug!(
            filter = %key.1,
            rows = view.summary.total_count,
            "view computed"
        );

        if self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.cache.remove(&evicted);
            }
        }
        self.order.push_back(key.clone());
        self.cache.insert(key, Arc::clone(&view));
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "city,property_type,bhk,size_sqft,price,age_years,amenities_count\n\
                       Pune,Flat,2,1000,5000000,3,4\n\
                       Pune,Flat,3,1000,7000000,8,2\n\
                       Mumbai,Villa,4,2000,20000000,1,6\n\
                       Goa,Villa,2,0,100,1,1\n";

    fn dashboard() -> Dashboard {
        Dashboard::new(Dataset::from_reader(CSV.as_bytes()).unwrap(), ScoringParams::default())
    }

    #[test]
    fn identical_filters_share_a_view() {
        let mut d = dashboard();
        let a = d.view(&Filter::new().cities(["pune"]));
        let b = d.view(&Filter::new().cities(["PUNE"]));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(d.cached_views(), 1);
        assert_eq!(a.summary.total_count, 2);
    }

    #[test]
    fn zero_size_row_is_counted_by_the_deriver() {
        let mut d = dashboard();
        assert_eq!(d.dataset().clean_report().dropped_rows(), 0);
        let v = d.view(&Filter::new());
        assert_eq!(v.derive_report.non_positive_size, 1);
        assert_eq!(v.summary.total_count, 3);
    }

    #[test]
    fn reload_invalidates_cache() {
        let mut d = dashboard();
        let before = d.view(&Filter::new());
        let old_version = d.dataset().version();
        d.replace_dataset(Dataset::from_reader(CSV.as_bytes()).unwrap());
        assert_ne!(d.dataset().version(), old_version);
        assert_eq!(d.cached_views(), 0);
        let after = d.view(&Filter::new());
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.summary, after.summary);
    }

    #[test]
    fn evicts_oldest_view() {
        let mut d = dashboard().with_capacity(2);
        let first = d.view(&Filter::new().bhk([2]));
        d.view(&Filter::new().bhk([3]));
        d.view(&Filter::new().bhk([4]));
        assert_eq!(d.cached_views(), 2);
        let again = d.view(&Filter::new().bhk([2]));
        assert!(!Arc::ptr_eq(&first, &again));
    }

    #[test]
    fn scores_are_relative_to_the_filtered_slice() {
        let mut d = dashboard();
        let mumbai = d.view(&Filter::new().cities(["Mumbai"]));
        assert_eq!(mumbai.derived.len(), 1);
        assert_eq!(mumbai.derived[0].components.size, 0.5);
        let all = d.view(&Filter::new());
        let m = all.derived.iter().find(|r| r.record.city == "Mumbai").unwrap();
        assert_eq!(m.components.size, 1.0);
    }

    #[test]
    fn unfiltered_view_retains_everything() {
        let mut d = dashboard();
        let v = d.view(&Filter::new());
        assert_eq!(v.derive_report.non_positive_size, 1);
        assert_eq!(v.insights.retained_pct, Some(100.0));
        let goa = d.view(&Filter::new().cities(["Goa"]));
        assert!(goa.summary.is_empty());
        assert_eq!(goa.insights.retained_pct, Some(25.0));
    }

    #[test]
    fn filtered_view_compares_against_full_dataset() {
        let mut d = dashboard();
        let pune = d.view(&Filter::new().cities(["Pune"]));
        // The unfiltered baseline is cached alongside.
        assert_eq!(d.cached_views(), 2);
        assert_eq!(pune.deltas[0].current, Some(2.0));
        assert_eq!(pune.deltas[0].baseline, Some(3.0));
        assert_eq!(pune.deltas[0].delta, Some(-1.0));
        let full_mean = (5_000_000.0 + 7_000_000.0 + 20_000_000.0) / 3.0;
        assert_eq!(pune.deltas[1].baseline, Some(full_mean));
        assert!((pune.deltas[1].delta.unwrap() - (6_000_000.0 - full_mean)).abs() < 1e-6);

        let all = d.view(&Filter::new());
        assert!(all.deltas.iter().all(|m| m.delta == Some(0.0)));
    }

    #[test]
    fn unknown_city_gives_empty_view() {
        let mut d = dashboard();
        let v = d.view(&Filter::new().cities(["Atlantis"]));
        assert!(v.summary.is_empty());
        assert!(v.derived.is_empty());
        assert_eq!(v.summary.mean_price, None);
        assert_eq!(v.insights.retained_pct, Some(0.0));
    }
}

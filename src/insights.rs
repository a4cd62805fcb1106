// Secondary statistics and the short narrative lines shown under the
// headline metrics.
use crate::types::{
    AggregateSummary, BhkCount, CityPrice, CorrelationMatrix, CorrelationPair,
    CorrelationStrength, DerivedRecord, Insights,
};
use crate::util::{format_number, min_max, pearson, skewness};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const DEFAULT_TOP_CITIES: usize = 10;

/// Skewness beyond this magnitude gets called out.
const SKEW_NOTABLE: f64 = 1.0;

/// Pairs listed on each side of the correlation ranking.
const TOP_PAIRS: usize = 5;

type Column = (&'static str, fn(&DerivedRecord) -> f64);

const NUMERIC_COLUMNS: [Column; 6] = [
    ("bhk", |d| d.record.bhk as f64),
    ("size_sqft", |d| d.record.size_sqft),
    ("price", |d| d.record.price),
    ("age_years", |d| d.record.age_years),
    ("amenities_count", |d| d.record.amenities_count as f64),
    ("price_per_sqft", |d| d.price_per_sqft),
];

/// Pearson coefficients between every pair of numeric columns, plus the
/// strongest positive and negative pairs.
pub fn correlation_matrix(data: &[DerivedRecord]) -> CorrelationMatrix {
    let series: Vec<Vec<f64>> = NUMERIC_COLUMNS
        .iter()
        .map(|(_, get)| data.iter().map(|d| get(d)).collect())
        .collect();
    let n = series.len();
    let mut values = vec![vec![None; n]; n];
    let mut pairs = Vec::new();
    for i in 0..n {
        // Constant columns have no diagonal either.
        values[i][i] = pearson(&series[i], &series[i]).map(|_| 1.0);
        for j in (i + 1)..n {
            let r = pearson(&series[i], &series[j]);
            values[i][j] = r;
            values[j][i] = r;
            if let Some(coefficient) = r {
                pairs.push(CorrelationPair {
                    left: NUMERIC_COLUMNS[i].0.to_string(),
                    right: NUMERIC_COLUMNS[j].0.to_string(),
                    coefficient,
                });
            }
        }
    }

    let by_coefficient = |a: &CorrelationPair, b: &CorrelationPair| {
        a.coefficient
            .partial_cmp(&b.coefficient)
            .unwrap_or(Ordering::Equal)
    };
    let mut top_positive: Vec<CorrelationPair> =
        pairs.iter().filter(|p| p.coefficient > 0.0).cloned().collect();
    top_positive.sort_by(|a, b| by_coefficient(b, a));
    top_positive.truncate(TOP_PAIRS);
    let mut top_negative: Vec<CorrelationPair> =
        pairs.into_iter().filter(|p| p.coefficient < 0.0).collect();
    top_negative.sort_by(by_coefficient);
    top_negative.truncate(TOP_PAIRS);

    CorrelationMatrix {
        columns: NUMERIC_COLUMNS.iter().map(|(name, _)| name.to_string()).collect(),
        values,
        top_positive,
        top_negative,
    }
}

/// `matched` is how many cleaned rows the filter selected and `full_count`
/// the number of cleaned rows overall; together they give `retained_pct`.
pub fn generate_insights(
    data: &[DerivedRecord],
    summary: &AggregateSummary,
    matched: usize,
    full_count: usize,
    top_n: usize,
) -> Insights {
    let prices: Vec<f64> = data.iter().map(|d| d.record.price).collect();
    let sizes: Vec<f64> = data.iter().map(|d| d.record.size_sqft).collect();
    let pps: Vec<f64> = data.iter().map(|d| d.price_per_sqft).collect();

    let correlation = pearson(&sizes, &prices);
    let skew = skewness(&prices);
    let pps_range = min_max(&pps);

    let mut bhk_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for d in data {
        *bhk_counts.entry(d.record.bhk).or_default() += 1;
    }
    let bhk_distribution = bhk_counts
        .into_iter()
        .map(|(bhk, count)| BhkCount { bhk, count })
        .collect();

    let mut top_cities: Vec<CityPrice> = summary
        .by_city
        .iter()
        .filter_map(|g| {
            g.mean_price.map(|mean_price| CityPrice {
                city: g.key.clone(),
                mean_price,
            })
        })
        .collect();
    // Stable sort keeps first-seen order among equal averages.
    top_cities.sort_by(|a, b| {
        b.mean_price
            .partial_cmp(&a.mean_price)
            .unwrap_or(Ordering::Equal)
    });
    top_cities.truncate(top_n);

    let retained_pct = if full_count == 0 {
        None
    } else {
        Some(matched as f64 / full_count as f64 * 100.0)
    };

    let mut lines = Vec::new();
    if let Some(s) = skew.filter(|s| s.abs() > SKEW_NOTABLE) {
        let (side, meaning) = if s > 0.0 {
            ("right", "a few high-value properties")
        } else {
            ("left", "concentration in the lower price range")
        };
        lines.push(format!(
            "Price Distribution: prices are {} skewed (skewness: {:.2}), indicating {}.",
            side, s, meaning
        ));
    }
    match correlation {
        Some(r) if r > 0.5 => lines.push(format!(
            "Size-Price Relationship: strong positive correlation ({:.2}) between property size and price.",
            r
        )),
        Some(r) if r < 0.0 => lines.push(format!(
            "Size-Price Relationship: negative correlation ({:.2}), larger properties may not always command higher prices.",
            r
        )),
        _ => {}
    }
    if let Some(top) = top_cities.first() {
        lines.push(format!(
            "Most Expensive City: {} has the highest average price ({}).",
            top.city,
            format_number(top.mean_price, 0)
        ));
    }
    if let Some(bhk) = summary.modal_bhk {
        lines.push(format!(
            "Popular Configuration: {} BHK is the most common configuration.",
            bhk
        ));
    }
    if let (Some((lo, hi)), Some(avg)) = (pps_range, summary.mean_price_per_sqft) {
        lines.push(format!(
            "Price Range: price per sq ft ranges from {} to {}, with an average of {}.",
            format_number(lo, 0),
            format_number(hi, 0),
            format_number(avg, 0)
        ));
    }

    Insights {
        size_price_correlation: correlation,
        correlation_strength: correlation.map(CorrelationStrength::from_coefficient),
        correlation_matrix: correlation_matrix(data),
        price_skewness: skew,
        min_price_per_sqft: pps_range.map(|(lo, _)| lo),
        max_price_per_sqft: pps_range.map(|(_, hi)| hi),
        mean_price_per_sqft: summary.mean_price_per_sqft,
        bhk_distribution,
        top_cities_by_price: top_cities,
        retained_pct,
        lines,
    }
}

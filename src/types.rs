use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Column names the dataset must carry, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "city",
    "property_type",
    "bhk",
    "size_sqft",
    "price",
    "age_years",
    "amenities_count",
];

/// One row as read from the file, before any validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRow {
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub bhk: Option<String>,
    pub size_sqft: Option<String>,
    pub price: Option<String>,
    pub age_years: Option<String>,
    pub amenities_count: Option<String>,
}

impl From<&PropertyRecord> for RawRow {
    fn from(r: &PropertyRecord) -> Self {
        RawRow {
            city: Some(r.city.clone()),
            property_type: Some(r.property_type.clone()),
            bhk: Some(r.bhk.to_string()),
            size_sqft: Some(r.size_sqft.to_string()),
            price: Some(r.price.to_string()),
            age_years: Some(r.age_years.to_string()),
            amenities_count: Some(r.amenities_count.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub city: String,
    pub property_type: String,
    pub bhk: u32,
    pub size_sqft: f64,
    pub price: f64,
    pub age_years: f64,
    pub amenities_count: u32,
}

/// The three batch-normalized inputs of the investment score, each in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreComponents {
    /// Inverted: the cheapest square foot in the batch scores 1.
    pub price_per_sqft: f64,
    pub size: f64,
    pub amenities: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedRecord {
    pub record: PropertyRecord,
    pub price_per_sqft: f64,
    pub age_of_property: f64,
    pub components: ScoreComponents,
    pub investment_score: f64,
    pub good_investment: bool,
}

/// Per-group metrics. Every statistic is `None` when the group has no rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMetrics {
    pub key: String,
    pub count: usize,
    pub mean_price: Option<f64>,
    pub mean_size: Option<f64>,
    pub median_price: Option<f64>,
    /// Sample standard deviation of price; needs two rows.
    pub std_price: Option<f64>,
    pub mean_price_per_sqft: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSummary {
    pub total_count: usize,
    pub mean_price: Option<f64>,
    pub mean_size: Option<f64>,
    pub mean_price_per_sqft: Option<f64>,
    pub modal_bhk: Option<u32>,
    pub good_investment_count: usize,
    pub by_city: Vec<GroupMetrics>,
    pub by_property_type: Vec<GroupMetrics>,
    pub by_bhk: Vec<GroupMetrics>,
}

impl AggregateSummary {
    /// The empty-result state: nothing survived cleaning or filtering.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub fn city(&self, name: &str) -> Option<&GroupMetrics> {
        self.by_city.iter().find(|g| g.key == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
}

impl CorrelationStrength {
    pub fn from_coefficient(r: f64) -> Self {
        let a = r.abs();
        if a > 0.7 {
            CorrelationStrength::Strong
        } else if a > 0.3 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        }
    }
}

/// A headline metric next to its value over the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyMetricDelta {
    pub metric: String,
    pub current: Option<f64>,
    pub baseline: Option<f64>,
    /// `current - baseline`, when both exist.
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub left: String,
    pub right: String,
    pub coefficient: f64,
}

/// Pairwise Pearson coefficients over the numeric columns. A cell is `None`
/// when either column is constant in the current slice.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
    pub top_positive: Vec<CorrelationPair>,
    pub top_negative: Vec<CorrelationPair>,
}

impl CorrelationMatrix {
    pub fn get(&self, left: &str, right: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == left)?;
        let j = self.columns.iter().position(|c| c == right)?;
        self.values[i][j]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BhkCount {
    pub bhk: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityPrice {
    pub city: String,
    pub mean_price: f64,
}

/// Secondary statistics and narrative lines shown next to the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub size_price_correlation: Option<f64>,
    pub correlation_strength: Option<CorrelationStrength>,
    pub correlation_matrix: CorrelationMatrix,
    pub price_skewness: Option<f64>,
    pub min_price_per_sqft: Option<f64>,
    pub max_price_per_sqft: Option<f64>,
    pub mean_price_per_sqft: Option<f64>,
    pub bhk_distribution: Vec<BhkCount>,
    pub top_cities_by_price: Vec<CityPrice>,
    pub retained_pct: Option<f64>,
    pub lines: Vec<String>,
}

// ---- Display rows ---------------------------------------------------------
//
// Pre-formatted rows for CSV export and Markdown previews. Numbers are
// rendered here once so both outputs agree.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupSummaryRow {
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
    #[serde(rename = "AvgPrice")]
    #[tabled(rename = "AvgPrice")]
    pub avg_price: String,
    #[serde(rename = "MedianPrice")]
    #[tabled(rename = "MedianPrice")]
    pub median_price: String,
    #[serde(rename = "StdPrice")]
    #[tabled(rename = "StdPrice")]
    pub std_price: String,
    #[serde(rename = "AvgSize")]
    #[tabled(rename = "AvgSize")]
    pub avg_size: String,
    #[serde(rename = "AvgPricePerSqFt")]
    #[tabled(rename = "AvgPricePerSqFt")]
    pub avg_price_per_sqft: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DerivedRow {
    #[serde(rename = "City")]
    #[tabled(rename = "City")]
    pub city: String,
    #[serde(rename = "PropertyType")]
    #[tabled(rename = "PropertyType")]
    pub property_type: String,
    #[serde(rename = "BHK")]
    #[tabled(rename = "BHK")]
    pub bhk: u32,
    #[serde(rename = "SizeSqFt")]
    #[tabled(rename = "SizeSqFt")]
    pub size_sqft: String,
    #[serde(rename = "Price")]
    #[tabled(rename = "Price")]
    pub price: String,
    #[serde(rename = "PricePerSqFt")]
    #[tabled(rename = "PricePerSqFt")]
    pub price_per_sqft: String,
    #[serde(rename = "AgeOfProperty")]
    #[tabled(rename = "AgeOfProperty")]
    pub age_of_property: String,
    #[serde(rename = "Amenities")]
    #[tabled(rename = "Amenities")]
    pub amenities_count: u32,
    #[serde(rename = "InvestmentScore")]
    #[tabled(rename = "InvestmentScore")]
    pub investment_score: String,
    #[serde(rename = "GoodInvestment")]
    #[tabled(rename = "GoodInvestment")]
    pub good_investment: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KeyMetricRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
    /// Difference from the whole dataset; blank when unfiltered.
    #[tabled(rename = "Change")]
    pub change: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CorrelationPairRow {
    #[tabled(rename = "Variables")]
    pub variables: String,
    #[tabled(rename = "Correlation")]
    pub coefficient: String,
}

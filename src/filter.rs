use crate::types::PropertyRecord;
use crate::util::normalize_label;
use serde::Serialize;

/// Predicates supplied by the display layer. An unset or empty selection
/// places no constraint on that field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Filter {
    cities: Option<Vec<String>>,
    property_types: Option<Vec<String>>,
    bhk: Option<Vec<u32>>,
    price_range: Option<(f64, f64)>,
    size_range: Option<(f64, f64)>,
}

fn normalized_set<I, S>(values: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut v: Vec<String> = values
        .into_iter()
        .map(|s| normalize_label(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect();
    v.sort();
    v.dedup();
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cities = normalized_set(cities);
        self
    }

    pub fn property_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.property_types = normalized_set(types);
        self
    }

    pub fn bhk<I: IntoIterator<Item = u32>>(mut self, values: I) -> Self {
        let mut v: Vec<u32> = values.into_iter().collect();
        v.sort_unstable();
        v.dedup();
        self.bhk = if v.is_empty() { None } else { Some(v) };
        self
    }

    /// Inclusive price bounds. Either end may be open.
    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.price_range = bounds(min, max);
        self
    }

    /// Inclusive size bounds. Either end may be open.
    pub fn size_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.size_range = bounds(min, max);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Filter::default()
    }

    pub fn matches(&self, r: &PropertyRecord) -> bool {
        if let Some(cities) = &self.cities {
            if cities.binary_search(&r.city).is_err() {
                return false;
            }
        }
        if let Some(types) = &self.property_types {
            if types.binary_search(&r.property_type).is_err() {
                return false;
            }
        }
        if let Some(bhk) = &self.bhk {
            if bhk.binary_search(&r.bhk).is_err() {
                return false;
            }
        }
        if let Some((lo, hi)) = self.price_range {
            if r.price < lo || r.price > hi {
                return false;
            }
        }
        if let Some((lo, hi)) = self.size_range {
            if r.size_sqft < lo || r.size_sqft > hi {
                return false;
            }
        }
        true
    }

    /// Stable textual key, equal for filters that select the same rows by
    /// construction (sets are sorted and deduplicated).
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

fn bounds(min: Option<f64>, max: Option<f64>) -> Option<(f64, f64)> {
    match (min, max) {
        (None, None) => None,
        (lo, hi) => Some((
            lo.unwrap_or(f64::NEG_INFINITY),
            hi.unwrap_or(f64::INFINITY),
        )),
    }
}

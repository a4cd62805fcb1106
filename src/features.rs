// Feature derivation: price per square foot and the investment score.
//
// Normalization is batch-relative. The same record can score differently
// depending on which slice of the dataset it is derived with.
use crate::error::{DashboardError, Result};
use crate::types::{DerivedRecord, PropertyRecord, ScoreComponents};
use crate::util::min_max;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Value every component takes when the batch has no spread.
pub const FLAT_COMPONENT: f64 = 0.5;

/// Weights of the three score components and the `good_investment` cut-off.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringParams {
    pub price_per_sqft_weight: f64,
    pub size_weight: f64,
    pub amenities_weight: f64,
    pub threshold: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        ScoringParams {
            price_per_sqft_weight: 0.4,
            size_weight: 0.3,
            amenities_weight: 0.3,
            threshold: 0.6,
        }
    }
}

impl ScoringParams {
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("price_per_sqft_weight", self.price_per_sqft_weight),
            ("size_weight", self.size_weight),
            ("amenities_weight", self.amenities_weight),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(DashboardError::Config(format!(
                    "scoring.{} must be a non-negative number, got {}",
                    name, w
                )));
            }
        }
        if self.weight_sum() <= 0.0 {
            return Err(DashboardError::Config(
                "scoring weights must not all be zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(DashboardError::Config(format!(
                "scoring.threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    fn weight_sum(&self) -> f64 {
        self.price_per_sqft_weight + self.size_weight + self.amenities_weight
    }

    /// Weighted mean of the components, clamped to [0,1].
    pub fn score(&self, c: &ScoreComponents) -> f64 {
        let raw = self.price_per_sqft_weight * c.price_per_sqft
            + self.size_weight * c.size
            + self.amenities_weight * c.amenities;
        let score = raw / self.weight_sum();
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeriveReport {
    pub input_rows: usize,
    pub derived_rows: usize,
    /// Rows excluded because `size_sqft <= 0`.
    pub non_positive_size: usize,
}

/// Min/max rescaler for one column of the batch.
#[derive(Debug, Clone, Copy)]
struct Scale {
    min: f64,
    range: f64,
}

impl Scale {
    fn over(values: &[f64]) -> Option<Scale> {
        let (min, max) = min_max(values)?;
        Some(Scale {
            min,
            range: max - min,
        })
    }

    fn apply(&self, v: f64) -> f64 {
        if self.range.abs() < f64::EPSILON {
            return FLAT_COMPONENT;
        }
        let scaled = (v - self.min) / self.range;
        if scaled.is_finite() {
            scaled.clamp(0.0, 1.0)
        } else {
            FLAT_COMPONENT
        }
    }
}

/// The Feature Deriver. Output preserves input order; rows with a
/// non-positive size are skipped and counted.
pub fn derive_features(
    records: &[PropertyRecord],
    params: &ScoringParams,
) -> (Vec<DerivedRecord>, DeriveReport) {
    let usable: Vec<&PropertyRecord> = records.iter().filter(|r| r.size_sqft > 0.0).collect();
    let mut report = DeriveReport {
        input_rows: records.len(),
        derived_rows: usable.len(),
        non_positive_size: records.len() - usable.len(),
    };

    let pps: Vec<f64> = usable.iter().map(|r| r.price / r.size_sqft).collect();
    let sizes: Vec<f64> = usable.iter().map(|r| r.size_sqft).collect();
    let amenities: Vec<f64> = usable.iter().map(|r| r.amenities_count as f64).collect();

    let (Some(pps_scale), Some(size_scale), Some(amen_scale)) =
        (Scale::over(&pps), Scale::over(&sizes), Scale::over(&amenities))
    else {
        report.derived_rows = 0;
        return (Vec::new(), report);
    };

    let derived: Vec<DerivedRecord> = usable
        .iter()
        .zip(&pps)
        .map(|(r, &price_per_sqft)| {
            let components = ScoreComponents {
                // Lower price per square foot is better.
                price_per_sqft: 1.0 - pps_scale.apply(price_per_sqft),
                size: size_scale.apply(r.size_sqft),
                amenities: amen_scale.apply(r.amenities_count as f64),
            };
            let investment_score = params.score(&components);
            DerivedRecord {
                record: (*r).clone(),
                price_per_sqft,
                age_of_property: r.age_years,
                components,
                investment_score,
                good_investment: investment_score >= params.threshold,
            }
        })
        .collect();

    debug!(
        input = report.input_rows,
        derived = report.derived_rows,
        skipped = report.non_positive_size,
        "features derived"
    );
    (derived, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(city: &str, price: f64, size: f64, amenities: u32) -> PropertyRecord {
        PropertyRecord {
            city: city.to_string(),
            property_type: "Apartment".to_string(),
            bhk: 2,
            size_sqft: size,
            price,
            age_years: 4.0,
            amenities_count: amenities,
        }
    }

    #[test]
    fn price_per_sqft_is_exact() {
        let input = vec![rec("Pune", 5_000_000.0, 1000.0, 1), rec("Pune", 7_000_000.0, 1000.0, 2)];
        let (out, _) = derive_features(&input, &ScoringParams::default());
        let pps: Vec<f64> = out.iter().map(|d| d.price_per_sqft).collect();
        assert_eq!(pps, vec![5000.0, 7000.0]);
        for d in &out {
            assert!((d.price_per_sqft - d.record.price / d.record.size_sqft).abs() < 1e-9);
            assert_eq!(d.age_of_property, d.record.age_years);
        }
    }

    #[test]
    fn single_record_batch_is_flat() {
        let (out, _) = derive_features(&[rec("Goa", 100.0, 10.0, 3)], &ScoringParams::default());
        let c = out[0].components;
        assert_eq!(c.price_per_sqft, FLAT_COMPONENT);
        assert_eq!(c.size, FLAT_COMPONENT);
        assert_eq!(c.amenities, FLAT_COMPONENT);
        assert!((out[0].investment_score - 0.5).abs() < 1e-12);
        assert!(!out[0].good_investment);
    }

    #[test]
    fn excludes_non_positive_size_and_keeps_order() {
        let input = vec![
            rec("A", 100.0, 10.0, 0),
            rec("B", 100.0, 0.0, 0),
            rec("C", 300.0, 10.0, 5),
        ];
        let (out, report) = derive_features(&input, &ScoringParams::default());
        let cities: Vec<&str> = out.iter().map(|d| d.record.city.as_str()).collect();
        assert_eq!(cities, vec!["A", "C"]);
        assert_eq!(report.non_positive_size, 1);
        assert_eq!(report.derived_rows, 2);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let input: Vec<PropertyRecord> = (1..50)
            .map(|i| rec("X", (i * i * 1000) as f64, (i * 37 % 900 + 100) as f64, (i % 7) as u32))
            .collect();
        let (out, _) = derive_features(&input, &ScoringParams::default());
        assert_eq!(out.len(), input.len());
        for d in &out {
            assert!((0.0..=1.0).contains(&d.investment_score));
            assert_eq!(d.good_investment, d.investment_score >= 0.6);
        }
    }

    #[test]
    fn cheaper_bigger_better_equipped_wins() {
        let input = vec![rec("A", 1000.0, 100.0, 10), rec("B", 4000.0, 50.0, 0)];
        let (out, _) = derive_features(&input, &ScoringParams::default());
        assert_eq!(out[0].investment_score, 1.0);
        assert_eq!(out[1].investment_score, 0.0);
        assert!(out[0].good_investment);
        assert!(!out[1].good_investment);
    }

    #[test]
    fn normalization_is_batch_relative() {
        let a = rec("A", 2000.0, 100.0, 2);
        let b = rec("B", 1000.0, 100.0, 2);
        let params = ScoringParams::default();
        let (alone, _) = derive_features(std::slice::from_ref(&a), &params);
        let (pair, _) = derive_features(&[a, b], &params);
        assert_eq!(alone[0].components.price_per_sqft, FLAT_COMPONENT);
        assert_eq!(pair[0].components.price_per_sqft, 0.0);
    }

    #[test]
    fn empty_batch_yields_nothing() {
        let (out, report) = derive_features(&[rec("A", 1.0, 0.0, 0)], &ScoringParams::default());
        assert!(out.is_empty());
        assert_eq!(report.non_positive_size, 1);
    }

    #[test]
    fn rejects_bad_params() {
        let mut p = ScoringParams::default();
        p.size_weight = -1.0;
        assert!(p.validate().is_err());
        let zero = ScoringParams {
            price_per_sqft_weight: 0.0,
            size_weight: 0.0,
            amenities_weight: 0.0,
            threshold: 0.5,
        };
        assert!(zero.validate().is_err());
        let high = ScoringParams { threshold: 1.5, ..ScoringParams::default() };
        assert!(high.validate().is_err());
        assert!(ScoringParams::default().validate().is_ok());
    }
}

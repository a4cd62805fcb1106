use crate::error::{DashboardError, Result};
use crate::features::ScoringParams;
use crate::insights::DEFAULT_TOP_CITIES;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "housing_report.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub scoring: ScoringParams,
    pub report: ReportConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            path: PathBuf::from("india_housing_prices.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub out_dir: PathBuf,
    pub preview_rows: usize,
    pub top_cities: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            out_dir: PathBuf::from("."),
            preview_rows: 5,
            top_cities: DEFAULT_TOP_CITIES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig { capacity: 32 }
    }
}

impl Config {
    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] if it exists.
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Config::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DashboardError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        if self.cache.capacity == 0 {
            return Err(DashboardError::Config(
                "cache.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let c = Config::from_toml("").unwrap();
        assert_eq!(c.scoring, ScoringParams::default());
        assert_eq!(c.cache.capacity, 32);
        assert_eq!(c.report.top_cities, DEFAULT_TOP_CITIES);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let c = Config::from_toml(
            r#"
            [data]
            path = "listings.csv"

            [scoring]
            threshold = 0.75
            size_weight = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(c.data.path, PathBuf::from("listings.csv"));
        assert_eq!(c.scoring.threshold, 0.75);
        assert_eq!(c.scoring.size_weight, 0.5);
        assert_eq!(c.scoring.amenities_weight, 0.3);
    }

    #[test]
    fn example_file_parses() {
        let c = Config::from_toml(include_str!("../housing_report.example.toml")).unwrap();
        assert!(c.validate().is_ok());
        assert_eq!(c.report.out_dir, PathBuf::from("reports"));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let c = Config::from_toml("[cache]\ncapacity = 0\n").unwrap();
        assert!(matches!(c.validate(), Err(DashboardError::Config(_))));
        let c = Config::from_toml("[scoring]\nthreshold = 2.0\n").unwrap();
        assert!(c.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            Config::from_toml("[scoring\nthreshold = "),
            Err(DashboardError::Toml(_))
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));
    }
}

//! Property-listings analytics: load a CSV of listings, clean it, derive
//! price-per-square-foot and an investment score, and summarize the result
//! for a dashboard.
//!
//! The pipeline is `loader::clean` -> `features::derive_features` ->
//! `reports::aggregate` (-> `insights::generate_insights`), each a pure
//! function over in-memory tables. [`dashboard::Dashboard`] memoizes whole
//! views per filter selection.
pub mod config;
pub mod dashboard;
pub mod error;
pub mod features;
pub mod filter;
pub mod insights;
pub mod loader;
pub mod logging;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use dashboard::{Dashboard, DashboardView, Dataset};
pub use error::{DashboardError, Result};
pub use features::ScoringParams;
pub use filter::Filter;

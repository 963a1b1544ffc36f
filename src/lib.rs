// Resourcing analytics for a clinical-trial portfolio.
//
// Three loosely shaped tables (trials, resources, allocations) are resolved
// once into typed records by `store::RecordStore`. `state::AppState`
// holds the filter criteria and trial selection and derives everything
// else on demand: the filtered trial list and dropdown options
// (`filter`), per-trial utilization and rollups (`analytics`) and the
// portfolio KPIs (`metrics`).
//
// Callers load a `Dataset`, build `AppState::from_dataset`, then drive it
// through `set_filter`, `select_trial` and `clear_selection` and read
// `selected_analytics`, `portfolio_metrics` or `filtered_trials` as needed.

pub mod analytics;
pub mod columns;
pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod names;
pub mod output;
pub mod state;
pub mod store;
pub mod types;
pub mod util;

pub use analytics::{AnalyticsOptions, FeatureDetection, HoursSource};
pub use columns::{Entity, Field, RawRecord};
pub use config::DataConfig;
pub use error::{LoadError, Result};
pub use filter::{FilterCriteria, FilterField, ALL};
pub use names::normalize_name;
pub use state::AppState;
pub use store::{Dataset, JoinKeyStrategy, RecordStore};
pub use types::{
    Allocation, PortfolioMetrics, Resource, ResourceType, Trial, TrialAnalytics,
};

//! The investor dataset and how recommendations are drawn from it.
mod dataset;
mod loader;
mod select;

pub use dataset::*;
pub use loader::DatasetSource;
pub use select::{DEFAULT_RECOMMENDATION_COUNT, select, select_with_rng};

//! Random forest training engine with permutation importance.
//!
//! Provides CART-based classification and regression forests with weighted
//! resampling (with or without replacement), per-tree permutation importance
//! evaluated on out-of-bag or held-out samples, parallel training via rayon,
//! and the Janitza empirical-null p-value routine for importance scores.

mod config;
mod error;
mod forest;
mod importance;
mod predict;
mod pvalues;
mod sample;
mod split;
mod target;
mod tree;

pub use config::{ForestConfig, ImportanceMode};
pub use error::ForestError;
pub use forest::{Forest, ForestFit, TaskKind};
pub use pvalues::{ImportanceTest, janitza_pvalues};
pub use target::Target;

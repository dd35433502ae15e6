//! Holdout-based variable selection and model evaluation for random forests.
//!
//! Wraps a forest engine behind a small training API, trains complementary
//! holdout forests with coin-flip case weights, turns the averaged holdout
//! importance into empirical p-values, and scores fitted models with a
//! contingency table, accuracy, Cohen's kappa, and a confusion plot.

mod error;
mod eval;
mod holdout;
mod model;
mod plot;
mod select;
mod table;

pub use calluna_forest::{ImportanceMode, ImportanceTest};
pub use error::VitaError;
pub use eval::{evaluate, ContingencyTable, Evaluation};
pub use holdout::{holdout_forest, holdout_forest_with, HoldoutForest};
pub use model::{
    train_forest, Backend, FittedForest, FittedModel, ModelConfig, NativeEngine, Predictions,
    Task, TrainableForest,
};
pub use plot::ConfusionPlot;
pub use select::{
    vita_selection, vita_selection_with, EmpiricalNullTester, JanitzaTester, SelectionReport,
    VariableReport, VitaConfig,
};
pub use table::{FeatureTable, Outcome};

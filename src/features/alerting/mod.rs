mod evaluator;
mod models;

pub use evaluator::HealthEvaluator;
pub use models::{AlertComposer, AlertMessage, Delivery, Outcome, ThresholdRule};

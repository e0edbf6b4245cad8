pub mod alerting;
pub mod collection;
pub mod system_metrics;

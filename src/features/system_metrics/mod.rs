mod collector;
mod models;

pub use collector::{select_mount, MountUsage, SystemMetricsCollector};
pub use models::{HealthSample, HealthSampleBuilder};

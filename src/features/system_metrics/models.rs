use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::shared::traits::Validatable;

/// One collected observation of host utilization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    pub cpu_usage: f64,
    pub disk_usage: f64,
    pub check_time: DateTime<Utc>,
}

fn check_percentage(name: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(format!("{} must be between 0 and 100, got {}", name, value));
    }
    Ok(())
}

impl Validatable for HealthSample {
    fn validate(&self) -> Result<(), String> {
        check_percentage("cpu_usage", self.cpu_usage)?;
        check_percentage("disk_usage", self.disk_usage)?;
        Ok(())
    }
}

// Builder pattern for HealthSample
#[derive(Default)]
pub struct HealthSampleBuilder {
    cpu_usage: Option<f64>,
    disk_usage: Option<f64>,
    check_time: Option<DateTime<Utc>>,
}

impl HealthSampleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cpu_usage(mut self, cpu_usage: f64) -> Self {
        self.cpu_usage = Some(cpu_usage);
        self
    }

    pub fn disk_usage(mut self, disk_usage: f64) -> Self {
        self.disk_usage = Some(disk_usage);
        self
    }

    pub fn check_time(mut self, check_time: DateTime<Utc>) -> Self {
        self.check_time = Some(check_time);
        self
    }

    pub fn build(self) -> Result<HealthSample, String> {
        let sample = HealthSample {
            cpu_usage: self.cpu_usage.ok_or("cpu_usage is required")?,
            disk_usage: self.disk_usage.ok_or("disk_usage is required")?,
            check_time: self.check_time.ok_or("check_time is required")?,
        };

        sample.validate()?;
        Ok(sample)
    }
}

//! Runtime configuration for both binaries.
//!
//! Values come from built-in defaults, then an optional YAML file named by
//! `HOSTWATCH_CONFIG`, then `HOSTWATCH_*` environment variables.

use crate::shared::error::ConfigError;
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_PATH_VAR: &str = "HOSTWATCH_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub store: StoreConfig,
    pub smtp: SmtpConfig,
    pub alert: AlertConfig,
    pub collector: CollectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub index: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            index: "server_health".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    /// Implicit TLS port.
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl SmtpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 465,
            username: None,
            password: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub cpu_threshold: f64,
    pub disk_threshold: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            subject: "[Server Alert] High Resource Usage".to_string(),
            cpu_threshold: 80.0,
            disk_threshold: 80.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub mount_point: PathBuf,
    pub cpu_window_secs: f64,
}

impl CollectorConfig {
    pub fn cpu_window(&self) -> Duration {
        Duration::try_from_secs_f64(self.cpu_window_secs).unwrap_or(Duration::ZERO)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            mount_point: PathBuf::from("/"),
            cpu_window_secs: 1.0,
        }
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl MonitorConfig {
    /// Loads the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with("HOSTWATCH_"))
            .collect();
        Self::load_from(&vars)
    }

    pub fn load_from(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = match vars.get(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(vars)?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        info!("Reading config from: {}", path);
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_env(&mut self, vars: &HashMap<String, String>) -> Result<(), ConfigError> {
        for (key, value) in vars {
            match key.as_str() {
                "HOSTWATCH_STORE_URL" => self.store.url = value.clone(),
                "HOSTWATCH_STORE_USER" => self.store.username = Some(value.clone()),
                "HOSTWATCH_STORE_PASSWORD" => self.store.password = Some(value.clone()),
                "HOSTWATCH_STORE_INDEX" => self.store.index = value.clone(),
                "HOSTWATCH_SMTP_HOST" => self.smtp.host = value.clone(),
                "HOSTWATCH_SMTP_PORT" => self.smtp.port = parse_env(key, value)?,
                "HOSTWATCH_SMTP_USER" => self.smtp.username = Some(value.clone()),
                "HOSTWATCH_SMTP_PASSWORD" => self.smtp.password = Some(value.clone()),
                "HOSTWATCH_SMTP_TIMEOUT_SECS" => self.smtp.timeout_secs = parse_env(key, value)?,
                "HOSTWATCH_ALERT_FROM" => self.alert.from = value.clone(),
                "HOSTWATCH_ALERT_TO" => self.alert.to = value.clone(),
                "HOSTWATCH_CPU_THRESHOLD" => self.alert.cpu_threshold = parse_env(key, value)?,
                "HOSTWATCH_DISK_THRESHOLD" => self.alert.disk_threshold = parse_env(key, value)?,
                "HOSTWATCH_MOUNT_POINT" => self.collector.mount_point = PathBuf::from(value),
                "HOSTWATCH_CPU_WINDOW_SECS" => {
                    self.collector.cpu_window_secs = parse_env(key, value)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Checks what the collector needs.
    pub fn validate_for_collector(&self) -> Result<(), ConfigError> {
        if !self.collector.cpu_window_secs.is_finite() || self.collector.cpu_window_secs < 0.0 {
            return Err(ConfigError::Invalid(
                "collector.cpu_window_secs must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// Checks what the evaluator needs: thresholds and both addresses.
    pub fn validate_for_evaluator(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("alert.cpu_threshold", self.alert.cpu_threshold),
            ("alert.disk_threshold", self.alert.disk_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }
        if self.alert.from.trim().is_empty() || self.alert.to.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "alert.from and alert.to must both be set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let config = MonitorConfig::load_from(&HashMap::new()).unwrap();
        assert_eq!(config.store.index, "server_health");
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.smtp.timeout(), Duration::from_secs(10));
        assert_eq!(config.alert.cpu_threshold, 80.0);
        assert_eq!(config.alert.disk_threshold, 80.0);
        assert_eq!(config.collector.mount_point, PathBuf::from("/"));
        assert_eq!(config.collector.cpu_window(), Duration::from_secs(1));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "smtp:\n  host: smtp.example.org\n  port: 2465\nalert:\n  from: ops@example.org\n  to: oncall@example.org"
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let config = MonitorConfig::load_from(&vars(&[
            (CONFIG_PATH_VAR, path.as_str()),
            ("HOSTWATCH_SMTP_PORT", "465"),
            ("HOSTWATCH_DISK_THRESHOLD", "90"),
        ]))
        .unwrap();

        assert_eq!(config.smtp.host, "smtp.example.org");
        assert_eq!(config.smtp.port, 465);
        assert_eq!(config.alert.disk_threshold, 90.0);
        assert_eq!(config.alert.cpu_threshold, 80.0);
        assert!(config.validate_for_evaluator().is_ok());
    }

    #[test]
    fn unparsable_env_value_is_reported() {
        let err = MonitorConfig::load_from(&vars(&[("HOSTWATCH_SMTP_PORT", "smtp")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for HOSTWATCH_SMTP_PORT: smtp");
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        let err = MonitorConfig::load_from(&vars(&[(CONFIG_PATH_VAR, "/nonexistent/hostwatch.yaml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn evaluator_requires_addresses_and_sane_thresholds() {
        let mut config = MonitorConfig::default();
        assert!(config.validate_for_evaluator().is_err());

        config.alert.from = "ops@example.org".to_string();
        config.alert.to = "oncall@example.org".to_string();
        assert!(config.validate_for_evaluator().is_ok());

        config.alert.cpu_threshold = 120.0;
        assert!(config.validate_for_evaluator().is_err());
    }

    #[test]
    fn negative_cpu_window_is_rejected() {
        let mut config = MonitorConfig::default();
        config.collector.cpu_window_secs = -1.0;
        assert!(config.validate_for_collector().is_err());
    }
}

use crate::features::system_metrics::HealthSample;
use crate::shared::config::AlertConfig;
use crate::shared::error::TransportError;
use uuid::Uuid;

/// Static alert rule: a metric strictly above its limit triggers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdRule {
    pub cpu_limit: f64,
    pub disk_limit: f64,
}

impl ThresholdRule {
    pub fn new(cpu_limit: f64, disk_limit: f64) -> Self {
        Self {
            cpu_limit,
            disk_limit,
        }
    }

    pub fn is_triggered(&self, sample: &HealthSample) -> bool {
        sample.cpu_usage > self.cpu_limit || sample.disk_usage > self.disk_limit
    }
}

impl Default for ThresholdRule {
    fn default() -> Self {
        Self::new(80.0, 80.0)
    }
}

/// Notification for one triggering sample; built, sent, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: String,
    /// RFC 5322 Message-ID, unique per message so receivers can tell
    /// retries of one alert apart from a new alert with the same text.
    pub message_id: String,
}

/// Builds [`AlertMessage`]s with fixed addressing.
#[derive(Debug, Clone)]
pub struct AlertComposer {
    from: String,
    to: String,
    subject: String,
    domain: String,
}

impl AlertComposer {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            from: config.from.clone(),
            to: config.to.clone(),
            subject: config.subject.clone(),
            domain: whoami::hostname(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn compose(&self, sample: &HealthSample) -> AlertMessage {
        AlertMessage {
            subject: self.subject.clone(),
            body: format!(
                "Server Alert\nCPU Usage: {:.1}%\nDisk Usage: {:.1}%\nChecked at: {}",
                sample.cpu_usage,
                sample.disk_usage,
                sample.check_time.to_rfc3339()
            ),
            from: self.from.clone(),
            to: self.to.clone(),
            message_id: format!("<{}@{}>", Uuid::new_v4(), self.domain),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Confirmed,
    /// The server hung up after receiving the message; see
    /// [`TransportError::is_tolerated_disconnect`].
    DisconnectTolerated,
}

/// Result of one evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NoData,
    NoAlert(HealthSample),
    AlertSent { message_id: String, delivery: Delivery },
    AlertSendFailed(TransportError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::AlertSendFailed(_))
    }

    /// The single line a run reports to its caller.
    pub fn status_line(&self) -> String {
        match self {
            Self::NoData => "No data found.".to_string(),
            Self::NoAlert(sample) => format!(
                "System normal, no alert needed (CPU={:.1}%, Disk={:.1}%).",
                sample.cpu_usage, sample.disk_usage
            ),
            Self::AlertSent {
                delivery: Delivery::Confirmed,
                ..
            } => "Alert email sent!".to_string(),
            Self::AlertSent {
                delivery: Delivery::DisconnectTolerated,
                ..
            } => "Alert email sent (server disconnected after hand-off).".to_string(),
            Self::AlertSendFailed(err) => {
                format!("Failed to send email: {}: {}", err.kind, err.message)
            }
        }
    }
}

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use crate::features::system_metrics::HealthSample;
use crate::features::alerting::AlertMessage;
use crate::shared::error::{CollectionError, StorageError, TransportError};

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Source of instantaneous host utilization figures, in percent.
#[async_trait]
pub trait MetricsSource: Send {
    /// Averages CPU utilization over `window`; blocks for that long.
    async fn sample_cpu_percent(&mut self, window: Duration) -> Result<f64, CollectionError>;
    async fn sample_disk_percent(&mut self, path: &Path) -> Result<f64, CollectionError>;
}

/// Append-only store of health samples.
#[async_trait]
pub trait SampleStore: Send + Sync {
    type Connection: StoreConnection;

    async fn connect(&self) -> Result<Self::Connection, StorageError>;
}

/// A live store connection, scoped to one run.
///
/// `close` consumes the connection, so it is released at most once. Callers
/// must reach `close` on every path once `connect` succeeded.
#[async_trait]
pub trait StoreConnection: Send {
    /// Persists one sample as a single atomic record.
    async fn insert(&mut self, sample: &HealthSample) -> Result<(), StorageError>;

    /// Returns the sample with the most recent `check_time`, preferring the
    /// later insertion when two share a timestamp. `None` when empty.
    async fn query_latest(&mut self) -> Result<Option<HealthSample>, StorageError>;

    async fn close(self);
}

/// Outbound notification channel.
pub trait NotificationTransport {
    type Session: TransportSession;

    /// Opens an encrypted, authenticated session.
    fn open_session(&self) -> Result<Self::Session, TransportError>;
}

pub trait TransportSession {
    fn send(&mut self, message: &AlertMessage) -> Result<(), TransportError>;

    /// Ends the session. Failures while closing are logged, never returned.
    fn close(self);
}

pub mod features;
pub mod shared;

// Re-export commonly used items from features
pub use features::alerting::{
    AlertComposer,
    AlertMessage,
    Delivery,
    HealthEvaluator,
    Outcome,
    ThresholdRule,
};
pub use features::collection::HealthCollector;
pub use features::system_metrics::{
    HealthSample,
    HealthSampleBuilder,
    SystemMetricsCollector,
};

// Re-export shared functionality
pub use shared::traits::{
    MetricsSource,
    NotificationTransport,
    SampleStore,
    StoreConnection,
    TransportSession,
    Validatable,
};
pub use shared::error::{
    CollectionError,
    ConfigError,
    EvaluationError,
    SendStage,
    StorageError,
    TransportError,
    TransportErrorKind,
};
pub use shared::config::MonitorConfig;
pub use shared::storage::{ElasticsearchStore, InMemoryStore};
pub use shared::transport::SmtpTransport;

/// Initializes `env_logger` on stderr, `warn` unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

use hostwatch::{
    init_logging, CollectionError, ElasticsearchStore, HealthCollector, MonitorConfig,
    StorageError, SystemMetricsCollector,
};
use log::error;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();

    let config = match MonitorConfig::load().and_then(|config| {
        config.validate_for_collector()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            println!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = match ElasticsearchStore::new(&config.store) {
        Ok(store) => store,
        Err(e) => {
            println!("Database connection failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut collector = HealthCollector::new(
        SystemMetricsCollector::new(),
        store,
        config.collector.clone(),
    );

    match collector.collect_and_store().await {
        Ok(sample) => {
            println!(
                "Data saved: CPU={:.1}%, Disk={:.1}%",
                sample.cpu_usage, sample.disk_usage
            );
            ExitCode::SUCCESS
        }
        Err(CollectionError::Storage(e @ StorageError::Connection(_))) => {
            println!("Database connection failed: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("Failed to save data: {}", e);
            ExitCode::FAILURE
        }
    }
}

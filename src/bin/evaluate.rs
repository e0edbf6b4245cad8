use hostwatch::{
    init_logging, AlertComposer, ElasticsearchStore, EvaluationError, HealthEvaluator,
    MonitorConfig, SmtpTransport, StorageError, ThresholdRule,
};
use log::error;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();

    let config = match MonitorConfig::load().and_then(|config| {
        config.validate_for_evaluator()?;
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

    let evaluator = HealthEvaluator::new(
        store,
        SmtpTransport::new(config.smtp.clone()),
        ThresholdRule::new(config.alert.cpu_threshold, config.alert.disk_threshold),
        AlertComposer::new(&config.alert),
    );

    match evaluator.evaluate_and_notify().await {
        Ok(outcome) => {
            println!("{}", outcome.status_line());
            if outcome.is_failure() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(EvaluationError::Storage(e @ StorageError::Connection(_))) => {
            println!("Database connection failed: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("Failed to query data: {}", e);
            ExitCode::FAILURE
        }
    }
}

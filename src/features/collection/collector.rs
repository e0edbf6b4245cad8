use crate::features::system_metrics::{HealthSample, HealthSampleBuilder};
use crate::shared::config::CollectorConfig;
use crate::shared::error::CollectionError;
use crate::shared::traits::{MetricsSource, SampleStore, StoreConnection};
use chrono::Utc;
use log::{error, info};

/// Samples host utilization and appends it to the store.
pub struct HealthCollector<M, S> {
    metrics: M,
    store: S,
    config: CollectorConfig,
}

impl<M, S> HealthCollector<M, S>
where
    M: MetricsSource,
    S: SampleStore,
{
    pub fn new(metrics: M, store: S, config: CollectorConfig) -> Self {
        Self {
            metrics,
            store,
            config,
        }
    }

    /// Runs one collection cycle and returns the stored sample.
    ///
    /// Nothing is sampled when the store is unreachable. A failed insert is
    /// reported, not retried.
    pub async fn collect_and_store(&mut self) -> Result<HealthSample, CollectionError> {
        let mut connection = self.store.connect().await.map_err(|e| {
            error!("Database connection failed: {}", e);
            e
        })?;

        let stored = self.sample_and_insert(&mut connection).await;
        connection.close().await;
        stored
    }

    async fn sample_and_insert(
        &mut self,
        connection: &mut S::Connection,
    ) -> Result<HealthSample, CollectionError> {
        let sample = self.sample().await.map_err(|e| {
            error!("Failed to sample host metrics: {}", e);
            e
        })?;

        connection.insert(&sample).await.map_err(|e| {
            error!("Failed to save data: {}", e);
            e
        })?;

        info!(
            "Data saved: CPU={:.1}%, Disk={:.1}%",
            sample.cpu_usage, sample.disk_usage
        );
        Ok(sample)
    }

    async fn sample(&mut self) -> Result<HealthSample, CollectionError> {
        let cpu_usage = self
            .metrics
            .sample_cpu_percent(self.config.cpu_window())
            .await?;
        let disk_usage = self
            .metrics
            .sample_disk_percent(&self.config.mount_point)
            .await?;

        HealthSampleBuilder::new()
            .cpu_usage(cpu_usage)
            .disk_usage(disk_usage)
            .check_time(Utc::now())
            .build()
            .map_err(CollectionError::Parse)
    }
}

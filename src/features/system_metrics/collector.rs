use crate::shared::traits::MetricsSource;
use crate::shared::error::CollectionError;
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{CpuRefreshKind, Disks, RefreshKind, System, MINIMUM_CPU_UPDATE_INTERVAL};

/// Space figures for one mounted filesystem.
#[derive(Debug, Clone)]
pub struct MountUsage {
    pub mount_point: PathBuf,
    pub total_space: u64,
    pub available_space: u64,
}

impl MountUsage {
    pub fn used_percent(&self) -> Option<f64> {
        if self.total_space == 0 {
            return None;
        }
        let used = self.total_space.saturating_sub(self.available_space);
        Some(used as f64 / self.total_space as f64 * 100.0)
    }
}

/// Picks the filesystem holding `path`: the longest mount point prefixing it.
pub fn select_mount<'a>(path: &Path, mounts: &'a [MountUsage]) -> Option<&'a MountUsage> {
    mounts
        .iter()
        .filter(|mount| path.starts_with(&mount.mount_point))
        .max_by_key(|mount| mount.mount_point.components().count())
}

pub struct SystemMetricsCollector {
    sys: System,
}

impl SystemMetricsCollector {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage()),
        );
        Self { sys }
    }

    fn collect_mounts(&self) -> Vec<MountUsage> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .list()
            .iter()
            .map(|disk| MountUsage {
                mount_point: disk.mount_point().to_path_buf(),
                total_space: disk.total_space(),
                available_space: disk.available_space(),
            })
            .collect()
    }
}

#[async_trait]
impl MetricsSource for SystemMetricsCollector {
    async fn sample_cpu_percent(&mut self, window: Duration) -> Result<f64, CollectionError> {
        // sysinfo needs two refreshes at least MINIMUM_CPU_UPDATE_INTERVAL apart
        let window = window.max(MINIMUM_CPU_UPDATE_INTERVAL);
        self.sys.refresh_cpu_usage();
        tokio::time::sleep(window).await;
        self.sys.refresh_cpu_usage();

        if self.sys.cpus().is_empty() {
            return Err(CollectionError::SystemApi(
                "No CPU information available".to_string(),
            ));
        }

        let usage = f64::from(self.sys.global_cpu_usage()).clamp(0.0, 100.0);
        debug!("CPU usage over {:?}: {:.1}%", window, usage);
        Ok(usage)
    }

    async fn sample_disk_percent(&mut self, path: &Path) -> Result<f64, CollectionError> {
        let path = std::fs::canonicalize(path)?;
        let mounts = self.collect_mounts();
        debug!("Found {} mounted filesystems", mounts.len());

        let mount = select_mount(&path, &mounts).ok_or_else(|| {
            CollectionError::SystemApi(format!("No filesystem found for {}", path.display()))
        })?;
        let usage = mount.used_percent().ok_or_else(|| {
            CollectionError::SystemApi(format!(
                "Filesystem at {} reports zero capacity",
                mount.mount_point.display()
            ))
        })?;

        debug!("Disk usage of {}: {:.1}%", mount.mount_point.display(), usage);
        Ok(usage.clamp(0.0, 100.0))
    }
}

impl Default for SystemMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

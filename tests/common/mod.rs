#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hostwatch::{
    AlertComposer, AlertMessage, CollectionError, HealthEvaluator, HealthSample, InMemoryStore,
    MetricsSource, NotificationTransport, SendStage, ThresholdRule, TransportError,
    TransportErrorKind, TransportSession,
};
use hostwatch::shared::config::AlertConfig;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Metrics source returning fixed readings.
pub struct FixedMetrics {
    pub cpu: f64,
    pub disk: f64,
    pub fail: bool,
}

impl FixedMetrics {
    pub fn new(cpu: f64, disk: f64) -> Self {
        Self {
            cpu,
            disk,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            cpu: 0.0,
            disk: 0.0,
            fail: true,
        }
    }
}

#[async_trait]
impl MetricsSource for FixedMetrics {
    async fn sample_cpu_percent(&mut self, _window: Duration) -> Result<f64, CollectionError> {
        if self.fail {
            return Err(CollectionError::SystemApi("no cpu".to_string()));
        }
        Ok(self.cpu)
    }

    async fn sample_disk_percent(&mut self, _path: &Path) -> Result<f64, CollectionError> {
        Ok(self.disk)
    }
}

#[derive(Default)]
struct TransportLog {
    opened: usize,
    closed: usize,
    sent: Vec<AlertMessage>,
}

/// Transport double that records every session and plays back scripted errors.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    log: Arc<Mutex<TransportLog>>,
    open_error: Option<TransportError>,
    send_error: Option<TransportError>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_open(kind: TransportErrorKind, stage: SendStage) -> Self {
        Self {
            open_error: Some(TransportError::new(kind, stage, "scripted open failure")),
            ..Self::default()
        }
    }

    pub fn failing_send(kind: TransportErrorKind, stage: SendStage) -> Self {
        Self {
            send_error: Some(TransportError::new(kind, stage, "scripted send failure")),
            ..Self::default()
        }
    }

    pub fn sessions_opened(&self) -> usize {
        self.log.lock().unwrap().opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.log.lock().unwrap().closed
    }

    pub fn sent(&self) -> Vec<AlertMessage> {
        self.log.lock().unwrap().sent.clone()
    }
}

pub struct RecordingSession {
    log: Arc<Mutex<TransportLog>>,
    send_error: Option<TransportError>,
}

impl NotificationTransport for RecordingTransport {
    type Session = RecordingSession;

    fn open_session(&self) -> Result<RecordingSession, TransportError> {
        if let Some(err) = &self.open_error {
            return Err(err.clone());
        }
        self.log.lock().unwrap().opened += 1;
        Ok(RecordingSession {
            log: Arc::clone(&self.log),
            send_error: self.send_error.clone(),
        })
    }
}

impl TransportSession for RecordingSession {
    fn send(&mut self, message: &AlertMessage) -> Result<(), TransportError> {
        self.log.lock().unwrap().sent.push(message.clone());
        match &self.send_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn close(self) {
        self.log.lock().unwrap().closed += 1;
    }
}

pub fn sample_at(cpu: f64, disk: f64, check_time: DateTime<Utc>) -> HealthSample {
    HealthSample {
        cpu_usage: cpu,
        disk_usage: disk,
        check_time,
    }
}

pub fn composer() -> AlertComposer {
    AlertComposer::new(&AlertConfig {
        from: "ops@example.org".to_string(),
        to: "oncall@example.org".to_string(),
        ..AlertConfig::default()
    })
    .with_domain("host.example")
}

pub fn evaluator(
    store: &InMemoryStore,
    transport: &RecordingTransport,
) -> HealthEvaluator<InMemoryStore, RecordingTransport> {
    HealthEvaluator::new(
        store.clone(),
        transport.clone(),
        ThresholdRule::default(),
        composer(),
    )
}

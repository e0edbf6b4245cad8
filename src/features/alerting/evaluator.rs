use crate::features::alerting::models::{AlertComposer, AlertMessage, Delivery, Outcome, ThresholdRule};
use crate::features::system_metrics::HealthSample;
use crate::shared::error::{EvaluationError, StorageError};
use crate::shared::traits::{NotificationTransport, SampleStore, StoreConnection, TransportSession};
use log::{error, info, warn};

/// Reads the latest sample and notifies when it crosses a threshold.
///
/// One call is one run: a single store round trip and at most one delivery
/// attempt. Retrying is left to whoever schedules the runs.
pub struct HealthEvaluator<S, T> {
    store: S,
    transport: T,
    rule: ThresholdRule,
    composer: AlertComposer,
}

impl<S, T> HealthEvaluator<S, T>
where
    S: SampleStore,
    T: NotificationTransport,
{
    pub fn new(store: S, transport: T, rule: ThresholdRule, composer: AlertComposer) -> Self {
        Self {
            store,
            transport,
            rule,
            composer,
        }
    }

    pub async fn evaluate_and_notify(&self) -> Result<Outcome, EvaluationError> {
        let sample = match self.fetch_latest().await? {
            Some(sample) => sample,
            None => {
                info!("No health samples stored yet");
                return Ok(Outcome::NoData);
            }
        };

        if !self.rule.is_triggered(&sample) {
            info!(
                "Latest sample within limits: CPU={:.1}%, Disk={:.1}%",
                sample.cpu_usage, sample.disk_usage
            );
            return Ok(Outcome::NoAlert(sample));
        }

        warn!(
            "Threshold exceeded: CPU={:.1}% (limit {}), Disk={:.1}% (limit {})",
            sample.cpu_usage, self.rule.cpu_limit, sample.disk_usage, self.rule.disk_limit
        );
        let message = self.composer.compose(&sample);
        Ok(self.deliver(&message))
    }

    async fn fetch_latest(&self) -> Result<Option<HealthSample>, StorageError> {
        let mut connection = self.store.connect().await.map_err(|e| {
            error!("Database connection failed: {}", e);
            e
        })?;

        let latest = connection.query_latest().await;
        connection.close().await;

        latest.map_err(|e| {
            error!("Failed to query data: {}", e);
            e
        })
    }

    fn deliver(&self, message: &AlertMessage) -> Outcome {
        let mut session = match self.transport.open_session() {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to send email: {}", e);
                return Outcome::AlertSendFailed(e);
            }
        };

        let sent = session.send(message);
        session.close();

        match sent {
            Ok(()) => {
                info!("Alert {} delivered", message.message_id);
                Outcome::AlertSent {
                    message_id: message.message_id.clone(),
                    delivery: Delivery::Confirmed,
                }
            }
            Err(e) if e.is_tolerated_disconnect() => {
                warn!(
                    "Server disconnected after accepting alert {}, treating as sent: {}",
                    message.message_id, e
                );
                Outcome::AlertSent {
                    message_id: message.message_id.clone(),
                    delivery: Delivery::DisconnectTolerated,
                }
            }
            Err(e) => {
                error!("Failed to send email: {}", e);
                Outcome::AlertSendFailed(e)
            }
        }
    }
}

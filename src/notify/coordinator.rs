use std::time::Duration;

use tracing::{error, info, instrument};

use super::format::change_message;
use super::AlertSink;
use crate::engine::types::ChangeEvent;

/// Outcome of one delivery batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Tokens whose alert the sink rejected, in batch order.
    pub failed: Vec<String>,
}

impl DeliveryReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

/// Sends change alerts one at a time, pausing after each send.
pub struct Notifier {
    sink: Box<dyn AlertSink>,
    pause: Duration,
}

impl Notifier {
    pub fn new(sink: Box<dyn AlertSink>, pause: Duration) -> Self {
        Self { sink, pause }
    }

    pub fn sink(&self) -> &dyn AlertSink {
        self.sink.as_ref()
    }

    /// Deliver every event in order. A failed send is recorded and the batch
    /// carries on; the caller decides what a partial failure means.
    #[instrument(skip_all, fields(events = events.len()))]
    pub async fn deliver(&self, events: &[ChangeEvent]) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for event in events {
            let message = change_message(event);
            match self.sink.send(&message).await {
                Ok(()) => {
                    info!(token = %event.token(), kind = event.kind(), "Notification sent");
                    metrics::counter!("capwatch_notifications_total", "outcome" => "delivered").increment(1);
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(token = %event.token(), kind = event.kind(), error = %e, "Failed to send notification");
                    metrics::counter!("capwatch_notifications_total", "outcome" => "failed").increment(1);
                    report.failed.push(event.token().to_string());
                }
            }
            // Rate limiting, applied after failures too
            tokio::time::sleep(self.pause).await;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::Percentage;
    use crate::notify::DeliveryError;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Instant;

    #[derive(Clone, Default)]
    struct ScriptedSink {
        sent: Arc<Mutex<Vec<String>>>,
        reject_containing: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl AlertSink for ScriptedSink {
        async fn send(&self, message: &str) -> Result<(), DeliveryError> {
            self.sent.lock().push(message.to_string());
            match self.reject_containing {
                Some(needle) if message.contains(needle) => Err(DeliveryError::Other("rejected".into())),
                _ => Ok(()),
            }
        }
    }

    fn new_event(token: &str) -> ChangeEvent {
        ChangeEvent::New {
            token: token.into(),
            capacity: Percentage::new("50.00%"),
            token_apr: "10%".into(),
            tvl: 1.0,
        }
    }

    #[tokio::test]
    async fn test_all_delivered() {
        let sink = ScriptedSink::default();
        let notifier = Notifier::new(Box::new(sink.clone()), Duration::ZERO);

        let report = notifier.deliver(&[new_event("A"), new_event("B")]).await;
        assert!(report.all_succeeded());
        assert_eq!(report.delivered, 2);
        assert_eq!(sink.sent.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let sink = ScriptedSink { reject_containing: Some("<b>B</b>"), ..Default::default() };
        let notifier = Notifier::new(Box::new(sink.clone()), Duration::ZERO);

        let report = notifier.deliver(&[new_event("A"), new_event("B"), new_event("C")]).await;
        assert!(!report.all_succeeded());
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, vec!["B".to_string()]);
        assert_eq!(report.attempted(), 3);

        let sent = sink.sent.lock();
        assert_eq!(sent.len(), 3);
        assert!(sent[2].contains("<b>C</b>"));
    }

    #[tokio::test]
    async fn test_pause_between_sends() {
        let notifier = Notifier::new(Box::new(ScriptedSink::default()), Duration::from_millis(30));
        let start = Instant::now();
        notifier.deliver(&[new_event("A"), new_event("B")]).await;
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let notifier = Notifier::new(Box::new(ScriptedSink::default()), Duration::from_secs(60));
        let report = notifier.deliver(&[]).await;
        assert!(report.all_succeeded());
        assert_eq!(report.attempted(), 0);
    }
}

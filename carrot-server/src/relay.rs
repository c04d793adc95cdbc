use carrot_log::LogError;
use carrot_metrics::ExtractError;
use futures::{Stream, StreamExt};
use lapin::message::Delivery;
use lapin::options::BasicAckOptions;
use thiserror::Error;

use crate::store::{MetricSink, WriteError};

/// An error handling a single delivery.
///
/// Relay errors are local to one message. They are logged at the delivery
/// loop boundary and never terminate the loop.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The message body could not be turned into metrics.
    #[error("failed to extract metrics from the message")]
    Extract(#[from] ExtractError),

    /// The metrics could not be forwarded to the store.
    #[error("failed to forward metrics to the store")]
    Forward(#[from] WriteError),
}

/// The delivery loop between the broker and the store.
///
/// Deliveries are processed strictly in order, one at a time: a message is
/// fully extracted, forwarded, and acknowledged before the next one is read.
/// A message is acknowledged if and only if every metric extracted from it
/// was forwarded without error. On any failure the message is left
/// unacknowledged and the loop continues with the next delivery; redelivery
/// of unacknowledged messages is entirely broker policy.
pub struct Relay<S> {
    sink: S,
}

impl<S: MetricSink> Relay<S> {
    /// Creates a relay forwarding extracted metrics to the given sink.
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Handles one message body end to end.
    ///
    /// Returns the number of forwarded metrics. `Ok` means the originating
    /// message can be acknowledged.
    pub async fn process(&self, payload: &[u8]) -> Result<usize, RelayError> {
        let metrics = carrot_metrics::extract(payload)?;
        self.sink.write(&metrics).await?;
        Ok(metrics.len())
    }

    /// Runs the delivery loop until the stream ends or `shutdown` resolves.
    ///
    /// The stream is the consumer returned by
    /// [`Broker::connect`](crate::Broker::connect). The store write is
    /// awaited without a timeout, so a hanging store client blocks the loop.
    pub async fn run<D>(&self, mut deliveries: D, shutdown: impl Future<Output = ()>)
    where
        D: Stream<Item = Result<Delivery, lapin::Error>> + Unpin,
    {
        tokio::pin!(shutdown);

        loop {
            let delivery = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    carrot_log::info!("shutdown requested, stopping the delivery loop");
                    break;
                }
                delivery = deliveries.next() => match delivery {
                    Some(delivery) => delivery,
                    None => {
                        carrot_log::info!("delivery stream closed, stopping");
                        break;
                    }
                },
            };

            let delivery = match delivery {
                Ok(delivery) => delivery,
                Err(error) => {
                    carrot_log::error!("broker delivery failed: {}", LogError(&error));
                    continue;
                }
            };

            match self.process(&delivery.data).await {
                Ok(count) => {
                    carrot_log::debug!("forwarded {count} metrics");
                    if let Err(error) = delivery.ack(BasicAckOptions::default()).await {
                        carrot_log::error!(
                            "failed to acknowledge delivery: {}",
                            LogError(&error)
                        );
                    }
                }
                // Leave the message unacknowledged and move on.
                Err(error) => {
                    carrot_log::error!("failed to relay message: {}", LogError(&error))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use carrot_metrics::Metric;
    use similar_asserts::assert_eq;

    use super::*;

    /// A sink recording every write, optionally failing the next one.
    #[derive(Default)]
    struct MockSink {
        written: Mutex<Vec<Vec<Metric>>>,
        fail_next: AtomicBool,
    }

    impl MetricSink for MockSink {
        async fn write(&self, metrics: &[Metric]) -> Result<(), WriteError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(WriteError::Status {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: "overloaded".to_owned(),
                });
            }

            self.written.lock().unwrap().push(metrics.to_vec());
            Ok(())
        }
    }

    fn payload(value: serde_json::Value) -> Vec<u8> {
        value.to_string().into_bytes()
    }

    #[tokio::test]
    async fn test_successful_message_is_forwarded() {
        let relay = Relay::new(MockSink::default());

        let count = relay
            .process(&payload(serde_json::json!({
                "host": "s1",
                "metrics": [
                    {"name": "cpu", "value": 1, "time": "2023-10-15T14:30:45Z"},
                    {"name": "mem", "value": 2, "time": "2023-10-15T14:30:45Z"},
                ]
            })))
            .await
            .unwrap();

        assert_eq!(count, 2);
        let written = relay.sink.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0][0].name, "cpu");
        assert_eq!(written[0][1].name, "mem");
    }

    #[tokio::test]
    async fn test_extraction_failure_reaches_no_sink() {
        let relay = Relay::new(MockSink::default());

        let result = relay.process(b"not json").await;
        assert!(matches!(result, Err(RelayError::Extract(_))));
        assert!(relay.sink.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_does_not_poison_the_next_message() {
        let relay = Relay::new(MockSink::default());
        let body = payload(serde_json::json!({
            "metrics": [{"name": "cpu", "value": 1, "time": 0}]
        }));

        relay.sink.fail_next.store(true, Ordering::SeqCst);
        let first = relay.process(&body).await;
        assert!(matches!(first, Err(RelayError::Forward(_))));

        let second = relay.process(&body).await.unwrap();
        assert_eq!(second, 1);
        assert_eq!(relay.sink.written.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_metrics_array_still_succeeds() {
        let relay = Relay::new(MockSink::default());

        let count = relay
            .process(&payload(serde_json::json!({"host": "s1", "metrics": []})))
            .await
            .unwrap();

        // Nothing to forward, but the message still acks.
        assert_eq!(count, 0);
    }
}

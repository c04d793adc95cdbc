use carrot_config::InfluxConfig;
use carrot_metrics::{Metric, MetricValue};
use thiserror::Error;

/// An error writing metrics to the store.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The write request could not be sent.
    #[error("failed to send write request to influxdb")]
    Http(#[from] reqwest::Error),

    /// The store rejected the write.
    #[error("influxdb rejected the write with status {status}: {body}")]
    Status {
        /// The HTTP status code of the response.
        status: reqwest::StatusCode,
        /// The response body, truncated for logging.
        body: String,
    },
}

/// A destination for extracted metrics.
///
/// All metrics of one message are written together and fail atomically as a
/// group. Implementations never retry internally; failures are reported to
/// the delivery loop, which leaves the originating message unacknowledged.
pub trait MetricSink {
    /// Writes all given metrics, or fails as a group.
    fn write(
        &self,
        metrics: &[Metric],
    ) -> impl Future<Output = Result<(), WriteError>> + Send;
}

/// A sink writing metrics to the InfluxDB v2 write API.
///
/// Metrics are encoded in line protocol with nanosecond precision and posted
/// in a single request per message. The fields map of each point has a single
/// entry keyed by the metric's own name.
#[derive(Clone, Debug)]
pub struct InfluxSink {
    client: reqwest::Client,
    url: String,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxSink {
    /// Creates a sink for the configured InfluxDB instance.
    pub fn new(config: &InfluxConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/api/v2/write", config.url.trim_end_matches('/')),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
            token: config.token.clone(),
        }
    }
}

impl MetricSink for InfluxSink {
    async fn write(&self, metrics: &[Metric]) -> Result<(), WriteError> {
        let mut body = String::new();
        for metric in metrics {
            match encode_line(metric) {
                Some(line) => {
                    body.push_str(&line);
                    body.push('\n');
                }
                // The line protocol has no null field value.
                None => carrot_log::debug!(
                    "skipping null-valued metric {:?}",
                    metric.name
                ),
            }
        }

        if body.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(&self.url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            body.truncate(512);
            return Err(WriteError::Status { status, body });
        }

        Ok(())
    }
}

/// Encodes a metric as one line of InfluxDB line protocol.
///
/// Returns `None` for null-valued metrics, which cannot be represented as a
/// field value.
fn encode_line(metric: &Metric) -> Option<String> {
    let value = match &metric.value {
        MetricValue::String(s) => {
            format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
        }
        // Bare numbers are floats in line protocol.
        MetricValue::Float(f) => f.to_string(),
        MetricValue::Bool(b) => b.to_string(),
        MetricValue::Null => return None,
    };

    let mut line = escape_measurement(&metric.name);
    for (key, tag_value) in &metric.tags {
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(tag_value));
    }

    line.push(' ');
    line.push_str(&escape_key(&metric.name));
    line.push('=');
    line.push_str(&value);

    line.push(' ');
    let nanos = metric
        .timestamp
        .timestamp_nanos_opt()
        .unwrap_or_else(|| metric.timestamp.timestamp().saturating_mul(1_000_000_000));
    line.push_str(&nanos.to_string());

    Some(line)
}

fn escape_measurement(name: &str) -> String {
    name.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(key: &str) -> String {
    key.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

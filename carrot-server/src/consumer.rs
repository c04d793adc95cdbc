use carrot_config::BrokerConfig;
use lapin::options::{
    BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties, Consumer, ExchangeKind};
use thiserror::Error;

/// An error establishing the broker consumer.
///
/// All of these are startup errors and fatal to the process.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Failed to connect to the broker or open a channel.
    #[error("failed to connect to the broker")]
    Connect(#[source] lapin::Error),

    /// Failed to declare the exchange, queue, or binding.
    #[error("failed to declare broker topology")]
    Topology(#[source] lapin::Error),

    /// Failed to start consuming from the queue.
    #[error("failed to start consuming")]
    Consume(#[source] lapin::Error),
}

/// A live broker connection with an attached consumer.
///
/// The connection is held for the lifetime of this value; dropping it closes
/// the consumer stream and releases all unacknowledged deliveries back to the
/// broker.
pub struct Broker {
    _connection: Connection,
    consumer: Consumer,
}

impl Broker {
    /// Connects to the broker and sets up the consuming topology.
    ///
    /// Declares a non-durable fanout exchange with the configured name, a
    /// durable server-named queue bound to it, and starts a manual-ack
    /// consumer on that queue. Every message published to the exchange is
    /// delivered to this consumer.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let connection = Connection::connect(&config.uri(), ConnectionProperties::default())
            .await
            .map_err(BrokerError::Connect)?;

        let channel = connection
            .create_channel()
            .await
            .map_err(BrokerError::Connect)?;

        channel
            .exchange_declare(
                &config.exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Topology)?;

        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Topology)?;

        channel
            .queue_bind(
                queue.name().as_str(),
                &config.exchange,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Topology)?;

        // Manual acknowledgments: the delivery loop decides when to ack.
        let consumer = channel
            .basic_consume(
                queue.name().as_str(),
                "",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Consume)?;

        Ok(Self {
            _connection: connection,
            consumer,
        })
    }

    /// Returns the stream of deliveries.
    pub fn consumer(&self) -> Consumer {
        self.consumer.clone()
    }
}

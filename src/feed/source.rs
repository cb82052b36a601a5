//! External feed connections.
//!
//! A [`FeedSource`] is owned by the ingestor task: opened when the task
//! starts, read in a loop, closed when the task stops. Payloads are opaque
//! bytes and are never decoded here.

use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::Message;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::FeedConfig;

/// Errors reading from a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The consumer could not be created or subscribed.
    #[error("feed client for {broker} failed: {source}")]
    Client {
        broker: String,
        #[source]
        source: KafkaError,
    },

    /// The broker reported an error while consuming.
    #[error("feed read failed: {0}")]
    Kafka(#[from] KafkaError),

    /// The source has no more messages.
    #[error("feed closed")]
    Closed,

    /// No message within the read timeout.
    #[error("no message within {0:?}")]
    Timeout(Duration),
}

/// Source of opaque messages.
#[async_trait]
pub trait FeedSource: Send {
    /// Establish the connection / subscription.
    async fn open(&mut self) -> Result<(), FeedError>;

    /// Wait for the next message.
    async fn read(&mut self) -> Result<Bytes, FeedError>;

    /// Release the connection. Idempotent.
    async fn close(&mut self);

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Kafka topic consumer.
///
/// Joins `group_id` and starts from `offset_reset` when the group has no
/// committed offset. A read on a closed feed subscribes again.
pub struct KafkaFeed {
    broker: String,
    topic: String,
    group_id: String,
    offset_reset: String,
    read_timeout: Option<Duration>,
    consumer: Option<StreamConsumer>,
}

impl KafkaFeed {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            broker: config.broker.clone(),
            topic: config.topic.clone(),
            group_id: config.group_id.clone(),
            offset_reset: config.offset_reset.clone(),
            read_timeout: None,
            consumer: None,
        }
    }

    /// Fail reads that see no message for `timeout`.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    fn subscribe(&mut self) -> Result<&StreamConsumer, FeedError> {
        if self.consumer.is_none() {
            let client_error = |source| FeedError::Client {
                broker: self.broker.clone(),
                source,
            };
            let consumer: StreamConsumer = ClientConfig::new()
                .set("bootstrap.servers", &self.broker)
                .set("group.id", &self.group_id)
                .set("auto.offset.reset", &self.offset_reset)
                .set("enable.partition.eof", "false")
                .create()
                .map_err(client_error)?;
            consumer.subscribe(&[self.topic.as_str()]).map_err(client_error)?;

            tracing::info!(
                broker = %self.broker,
                topic = %self.topic,
                group_id = %self.group_id,
                "Feed subscribed"
            );
            self.consumer = Some(consumer);
        }
        self.consumer.as_ref().ok_or(FeedError::Closed)
    }

    async fn next_payload(&mut self) -> Result<Bytes, FeedError> {
        let consumer = self.subscribe()?;
        loop {
            let message = consumer.recv().await?;
            // tombstones carry no payload
            if let Some(payload) = message.payload() {
                return Ok(Bytes::copy_from_slice(payload));
            }
        }
    }
}

#[async_trait]
impl FeedSource for KafkaFeed {
    async fn open(&mut self) -> Result<(), FeedError> {
        self.subscribe().map(|_| ())
    }

    async fn read(&mut self) -> Result<Bytes, FeedError> {
        match self.read_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.next_payload()).await {
                Ok(result) => result,
                Err(_) => Err(FeedError::Timeout(timeout)),
            },
            None => self.next_payload().await,
        }
    }

    async fn close(&mut self) {
        let Some(consumer) = self.consumer.take() else {
            return;
        };
        consumer.unsubscribe();
        // leaving the group blocks on the broker
        if let Err(e) = tokio::task::spawn_blocking(move || drop(consumer)).await {
            tracing::warn!(error = %e, "Feed consumer close failed");
        }
        tracing::info!(broker = %self.broker, topic = %self.topic, "Feed consumer closed");
    }

    fn describe(&self) -> String {
        format!("kafka://{}/{}", self.broker, self.topic)
    }
}

/// In-process feed backed by an mpsc channel.
pub struct ChannelFeed {
    rx: mpsc::Receiver<Bytes>,
}

impl ChannelFeed {
    /// Returns the feed and the sender that publishes into it.
    pub fn new(buffer: usize) -> (Self, mpsc::Sender<Bytes>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { rx }, tx)
    }
}

#[async_trait]
impl FeedSource for ChannelFeed {
    async fn open(&mut self) -> Result<(), FeedError> {
        Ok(())
    }

    async fn read(&mut self) -> Result<Bytes, FeedError> {
        self.rx.recv().await.ok_or(FeedError::Closed)
    }

    async fn close(&mut self) {
        self.rx.close();
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}

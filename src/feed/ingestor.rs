//! Background task moving feed messages into the bounded queue.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::config::FeedConfig;
use crate::feed::queue::{BoundedQueue, QueueError};
use crate::feed::source::FeedSource;
use crate::observability::metrics::{self, FailureKind};
use crate::resilience::Backoff;

/// Counters reported when the ingestor stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub accepted: u64,
    pub dropped: u64,
    pub read_errors: u64,
}

/// Reads from a [`FeedSource`] until shutdown and enqueues every message.
///
/// A full queue drops the message rather than blocking the reader.
pub struct FeedIngestor<S> {
    source: S,
    queue: Arc<BoundedQueue<Bytes>>,
    backoff: Backoff,
    stats: IngestStats,
}

impl<S: FeedSource> FeedIngestor<S> {
    pub fn new(source: S, queue: Arc<BoundedQueue<Bytes>>, config: &FeedConfig) -> Self {
        Self {
            source,
            queue,
            backoff: Backoff::new(config.retry_base_delay_ms, config.retry_max_delay_ms),
            stats: IngestStats::default(),
        }
    }

    /// Run until the shutdown signal fires, then close the source.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> IngestStats {
        let description = self.source.describe();
        tracing::info!(source = %description, capacity = self.queue.capacity(), "Feed ingestor started");

        if let Err(e) = self.source.open().await {
            // reads retry the connection
            tracing::warn!(source = %description, error = %e, "Feed open failed");
        }

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                result = self.source.read() => match result {
                    Ok(message) => self.accept(message),
                    Err(e) => {
                        self.stats.read_errors += 1;
                        let delay = self.backoff.next_delay();
                        tracing::warn!(
                            source = %description,
                            error = %e,
                            retry_in_ms = delay.as_millis() as u64,
                            "Feed read failed"
                        );
                        tokio::select! {
                            _ = shutdown.recv() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                },
            }
        }

        self.source.close().await;
        tracing::info!(
            source = %description,
            accepted = self.stats.accepted,
            dropped = self.stats.dropped,
            "Feed ingestor stopped"
        );
        self.stats
    }

    fn accept(&mut self, message: Bytes) {
        self.backoff.reset();
        match self.queue.enqueue(message) {
            Ok(()) => {
                self.stats.accepted += 1;
                metrics::record_feed_message();
                metrics::record_queue_depth(self.queue.len());
            }
            Err(QueueError::Full { capacity }) => {
                self.stats.dropped += 1;
                metrics::record_failure(FailureKind::QueueFull);
                tracing::debug!(capacity, "Feed queue full, message dropped");
            }
            Err(QueueError::Empty) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::source::ChannelFeed;
    use std::time::Duration;

    fn config() -> FeedConfig {
        FeedConfig {
            enabled: true,
            retry_base_delay_ms: 10,
            retry_max_delay_ms: 20,
            ..FeedConfig::default()
        }
    }

    async fn wait_for_len(queue: &BoundedQueue<Bytes>, len: usize) {
        for _ in 0..100 {
            if queue.len() == len {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queue never reached {} items", len);
    }

    #[tokio::test]
    async fn test_messages_land_in_queue() {
        let (feed, tx) = ChannelFeed::new(16);
        let queue = Arc::new(BoundedQueue::new(10));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let ingestor = FeedIngestor::new(feed, Arc::clone(&queue), &config());
        let handle = tokio::spawn(ingestor.run(shutdown_rx));

        tx.send(Bytes::from_static(b"span-1")).await.unwrap();
        tx.send(Bytes::from_static(b"span-2")).await.unwrap();
        wait_for_len(&queue, 2).await;

        assert_eq!(queue.dequeue().unwrap(), "span-1");
        assert_eq!(queue.dequeue().unwrap(), "span-2");

        shutdown_tx.send(()).unwrap();
        let stats = handle.await.unwrap();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test]
    async fn test_binary_payload_kept_intact() {
        let (feed, tx) = ChannelFeed::new(4);
        let queue = Arc::new(BoundedQueue::new(4));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(FeedIngestor::new(feed, Arc::clone(&queue), &config()).run(shutdown_rx));

        // protobuf-encoded spans carry newlines and invalid UTF-8
        let payload = Bytes::from_static(b"\x0a\x03a\nb\xff\xfe\x00");
        tx.send(payload.clone()).await.unwrap();
        wait_for_len(&queue, 1).await;
        assert_eq!(queue.dequeue().unwrap(), payload);

        shutdown_tx.send(()).unwrap();
        assert_eq!(handle.await.unwrap().accepted, 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops_messages() {
        let (feed, tx) = ChannelFeed::new(16);
        let queue = Arc::new(BoundedQueue::new(2));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(FeedIngestor::new(feed, Arc::clone(&queue), &config()).run(shutdown_rx));

        for i in 0..5 {
            tx.send(Bytes::from(format!("m{}", i))).await.unwrap();
        }
        // channel drained means every message went through accept()
        for _ in 0..100 {
            if tx.capacity() == 16 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        shutdown_tx.send(()).unwrap();
        let stats = handle.await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.dropped, 3);
        assert_eq!(queue.dequeue().unwrap(), "m0");
    }

    #[tokio::test]
    async fn test_shutdown_while_backing_off() {
        let (feed, tx) = ChannelFeed::new(1);
        drop(tx);
        let queue = Arc::new(BoundedQueue::new(1));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(FeedIngestor::new(feed, queue, &config()).run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        let stats = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ingestor did not stop")
            .unwrap();
        assert!(stats.read_errors >= 1);
    }
}

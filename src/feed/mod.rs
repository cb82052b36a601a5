//! Feed ingestion subsystem.
//!
//! # Data Flow
//! ```text
//! Kafka topic (rdkafka StreamConsumer) or in-process channel
//!     → source.rs (FeedSource: open / read / close)
//!     → ingestor.rs (background task, backoff on read errors)
//!     → queue.rs (BoundedQueue, drop when full)
//!     → /kafka handler drains one item per request
//! ```
//!
//! # Design Decisions
//! - Enqueue and dequeue never block; a full queue rejects
//! - Messages are opaque bytes; only the drain handler decodes them
//! - The ingestor stops on the shared shutdown signal and closes its source

pub mod ingestor;
pub mod queue;
pub mod source;

pub use ingestor::{FeedIngestor, IngestStats};
pub use queue::{BoundedQueue, QueueError, DEFAULT_CAPACITY};
pub use source::{ChannelFeed, FeedError, FeedSource, KafkaFeed};

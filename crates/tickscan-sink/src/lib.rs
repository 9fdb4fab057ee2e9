//! Persistence and streaming sinks for the tickscan ticker scanner.
//!
//! This crate provides the output side of a scan cycle:
//!
//! - [`CandleStore`] / [`SqlCandleStore`] - conflict-ignoring candle persistence
//! - [`StreamSink`] - Redis stream and Kafka ticker publishing
//! - [`StreamPublisher`] - bounded worker pool in front of a stream sink

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tickscan/tickscan/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod publisher;
mod sql;
mod store;
mod stream;

pub use error::SinkError;
pub use publisher::{PublisherStats, StreamPublisher};
pub use sql::{DatabaseKind, INSERT_BATCH_SIZE, SqlCandleStore};
pub use store::{CandleStore, SaveReport};
pub use stream::{
    KafkaSettings, KafkaStreamSink, RedisSettings, RedisStreamSink, StreamMessage, StreamSink,
};

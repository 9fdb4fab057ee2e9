//! Scanner daemon for tickscan.
//!
//! This crate wires the fetch, aggregation and sink crates into a polling
//! service:
//!
//! - [`ScannerConfig`] - TOML configuration with validation and save-back
//! - [`Scanner`] - The cycle loop: fetch, rotate, aggregate, extract, persist
//! - [`AbsenceTracker`] - Counts consecutive misses before blacklisting
//! - [`IntervalSchedule`] - Decides which intervals closed a window
//! - [`CycleStats`] - Counters for one cycle

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tickscan/tickscan/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod absence;
mod config;
mod scanner;
mod schedule;
mod stats;

pub use absence::AbsenceTracker;
pub use config::{
    AggregatorConfig, ConfigError, DEFAULT_CONFIG_FILE, DatabaseConfig, DatabaseProvider,
    KafkaConfig, LoggingConfig, MIN_REFRESH_SECONDS, RedisConfig, ScannerConfig, StreamingConfig,
    StreamingProvider,
};
pub use scanner::{RunSummary, Scanner, ScannerError};
pub use schedule::IntervalSchedule;
pub use stats::CycleStats;

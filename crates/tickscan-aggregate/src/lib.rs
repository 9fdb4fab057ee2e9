//! Candle aggregation for the tickscan ticker scanner.
//!
//! This crate turns polled ticker snapshots into OHLC candles:
//!
//! - [`TickAggregator`] - per-symbol sample buffer with interval extraction
//! - [`Candle`] - completed OHLC candle
//! - [`SymbolRotator`] - round-robin batch selection over a symbol universe

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tickscan/tickscan/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod candle;
mod rotator;

pub use aggregator::{Coverage, TickAggregator};
pub use candle::Candle;
pub use rotator::SymbolRotator;

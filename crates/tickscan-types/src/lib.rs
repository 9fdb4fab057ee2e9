//! Core types for the tickscan candle scanner.
//!
//! This crate provides the data structures shared across the workspace:
//!
//! - [`TickSample`] - A single price/volume observation, truncated to one second
//! - [`Interval`] - The closed table of candle intervals
//! - [`NormalizedTicker`] - The exchange-independent ticker snapshot record
//! - [`ExchangeId`] - Supported exchanges
//! - [`clean_symbol`] - Quote-suffix symbol normalization

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod exchange;
mod interval;
mod symbol;
mod tick;
mod ticker;

pub use error::TickerParseError;
pub use exchange::{ExchangeId, ExchangeParseError};
pub use interval::{Interval, IntervalParseError};
pub use symbol::clean_symbol;
pub use tick::{TICK_RESOLUTION_MS, TickSample, truncate_to_resolution};
pub use ticker::NormalizedTicker;

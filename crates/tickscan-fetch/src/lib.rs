//! Rate-limited fetching for the tickscan ticker scanner.
//!
//! This crate provides the HTTP side of a scan cycle:
//!
//! - [`RateLimitedClient`] - self-throttling client with bounded retries
//! - [`RateLimitState`] / [`RateLimitHeaders`] - server-reported usage tracking
//! - [`TickerSource`] / [`ExchangeClient`] - per-exchange ticker snapshots

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/tickscan/tickscan/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod exchange;
mod limit;

pub use client::{ClientConfig, RateLimitedClient};
pub use error::FetchError;
pub use exchange::{ExchangeClient, TICKER_WEIGHT, TickerSource};
pub use limit::{MAX_WAIT, RateLimitHeaders, RateLimitState, retry_after};

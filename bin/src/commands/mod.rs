//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod intervals;
pub(crate) mod run;
pub(crate) mod tickers;

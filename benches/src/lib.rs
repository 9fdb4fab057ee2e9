//! Workload generation for tickscan benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tickscan_aggregate::TickAggregator;

/// One synthetic ticker observation.
#[derive(Debug, Clone)]
pub struct SyntheticTick {
    /// Symbol index into [`Workload::symbols`].
    pub symbol: usize,
    /// Last price.
    pub price: f64,
    /// 24h volume.
    pub volume: f64,
    /// Observation time in Unix milliseconds.
    pub time_ms: i64,
}

/// A reproducible stream of observations for a fixed symbol set.
#[derive(Debug, Clone)]
pub struct Workload {
    /// Symbol names.
    pub symbols: Vec<String>,
    /// Observations, ordered by time.
    pub ticks: Vec<SyntheticTick>,
    /// Time just after the last observation.
    pub end_ms: i64,
}

impl Workload {
    /// Generates `symbols` random walks sampled every `step_ms` for `duration_ms`.
    pub fn random_walk(symbols: usize, duration_ms: i64, step_ms: i64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let names: Vec<String> = (0..symbols).map(|i| format!("SYM{i:04}USDT")).collect();
        let mut prices: Vec<f64> = (0..symbols).map(|_| rng.gen_range(1.0..50_000.0)).collect();

        let start_ms = 1_700_000_000_000_i64;
        let mut ticks = Vec::new();
        let mut time_ms = start_ms;
        while time_ms < start_ms + duration_ms {
            for (symbol, price) in prices.iter_mut().enumerate() {
                *price *= 1.0 + rng.gen_range(-0.001..0.001);
                ticks.push(SyntheticTick {
                    symbol,
                    price: *price,
                    volume: rng.gen_range(1_000.0..1_000_000.0),
                    time_ms,
                });
            }
            time_ms += step_ms;
        }

        Self {
            symbols: names,
            ticks,
            end_ms: time_ms,
        }
    }

    /// Feeds every observation into a fresh aggregator.
    pub fn load(&self, aggregator: &TickAggregator) -> usize {
        self.ticks
            .iter()
            .filter(|t| aggregator.add_price_at(&self.symbols[t.symbol], t.price, t.volume, t.time_ms))
            .count()
    }
}

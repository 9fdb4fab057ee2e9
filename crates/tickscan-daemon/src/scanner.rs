//! The polling loop tying fetch, aggregation, streaming and storage together.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tickscan_aggregate::{Coverage, SymbolRotator, TickAggregator};
use tickscan_fetch::{ClientConfig, ExchangeClient, FetchError, TickerSource};
use tickscan_sink::{
    CandleStore, KafkaSettings, KafkaStreamSink, PublisherStats, RedisSettings, RedisStreamSink,
    SinkError, SqlCandleStore, StreamMessage, StreamPublisher, StreamSink,
};
use tickscan_types::{Interval, NormalizedTicker};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ScannerConfig, StreamingConfig, StreamingProvider};
use crate::{AbsenceTracker, CycleStats, IntervalSchedule};

/// Errors that stop the scanner from starting.
#[derive(Error, Debug)]
pub enum ScannerError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The exchange client could not be built.
    #[error("Failed to create exchange client: {0}")]
    Fetch(#[from] FetchError),

    /// A sink could not be opened.
    #[error("Failed to open sink: {0}")]
    Sink(#[from] SinkError),
}

/// Totals reported when [`Scanner::run`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Completed cycles.
    pub cycles: u64,
    /// Final publisher counters, if streaming was enabled.
    pub publisher: Option<PublisherStats>,
}

/// Periodic ticker scanner.
///
/// Each cycle fetches one snapshot, feeds the current rotation batch into the
/// aggregator, and persists candles for every interval whose window closed
/// since the previous cycle.
pub struct Scanner {
    config: ScannerConfig,
    config_path: Option<PathBuf>,
    source: Arc<dyn TickerSource>,
    store: Arc<dyn CandleStore>,
    publisher: Option<StreamPublisher>,
    aggregator: TickAggregator,
    rotator: SymbolRotator,
    seeded: bool,
    absence: AbsenceTracker,
    schedule: IntervalSchedule,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("exchange", &self.source.exchange())
            .field("instance", &self.config.instance)
            .field("universe", &self.rotator.len())
            .field("streaming", &self.publisher.is_some())
            .finish_non_exhaustive()
    }
}

impl Scanner {
    /// Creates a scanner over the given source and store.
    ///
    /// Configuration floors are applied before validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn new(
        mut config: ScannerConfig,
        source: Arc<dyn TickerSource>,
        store: Arc<dyn CandleStore>,
    ) -> Result<Self, ScannerError> {
        config.apply_floors();
        config.validate()?;
        let intervals = config.parsed_intervals()?;

        let coverage = if config.aggregator.require_full_coverage {
            Coverage::FullWindow
        } else {
            Coverage::Lenient
        };

        let universe: Vec<String> = config
            .symbols
            .iter()
            .filter(|s| !config.is_blacklisted(s))
            .cloned()
            .collect();
        let seeded = !universe.is_empty();

        Ok(Self {
            rotator: SymbolRotator::new(universe, config.batch_size),
            absence: AbsenceTracker::new(config.absence_threshold),
            schedule: IntervalSchedule::new(intervals),
            aggregator: TickAggregator::with_coverage(coverage),
            seeded,
            config,
            config_path: None,
            source,
            store,
            publisher: None,
        })
    }

    /// Builds a scanner from configuration alone, connecting the exchange
    /// client, candle database and optional stream sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or a connection fails.
    pub async fn connect(
        config: ScannerConfig,
        config_path: Option<PathBuf>,
    ) -> Result<Self, ScannerError> {
        config.validate()?;
        let exchange = config.exchange_id()?;
        let source = Arc::new(ExchangeClient::new(exchange, ClientConfig::default())?);
        let store = Arc::new(SqlCandleStore::connect(&config.database.connection_string).await?);

        let publisher = if config.streaming.enabled {
            Some(open_publisher(&config.streaming).await?)
        } else {
            None
        };

        let mut scanner = Self::new(config, source, store)?;
        scanner.config_path = config_path;
        scanner.publisher = publisher;
        Ok(scanner)
    }

    /// Sets the file blacklist changes are written back to.
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Publishes accepted tickers through `publisher`.
    #[must_use]
    pub fn with_publisher(mut self, publisher: StreamPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Returns the live configuration, including runtime blacklist additions.
    #[must_use]
    pub const fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Returns the aggregator.
    #[must_use]
    pub const fn aggregator(&self) -> &TickAggregator {
        &self.aggregator
    }

    /// Returns the current rotation universe.
    #[must_use]
    pub fn universe(&self) -> &[String] {
        self.rotator.symbols()
    }

    /// Runs cycles every `refresh_seconds` until `shutdown` resolves.
    ///
    /// A cycle in progress when `shutdown` resolves runs to completion. The
    /// stream publisher is drained before returning.
    pub async fn run<F>(mut self, shutdown: F) -> RunSummary
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            exchange = %self.source.exchange(),
            instance = %self.config.instance,
            refresh_seconds = self.config.refresh_seconds,
            intervals = ?self.schedule.intervals(),
            "scanner started"
        );

        let mut cycles = 0_u64;
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(cycles, "shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                    cycles += 1;
                }
            }
        }

        let publisher = match self.publisher.take() {
            Some(publisher) => {
                let stats = publisher.shutdown().await;
                info!(
                    published = stats.published,
                    dropped = stats.dropped,
                    failed = stats.failed,
                    "stream publisher drained"
                );
                Some(stats)
            }
            None => None,
        };

        RunSummary { cycles, publisher }
    }

    /// Runs one cycle at the current wall-clock time, with jitter if enabled.
    pub async fn run_cycle(&mut self) -> CycleStats {
        let jitter = &self.config.aggregator;
        if jitter.enable_jitter && jitter.jitter_max_millis > 0 {
            let delay = rand::thread_rng().gen_range(0..=jitter.jitter_max_millis);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.run_cycle_at(Utc::now().timestamp_millis()).await
    }

    /// Runs one cycle treating `now_ms` as the sample and extraction time.
    pub async fn run_cycle_at(&mut self, now_ms: i64) -> CycleStats {
        let started = Instant::now();
        let mut stats = CycleStats::default();

        let snapshot = match self.source.all_tickers().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(exchange = %self.source.exchange(), error = %e, "failed to fetch tickers");
                stats.elapsed = started.elapsed();
                return stats;
            }
        };
        stats.snapshot_len = snapshot.len();

        if !self.seeded {
            self.seed_universe(&snapshot);
        }

        let batch = self.rotator.next_batch();
        stats.batch_len = batch.len();
        let batch_set: HashSet<&str> = batch.iter().map(String::as_str).collect();

        let at = DateTime::from_timestamp_millis(now_ms).unwrap_or_else(Utc::now);
        for ticker in snapshot
            .iter()
            .filter(|t| batch_set.contains(t.symbol.as_str()) && !self.config.is_blacklisted(&t.symbol))
        {
            self.ingest(ticker, now_ms, at, &mut stats);
        }

        self.track_absence(&batch, &snapshot, &mut stats);

        let due = self.schedule.due(now_ms);
        stats.intervals_due = due.len();
        if !due.is_empty() {
            self.extract_and_save(now_ms, &due, &mut stats).await;
        }

        stats.elapsed = started.elapsed();
        self.log_stats(&stats);
        stats
    }

    fn seed_universe(&mut self, snapshot: &[NormalizedTicker]) {
        let mut symbols: Vec<String> = snapshot
            .iter()
            .map(|t| t.symbol.clone())
            .filter(|s| !self.config.is_blacklisted(s))
            .collect();
        symbols.sort();
        symbols.dedup();
        info!(symbols = symbols.len(), "seeded universe from snapshot");
        self.rotator.set_universe(symbols);
        self.seeded = true;
    }

    fn ingest(
        &self,
        ticker: &NormalizedTicker,
        now_ms: i64,
        at: DateTime<Utc>,
        stats: &mut CycleStats,
    ) {
        let (price, volume) = match ticker.sample_values() {
            Ok(values) => values,
            Err(e) => {
                warn!(symbol = %ticker.symbol, error = %e, "skipping malformed ticker");
                stats.samples_malformed += 1;
                return;
            }
        };

        if self.aggregator.add_price_at(&ticker.symbol, price, volume, now_ms) {
            stats.samples_added += 1;
        } else {
            stats.samples_duplicate += 1;
        }

        let Some(publisher) = &self.publisher else {
            return;
        };
        match StreamMessage::from_ticker(ticker, at) {
            Ok(message) => {
                if publisher.offer(message) {
                    stats.streamed += 1;
                } else {
                    stats.stream_dropped += 1;
                }
            }
            Err(e) => warn!(symbol = %ticker.symbol, error = %e, "failed to encode stream message"),
        }
    }

    fn track_absence(&mut self, batch: &[String], snapshot: &[NormalizedTicker], stats: &mut CycleStats) {
        let present: HashSet<&str> = snapshot.iter().map(|t| t.symbol.as_str()).collect();

        for symbol in batch {
            if self.config.is_blacklisted(symbol) {
                continue;
            }
            if present.contains(symbol.as_str()) {
                self.absence.seen(symbol);
                continue;
            }

            stats.missing += 1;
            debug!(symbol = %symbol, misses = self.absence.misses(symbol) + 1, "symbol missing from snapshot");
            if self.absence.missed(symbol) {
                self.blacklist(symbol);
                stats.blacklisted.push(symbol.clone());
            }
        }

        if !stats.blacklisted.is_empty() {
            self.persist_config();
        }
    }

    fn blacklist(&mut self, symbol: &str) {
        self.config.blacklist(symbol);
        self.rotator.retain(|s| s != symbol);
        let purged = self.aggregator.purge_symbol(symbol);
        warn!(
            symbol,
            threshold = self.absence.threshold(),
            purged,
            "symbol absent from consecutive snapshots, blacklisted"
        );
    }

    fn persist_config(&self) {
        let Some(path) = &self.config_path else {
            return;
        };
        match self.config.save(path) {
            Ok(()) => info!(
                path = %path.display(),
                blacklisted = self.config.blacklisted_symbols.len(),
                "saved config"
            ),
            Err(e) => error!(error = %e, "failed to save config"),
        }
    }

    async fn extract_and_save(&self, now_ms: i64, due: &[Interval], stats: &mut CycleStats) {
        let candles = self.aggregator.extract_intervals_at(now_ms, due);
        stats.candles = candles.len();
        if candles.is_empty() {
            return;
        }

        match self.store.save(&candles, &self.config.instance).await {
            Ok(report) => stats.saved = Some(report),
            Err(e) => error!(
                instance = %self.config.instance,
                candles = candles.len(),
                error = %e,
                "failed to save candles"
            ),
        }
    }

    fn log_stats(&self, stats: &CycleStats) {
        if self.config.aggregator.enable_batch_stats {
            info!(
                snapshot = stats.snapshot_len,
                batch = stats.batch_len,
                added = stats.samples_added,
                duplicate = stats.samples_duplicate,
                malformed = stats.samples_malformed,
                missing = stats.missing,
                streamed = stats.streamed,
                dropped = stats.stream_dropped,
                candles = stats.candles,
                inserted = stats.inserted(),
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "cycle complete"
            );
        } else {
            debug!(
                snapshot = stats.snapshot_len,
                batch = stats.batch_len,
                added = stats.samples_added,
                candles = stats.candles,
                inserted = stats.inserted(),
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "cycle complete"
            );
        }
    }
}

async fn open_publisher(settings: &StreamingConfig) -> Result<StreamPublisher, ScannerError> {
    let sink: Arc<dyn StreamSink> = match settings.provider()? {
        StreamingProvider::Redis => {
            let redis = &settings.redis;
            Arc::new(
                RedisStreamSink::connect(&RedisSettings {
                    address: redis.address.clone(),
                    stream: redis.stream.clone(),
                    password: redis.password.clone(),
                    db: redis.db,
                })
                .await?,
            )
        }
        StreamingProvider::Kafka => Arc::new(
            KafkaStreamSink::connect(&KafkaSettings {
                brokers: settings.kafka.brokers.clone(),
                topic: settings.kafka.topic.clone(),
            })
            .await?,
        ),
    };
    Ok(StreamPublisher::spawn(sink, settings.queue_capacity, settings.workers))
}

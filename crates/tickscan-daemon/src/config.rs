//! Scanner configuration loading, validation and persistence.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tickscan_types::{ExchangeId, Interval, IntervalParseError};
use tracing::warn;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "tickscan.toml";

/// Shortest allowed poll period.
pub const MIN_REFRESH_SECONDS: u64 = 4;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config '{path}': {source}")]
    Read {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write the configuration file.
    #[error("Failed to write config '{path}': {source}")]
    Write {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying TOML error.
        source: toml::de::Error,
    },

    /// Failed to serialize TOML.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Unknown exchange name.
    #[error("Unknown exchange '{0}', expected one of: binance, bybit, okx, bitget")]
    UnknownExchange(String),

    /// Unknown database provider.
    #[error("Unknown database provider '{0}', expected sqlite or postgresql")]
    UnknownDatabaseProvider(String),

    /// Database connection string is empty.
    #[error("Database connection string is empty")]
    MissingConnectionString,

    /// Connection string scheme does not match the provider.
    #[error("Database provider '{provider}' does not accept '{scheme}' connection strings")]
    ConnectionStringMismatch {
        /// Configured provider.
        provider: String,
        /// Scheme of the connection string.
        scheme: String,
    },

    /// Unknown streaming provider.
    #[error("Unknown streaming provider '{0}', expected redis or kafka")]
    UnknownStreamingProvider(String),

    /// Redis streaming is enabled without an address or stream key.
    #[error("Redis streaming requires both an address and a stream")]
    IncompleteRedis,

    /// Kafka streaming is enabled without brokers or a topic.
    #[error("Kafka streaming requires at least one broker and a topic")]
    IncompleteKafka,

    /// Unknown interval name.
    #[error(transparent)]
    Interval(#[from] IntervalParseError),

    /// Batch size of zero.
    #[error("batch_size must be at least 1")]
    ZeroBatchSize,
}

/// Database backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseProvider {
    /// SQLite.
    Sqlite,
    /// PostgreSQL.
    Postgresql,
}

impl DatabaseProvider {
    /// Returns true if `url` uses a scheme this provider connects to.
    #[must_use]
    pub fn accepts(&self, url: &str) -> bool {
        let scheme = url.split(':').next().unwrap_or_default();
        match self {
            Self::Sqlite => scheme == "sqlite",
            Self::Postgresql => matches!(scheme, "postgres" | "postgresql"),
        }
    }
}

impl FromStr for DatabaseProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgresql" | "postgres" => Ok(Self::Postgresql),
            _ => Err(ConfigError::UnknownDatabaseProvider(s.to_string())),
        }
    }
}

/// Streaming backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingProvider {
    /// Redis streams.
    Redis,
    /// Kafka topic.
    Kafka,
}

impl FromStr for StreamingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "kafka" => Ok(Self::Kafka),
            _ => Err(ConfigError::UnknownStreamingProvider(s.to_string())),
        }
    }
}

/// Aggregation tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Sleep a random delay before each fetch.
    pub enable_jitter: bool,
    /// Upper bound of the jitter delay.
    pub jitter_max_millis: u64,
    /// Log cycle statistics at info level instead of debug.
    pub enable_batch_stats: bool,
    /// Skip candles for windows the buffer does not fully cover.
    pub require_full_coverage: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            enable_jitter: true,
            jitter_max_millis: 500,
            enable_batch_stats: false,
            require_full_coverage: true,
        }
    }
}

/// Redis stream settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Server address, `host:port` or `redis://` URL.
    pub address: String,
    /// Stream key.
    pub stream: String,
    /// Password, empty for none.
    pub password: String,
    /// Logical database index.
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: "redis://127.0.0.1:6379".to_string(),
            stream: "ticks".to_string(),
            password: String::new(),
            db: 0,
        }
    }
}

/// Kafka settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    /// Bootstrap brokers.
    pub brokers: Vec<String>,
    /// Topic name.
    pub topic: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["127.0.0.1:9092".to_string()],
            topic: "ticks".to_string(),
        }
    }
}

/// Raw ticker streaming settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Publish every accepted ticker.
    pub enabled: bool,
    /// `redis` or `kafka`.
    pub provider: String,
    /// Publisher queue capacity.
    pub queue_capacity: usize,
    /// Publisher worker count.
    pub workers: usize,
    /// Redis settings.
    pub redis: RedisConfig,
    /// Kafka settings.
    pub kafka: KafkaConfig,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "redis".to_string(),
            queue_capacity: 1024,
            workers: 4,
            redis: RedisConfig::default(),
            kafka: KafkaConfig::default(),
        }
    }
}

impl StreamingConfig {
    /// Returns the parsed provider.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider name.
    pub fn provider(&self) -> Result<StreamingProvider, ConfigError> {
        self.provider.parse()
    }
}

/// Candle database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlite` or `postgresql`.
    pub provider: String,
    /// `sqlx` connection URL.
    pub connection_string: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            connection_string: "sqlite://tickscan.db".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Returns the parsed provider.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider name.
    pub fn provider(&self) -> Result<DatabaseProvider, ConfigError> {
        self.provider.parse()
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Optional log file, written in addition to the console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Complete scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Exchange to poll.
    pub exchange: String,
    /// Instance tag written with every candle.
    pub instance: String,
    /// Poll period in seconds.
    pub refresh_seconds: u64,
    /// Symbol universe; discovered from the first snapshot when empty.
    pub symbols: Vec<String>,
    /// Symbols never fed to the aggregator.
    pub blacklisted_symbols: Vec<String>,
    /// Symbols taken from the universe per cycle.
    pub batch_size: usize,
    /// Interval names to extract.
    pub intervals: Vec<String>,
    /// Consecutive missing cycles before a symbol is blacklisted.
    pub absence_threshold: u32,
    /// Force debug logging.
    pub debug: bool,
    /// Aggregation tuning.
    pub aggregator: AggregatorConfig,
    /// Raw ticker streaming.
    pub streaming: StreamingConfig,
    /// Candle database.
    pub database: DatabaseConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            exchange: ExchangeId::Binance.as_str().to_string(),
            instance: format!("tickscan-{}", uuid::Uuid::new_v4()),
            refresh_seconds: 5,
            symbols: Vec::new(),
            blacklisted_symbols: Vec::new(),
            batch_size: 50,
            intervals: Interval::all().iter().map(|i| i.as_str().to_string()).collect(),
            absence_threshold: 3,
            debug: false,
            aggregator: AggregatorConfig::default(),
            streaming: StreamingConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ScannerConfig {
    /// Loads a configuration file.
    ///
    /// Missing keys take their defaults. The result is neither validated nor
    /// floored; see [`ScannerConfig::apply_floors`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Writes the configuration back as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Raises values below their minimum, logging each change.
    pub fn apply_floors(&mut self) {
        if self.refresh_seconds < MIN_REFRESH_SECONDS {
            warn!(
                configured = self.refresh_seconds,
                applied = MIN_REFRESH_SECONDS,
                "refresh_seconds below minimum, raising"
            );
            self.refresh_seconds = MIN_REFRESH_SECONDS;
        }
    }

    /// Checks every setting that would otherwise fail at startup.
    ///
    /// Streaming settings are only checked when streaming is enabled.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.exchange_id()?;
        self.parsed_intervals()?;
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        let provider = self.database.provider()?;
        let url = self.database.connection_string.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingConnectionString);
        }
        if !provider.accepts(url) {
            return Err(ConfigError::ConnectionStringMismatch {
                provider: self.database.provider.clone(),
                scheme: url.split(':').next().unwrap_or_default().to_string(),
            });
        }

        if self.streaming.enabled {
            match self.streaming.provider()? {
                StreamingProvider::Redis => {
                    let redis = &self.streaming.redis;
                    if redis.address.trim().is_empty() || redis.stream.trim().is_empty() {
                        return Err(ConfigError::IncompleteRedis);
                    }
                }
                StreamingProvider::Kafka => {
                    let kafka = &self.streaming.kafka;
                    if kafka.brokers.is_empty() || kafka.topic.trim().is_empty() {
                        return Err(ConfigError::IncompleteKafka);
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the configured exchange.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown exchange name.
    pub fn exchange_id(&self) -> Result<ExchangeId, ConfigError> {
        self.exchange
            .parse()
            .map_err(|_| ConfigError::UnknownExchange(self.exchange.clone()))
    }

    /// Returns the configured intervals, deduplicated and shortest first.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first unknown interval.
    pub fn parsed_intervals(&self) -> Result<Vec<Interval>, ConfigError> {
        let mut intervals = self
            .intervals
            .iter()
            .map(|name| name.trim().parse::<Interval>())
            .collect::<Result<Vec<_>, _>>()?;
        intervals.sort();
        intervals.dedup();
        Ok(intervals)
    }

    /// Returns the poll period.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_seconds)
    }

    /// Returns true if `symbol` is blacklisted (case-insensitive).
    #[must_use]
    pub fn is_blacklisted(&self, symbol: &str) -> bool {
        self.blacklisted_symbols
            .iter()
            .any(|s| s.eq_ignore_ascii_case(symbol))
    }

    /// Adds a symbol to the blacklist, returning false if it was already there.
    pub fn blacklist(&mut self, symbol: &str) -> bool {
        if self.is_blacklisted(symbol) {
            return false;
        }
        self.blacklisted_symbols.push(symbol.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
exchange = "bybit"
instance = "scanner-1"
refresh_seconds = 10
symbols = ["BTCUSDT", "ETHUSDT"]
intervals = ["1m", "5m", "1h"]

[aggregator]
jitter_max_millis = 250

[streaming]
enabled = true
provider = "kafka"

[streaming.kafka]
brokers = ["kafka-1:9092"]
topic = "tickers"

[database]
provider = "postgresql"
connection_string = "postgres://scanner@localhost/candles"
"#;

    fn write(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = ScannerConfig::default();
        assert_eq!(config.exchange, "binance");
        assert!(config.instance.starts_with("tickscan-"));
        assert_eq!(config.refresh_seconds, 5);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.absence_threshold, 3);
        assert_eq!(config.intervals.len(), Interval::all().len());
        assert!(config.aggregator.enable_jitter);
        assert!(config.aggregator.require_full_coverage);
        assert!(!config.streaming.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_instances_are_unique_by_default() {
        assert_ne!(ScannerConfig::default().instance, ScannerConfig::default().instance);
    }

    #[test]
    fn test_load_sample() {
        let dir = TempDir::new().unwrap();
        let config = ScannerConfig::load(&write(&dir, SAMPLE)).unwrap();

        assert_eq!(config.exchange_id().unwrap(), ExchangeId::Bybit);
        assert_eq!(config.instance, "scanner-1");
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
        assert_eq!(config.symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(config.aggregator.jitter_max_millis, 250);
        assert!(config.aggregator.enable_jitter);
        assert_eq!(config.streaming.provider().unwrap(), StreamingProvider::Kafka);
        assert_eq!(config.database.provider().unwrap(), DatabaseProvider::Postgresql);
        assert_eq!(
            config.parsed_intervals().unwrap(),
            vec![Interval::Minute1, Interval::Minute5, Interval::Hour1]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_refresh_floor() {
        let dir = TempDir::new().unwrap();
        let mut config = ScannerConfig::load(&write(&dir, "refresh_seconds = 1\n")).unwrap();
        assert_eq!(config.refresh_seconds, 1);
        config.apply_floors();
        assert_eq!(config.refresh_seconds, MIN_REFRESH_SECONDS);
        config.refresh_seconds = 30;
        config.apply_floors();
        assert_eq!(config.refresh_seconds, 30);
    }

    #[test]
    fn test_missing_file() {
        let err = ScannerConfig::load(Path::new("/nonexistent/tickscan.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let err = ScannerConfig::load(&write(&dir, "exchange = [")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_exchange_rejected() {
        let config = ScannerConfig {
            exchange: "kraken".to_string(),
            ..ScannerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::UnknownExchange(_))));
    }

    #[test]
    fn test_unknown_interval_rejected() {
        let config = ScannerConfig {
            intervals: vec!["1m".to_string(), "7m".to_string()],
            ..ScannerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Interval(_))));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let config = ScannerConfig {
            batch_size: 0,
            ..ScannerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBatchSize)));
    }

    #[test]
    fn test_unknown_database_provider_rejected() {
        let mut config = ScannerConfig::default();
        config.database.provider = "mysql".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownDatabaseProvider(_))
        ));
    }

    #[test]
    fn test_connection_string_must_match_provider() {
        let mut config = ScannerConfig::default();
        config.database.connection_string = "postgres://localhost/candles".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConnectionStringMismatch { .. })
        ));

        config.database.provider = "postgres".to_string();
        assert!(config.validate().is_ok());

        config.database.connection_string = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingConnectionString)));
    }

    #[test]
    fn test_streaming_checked_only_when_enabled() {
        let mut config = ScannerConfig::default();
        config.streaming.provider = "nats".to_string();
        assert!(config.validate().is_ok());

        config.streaming.enabled = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownStreamingProvider(_))
        ));

        config.streaming.provider = "redis".to_string();
        config.streaming.redis.stream = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::IncompleteRedis)));

        config.streaming.provider = "kafka".to_string();
        config.streaming.kafka.brokers.clear();
        assert!(matches!(config.validate(), Err(ConfigError::IncompleteKafka)));
    }

    #[test]
    fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, SAMPLE);
        let mut config = ScannerConfig::load(&path).unwrap();

        assert!(config.blacklist("DOGEUSDT"));
        assert!(!config.blacklist("dogeusdt"));
        config.save(&path).unwrap();

        let reloaded = ScannerConfig::load(&path).unwrap();
        assert_eq!(reloaded, config);
        assert!(reloaded.is_blacklisted("DOGEUSDT"));
    }
}

//! Ticker streaming sinks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, IntoConnectionInfo};
use rskafka::client::ClientBuilder;
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::record::Record;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tickscan_types::NormalizedTicker;
use tracing::{debug, info};

use crate::SinkError;

/// Wire payload published for each ticker update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct TickerPayload<'a> {
    symbol: &'a str,
    price_change_percent: &'a str,
    last_price: &'a str,
    volume: &'a str,
    timestamp: i64,
}

/// One ticker update ready for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Raw exchange symbol.
    pub symbol: String,
    /// JSON payload: `{symbol, priceChangePercent, lastPrice, volume, timestamp}`.
    pub payload: String,
    /// Creation time in Unix milliseconds.
    pub created_ms: i64,
}

impl StreamMessage {
    /// Builds a message from a ticker observed at `at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn from_ticker(ticker: &NormalizedTicker, at: DateTime<Utc>) -> Result<Self, SinkError> {
        let created_ms = at.timestamp_millis();
        let payload = serde_json::to_string(&TickerPayload {
            symbol: &ticker.symbol,
            price_change_percent: &ticker.change_24h,
            last_price: &ticker.last_price,
            volume: &ticker.vol_24h,
            timestamp: created_ms,
        })?;
        Ok(Self {
            symbol: ticker.symbol.clone(),
            payload,
            created_ms,
        })
    }
}

/// Destination for ticker stream messages.
#[async_trait]
pub trait StreamSink: Send + Sync {
    /// Returns a short name for logging.
    fn name(&self) -> &'static str;

    /// Publishes one message.
    async fn publish(&self, message: &StreamMessage) -> Result<(), SinkError>;
}

/// Redis stream settings.
#[derive(Debug, Clone, Default)]
pub struct RedisSettings {
    /// `host:port` or a `redis://` URL.
    pub address: String,
    /// Stream key.
    pub stream: String,
    /// Password, empty for none.
    pub password: String,
    /// Logical database index.
    pub db: i64,
}

/// Appends messages to a Redis stream with `XADD`.
#[derive(Clone)]
pub struct RedisStreamSink {
    conn: ConnectionManager,
    stream: String,
}

impl std::fmt::Debug for RedisStreamSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamSink")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl RedisStreamSink {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the server is unreachable.
    pub async fn connect(settings: &RedisSettings) -> Result<Self, SinkError> {
        let mut info = redis_url(&settings.address).into_connection_info()?;
        if !settings.password.is_empty() {
            info.redis.password = Some(settings.password.clone());
        }
        info.redis.db = settings.db;

        let client = redis::Client::open(info)?;
        let conn = client.get_connection_manager().await?;
        info!(address = %settings.address, stream = %settings.stream, "connected to redis");
        Ok(Self {
            conn,
            stream: settings.stream.clone(),
        })
    }
}

#[async_trait]
impl StreamSink for RedisStreamSink {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn publish(&self, message: &StreamMessage) -> Result<(), SinkError> {
        let mut conn = self.conn.clone();
        let ts = Utc::now().timestamp_millis().to_string();
        let fields = [
            ("symbol", message.symbol.as_str()),
            ("payload", message.payload.as_str()),
            ("ts", ts.as_str()),
        ];
        let id: String = conn.xadd(&self.stream, "*", &fields[..]).await?;
        debug!(symbol = %message.symbol, id = %id, "published to redis stream");
        Ok(())
    }
}

/// Prefixes a bare `host:port` with the `redis://` scheme.
fn redis_url(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("redis://{address}")
    }
}

/// Kafka topic settings.
#[derive(Debug, Clone, Default)]
pub struct KafkaSettings {
    /// Bootstrap brokers (`host:port`).
    pub brokers: Vec<String>,
    /// Topic name.
    pub topic: String,
}

/// Produces messages to partition 0 of a Kafka topic.
pub struct KafkaStreamSink {
    partition: PartitionClient,
    topic: String,
    last_key: AtomicI64,
}

impl std::fmt::Debug for KafkaStreamSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaStreamSink")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

impl KafkaStreamSink {
    /// Connects to the brokers and resolves the topic partition.
    ///
    /// # Errors
    ///
    /// Returns an error if no broker is reachable or the topic is unknown.
    pub async fn connect(settings: &KafkaSettings) -> Result<Self, SinkError> {
        let client = ClientBuilder::new(settings.brokers.clone())
            .build()
            .await
            .map_err(|e| SinkError::Kafka(e.to_string()))?;
        let partition = client
            .partition_client(settings.topic.clone(), 0, UnknownTopicHandling::Retry)
            .await
            .map_err(|e| SinkError::Kafka(e.to_string()))?;
        info!(brokers = ?settings.brokers, topic = %settings.topic, "connected to kafka");
        Ok(Self {
            partition,
            topic: settings.topic.clone(),
            last_key: AtomicI64::new(0),
        })
    }

    /// Returns a nanosecond timestamp strictly greater than any previous key.
    fn next_key(&self) -> i64 {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        next_monotonic(&self.last_key, now)
    }
}

fn next_monotonic(last: &AtomicI64, now: i64) -> i64 {
    let mut previous = last.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(previous.saturating_add(1));
        match last.compare_exchange_weak(previous, candidate, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(actual) => previous = actual,
        }
    }
}

#[async_trait]
impl StreamSink for KafkaStreamSink {
    fn name(&self) -> &'static str {
        "kafka"
    }

    async fn publish(&self, message: &StreamMessage) -> Result<(), SinkError> {
        let record = Record {
            key: Some(self.next_key().to_string().into_bytes()),
            value: Some(message.payload.clone().into_bytes()),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };
        self.partition
            .produce(vec![record], Compression::NoCompression)
            .await
            .map_err(|e| SinkError::Kafka(e.to_string()))?;
        debug!(symbol = %message.symbol, topic = %self.topic, "published to kafka");
        Ok(())
    }
}

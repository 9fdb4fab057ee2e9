//! SQL candle store for SQLite and PostgreSQL.

use async_trait::async_trait;
use sqlx::AnyPool;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tickscan_aggregate::Candle;
use tickscan_types::clean_symbol;
use tracing::{debug, info};

use crate::{CandleStore, SaveReport, SinkError};

/// Rows per multi-row insert statement.
pub const INSERT_BATCH_SIZE: usize = 100;

/// Bound parameters per candle row.
const COLUMNS: usize = 10;

const INSERT_PREFIX: &str = r#"INSERT INTO symbol_kline_data (symbol, "interval", open, high, low, close, volume, open_time, trade_count, instance) VALUES "#;
const INSERT_SUFFIX: &str = r#" ON CONFLICT (symbol, "interval", open_time) DO NOTHING"#;

/// Database backend behind a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseKind {
    /// SQLite file or in-memory database.
    Sqlite,
    /// PostgreSQL server.
    Postgres,
}

impl DatabaseKind {
    /// Detects the backend from a connection URL.
    ///
    /// # Errors
    ///
    /// Returns an error for any scheme other than `sqlite:` or `postgres(ql)://`.
    pub fn from_url(url: &str) -> Result<Self, SinkError> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else {
            Err(SinkError::UnsupportedDatabase(url.to_string()))
        }
    }

    const fn create_table_sql(self) -> &'static str {
        match self {
            Self::Sqlite => {
                r#"CREATE TABLE IF NOT EXISTS symbol_kline_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                "interval" TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL,
                open_time BIGINT NOT NULL,
                trade_count BIGINT NOT NULL,
                instance TEXT NOT NULL,
                UNIQUE (symbol, "interval", open_time)
            )"#
            }
            Self::Postgres => {
                r#"CREATE TABLE IF NOT EXISTS symbol_kline_data (
                id BIGSERIAL PRIMARY KEY,
                symbol TEXT NOT NULL,
                "interval" TEXT NOT NULL,
                open DOUBLE PRECISION NOT NULL,
                high DOUBLE PRECISION NOT NULL,
                low DOUBLE PRECISION NOT NULL,
                close DOUBLE PRECISION NOT NULL,
                volume DOUBLE PRECISION NOT NULL,
                open_time BIGINT NOT NULL,
                trade_count BIGINT NOT NULL,
                instance TEXT NOT NULL,
                UNIQUE (symbol, "interval", open_time)
            )"#
            }
        }
    }
}

/// Candle store backed by an `sqlx` Any pool.
#[derive(Debug, Clone)]
pub struct SqlCandleStore {
    pool: AnyPool,
    kind: DatabaseKind,
}

impl SqlCandleStore {
    /// Connects with a default pool size of 5 and creates the table if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is unsupported, the database cannot be
    /// reached, or the schema cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self, SinkError> {
        Self::connect_with(database_url, 5).await
    }

    /// Connects with an explicit pool size.
    ///
    /// In-memory SQLite needs `max_connections = 1`, since each connection
    /// would otherwise open its own empty database.
    ///
    /// # Errors
    ///
    /// See [`SqlCandleStore::connect`].
    pub async fn connect_with(database_url: &str, max_connections: u32) -> Result<Self, SinkError> {
        let kind = DatabaseKind::from_url(database_url)?;
        if kind == DatabaseKind::Sqlite {
            prepare_sqlite_path(database_url)?;
        }

        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let store = Self { pool, kind };
        store.init_schema().await?;
        debug!(?kind, "candle store ready");
        Ok(store)
    }

    /// Returns the detected backend.
    #[must_use]
    pub const fn kind(&self) -> DatabaseKind {
        self.kind
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Returns the number of stored candles.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn row_count(&self) -> Result<i64, SinkError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM symbol_kline_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn init_schema(&self) -> Result<(), SinkError> {
        sqlx::query(self.kind.create_table_sql())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_batch(&self, symbol: &str, batch: &[&Candle], instance: &str) -> Result<u64, SinkError> {
        let sql = insert_sql(batch.len());
        let mut query = sqlx::query(&sql);
        for candle in batch {
            query = query
                .bind(symbol.to_string())
                .bind(candle.interval.as_str().to_string())
                .bind(candle.open)
                .bind(candle.high)
                .bind(candle.low)
                .bind(candle.close)
                .bind(candle.volume)
                .bind(candle.open_time)
                .bind(candle.trade_count)
                .bind(instance.to_string());
        }
        Ok(query.execute(&self.pool).await?.rows_affected())
    }
}

#[async_trait]
impl CandleStore for SqlCandleStore {
    async fn save(&self, candles: &[Candle], instance: &str) -> Result<SaveReport, SinkError> {
        let mut groups: BTreeMap<(String, &str), Vec<&Candle>> = BTreeMap::new();
        for candle in candles {
            groups
                .entry((clean_symbol(&candle.symbol), candle.interval.as_str()))
                .or_default()
                .push(candle);
        }

        let mut total = SaveReport::default();
        for ((symbol, interval), group) in &groups {
            let mut report = SaveReport::default();
            for batch in group.chunks(INSERT_BATCH_SIZE) {
                let inserted = self.insert_batch(symbol, batch, instance).await?;
                report.merge(SaveReport {
                    attempted: batch.len() as u64,
                    inserted,
                });
            }
            info!(
                symbol = %symbol,
                interval,
                instance,
                attempted = report.attempted,
                inserted = report.inserted,
                "saved candles"
            );
            total.merge(report);
        }

        Ok(total)
    }
}

/// Builds a multi-row insert with `$n` placeholders, accepted by both backends.
fn insert_sql(rows: usize) -> String {
    let mut sql = String::from(INSERT_PREFIX);
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        let placeholders: Vec<String> = (1..=COLUMNS)
            .map(|col| format!("${}", row * COLUMNS + col))
            .collect();
        sql.push('(');
        sql.push_str(&placeholders.join(", "));
        sql.push(')');
    }
    sql.push_str(INSERT_SUFFIX);
    sql
}

/// Creates the SQLite file and its parent directories so the driver can open it.
fn prepare_sqlite_path(database_url: &str) -> Result<(), SinkError> {
    let path_part = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path_part = path_part.split('?').next().unwrap_or_default();
    if path_part.is_empty() || path_part.contains(":memory:") || database_url.contains("mode=memory") {
        return Ok(());
    }

    let fs_path = PathBuf::from(path_part);
    if let Some(parent) = fs_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&fs_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickscan_types::Interval;

    fn candle(symbol: &str, interval: Interval, open_time: i64) -> Candle {
        Candle {
            symbol: symbol.to_string(),
            interval,
            open: 100.0,
            high: 105.0,
            low: 99.0,
            close: 102.0,
            open_time,
            volume: 4.5,
            trade_count: 3,
        }
    }

    async fn memory_store() -> SqlCandleStore {
        SqlCandleStore::connect_with("sqlite::memory:", 1).await.unwrap()
    }

    #[test]
    fn test_database_kind_from_url() {
        assert_eq!(DatabaseKind::from_url("sqlite::memory:").unwrap(), DatabaseKind::Sqlite);
        assert_eq!(DatabaseKind::from_url("sqlite://data/k.db").unwrap(), DatabaseKind::Sqlite);
        assert_eq!(
            DatabaseKind::from_url("postgres://u:p@localhost/db").unwrap(),
            DatabaseKind::Postgres
        );
        assert_eq!(
            DatabaseKind::from_url("postgresql://localhost/db").unwrap(),
            DatabaseKind::Postgres
        );
        assert!(DatabaseKind::from_url("mysql://localhost/db").is_err());
    }

    #[test]
    fn test_insert_sql_placeholders() {
        let sql = insert_sql(2);
        assert!(sql.contains("($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"));
        assert!(sql.contains("($11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"));
        assert!(sql.ends_with("DO NOTHING"));
    }

    #[tokio::test]
    async fn test_save_inserts_rows() {
        let store = memory_store().await;
        let candles = vec![
            candle("BTCUSDT", Interval::Minute1, 0),
            candle("BTCUSDT", Interval::Minute5, 0),
            candle("ETHUSDT", Interval::Minute1, 0),
        ];

        let report = store.save(&candles, "scanner-1").await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.inserted, 3);
        assert_eq!(store.row_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicates_are_ignored() {
        let store = memory_store().await;
        let candles = vec![candle("BTCUSDT", Interval::Minute1, 60_000)];
        store.save(&candles, "a").await.unwrap();

        let mut changed = candles[0].clone();
        changed.close = 999.0;
        let report = store.save(&[changed], "b").await.unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.duplicates(), 1);

        let close: f64 = sqlx::query_scalar("SELECT close FROM symbol_kline_data")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert!((close - 102.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_symbols_normalized_on_save() {
        let store = memory_store().await;
        let candles = vec![
            candle("BTCUSDT", Interval::Minute1, 0),
            candle("BTC-USDT-SWAP", Interval::Minute1, 0),
        ];

        // Both map to BTC with the same key, so only one row lands.
        let report = store.save(&candles, "scanner-1").await.unwrap();
        assert_eq!(report.inserted, 1);

        let symbol: String = sqlx::query_scalar("SELECT symbol FROM symbol_kline_data")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(symbol, "BTC");
    }

    #[tokio::test]
    async fn test_large_save_spans_batches() {
        let store = memory_store().await;
        let candles: Vec<Candle> = (0..250)
            .map(|i| candle("SOLUSDT", Interval::Minute1, i * 60_000))
            .collect();

        let report = store.save(&candles, "scanner-1").await.unwrap();
        assert_eq!(report.attempted, 250);
        assert_eq!(report.inserted, 250);
        assert_eq!(store.row_count().await.unwrap(), 250);
    }

    #[tokio::test]
    async fn test_file_database_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("candles.db");
        let url = format!("sqlite://{}", path.display());

        let store = SqlCandleStore::connect(&url).await.unwrap();
        store
            .save(&[candle("BTCUSDT", Interval::Hour1, 0)], "scanner-1")
            .await
            .unwrap();

        assert!(path.exists());
        assert_eq!(store.row_count().await.unwrap(), 1);
    }
}

/// Collaborator boundary between the aggregation core and storage.
///
/// The core never sees driver rows; a store hands over typed records only.
/// `MemoryStore` keeps everything in vectors and applies the same filters
/// as the SQL queries in `db`, which makes it usable for tests and offline
/// replay.

use crate::ingest::openweather;
use crate::model::{ForecastBucket, HeightSample, LogEntry, MonitorError, OVERFLOW_PREFIX};
use serde_json::{Map, Value};

/// Read access to the raw rows an aggregation needs.
pub trait ReadingStore {
    /// Height samples with `from <= timestamp <= to`, ascending.
    fn heights_between(&mut self, from: i64, to: i64) -> Result<Vec<HeightSample>, MonitorError>;

    /// Buckets still valid at `tm_now` that touch `[tm_now, tm_to]`,
    /// ordered by `forecast_from`.
    fn forecast_buckets(&mut self, tm_now: i64, tm_to: i64)
    -> Result<Vec<ForecastBucket>, MonitorError>;

    /// `overflow_*` log entries with `from <= timestamp <= to`, ascending.
    fn overflow_log(&mut self, from: i64, to: i64) -> Result<Vec<LogEntry>, MonitorError>;

    /// Latest configuration acknowledged by the sensor, if any.
    fn sensor_config(&mut self) -> Result<Option<Map<String, Value>>, MonitorError> {
        Ok(None)
    }
}

/// In-memory rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub heights: Vec<HeightSample>,
    pub forecasts: Vec<ForecastBucket>,
    pub log: Vec<LogEntry>,
    pub sensor_config: Option<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_height(&mut self, timestamp: i64, height_mm: i64) {
        self.heights.push(HeightSample { timestamp, height_mm });
    }

    pub fn push_log(&mut self, timestamp: i64, message: &str) {
        self.log.push(LogEntry::new(timestamp, message));
    }

    /// Same rule as `PgStore::store_forecasts`: buckets replaced by `fresh`
    /// expire at `now - 1`, then the fresh buckets are appended.
    pub fn store_forecasts(&mut self, fresh: &[ForecastBucket], now: i64) -> usize {
        openweather::supersede(&mut self.forecasts, fresh, now);
        self.forecasts.extend_from_slice(fresh);
        fresh.len()
    }
}

impl ReadingStore for MemoryStore {
    fn heights_between(&mut self, from: i64, to: i64) -> Result<Vec<HeightSample>, MonitorError> {
        let mut rows: Vec<HeightSample> = self
            .heights
            .iter()
            .filter(|h| (from..=to).contains(&h.timestamp))
            .copied()
            .collect();
        rows.sort_by_key(|h| h.timestamp);
        Ok(rows)
    }

    fn forecast_buckets(
        &mut self,
        tm_now: i64,
        tm_to: i64,
    ) -> Result<Vec<ForecastBucket>, MonitorError> {
        let mut rows: Vec<ForecastBucket> = self
            .forecasts
            .iter()
            .filter(|b| b.is_valid_at(tm_now) && b.overlaps(tm_now, tm_to))
            .copied()
            .collect();
        rows.sort_by_key(|b| b.forecast_from);
        Ok(rows)
    }

    fn overflow_log(&mut self, from: i64, to: i64) -> Result<Vec<LogEntry>, MonitorError> {
        let mut rows: Vec<LogEntry> = self
            .log
            .iter()
            .filter(|e| (from..=to).contains(&e.timestamp) && e.message.starts_with(OVERFLOW_PREFIX))
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.timestamp);
        Ok(rows)
    }

    fn sensor_config(&mut self) -> Result<Option<Map<String, Value>>, MonitorError> {
        Ok(self.sensor_config.clone())
    }
}

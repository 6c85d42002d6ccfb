/// PostgreSQL-backed reading store.
///
/// Expected tables (column types matter, rows are read with `try_get`):
///
/// ```text
/// height   (time BIGINT PRIMARY KEY, mm INTEGER)
/// log      (time BIGINT, msg VARCHAR(1024))
/// forecast (valid_from BIGINT, valid_to BIGINT, forecast_from BIGINT,
///           forecast_to BIGINT, rain_mm DOUBLE PRECISION,
///           PRIMARY KEY (valid_from, forecast_from))
/// command  (time BIGINT, cmd VARCHAR(1024), popped CHAR(1))
/// ```
///
/// Any driver error becomes `MonitorError::DataUnavailable`; the aggregation
/// layer decides whether that degrades the chart or aborts.

use crate::logging::{self, Source};
use crate::model::{ForecastBucket, HeightSample, LogEntry, MonitorError};
use crate::store::ReadingStore;
use postgres::{Client, NoTls, Row};
use serde_json::{Map, Value};
use std::env;

fn unavailable(context: &str, err: postgres::Error) -> MonitorError {
    MonitorError::DataUnavailable(format!("{}: {}", context, err))
}

pub struct PgStore {
    client: Client,
}

impl PgStore {
    /// Connects using `DATABASE_URL` from the environment or `.env`.
    pub fn connect_from_env() -> Result<Self, MonitorError> {
        dotenv::dotenv().ok();
        let url = env::var("DATABASE_URL").map_err(|_| {
            MonitorError::Config("DATABASE_URL must be set (environment or .env)".to_string())
        })?;
        Self::connect(&url)
    }

    pub fn connect(url: &str) -> Result<Self, MonitorError> {
        let client = Client::connect(url, NoTls).map_err(|e| unavailable("connection", e))?;
        logging::info(Source::Database, "database connected");
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Stores a freshly fetched forecast.
    ///
    /// Buckets of an earlier forecast for the same periods that are still
    /// valid at `now` expire at `now - 1`; the new buckets are inserted as
    /// valid from `now`. Both happen in one transaction.
    pub fn store_forecasts(
        &mut self,
        fresh: &[ForecastBucket],
        now: i64,
    ) -> Result<usize, MonitorError> {
        let mut tx = self
            .client
            .transaction()
            .map_err(|e| unavailable("begin forecast update", e))?;

        for bucket in fresh {
            tx.execute(
                "UPDATE forecast SET valid_to = $1
                 WHERE forecast_from = $2 AND valid_to >= $3",
                &[&(now - 1), &bucket.forecast_from, &now],
            )
            .map_err(|e| unavailable("supersede forecast", e))?;

            tx.execute(
                "INSERT INTO forecast (valid_from, valid_to, forecast_from, forecast_to, rain_mm)
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &now,
                    &bucket.valid_to,
                    &bucket.forecast_from,
                    &bucket.forecast_to,
                    &bucket.rain_mm,
                ],
            )
            .map_err(|e| unavailable("insert forecast", e))?;
        }

        tx.commit().map_err(|e| unavailable("commit forecast update", e))?;
        logging::info(
            Source::Forecast,
            &format!("stored {} forecast buckets", fresh.len()),
        );
        Ok(fresh.len())
    }
}

fn height_row(row: &Row) -> Result<HeightSample, postgres::Error> {
    Ok(HeightSample {
        timestamp: row.try_get(0)?,
        height_mm: i64::from(row.try_get::<_, i32>(1)?),
    })
}

fn forecast_row(row: &Row) -> Result<ForecastBucket, postgres::Error> {
    Ok(ForecastBucket {
        forecast_from: row.try_get(0)?,
        forecast_to: row.try_get(1)?,
        rain_mm: row.try_get(2)?,
        valid_to: row.try_get(3)?,
    })
}

fn log_row(row: &Row) -> Result<LogEntry, postgres::Error> {
    Ok(LogEntry {
        timestamp: row.try_get(0)?,
        message: row.try_get(1)?,
    })
}

impl ReadingStore for PgStore {
    fn heights_between(&mut self, from: i64, to: i64) -> Result<Vec<HeightSample>, MonitorError> {
        let rows = self
            .client
            .query(
                "SELECT time, mm FROM height
                 WHERE time BETWEEN $1 AND $2
                 ORDER BY time",
                &[&from, &to],
            )
            .map_err(|e| unavailable("query height", e))?;

        rows.iter()
            .map(height_row)
            .collect::<Result<_, _>>()
            .map_err(|e| unavailable("decode height row", e))
    }

    fn forecast_buckets(
        &mut self,
        tm_now: i64,
        tm_to: i64,
    ) -> Result<Vec<ForecastBucket>, MonitorError> {
        let rows = self
            .client
            .query(
                "SELECT forecast_from, forecast_to, rain_mm, valid_to FROM forecast
                 WHERE valid_to >= $1
                   AND forecast_from <= $2
                   AND forecast_to >= $1
                 ORDER BY forecast_from",
                &[&tm_now, &tm_to],
            )
            .map_err(|e| unavailable("query forecast", e))?;

        rows.iter()
            .map(forecast_row)
            .collect::<Result<_, _>>()
            .map_err(|e| unavailable("decode forecast row", e))
    }

    fn overflow_log(&mut self, from: i64, to: i64) -> Result<Vec<LogEntry>, MonitorError> {
        let rows = self
            .client
            .query(
                "SELECT time, msg FROM log
                 WHERE time BETWEEN $1 AND $2
                   AND msg LIKE 'overflow\\_%'
                 ORDER BY time",
                &[&from, &to],
            )
            .map_err(|e| unavailable("query log", e))?;

        rows.iter()
            .map(log_row)
            .collect::<Result<_, _>>()
            .map_err(|e| unavailable("decode log row", e))
    }

    /// Latest JSON command the sensor has already popped.
    fn sensor_config(&mut self) -> Result<Option<Map<String, Value>>, MonitorError> {
        let row = self
            .client
            .query_opt(
                "SELECT cmd FROM command
                 WHERE popped = 'Y' AND cmd LIKE '{%}'
                 ORDER BY time DESC
                 LIMIT 1",
                &[],
            )
            .map_err(|e| unavailable("query command", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let cmd: String = row
            .try_get(0)
            .map_err(|e| unavailable("decode command row", e))?;

        match serde_json::from_str::<Value>(&cmd) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) | Err(_) => {
                logging::warn(
                    Source::Database,
                    &format!("ignoring sensor config that is not a JSON object: {}", cmd),
                );
                Ok(None)
            }
        }
    }
}

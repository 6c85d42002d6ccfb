/// OpenWeatherMap forecast client
///
/// Retrieves the 5 day / 3 hour forecast for the configured city and turns
/// its precipitation into forecast buckets for the volume projection.
///
/// API Documentation: https://openweathermap.org/forecast5

use crate::logging::{self, Source};
use crate::model::{ForecastBucket, MonitorError};
use serde::Deserialize;

const OPENWEATHER_BASE_URL: &str = "http://api.openweathermap.org/data/2.5/forecast";

/// `valid_to` of a bucket nobody has superseded yet (about 31 years ahead).
pub const VALID_UNTIL_SUPERSEDED_S: i64 = 1_000_000_000;

// ============================================================================
// API Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub list: Vec<ForecastPeriod>,
}

/// One 3-hour period of the forecast.
#[derive(Debug, Deserialize)]
pub struct ForecastPeriod {
    /// Period start, epoch seconds.
    pub dt: i64,
    pub rain: Option<RainAmount>,
}

#[derive(Debug, Deserialize)]
pub struct RainAmount {
    #[serde(rename = "3h")]
    pub three_hours_mm: Option<f64>,
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Query parameters of a forecast request; reqwest percent-encodes them.
pub fn forecast_query<'a>(city: &'a str, appid: &'a str) -> [(&'static str, &'a str); 3] {
    [("q", city), ("mode", "json"), ("appid", appid)]
}

/// Fetch the forecast and return `(period start, rain mm)` pairs.
///
/// The API key is read from `OPENWEATHER_APPID`.
pub fn fetch_forecast(
    client: &reqwest::blocking::Client,
    city: &str,
) -> Result<Vec<(i64, f64)>, MonitorError> {
    dotenv::dotenv().ok();
    let appid = std::env::var("OPENWEATHER_APPID").map_err(|_| {
        MonitorError::Config("OPENWEATHER_APPID must be set (environment or .env)".to_string())
    })?;

    let response = client
        .get(OPENWEATHER_BASE_URL)
        .query(&forecast_query(city, &appid))
        .header("Accept", "application/json")
        .send()
        .map_err(|e| MonitorError::DataUnavailable(format!("forecast request: {}", e)))?;

    if !response.status().is_success() {
        return Err(MonitorError::DataUnavailable(format!(
            "OpenWeather HTTP error: {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .map_err(|e| MonitorError::DataUnavailable(format!("forecast body: {}", e)))?;
    let periods = parse_forecast(&body)?;
    logging::info(
        Source::Forecast,
        &format!("fetched {} forecast periods for {}", periods.len(), city),
    );
    Ok(periods)
}

/// Parse a forecast response body. Periods without rain count as 0.0 mm.
pub fn parse_forecast(body: &str) -> Result<Vec<(i64, f64)>, MonitorError> {
    let response: ForecastResponse = serde_json::from_str(body)
        .map_err(|e| MonitorError::DataUnavailable(format!("forecast JSON: {}", e)))?;

    Ok(response
        .list
        .into_iter()
        .map(|period| {
            let rain_mm = period
                .rain
                .and_then(|r| r.three_hours_mm)
                .unwrap_or(0.0);
            (period.dt, rain_mm)
        })
        .collect())
}

// ============================================================================
// Bucket Helpers
// ============================================================================

/// Turn fetched periods into buckets valid from `now` until superseded.
pub fn to_buckets(periods: &[(i64, f64)], interval_s: i64, now: i64) -> Vec<ForecastBucket> {
    periods
        .iter()
        .map(|&(start, rain_mm)| ForecastBucket {
            forecast_from: start,
            forecast_to: start + interval_s,
            rain_mm,
            valid_to: now + VALID_UNTIL_SUPERSEDED_S,
        })
        .collect()
}

/// Expire stored buckets replaced by `fresh`.
///
/// A stored bucket is replaced when a fresh bucket starts at the same
/// `forecast_from` and the stored one is still valid at `now`; it then
/// expires at `now - 1`. Returns how many buckets were expired.
pub fn supersede(existing: &mut [ForecastBucket], fresh: &[ForecastBucket], now: i64) -> usize {
    let mut expired = 0;
    for old in existing.iter_mut() {
        let replaced = fresh.iter().any(|f| f.forecast_from == old.forecast_from);
        if replaced && old.is_valid_at(now) {
            old.valid_to = now - 1;
            expired += 1;
        }
    }
    expired
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "cod": "200",
        "cnt": 3,
        "list": [
            {"dt": 1714564800, "main": {"temp": 285.1}, "rain": {"3h": 1.25}},
            {"dt": 1714575600, "main": {"temp": 284.0}},
            {"dt": 1714586400, "rain": {}}
        ],
        "city": {"name": "Prague"}
    }"#;

    #[test]
    fn test_parse_forecast_defaults_missing_rain_to_zero() {
        let periods = parse_forecast(SAMPLE).expect("sample should parse");
        assert_eq!(
            periods,
            vec![(1714564800, 1.25), (1714575600, 0.0), (1714586400, 0.0)]
        );
    }

    #[test]
    fn test_parse_forecast_without_list_is_empty() {
        let periods = parse_forecast(r#"{"cod":"401","message":"Invalid API key"}"#).unwrap();
        assert!(periods.is_empty());
    }

    #[test]
    fn test_invalid_json_is_data_unavailable() {
        let result = parse_forecast("<html>gateway timeout</html>");
        assert!(matches!(result, Err(MonitorError::DataUnavailable(_))));
    }

    #[test]
    fn test_to_buckets_spans_interval() {
        let buckets = to_buckets(&[(1000, 2.0)], 10_800, 500);
        assert_eq!(
            buckets,
            vec![ForecastBucket {
                forecast_from: 1000,
                forecast_to: 11_800,
                rain_mm: 2.0,
                valid_to: 500 + VALID_UNTIL_SUPERSEDED_S,
            }]
        );
    }

    #[test]
    fn test_supersede_expires_only_matching_valid_buckets() {
        let now = 10_000;
        let mut existing = vec![
            ForecastBucket { forecast_from: 1000, forecast_to: 2000, rain_mm: 1.0, valid_to: now + 50 },
            ForecastBucket { forecast_from: 2000, forecast_to: 3000, rain_mm: 1.0, valid_to: now + 50 },
            ForecastBucket { forecast_from: 1000, forecast_to: 2000, rain_mm: 0.5, valid_to: now - 100 },
        ];
        let fresh = to_buckets(&[(1000, 3.0)], 1000, now);

        assert_eq!(supersede(&mut existing, &fresh, now), 1);
        assert_eq!(existing[0].valid_to, now - 1);
        assert_eq!(existing[1].valid_to, now + 50, "different period stays valid");
        assert_eq!(existing[2].valid_to, now - 100, "already expired stays untouched");
    }

    #[test]
    fn test_forecast_request_encodes_city() {
        let request = reqwest::blocking::Client::new()
            .get(OPENWEATHER_BASE_URL)
            .query(&forecast_query("São Paulo,br", "KEY"))
            .build()
            .expect("request should build");
        let url = request.url();
        assert_eq!(url.path(), "/data/2.5/forecast");
        assert_eq!(
            url.query(),
            Some("q=S%C3%A3o+Paulo%2Cbr&mode=json&appid=KEY"),
            "city must be percent-encoded"
        );
    }
}

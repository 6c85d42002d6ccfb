/// Service configuration.
///
/// Static settings are read from a TOML file (`waterbag.toml` by default);
/// every section and field is optional and falls back to the installation
/// defaults. Secrets stay in the environment (`.env` via `dotenv`).
///
/// The sensor itself also carries a JSON configuration. Its latest
/// acknowledged version may override the volume geometry; those overrides are
/// applied per aggregation and never written back.

use crate::logging::LogLevel;
use crate::model::{MonitorError, VolumeConfig, VolumeMethod};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "waterbag.toml";

/// Forecast period length of the 5 day / 3 hour feed.
pub const DEFAULT_FORECAST_INTERVAL_S: i64 = 3 * 3600;

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    pub volume: VolumeConfig,
    pub chart: ChartConfig,
    pub forecast: ForecastConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub past_days: i64,
    pub future_days: i64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            past_days: 3,
            future_days: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub city: String,
    pub interval_s: i64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            city: "Prague,cz".to_string(),
            interval_s: DEFAULT_FORECAST_INTERVAL_S,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub console_timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            console_timestamps: false,
        }
    }
}

impl LoggingConfig {
    pub fn min_level(&self) -> Result<LogLevel, MonitorError> {
        self.level.parse()
    }
}

impl ServiceConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, MonitorError> {
        toml::from_str(text).map_err(|e| MonitorError::Config(format!("invalid TOML: {}", e)))
    }

    /// Loads the configuration file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MonitorError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }
}

// ---------------------------------------------------------------------------
// Sensor overrides
// ---------------------------------------------------------------------------

/// Reads a numeric sensor value; the sensor sends numbers or numeric strings.
fn number(key: &str, value: &Value) -> Result<f64, MonitorError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        MonitorError::Config(format!("sensor config '{}' is not a number: {}", key, value))
    })
}

/// Returns `base` with any geometry fields present in the sensor's JSON
/// configuration replaced. Keys unrelated to geometry are ignored.
pub fn apply_sensor_overrides(
    base: &VolumeConfig,
    sensor: &Map<String, Value>,
) -> Result<VolumeConfig, MonitorError> {
    let mut cfg = base.clone();
    for (key, value) in sensor {
        match key.as_str() {
            "max_height_mm" => cfg.max_height_mm = number(key, value)?,
            "max_volume_l" => cfg.max_volume_l = number(key, value)?,
            "flat_width_mm" => cfg.flat_width_mm = number(key, value)?,
            "roof_area_m2" => cfg.roof_area_m2 = number(key, value)?,
            "volume_method" => {
                cfg.volume_method = match value {
                    Value::String(s) => s.parse::<VolumeMethod>()?,
                    other => {
                        return Err(MonitorError::Config(format!(
                            "sensor config 'volume_method' is not a string: {}",
                            other
                        )));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be a JSON object"),
        }
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let cfg = ServiceConfig::from_toml("").expect("empty file is valid");
        assert_eq!(cfg, ServiceConfig::default());
        assert_eq!(cfg.volume.max_volume_l, 3000.0);
        assert_eq!(cfg.chart.past_days, 3);
        assert_eq!(cfg.forecast.interval_s, 10_800);
    }

    #[test]
    fn test_toml_sections_parse() {
        let text = r#"
            [volume]
            max_height_mm = 1000
            max_volume_l = 5000
            flat_width_mm = 1800
            roof_area_m2 = 80.5
            volume_method = "linear"

            [chart]
            past_days = 7

            [logging]
            level = "debug"
            file = "waterbag.log"
        "#;
        let cfg = ServiceConfig::from_toml(text).unwrap();
        assert_eq!(cfg.volume.max_height_mm, 1000.0);
        assert_eq!(cfg.volume.volume_method, VolumeMethod::Linear);
        assert_eq!(cfg.volume.roof_area_m2, 80.5);
        assert_eq!(cfg.chart.past_days, 7);
        assert_eq!(cfg.chart.future_days, 3);
        assert_eq!(cfg.logging.min_level().unwrap(), LogLevel::Debug);
        assert_eq!(cfg.logging.file.as_deref(), Some("waterbag.log"));
    }

    #[test]
    fn test_unknown_volume_method_in_toml_is_rejected() {
        let text = "[volume]\nvolume_method = \"sphere\"\n";
        let err = ServiceConfig::from_toml(text).unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)), "got {:?}", err);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let cfg = ServiceConfig::from_toml(include_str!("../waterbag.toml")).unwrap();
        assert_eq!(cfg.volume, VolumeConfig::default());
        assert_eq!(cfg.chart, ChartConfig::default());
        assert_eq!(cfg.forecast, ForecastConfig::default());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let cfg = ServiceConfig::load("definitely/not/here/waterbag.toml").unwrap();
        assert_eq!(cfg, ServiceConfig::default());
    }

    #[test]
    fn test_sensor_overrides_replace_geometry() {
        let sensor = object(json!({
            "max_height_mm": "550",
            "max_volume_l": 2800,
            "volume_method": "linear",
            "measure_interval_s": 600
        }));
        let cfg = apply_sensor_overrides(&VolumeConfig::default(), &sensor).unwrap();
        assert_eq!(cfg.max_height_mm, 550.0);
        assert_eq!(cfg.max_volume_l, 2800.0);
        assert_eq!(cfg.volume_method, VolumeMethod::Linear);
        assert_eq!(cfg.roof_area_m2, 55.0, "untouched fields keep base value");
    }

    #[test]
    fn test_bad_sensor_values_are_config_errors() {
        let sensor = object(json!({ "max_height_mm": "tall" }));
        assert!(matches!(
            apply_sensor_overrides(&VolumeConfig::default(), &sensor),
            Err(MonitorError::Config(_))
        ));

        let sensor = object(json!({ "volume_method": "cone" }));
        assert!(matches!(
            apply_sensor_overrides(&VolumeConfig::default(), &sensor),
            Err(MonitorError::Config(_))
        ));
    }
}

/// Core data types for the rainwater storage monitoring service.
///
/// This module defines the shared domain model imported by all other modules:
/// the typed rows handed over by the storage collaborator, the plotting
/// series produced by the aggregation, the volume geometry configuration and
/// the error type. Apart from small classification helpers it holds no logic
/// and no I/O.
///
/// All timestamps are integer seconds since the Unix epoch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Log message prefixes
// ---------------------------------------------------------------------------

/// Every overflow valve transition logged by the sensor starts with this.
pub const OVERFLOW_PREFIX: &str = "overflow_";

/// Log message prefix for a valve opening.
pub const OVERFLOW_OPENED: &str = "overflow_opened";

/// Log message prefix for a valve closing.
pub const OVERFLOW_CLOSED: &str = "overflow_closed";

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// A single fill-height measurement reported by the level sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightSample {
    pub timestamp: i64,
    pub height_mm: i64,
}

/// Predicted precipitation for one future interval.
///
/// A bucket is issued when a forecast is fetched and stays eligible until a
/// newer forecast for the same interval supersedes it (`valid_to`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastBucket {
    pub forecast_from: i64,
    pub forecast_to: i64,
    pub rain_mm: f64,
    pub valid_to: i64,
}

impl ForecastBucket {
    /// Timestamp at which the bucket's rain is plotted.
    pub fn midpoint(&self) -> i64 {
        (self.forecast_from + self.forecast_to) / 2
    }

    /// A bucket is still valid while `valid_to >= now`.
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.valid_to >= now
    }

    /// True if `[forecast_from, forecast_to]` intersects `[start, end]`.
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.forecast_from <= end && self.forecast_to >= start
    }
}

/// One raw row of the sensor's message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: i64,
    pub message: String,
}

impl LogEntry {
    pub fn new(timestamp: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    /// Interprets the entry as an overflow valve transition.
    ///
    /// Returns `Ok(None)` for messages unrelated to the overflow valve and
    /// `Err(MalformedEvent)` for `overflow_*` messages that are neither an
    /// opening nor a closing.
    pub fn to_overflow_event(&self) -> Result<Option<OverflowEvent>, MonitorError> {
        Ok(OverflowKind::classify(&self.message)?.map(|kind| OverflowEvent {
            timestamp: self.timestamp,
            kind,
        }))
    }
}

/// Direction of an overflow valve transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowKind {
    Opened,
    Closed,
}

impl OverflowKind {
    /// Classifies a log message by its prefix.
    pub fn classify(message: &str) -> Result<Option<OverflowKind>, MonitorError> {
        if message.starts_with(OVERFLOW_OPENED) {
            Ok(Some(OverflowKind::Opened))
        } else if message.starts_with(OVERFLOW_CLOSED) {
            Ok(Some(OverflowKind::Closed))
        } else if message.starts_with(OVERFLOW_PREFIX) {
            Err(MonitorError::MalformedEvent(message.to_string()))
        } else {
            Ok(None)
        }
    }
}

/// A valve transition taken from the message log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowEvent {
    pub timestamp: i64,
    pub kind: OverflowKind,
}

// ---------------------------------------------------------------------------
// Output series
// ---------------------------------------------------------------------------

/// One point of a plotted series. Timestamps stay in seconds until the
/// series is serialized for the chart, which renders milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: i64,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Timestamp-ascending points, only ever handed to the chart.
pub type Series = Vec<SeriesPoint>;

// ---------------------------------------------------------------------------
// Volume configuration
// ---------------------------------------------------------------------------

/// How fill height is converted to stored volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VolumeMethod {
    /// Constant horizontal cross-section (rigid tank).
    Linear,
    /// Flexible bag that rounds out as it fills.
    Oval,
}

impl FromStr for VolumeMethod {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "linear" => Ok(VolumeMethod::Linear),
            "oval" => Ok(VolumeMethod::Oval),
            other => Err(MonitorError::Config(format!(
                "unknown volume_method '{}' (expected 'linear' or 'oval')",
                other
            ))),
        }
    }
}

impl TryFrom<String> for VolumeMethod {
    type Error = MonitorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VolumeMethod> for String {
    fn from(method: VolumeMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for VolumeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VolumeMethod::Linear => write!(f, "linear"),
            VolumeMethod::Oval => write!(f, "oval"),
        }
    }
}

/// Storage geometry and catchment area, read fresh for every aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub max_height_mm: f64,
    pub max_volume_l: f64,
    /// Width of the empty, flattened bag; only used by the oval method.
    pub flat_width_mm: f64,
    pub roof_area_m2: f64,
    pub volume_method: VolumeMethod,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            max_height_mm: 600.0,
            max_volume_l: 3000.0,
            flat_width_mm: 2000.0,
            roof_area_m2: 55.0,
            volume_method: VolumeMethod::Oval,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the aggregation core and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// Unknown volume method or geometrically impossible configuration.
    Config(String),
    /// The storage collaborator or the forecast feed failed.
    DataUnavailable(String),
    /// An `overflow_*` log message that is neither an opening nor a closing.
    MalformedEvent(String),
    /// Window bounds violating `from < now < to`.
    InvalidWindow { from: i64, now: i64, to: i64 },
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Config(msg) => write!(f, "Config error: {}", msg),
            MonitorError::DataUnavailable(msg) => write!(f, "Data unavailable: {}", msg),
            MonitorError::MalformedEvent(msg) => write!(f, "Malformed overflow event: {}", msg),
            MonitorError::InvalidWindow { from, now, to } => write!(
                f,
                "Invalid window: expected from < now < to, got {} / {} / {}",
                from, now, to
            ),
        }
    }
}

impl std::error::Error for MonitorError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_messages_classified_by_prefix() {
        assert_eq!(
            OverflowKind::classify("overflow_opened").unwrap(),
            Some(OverflowKind::Opened)
        );
        assert_eq!(
            OverflowKind::classify("overflow_closed at 598mm").unwrap(),
            Some(OverflowKind::Closed)
        );
    }

    #[test]
    fn test_unrelated_messages_are_ignored() {
        assert_eq!(OverflowKind::classify("wifi reconnected").unwrap(), None);
        assert_eq!(OverflowKind::classify("").unwrap(), None);
    }

    #[test]
    fn test_unknown_overflow_message_is_malformed() {
        let result = OverflowKind::classify("overflow_stuck");
        assert_eq!(
            result,
            Err(MonitorError::MalformedEvent("overflow_stuck".to_string()))
        );
    }

    #[test]
    fn test_log_entry_converts_to_event() {
        let entry = LogEntry::new(1_700_000_000, "overflow_opened");
        let event = entry.to_overflow_event().unwrap();
        assert_eq!(
            event,
            Some(OverflowEvent {
                timestamp: 1_700_000_000,
                kind: OverflowKind::Opened
            })
        );
    }

    #[test]
    fn test_bucket_midpoint_and_overlap() {
        let bucket = ForecastBucket {
            forecast_from: 1000,
            forecast_to: 2000,
            rain_mm: 1.5,
            valid_to: 5000,
        };
        assert_eq!(bucket.midpoint(), 1500);
        assert!(bucket.overlaps(1800, 3000), "tail overlap");
        assert!(bucket.overlaps(0, 1000), "touching start counts");
        assert!(bucket.overlaps(1200, 1300), "window inside bucket");
        assert!(!bucket.overlaps(2001, 3000));
        assert!(bucket.is_valid_at(5000), "valid_to is inclusive");
        assert!(!bucket.is_valid_at(5001));
    }

    #[test]
    fn test_volume_method_parses_known_names_only() {
        assert_eq!("linear".parse::<VolumeMethod>().unwrap(), VolumeMethod::Linear);
        assert_eq!(" oval ".parse::<VolumeMethod>().unwrap(), VolumeMethod::Oval);
        let err = "cylinder".parse::<VolumeMethod>().unwrap_err();
        assert!(
            matches!(err, MonitorError::Config(_)),
            "unknown method must be a config error, got {:?}",
            err
        );
    }

    #[test]
    fn test_default_config_matches_installation() {
        let cfg = VolumeConfig::default();
        assert_eq!(cfg.max_volume_l, 3000.0);
        assert_eq!(cfg.max_height_mm, 600.0);
        assert_eq!(cfg.volume_method, VolumeMethod::Oval);
    }
}

/// Chart-ready text for the dashboard template.
///
/// Series become JavaScript point lists `[{t:<ms>,y:<int>},...]`. Liters
/// are truncated to whole numbers here and nowhere earlier.

use crate::analysis::AggregateResult;
use crate::model::SeriesPoint;
use serde::Serialize;

/// Renders one series in ascending order as `[{t:..,y:..},...]`.
pub fn to_chart_series(series: &[SeriesPoint]) -> String {
    let points: Vec<String> = series
        .iter()
        .map(|p| format!("{{t:{},y:{}}}", p.timestamp * 1000, p.value as i64))
        .collect();
    format!("[{}]", points.join(","))
}

/// One-line tank summary, e.g. `1731l, overflow open 120s, total 3600s`.
pub fn state_line(result: &AggregateResult) -> String {
    let volume = if result.has_data() {
        format!("{}l", result.current_volume_l as i64)
    } else {
        "n/a".to_string()
    };
    let valve = match result.currently_open_for_s {
        Some(open_s) => format!("overflow open {}s", open_s),
        None => "overflow closed".to_string(),
    };
    format!("{}, {}, total {}s", volume, valve, result.total_open_s)
}

/// Everything the page template substitutes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub stored: String,
    pub forecast: String,
    pub overflow: String,
    pub state: String,
    /// Upper bound of the volume axis: one and a half times capacity.
    pub y_axis_max_l: i64,
}

impl ChartPayload {
    pub fn from_result(result: &AggregateResult) -> Self {
        Self {
            stored: to_chart_series(&result.stored),
            forecast: to_chart_series(&result.forecast),
            overflow: to_chart_series(&result.overflow),
            state: state_line(result),
            y_axis_max_l: (1.5 * result.volume_config.max_volume_l).round() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ChartWindow, RawRows, aggregate};
    use crate::model::{HeightSample, LogEntry, VolumeConfig};

    /// Reads `[{t:..,y:..},...]` back into `(ms, value)` pairs.
    fn parse_chart_series(text: &str) -> Vec<(i64, i64)> {
        let inner = text
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .expect("series must be bracketed");
        if inner.is_empty() {
            return Vec::new();
        }
        inner
            .split("},{")
            .map(|point| {
                let point = point.trim_start_matches('{').trim_end_matches('}');
                let (t, y) = point.split_once(",y:").expect("point has t and y");
                let t = t.strip_prefix("t:").expect("point starts with t");
                (t.parse().unwrap(), y.parse().unwrap())
            })
            .collect()
    }

    #[test]
    fn test_series_format() {
        let series = vec![SeriesPoint::new(1, 10.9), SeriesPoint::new(2, 0.0)];
        assert_eq!(to_chart_series(&series), "[{t:1000,y:10},{t:2000,y:0}]");
        assert_eq!(to_chart_series(&[]), "[]");
    }

    #[test]
    fn test_serialized_series_parses_back() {
        let series = vec![
            SeriesPoint::new(1_714_560_000, 1731.0),
            SeriesPoint::new(1_714_560_600, 1732.0),
            SeriesPoint::new(1_714_561_200, 0.0),
        ];
        let parsed = parse_chart_series(&to_chart_series(&series));
        let expected: Vec<(i64, i64)> = series
            .iter()
            .map(|p| (p.timestamp * 1000, p.value as i64))
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_payload_state_for_open_and_missing_data() {
        let window = ChartWindow::new(0, 1_000, 2_000).unwrap();
        let rows = RawRows {
            heights: vec![HeightSample { timestamp: 500, height_mm: 300 }],
            forecast: Vec::new(),
            log: vec![LogEntry::new(400, "overflow_opened")],
        };
        let result = aggregate(&VolumeConfig::default(), window, &rows).unwrap();
        let payload = ChartPayload::from_result(&result);
        assert_eq!(payload.state, "1731l, overflow open 600s, total 0s");
        assert_eq!(payload.y_axis_max_l, 4500);
        assert_eq!(payload.overflow, "[{t:400000,y:0},{t:400000,y:500},{t:500000,y:500}]");

        let empty = aggregate(&VolumeConfig::default(), window, &RawRows::default()).unwrap();
        let payload = ChartPayload::from_result(&empty);
        assert_eq!(payload.state, "n/a, overflow closed, total 0s");
        assert_eq!(payload.stored, "[]");
    }
}

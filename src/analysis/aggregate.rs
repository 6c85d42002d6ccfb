/// Merges heights, forecast and overflow log into one chart state.
///
/// All three series are computed against the same [`ChartWindow`] and are
/// stitched together at the anchor: the latest real height measurement.
/// The forecast line starts there, and the overflow step function is
/// extended up to it.
///
/// `aggregate` is a pure function of its inputs. `aggregate_from_store`
/// adds the fetching around it and degrades to empty inputs when a fetch
/// fails, so the dashboard keeps rendering.

use crate::analysis::forecast;
use crate::analysis::overflow;
use crate::analysis::window::ChartWindow;
use crate::config::apply_sensor_overrides;
use crate::logging::{self, Source};
use crate::model::{
    ForecastBucket, HeightSample, LogEntry, MonitorError, OverflowEvent, Series, SeriesPoint,
    VolumeConfig,
};
use crate::store::ReadingStore;
use crate::volume::VolumeModel;

/// Height of the overflow step as a fraction of `max_volume_l`.
pub const OVERFLOW_PEAK_FRACTION: f64 = 1.0 / 6.0;

/// `currently_open_for_s` sentinel for a closed valve.
pub const OVERFLOW_CLOSED_SENTINEL: i64 = -1;

/// Rows fetched for one aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRows {
    pub heights: Vec<HeightSample>,
    pub forecast: Vec<ForecastBucket>,
    pub log: Vec<LogEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub window: ChartWindow,
    /// Geometry actually used, after sensor overrides.
    pub volume_config: VolumeConfig,
    pub stored: Series,
    pub forecast: Series,
    pub overflow: Series,
    /// Latest measured volume, `0.0` when the window holds no heights.
    pub current_volume_l: f64,
    /// Timestamp of the anchor measurement, `None` when there is no data.
    pub last_sample_ts: Option<i64>,
    /// Seconds since the valve opened, `None` while it is closed.
    pub currently_open_for_s: Option<i64>,
    pub total_open_s: i64,
}

impl AggregateResult {
    pub fn has_data(&self) -> bool {
        self.last_sample_ts.is_some()
    }

    /// Open time in seconds, or `-1` when the valve is closed.
    pub fn open_for_s_or_sentinel(&self) -> i64 {
        self.currently_open_for_s.unwrap_or(OVERFLOW_CLOSED_SENTINEL)
    }

    pub fn overflow_peak_l(&self) -> f64 {
        self.volume_config.max_volume_l * OVERFLOW_PEAK_FRACTION
    }
}

/// Converts the log to valve events, skipping unrelated and malformed lines.
fn overflow_events(log: &[LogEntry]) -> Vec<OverflowEvent> {
    log.iter()
        .filter_map(|entry| match entry.to_overflow_event() {
            Ok(event) => event,
            Err(e) => {
                logging::log_fetch_failure(Source::Overflow, "classify log entry", &e);
                None
            }
        })
        .collect()
}

/// Computes every series and scalar for `window` from already fetched rows.
///
/// Only an invalid configuration is an error. Empty inputs produce the
/// "no data" state: empty stored and forecast series, zero volume and no
/// anchor timestamp. The overflow series is still built in that case and is
/// closed at `window.now()`.
pub fn aggregate(
    config: &VolumeConfig,
    window: ChartWindow,
    rows: &RawRows,
) -> Result<AggregateResult, MonitorError> {
    let model = VolumeModel::new(config)?;

    let mut heights: Vec<HeightSample> = rows
        .heights
        .iter()
        .filter(|h| window.contains(h.timestamp))
        .copied()
        .collect();
    heights.sort_by_key(|h| h.timestamp);

    let stored: Series = heights
        .iter()
        .map(|h| SeriesPoint::new(h.timestamp, model.volume_l(h.height_mm as f64)))
        .collect();

    let anchor = stored.last().copied();
    let anchor_ts = anchor.map_or(window.now(), |p| p.timestamp);

    let forecast = match anchor {
        Some(anchor) => forecast::project(&model, anchor, window.now(), window.to(), &rows.forecast),
        None => Vec::new(),
    };

    let peak_l = config.max_volume_l * OVERFLOW_PEAK_FRACTION;
    let events = overflow_events(&rows.log);
    let track = overflow::track(anchor_ts, window.from(), window.to(), &events, peak_l);
    let currently_open_for_s = track.open_for_s(window.now());

    Ok(AggregateResult {
        window,
        volume_config: config.clone(),
        stored,
        forecast,
        overflow: track.series,
        current_volume_l: anchor.map_or(0.0, |p| p.value),
        last_sample_ts: anchor.map(|p| p.timestamp),
        currently_open_for_s,
        total_open_s: track.total_open_s,
    })
}

/// Unwraps a fetch, logging and substituting an empty result on failure.
fn or_empty<T>(fetched: Result<Vec<T>, MonitorError>, source: Source, operation: &str) -> Vec<T> {
    match fetched {
        Ok(rows) => rows,
        Err(e) => {
            logging::log_fetch_failure(source, operation, &e);
            Vec::new()
        }
    }
}

/// Fetches the rows for `window` from `store` and aggregates them.
///
/// Fetch failures degrade to empty inputs. The sensor's acknowledged
/// configuration, when readable, overrides `config` for this call only; an
/// override that does not parse is a configuration error.
pub fn aggregate_from_store<S: ReadingStore + ?Sized>(
    store: &mut S,
    config: &VolumeConfig,
    window: ChartWindow,
) -> Result<AggregateResult, MonitorError> {
    let effective = match store.sensor_config() {
        Ok(Some(sensor)) => apply_sensor_overrides(config, &sensor)?,
        Ok(None) => config.clone(),
        Err(e) => {
            logging::log_fetch_failure(Source::Database, "read sensor config", &e);
            config.clone()
        }
    };

    let rows = RawRows {
        heights: or_empty(
            store.heights_between(window.from(), window.to()),
            Source::Height,
            "read heights",
        ),
        forecast: or_empty(
            store.forecast_buckets(window.now(), window.to()),
            Source::Forecast,
            "read forecast",
        ),
        log: or_empty(
            store.overflow_log(window.from(), window.to()),
            Source::Overflow,
            "read overflow log",
        ),
    };

    if rows.heights.is_empty() {
        logging::warn(
            Source::Height,
            &format!(
                "no height samples between {} and {}; volume shown as n/a",
                window.from(),
                window.to()
            ),
        );
    }

    aggregate(&effective, window, &rows)
}

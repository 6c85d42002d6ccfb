/// Predicted tank volume from the rain forecast.
///
/// The projection starts at the anchor (latest measured volume) and adds the
/// roof runoff of each eligible forecast bucket in turn, assuming nothing is
/// drawn from the tank. The series is therefore non-decreasing.

use crate::model::{ForecastBucket, Series, SeriesPoint};
use crate::volume::VolumeModel;

/// Buckets that are still valid at `tm_now` and intersect `[tm_now, tm_to]`,
/// ordered by `forecast_from`.
pub fn eligible_buckets(buckets: &[ForecastBucket], tm_now: i64, tm_to: i64) -> Vec<ForecastBucket> {
    let mut eligible: Vec<ForecastBucket> = buckets
        .iter()
        .filter(|b| b.is_valid_at(tm_now) && b.overlaps(tm_now, tm_to))
        .copied()
        .collect();
    eligible.sort_by_key(|b| b.forecast_from);
    eligible
}

/// Builds the cumulative forecast series.
///
/// The first point is the anchor itself so the forecast line continues the
/// measured line. Each bucket contributes its full rain amount, even when it
/// only partly overlaps the window, plotted at the bucket midpoint. The first
/// projected point never precedes the anchor.
pub fn project(
    model: &VolumeModel,
    anchor: SeriesPoint,
    tm_now: i64,
    tm_to: i64,
    buckets: &[ForecastBucket],
) -> Series {
    let eligible = eligible_buckets(buckets, tm_now, tm_to);
    let mut series = Vec::with_capacity(eligible.len() + 1);
    series.push(anchor);

    let mut cumsum_l = anchor.value;
    for bucket in &eligible {
        // Negative or NaN rain would make the volume shrink.
        cumsum_l += model.rain_l(bucket.rain_mm).max(0.0);
        series.push(SeriesPoint::new(bucket.midpoint(), cumsum_l));
    }

    if let Some(first) = series.get_mut(1) {
        if first.timestamp < anchor.timestamp {
            first.timestamp = anchor.timestamp;
        }
    }
    series
}

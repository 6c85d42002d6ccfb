/// Overflow valve step function and open-time accounting.
///
/// The valve is drawn as a two-level step: `0` while closed and `peak`
/// while open. `peak` is only a visual scale for the chart, not a volume.
///
/// The log may start while the valve is already open (a CLOSED with no
/// OPENED before it) or end while it is still open (an OPENED with no CLOSED
/// after it). Both are drawn, but only open→close pairs seen entirely inside
/// the window count towards `total_open_s`.

use crate::model::{OverflowEvent, OverflowKind, Series, SeriesPoint};

/// Result of scanning the valve log for one window.
#[derive(Debug, Clone, PartialEq)]
pub struct OverflowTrack {
    pub series: Series,
    /// Seconds the valve was open across fully observed open→close pairs.
    pub total_open_s: i64,
    /// Time of the opening that is still unmatched at the end of the log.
    pub open_since: Option<i64>,
}

impl OverflowTrack {
    pub fn empty() -> Self {
        Self {
            series: Vec::new(),
            total_open_s: 0,
            open_since: None,
        }
    }

    /// Seconds the valve has been open at `now`, or `None` when closed.
    pub fn open_for_s(&self, now: i64) -> Option<i64> {
        let still_open = self.series.last().is_some_and(|p| p.value != 0.0);
        match (still_open, self.open_since) {
            (true, Some(since)) => Some(now - since),
            _ => None,
        }
    }
}

/// Builds the valve series for events inside `[tm_from, tm_to]`.
///
/// Events are processed in timestamp order whatever order they arrive in.
/// When anything was observed, the series is extended with a closing point
/// at `last_ts` (the latest height measurement) carrying the final valve
/// level; the closing point never precedes the last event.
pub fn track(
    last_ts: i64,
    tm_from: i64,
    tm_to: i64,
    events: &[OverflowEvent],
    peak_value: f64,
) -> OverflowTrack {
    let mut in_window: Vec<OverflowEvent> = events
        .iter()
        .filter(|e| (tm_from..=tm_to).contains(&e.timestamp))
        .copied()
        .collect();
    if in_window.is_empty() {
        return OverflowTrack::empty();
    }
    in_window.sort_by_key(|e| e.timestamp);

    let mut series: Series = Vec::with_capacity(2 * in_window.len() + 1);
    let mut total_open_s = 0;
    let mut open_since: Option<i64> = None;

    for event in &in_window {
        let t = event.timestamp;
        match event.kind {
            OverflowKind::Opened => {
                series.push(SeriesPoint::new(t, 0.0));
                series.push(SeriesPoint::new(t, peak_value));
                // A repeated opening restarts the count.
                open_since = Some(t);
            }
            OverflowKind::Closed => {
                if let Some(since) = open_since.take() {
                    total_open_s += t - since;
                }
                series.push(SeriesPoint::new(t, peak_value));
                series.push(SeriesPoint::new(t, 0.0));
            }
        }
    }

    if let Some(last) = series.last().copied() {
        series.push(SeriesPoint::new(last_ts.max(last.timestamp), last.value));
    }

    OverflowTrack {
        series,
        total_open_s,
        open_since,
    }
}

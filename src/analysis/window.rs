/// The time window every aggregation is computed against.
///
/// Window sizes are plain values passed into each call, so concurrent chart
/// requests with different spans never interfere.
///
/// # Clock injection
/// Constructors take `now` explicitly; `ending_now` is the only place that
/// reads the real clock.

use crate::model::MonitorError;

pub const HOUR_S: i64 = 3600;
pub const DAY_S: i64 = 24 * HOUR_S;

/// Default span shown on either side of `now`.
pub const DEFAULT_SPAN_S: i64 = 3 * DAY_S;

/// `from < now < to`, all epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartWindow {
    from: i64,
    now: i64,
    to: i64,
}

impl ChartWindow {
    pub fn new(from: i64, now: i64, to: i64) -> Result<Self, MonitorError> {
        if from < now && now < to {
            Ok(Self { from, now, to })
        } else {
            Err(MonitorError::InvalidWindow { from, now, to })
        }
    }

    /// `past_s` before and `future_s` after `now`.
    ///
    /// Spans that do not fit in epoch seconds are an `InvalidWindow`.
    pub fn around(now: i64, past_s: i64, future_s: i64) -> Result<Self, MonitorError> {
        match (now.checked_sub(past_s), now.checked_add(future_s)) {
            (Some(from), Some(to)) => Self::new(from, now, to),
            (from, to) => Err(MonitorError::InvalidWindow {
                from: from.unwrap_or(i64::MIN),
                now,
                to: to.unwrap_or(i64::MAX),
            }),
        }
    }

    /// Like `around`, with both spans given in whole days.
    pub fn around_days(now: i64, past_days: i64, future_days: i64) -> Result<Self, MonitorError> {
        let span = |days: i64| {
            days.checked_mul(DAY_S).ok_or(MonitorError::InvalidWindow {
                from: i64::MIN,
                now,
                to: i64::MAX,
            })
        };
        Self::around(now, span(past_days)?, span(future_days)?)
    }

    /// Window from chart request parameters.
    ///
    /// Both spans default to three days. A positive `days` sets both spans,
    /// a positive `hours` overrides `days`. Zero or negative values are
    /// ignored.
    pub fn from_request(
        now: i64,
        days: Option<i64>,
        hours: Option<i64>,
    ) -> Result<Self, MonitorError> {
        let mut span_s = DEFAULT_SPAN_S;
        if let Some(d) = days.filter(|d| *d > 0) {
            span_s = d.saturating_mul(DAY_S);
        }
        if let Some(h) = hours.filter(|h| *h > 0) {
            span_s = h.saturating_mul(HOUR_S);
        }
        Self::around(now, span_s, span_s)
    }

    /// Convenience wrapper that uses the real current time.
    pub fn ending_now(days: Option<i64>, hours: Option<i64>) -> Result<Self, MonitorError> {
        Self::from_request(chrono::Utc::now().timestamp(), days, hours)
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn to(&self) -> i64 {
        self.to
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        (self.from..=self.to).contains(&timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_714_568_400; // 2024-05-01 13:00:00 UTC

    #[test]
    fn test_window_requires_strict_ordering() {
        assert!(ChartWindow::new(1, 2, 3).is_ok());
        assert_eq!(
            ChartWindow::new(2, 2, 3),
            Err(MonitorError::InvalidWindow { from: 2, now: 2, to: 3 })
        );
        assert!(ChartWindow::new(1, 3, 3).is_err());
        assert!(ChartWindow::new(5, 2, 3).is_err());
    }

    #[test]
    fn test_default_request_spans_three_days() {
        let w = ChartWindow::from_request(NOW, None, None).unwrap();
        assert_eq!(w.from(), NOW - 3 * DAY_S);
        assert_eq!(w.to(), NOW + 3 * DAY_S);
        assert_eq!(w.now(), NOW);
    }

    #[test]
    fn test_hours_override_days() {
        let w = ChartWindow::from_request(NOW, Some(7), Some(12)).unwrap();
        assert_eq!(w.from(), NOW - 12 * HOUR_S);
        assert_eq!(w.to(), NOW + 12 * HOUR_S);
    }

    #[test]
    fn test_non_positive_request_values_are_ignored() {
        let w = ChartWindow::from_request(NOW, Some(0), Some(-4)).unwrap();
        assert_eq!(w, ChartWindow::from_request(NOW, None, None).unwrap());

        let w = ChartWindow::from_request(NOW, Some(1), Some(0)).unwrap();
        assert_eq!(w.from(), NOW - DAY_S);
    }

    #[test]
    fn test_huge_spans_are_rejected_not_overflowed() {
        let result = ChartWindow::from_request(NOW, Some(200_000_000_000_000), None);
        assert!(
            matches!(result, Err(MonitorError::InvalidWindow { now: NOW, .. })),
            "got {:?}",
            result
        );
        assert!(ChartWindow::from_request(NOW, None, Some(i64::MAX)).is_err());
        assert!(ChartWindow::around(NOW, i64::MAX, 10).is_err());
    }

    #[test]
    fn test_around_days_checks_multiplication() {
        let w = ChartWindow::around_days(NOW, 2, 1).unwrap();
        assert_eq!(w.from(), NOW - 2 * DAY_S);
        assert_eq!(w.to(), NOW + DAY_S);
        assert!(ChartWindow::around_days(NOW, i64::MAX / 2, 3).is_err());
        assert!(ChartWindow::around_days(NOW, 3, -1).is_err(), "to must follow now");
    }

    #[test]
    fn test_contains_is_inclusive() {
        let w = ChartWindow::new(10, 20, 30).unwrap();
        assert!(w.contains(10));
        assert!(w.contains(30));
        assert!(!w.contains(31));
    }
}

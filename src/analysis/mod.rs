/// Aggregation of the three raw data sources into chart series.
///
/// Submodules:
/// - `window`    — the shared `[from, now, to]` time window.
/// - `forecast`  — cumulative predicted-volume series from rain buckets.
/// - `overflow`  — valve step function and total open time.
/// - `aggregate` — orchestration, anchoring and derived scalars.

pub mod aggregate;
pub mod forecast;
pub mod overflow;
pub mod window;

pub use aggregate::{AggregateResult, RawRows, aggregate, aggregate_from_store};
pub use window::ChartWindow;

/// Clients for external feeds.
///
/// Submodules:
/// - `openweather` — 5 day / 3 hour rain forecast.

pub mod openweather;

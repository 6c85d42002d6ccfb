// Rainwater storage monitoring service.
//
// Turns three irregular data sources (bag fill-height samples, rain
// forecast buckets and overflow valve log lines) into time-aligned chart
// series plus a few scalars: current volume, how long the overflow has been
// open and total overflow time in the window.
//
// Modules:
// - `model`    — shared types and `MonitorError`.
// - `volume`   — height→liters and rain→liters conversion.
// - `analysis` — window, forecast projection, overflow tracking, aggregation.
// - `chart`    — chart text and state line.
// - `store`    — collaborator trait and in-memory store.
// - `db`       — PostgreSQL store.
// - `ingest`   — forecast feed client.
// - `config`   — TOML settings and sensor overrides.
// - `logging`  — structured console/file logging.

pub mod analysis;
pub mod chart;
pub mod config;
pub mod db;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod store;
pub mod volume;

/// Prints the waterbag chart payload for the window ending now.
///
/// Usage: waterbag-chart [--config PATH] [--days N] [--hours N] [--update-forecast]

use std::process::ExitCode;
use std::time::Duration;

use waterbag_service::analysis::{ChartWindow, aggregate_from_store};
use waterbag_service::chart::ChartPayload;
use waterbag_service::config::{DEFAULT_CONFIG_PATH, ServiceConfig};
use waterbag_service::db::PgStore;
use waterbag_service::ingest::openweather;
use waterbag_service::logging::{self, Source};
use waterbag_service::model::MonitorError;

struct Args {
    config_path: String,
    days: Option<i64>,
    hours: Option<i64>,
    update_forecast: bool,
}

fn parse_number(flag: &str, value: Option<String>) -> Result<i64, MonitorError> {
    value
        .as_deref()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| MonitorError::Config(format!("{} expects a whole number", flag)))
}

fn parse_args() -> Result<Args, MonitorError> {
    let mut args = Args {
        config_path: DEFAULT_CONFIG_PATH.to_string(),
        days: None,
        hours: None,
        update_forecast: false,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                args.config_path = iter
                    .next()
                    .ok_or_else(|| MonitorError::Config("--config expects a path".to_string()))?
            }
            "--days" => args.days = Some(parse_number("--days", iter.next())?),
            "--hours" => args.hours = Some(parse_number("--hours", iter.next())?),
            "--update-forecast" => args.update_forecast = true,
            other => return Err(MonitorError::Config(format!("unknown argument '{}'", other))),
        }
    }
    Ok(args)
}

fn update_forecast(store: &mut PgStore, config: &ServiceConfig) -> Result<(), MonitorError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| MonitorError::DataUnavailable(format!("HTTP client: {}", e)))?;
    let periods = openweather::fetch_forecast(&client, &config.forecast.city)?;
    let now = chrono::Utc::now().timestamp();
    let buckets = openweather::to_buckets(&periods, config.forecast.interval_s, now);
    store.store_forecasts(&buckets, now)?;
    Ok(())
}

fn run() -> Result<(), MonitorError> {
    dotenv::dotenv().ok();
    let args = parse_args()?;
    let config = ServiceConfig::load(&args.config_path)?;
    logging::init_logger(
        config.logging.min_level()?,
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    );

    let mut store = PgStore::connect_from_env()?;

    if args.update_forecast {
        if let Err(e) = update_forecast(&mut store, &config) {
            logging::log_fetch_failure(Source::Forecast, "update forecast", &e);
        }
    }

    let window = if args.days.is_some() || args.hours.is_some() {
        ChartWindow::ending_now(args.days, args.hours)?
    } else {
        ChartWindow::around_days(
            chrono::Utc::now().timestamp(),
            config.chart.past_days,
            config.chart.future_days,
        )?
    };
    let result = aggregate_from_store(&mut store, &config.volume, window)?;
    let payload = ChartPayload::from_result(&result);

    println!("state:    {}", payload.state);
    println!("max_l:    {}", payload.y_axis_max_l);
    println!("stored:   {}", payload.stored);
    println!("forecast: {}", payload.forecast);
    println!("overflow: {}", payload.overflow);
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(Source::System, &e.to_string());
            eprintln!("waterbag-chart: {}", e);
            ExitCode::FAILURE
        }
    }
}

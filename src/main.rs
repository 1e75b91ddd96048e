//! Backtest Chart - Demo Application Entry Point
//!
//! Loads a backtest result, draws the configured indicators on an in-memory
//! chart and logs what was rendered.
//!
//! Usage: `backtest_chart_app [<result.json> | <timestamp>] [day|week|month|year|all]`
//!
//! Without a source the most recent result stored by the backend is used.

use chrono::Utc;
use std::error::Error;
use std::path::Path;
use tracing::{error, info, warn};

use backtest_chart::chart::{
    visible_range_for, ChartOverlayManager, IndicatorKind, MemoryChart, TimeRange,
};
use backtest_chart::service::{load_backtest_file, BacktestService, PaginationParams};
use backtest_chart::trader::{init_logger, BacktestResult, SETTINGS};

/// Load the requested backtest result from a file or the backend
async fn load_result(source: Option<&str>) -> Result<BacktestResult, Box<dyn Error>> {
    if let Some(source) = source {
        let path = Path::new(source);
        if path.is_file() {
            info!("Loading backtest result from {}", path.display());
            return Ok(load_backtest_file(path)?);
        }
    }

    let service = BacktestService::from_settings(&SETTINGS)?;
    let timestamp = match source {
        Some(timestamp) => timestamp.to_string(),
        None => {
            let params = PaginationParams {
                per_page: SETTINGS.get_int("api.page_size").unwrap_or(10).max(1) as u32,
                ..PaginationParams::default()
            };
            let page = service.get_backtests(&params).await?;
            info!(
                "Backend holds {} results, using the most recent",
                page.pagination.total_count
            );
            page.results
                .first()
                .map(|result| result.timestamp.clone())
                .ok_or("backend has no stored backtest results")?
        }
    };

    info!("Fetching backtest {} from {}", timestamp, service.base_url());
    Ok(service.get_backtest(&timestamp).await?)
}

/// Indicator kinds listed under `chart.indicators`
fn configured_kinds() -> Vec<IndicatorKind> {
    let configured = SETTINGS.get_string("chart.indicators").unwrap_or_default();
    configured
        .split(',')
        .filter(|key| !key.trim().is_empty())
        .filter_map(|key| {
            let kind = IndicatorKind::from_key(key);
            if kind.is_none() {
                warn!("Ignoring unknown indicator '{}' in chart.indicators", key.trim());
            }
            kind
        })
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    init_logger(&SETTINGS);
    info!("Starting Backtest Chart {}", backtest_chart::VERSION);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let source = args.first().map(String::as_str);
    let time_range: TimeRange = match args.get(1) {
        Some(value) => value.parse()?,
        None => TimeRange::All,
    };

    let result = runtime.block_on(load_result(source))?;
    info!(
        "Backtest {} '{}': {} candles, {} orders, final value {:.2}",
        result.timestamp,
        result.name,
        result.candles.len(),
        result.orders.len(),
        result.final_value
    );

    let mut manager = ChartOverlayManager::with_settings(MemoryChart::new(), SETTINGS.clone());
    for kind in configured_kinds() {
        if let Err(e) = manager.add(kind) {
            warn!("Could not add {}: {}", kind, e);
        }
    }

    let report = manager.recompute(&result.candles, &result.orders);
    for (id, e) in &report.failed {
        error!("Rendering {} failed: {}", id, e);
    }

    for config in manager.enabled_indicators() {
        info!(
            "{} [{}] params={:?} series={:?}",
            config.kind,
            config.id,
            config.params,
            manager.render_keys_for(&config.id)
        );
    }
    for (_, series) in manager.chart().all_series() {
        info!(
            "  {:<24} {:>6} points, scale {}",
            series.options.title,
            series.data.len(),
            series.options.price_scale_id.as_deref().unwrap_or("price")
        );
    }

    match visible_range_for(&result.candles, time_range, Utc::now()) {
        Some(range) => info!(
            "Visible range ({}): bars {:.0}..{:.0}",
            time_range.value(),
            range.from,
            range.to
        ),
        None => warn!("No candles inside the '{}' range", time_range.value()),
    }

    Ok(())
}

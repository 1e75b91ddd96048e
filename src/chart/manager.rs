//! Chart overlay manager.
//!
//! Owns the user's indicator configurations and keeps the chart's series in
//! step with them. Every rendered series is tracked under a render key
//! (`<id>` or `<id>_<suffix>`) together with the id of the indicator owning
//! it, so that removing or disabling an indicator removes exactly its series.

use chrono::Utc;
use std::collections::HashMap;

use super::base::{
    HISTOGRAM_DOWN_COLOR, HISTOGRAM_UP_COLOR, MAIN_LINE_WIDTH, MIDDLE_LEVEL_COLOR,
    OVERBOUGHT_COLOR, OVERSOLD_COLOR, SIGNAL_COLOR, THIN_LINE_WIDTH, VOLUME_DOWN_COLOR,
    VOLUME_SCALE_ID, VOLUME_UP_COLOR,
};
use super::engine::{IndicatorEngine, IndicatorOutput, IndicatorValues};
use super::indicator::{
    available_indicators, IndicatorConfig, IndicatorKind, IndicatorParams, Pane, ParamMap,
};
use super::marker::build_trade_markers;
use super::series::{
    align_points, level_points, ChartApi, LineStyle, SeriesData, SeriesId, SeriesOptions,
    SeriesPoint,
};
use crate::error::{OverlayError, RenderError, Result};
use crate::trader::{Candle, Order, Settings};

/// Title of the candlestick series
pub const PRICE_SERIES_TITLE: &str = "Price";

/// Title of the volume histogram
pub const VOLUME_SERIES_TITLE: &str = "Volume";

/// A series on the chart and the indicator owning it
#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderEntry {
    owner: String,
    series: SeriesId,
}

/// One series an indicator wants on the chart
#[derive(Debug, Clone)]
struct SeriesPlan {
    key: String,
    options: SeriesOptions,
    points: Vec<SeriesPoint>,
}

/// Outcome of a recompute pass
#[derive(Debug, Default)]
pub struct RecomputeReport {
    /// Ids of indicators whose series were rendered
    pub rendered: Vec<String>,
    /// Render failures, keyed by indicator id or by `price`, `volume`, `markers`
    pub failed: Vec<(String, RenderError)>,
}

impl RecomputeReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Manages indicator overlays on a chart
pub struct ChartOverlayManager<C: ChartApi> {
    chart: C,
    settings: Settings,
    engine: IndicatorEngine,
    /// Indicator configurations by id
    indicators: HashMap<String, IndicatorConfig>,
    /// Ids in creation order
    order: Vec<String>,
    /// Render key to series
    render_keys: HashMap<String, RenderEntry>,
    pane_visibility: HashMap<Pane, bool>,
    candles: Vec<Candle>,
    orders: Vec<Order>,
    price_series: Option<SeriesId>,
    volume_series: Option<SeriesId>,
}

impl<C: ChartApi> ChartOverlayManager<C> {
    /// Create a manager drawing on `chart` with built-in defaults
    pub fn new(chart: C) -> Self {
        Self::with_settings(chart, Settings::with_defaults())
    }

    /// Create a manager whose defaults come from `settings`
    pub fn with_settings(chart: C, settings: Settings) -> Self {
        Self {
            chart,
            settings,
            engine: IndicatorEngine::default(),
            indicators: HashMap::new(),
            order: Vec::new(),
            render_keys: HashMap::new(),
            pane_visibility: HashMap::new(),
            candles: Vec::new(),
            orders: Vec::new(),
            price_series: None,
            volume_series: None,
        }
    }

    /// Use a different engine (for example another price source)
    pub fn set_engine(&mut self, engine: IndicatorEngine) {
        self.engine = engine;
    }

    pub fn chart(&self) -> &C {
        &self.chart
    }

    pub fn chart_mut(&mut self) -> &mut C {
        &mut self.chart
    }

    /// Kinds that can be added, with their labels
    pub fn available_indicators(&self) -> Vec<(IndicatorKind, &'static str)> {
        available_indicators()
    }

    /// Enabled configurations in creation order
    pub fn enabled_indicators(&self) -> Vec<&IndicatorConfig> {
        self.configs().filter(|config| config.enabled).collect()
    }

    /// Every configuration, enabled or not, in creation order
    pub fn configs(&self) -> impl Iterator<Item = &IndicatorConfig> {
        self.order.iter().filter_map(|id| self.indicators.get(id))
    }

    pub fn indicator(&self, id: &str) -> Option<&IndicatorConfig> {
        self.indicators.get(id)
    }

    /// Whether the dedicated pane is currently shown
    pub fn is_pane_visible(&self, pane: Pane) -> bool {
        self.pane_visibility.get(&pane).copied().unwrap_or(false)
    }

    /// All render keys, sorted
    pub fn render_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.render_keys.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Render keys owned by one indicator, sorted
    pub fn render_keys_for(&self, id: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .render_keys
            .iter()
            .filter(|(_, entry)| entry.owner == id)
            .map(|(key, _)| key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Series drawn under a render key
    pub fn series_for_key(&self, key: &str) -> Option<SeriesId> {
        self.render_keys.get(key).map(|entry| entry.series)
    }

    pub fn price_series(&self) -> Option<SeriesId> {
        self.price_series
    }

    pub fn volume_series(&self) -> Option<SeriesId> {
        self.volume_series
    }

    // ==================== Lifecycle ====================

    /// Add an indicator of `kind` with default parameters and color.
    ///
    /// Returns the new id. Rejected when the kind owns a dedicated pane and
    /// an enabled instance already exists.
    pub fn add(&mut self, kind: IndicatorKind) -> Result<String> {
        if kind.is_exclusive() && self.has_enabled(kind, None) {
            tracing::warn!(%kind, "rejecting second enabled instance");
            return Err(OverlayError::DuplicateExclusive(kind));
        }

        let id = self.next_id(kind);
        let config = IndicatorConfig {
            id: id.clone(),
            kind,
            params: self.default_params(kind),
            color: self.default_color(kind),
            enabled: true,
        };
        tracing::info!(id = %id, %kind, params = ?config.params, "indicator added");

        self.indicators.insert(id.clone(), config);
        self.order.push(id.clone());
        self.refresh_pane(kind);
        self.render_if_loaded(&id);
        Ok(id)
    }

    /// Flip the enabled flag of an indicator and return the new state
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let (kind, enabled) = {
            let config = self
                .indicators
                .get(id)
                .ok_or_else(|| OverlayError::UnknownIndicator(id.to_string()))?;
            (config.kind, config.enabled)
        };

        if !enabled && kind.is_exclusive() && self.has_enabled(kind, Some(id)) {
            tracing::warn!(id, %kind, "cannot enable second instance");
            return Err(OverlayError::DuplicateExclusive(kind));
        }

        if let Some(config) = self.indicators.get_mut(id) {
            config.enabled = !enabled;
        }
        tracing::info!(id, enabled = !enabled, "indicator toggled");

        if enabled {
            self.remove_series_of(id);
            self.refresh_pane(kind);
        } else {
            self.refresh_pane(kind);
            self.render_if_loaded(id);
        }
        Ok(!enabled)
    }

    /// Replace the parameters of an indicator.
    ///
    /// The new mapping is validated before anything changes. An enabled
    /// indicator is re-rendered against the current candles.
    pub fn update_params(&mut self, id: &str, params: ParamMap) -> Result<()> {
        let config = self
            .indicators
            .get_mut(id)
            .ok_or_else(|| OverlayError::UnknownIndicator(id.to_string()))?;
        let parsed = IndicatorParams::from_map(config.kind, &params)?;

        config.params = parsed.to_map();
        let enabled = config.enabled;
        tracing::info!(id, params = ?config.params, "indicator parameters updated");

        if enabled {
            self.render_if_loaded(id);
        }
        Ok(())
    }

    /// Delete an indicator and all of its series
    pub fn remove(&mut self, id: &str) -> Result<IndicatorConfig> {
        let config = self
            .indicators
            .remove(id)
            .ok_or_else(|| OverlayError::UnknownIndicator(id.to_string()))?;
        self.order.retain(|existing| existing != id);
        self.remove_series_of(id);
        self.refresh_pane(config.kind);
        tracing::info!(id, kind = %config.kind, "indicator removed");
        Ok(config)
    }

    /// Render candles, volume, trade markers and every enabled indicator.
    ///
    /// Existing series are updated in place and missing ones created. A
    /// render failure is logged and reported but does not stop the other
    /// series from being drawn. Calling this twice with the same input
    /// leaves the chart unchanged.
    pub fn recompute(&mut self, candles: &[Candle], orders: &[Order]) -> RecomputeReport {
        self.candles = candles.to_vec();
        self.orders = orders.to_vec();

        let mut report = RecomputeReport::default();

        if let Err(e) = self.render_price() {
            tracing::error!(error = %e, "failed to render price series");
            report.failed.push(("price".to_string(), e));
        }
        if let Err(e) = self.render_volume() {
            tracing::error!(error = %e, "failed to render volume series");
            report.failed.push(("volume".to_string(), e));
        }
        if let Err(e) = self.render_markers() {
            tracing::error!(error = %e, "failed to render trade markers");
            report.failed.push(("markers".to_string(), e));
        }

        self.drop_orphan_series();

        let enabled: Vec<String> = self
            .enabled_indicators()
            .into_iter()
            .map(|config| config.id.clone())
            .collect();
        for id in enabled {
            match self.render_indicator(&id) {
                Ok(()) => report.rendered.push(id),
                Err(e) => {
                    tracing::error!(id = %id, error = %e, "failed to render indicator");
                    report.failed.push((id, e));
                }
            }
        }

        tracing::debug!(
            candles = self.candles.len(),
            orders = self.orders.len(),
            rendered = report.rendered.len(),
            failed = report.failed.len(),
            "recompute finished"
        );
        report
    }

    // ==================== Defaults ====================

    /// Default parameters, taken from settings where present and valid
    fn default_params(&self, kind: IndicatorKind) -> ParamMap {
        let builtin = kind.default_params();
        let configured: ParamMap = builtin
            .iter()
            .map(|(name, value)| {
                let key = format!("indicator.{}.{}", kind.key(), name);
                (name.clone(), self.settings.get_float(&key).unwrap_or(*value))
            })
            .collect();

        match IndicatorParams::from_map(kind, &configured) {
            Ok(_) => configured,
            Err(e) => {
                tracing::warn!(%kind, error = %e, "configured defaults invalid, using built-in");
                builtin
            }
        }
    }

    fn default_color(&self, kind: IndicatorKind) -> String {
        self.settings
            .get_string(&format!("indicator.{}.color", kind.key()))
            .unwrap_or_else(|| kind.default_color().to_string())
    }

    /// `<kind>_<millis>`, suffixed with `_<n>` until unique
    fn next_id(&self, kind: IndicatorKind) -> String {
        let base = format!("{}_{}", kind.key(), Utc::now().timestamp_millis());
        if !self.indicators.contains_key(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", base, n);
            if !self.indicators.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Whether an enabled config of `kind` exists, ignoring `except`
    fn has_enabled(&self, kind: IndicatorKind, except: Option<&str>) -> bool {
        self.indicators
            .values()
            .any(|c| c.kind == kind && c.enabled && Some(c.id.as_str()) != except)
    }

    // ==================== Rendering ====================

    fn refresh_pane(&mut self, kind: IndicatorKind) {
        let Some(pane) = kind.pane() else {
            return;
        };
        let visible = self.has_enabled(kind, None);
        self.pane_visibility.insert(pane, visible);
        if let Err(e) = self.chart.set_price_scale_visible(pane.scale_id(), visible) {
            tracing::error!(scale = pane.scale_id(), error = %e, "failed to set pane visibility");
        }
    }

    fn render_if_loaded(&mut self, id: &str) {
        if self.candles.is_empty() {
            return;
        }
        if let Err(e) = self.render_indicator(id) {
            tracing::error!(id, error = %e, "failed to render indicator");
        }
    }

    fn render_indicator(&mut self, id: &str) -> std::result::Result<(), RenderError> {
        let Some(config) = self.indicators.get(id) else {
            return Ok(());
        };
        let params = config
            .indicator_params()
            .map_err(|e| RenderError::Rejected(e.to_string()))?;
        let output = self
            .engine
            .compute(&params, &self.candles)
            .map_err(|e| RenderError::Rejected(e.to_string()))?;

        let plans = self.plan_series(config, &params, &output);
        for plan in plans {
            self.upsert(id, plan)?;
        }
        Ok(())
    }

    /// Create or update the series behind a render key
    fn upsert(&mut self, owner: &str, plan: SeriesPlan) -> std::result::Result<(), RenderError> {
        let data = SeriesData::Points(plan.points);
        match self.render_keys.get(&plan.key) {
            Some(entry) => {
                let series = entry.series;
                tracing::trace!(key = %plan.key, %series, "updating series");
                self.chart.apply_series_options(series, plan.options)?;
                self.chart.set_series_data(series, data)
            }
            None => {
                let series = self.chart.add_series(plan.options)?;
                tracing::debug!(key = %plan.key, %series, "series created");
                self.render_keys.insert(
                    plan.key,
                    RenderEntry {
                        owner: owner.to_string(),
                        series,
                    },
                );
                self.chart.set_series_data(series, data)
            }
        }
    }

    fn remove_series_of(&mut self, id: &str) {
        let keys: Vec<String> = self
            .render_keys
            .iter()
            .filter(|(_, entry)| entry.owner == id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            if let Some(entry) = self.render_keys.remove(&key) {
                if let Err(e) = self.chart.remove_series(entry.series) {
                    tracing::warn!(key = %key, error = %e, "failed to remove series");
                }
            }
        }
    }

    /// Remove series whose owner is missing or disabled
    fn drop_orphan_series(&mut self) {
        let mut orphans: Vec<String> = self
            .render_keys
            .values()
            .filter(|entry| {
                !self
                    .indicators
                    .get(&entry.owner)
                    .is_some_and(|config| config.enabled)
            })
            .map(|entry| entry.owner.clone())
            .collect();
        orphans.sort_unstable();
        orphans.dedup();
        for owner in orphans {
            self.remove_series_of(&owner);
        }
    }

    fn render_price(&mut self) -> std::result::Result<(), RenderError> {
        let series = match self.price_series {
            Some(series) => series,
            None => {
                let series = self
                    .chart
                    .add_series(SeriesOptions::candlestick(PRICE_SERIES_TITLE))?;
                self.price_series = Some(series);
                series
            }
        };
        self.chart
            .set_series_data(series, SeriesData::Candles(self.candles.clone()))
    }

    fn render_volume(&mut self) -> std::result::Result<(), RenderError> {
        let points: Vec<SeriesPoint> = self
            .candles
            .iter()
            .filter_map(|candle| {
                let color = if candle.is_up() {
                    VOLUME_UP_COLOR
                } else {
                    VOLUME_DOWN_COLOR
                };
                candle
                    .volume
                    .map(|volume| SeriesPoint::new(candle.time, volume).with_color(color))
            })
            .collect();

        if points.is_empty() {
            if let Some(series) = self.volume_series.take() {
                self.chart.remove_series(series)?;
            }
            return Ok(());
        }

        let series = match self.volume_series {
            Some(series) => series,
            None => {
                let options = SeriesOptions::histogram(VOLUME_SERIES_TITLE, VOLUME_UP_COLOR)
                    .on_scale(VOLUME_SCALE_ID);
                let series = self.chart.add_series(options)?;
                self.volume_series = Some(series);
                series
            }
        };
        self.chart.set_series_data(series, SeriesData::Points(points))
    }

    fn render_markers(&mut self) -> std::result::Result<(), RenderError> {
        let Some(series) = self.price_series else {
            return Ok(());
        };
        let markers = build_trade_markers(&self.orders);
        tracing::debug!(markers = markers.len(), "setting trade markers");
        self.chart.set_markers(series, markers)
    }

    /// Series an indicator draws, keyed by render key
    fn plan_series(
        &self,
        config: &IndicatorConfig,
        params: &IndicatorParams,
        output: &IndicatorOutput,
    ) -> Vec<SeriesPlan> {
        let id = config.id.as_str();
        let color = config.color.as_str();
        let warmup = output.warmup;
        let len = output.len();
        let candles = &self.candles;
        let line = |values: &[f64]| align_points(candles, warmup, values);
        let level = |value: f64| level_points(candles, warmup, len, value);
        let plan = |key: String, options: SeriesOptions, points: Vec<SeriesPoint>| SeriesPlan {
            key,
            options,
            points,
        };

        match (*params, &output.values) {
            (IndicatorParams::Sma { period }, IndicatorValues::Line(values)) => vec![plan(
                id.to_string(),
                SeriesOptions::line(format!("SMA({})", period), color, MAIN_LINE_WIDTH),
                line(values),
            )],
            (IndicatorParams::Ema { period }, IndicatorValues::Line(values)) => vec![plan(
                id.to_string(),
                SeriesOptions::line(format!("EMA({})", period), color, MAIN_LINE_WIDTH),
                line(values),
            )],
            (
                IndicatorParams::BollingerBands { period, std_dev },
                IndicatorValues::Bollinger(bb),
            ) => {
                vec![
                    plan(
                        format!("{}_upper", id),
                        SeriesOptions::line(
                            format!("BB Upper({}, {})", period, std_dev),
                            color,
                            THIN_LINE_WIDTH,
                        )
                        .with_style(LineStyle::Dashed),
                        line(&bb.upper),
                    ),
                    plan(
                        format!("{}_middle", id),
                        SeriesOptions::line(
                            format!("BB Middle({})", period),
                            color,
                            THIN_LINE_WIDTH,
                        ),
                        line(&bb.middle),
                    ),
                    plan(
                        format!("{}_lower", id),
                        SeriesOptions::line(
                            format!("BB Lower({}, {})", period, std_dev),
                            color,
                            THIN_LINE_WIDTH,
                        )
                        .with_style(LineStyle::Dashed),
                        line(&bb.lower),
                    ),
                ]
            }
            (IndicatorParams::Rsi { period }, IndicatorValues::Line(values)) => {
                let scale = Pane::Rsi.scale_id();
                let overbought = self.level_setting("level.rsi.overbought", 70.0);
                let oversold = self.level_setting("level.rsi.oversold", 30.0);
                let middle = self.level_setting("level.rsi.middle", 50.0);
                vec![
                    plan(
                        id.to_string(),
                        SeriesOptions::line(format!("RSI({})", period), color, MAIN_LINE_WIDTH)
                            .on_scale(scale),
                        line(values),
                    ),
                    plan(
                        format!("{}_overbought", id),
                        level_options(
                            format!("Overbought ({})", overbought),
                            OVERBOUGHT_COLOR,
                            scale,
                        ),
                        level(overbought),
                    ),
                    plan(
                        format!("{}_oversold", id),
                        level_options(format!("Oversold ({})", oversold), OVERSOLD_COLOR, scale),
                        level(oversold),
                    ),
                    plan(
                        format!("{}_middle", id),
                        level_options(format!("Middle ({})", middle), MIDDLE_LEVEL_COLOR, scale),
                        level(middle),
                    ),
                ]
            }
            (
                IndicatorParams::Macd {
                    fast_period,
                    slow_period,
                    signal_period,
                },
                IndicatorValues::Macd(macd),
            ) => {
                let scale = Pane::Macd.scale_id();
                let histogram = line(&macd.histogram)
                    .into_iter()
                    .map(|point| {
                        let color = if point.value >= 0.0 {
                            HISTOGRAM_UP_COLOR
                        } else {
                            HISTOGRAM_DOWN_COLOR
                        };
                        point.with_color(color)
                    })
                    .collect();
                vec![
                    plan(
                        format!("{}_line", id),
                        SeriesOptions::line(
                            format!("MACD({},{},{})", fast_period, slow_period, signal_period),
                            color,
                            MAIN_LINE_WIDTH,
                        )
                        .on_scale(scale),
                        line(&macd.macd),
                    ),
                    plan(
                        format!("{}_signal", id),
                        SeriesOptions::line(
                            format!("Signal({})", signal_period),
                            SIGNAL_COLOR,
                            THIN_LINE_WIDTH,
                        )
                        .on_scale(scale),
                        line(&macd.signal),
                    ),
                    plan(
                        format!("{}_histogram", id),
                        SeriesOptions::histogram("Histogram", HISTOGRAM_UP_COLOR).on_scale(scale),
                        histogram,
                    ),
                ]
            }
            (
                IndicatorParams::Stochastic {
                    period,
                    k_period,
                    d_period,
                },
                IndicatorValues::Stochastic(stoch),
            ) => {
                let scale = Pane::Stochastic.scale_id();
                let overbought = self.level_setting("level.stochastic.overbought", 80.0);
                let oversold = self.level_setting("level.stochastic.oversold", 20.0);
                vec![
                    plan(
                        format!("{}_k", id),
                        SeriesOptions::line(
                            format!("%K({},{})", period, k_period),
                            color,
                            MAIN_LINE_WIDTH,
                        )
                        .on_scale(scale),
                        line(&stoch.k),
                    ),
                    plan(
                        format!("{}_d", id),
                        SeriesOptions::line(
                            format!("%D({})", d_period),
                            SIGNAL_COLOR,
                            THIN_LINE_WIDTH,
                        )
                        .on_scale(scale),
                        line(&stoch.d),
                    ),
                    plan(
                        format!("{}_overbought", id),
                        level_options(
                            format!("Overbought ({})", overbought),
                            OVERBOUGHT_COLOR,
                            scale,
                        ),
                        level(overbought),
                    ),
                    plan(
                        format!("{}_oversold", id),
                        level_options(format!("Oversold ({})", oversold), OVERSOLD_COLOR, scale),
                        level(oversold),
                    ),
                ]
            }
            (params, _) => {
                tracing::warn!(kind = %params.kind(), "engine output does not match parameters");
                Vec::new()
            }
        }
    }

    fn level_setting(&self, key: &str, fallback: f64) -> f64 {
        self.settings.get_float(key).unwrap_or(fallback)
    }
}

/// Dashed thin reference line on a pane
fn level_options(title: String, color: &str, scale: &str) -> SeriesOptions {
    SeriesOptions::line(title, color, THIN_LINE_WIDTH)
        .with_style(LineStyle::Dashed)
        .on_scale(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::series::MemoryChart;
    use crate::trader::{OrderSide, SettingValue};
    use chrono::{DateTime, Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.5).sin() * 5.0 + i as f64 * 0.1;
                Candle::new(
                    start() + Duration::hours(i as i64),
                    close - 0.5,
                    close + 1.0,
                    close - 1.0,
                    close,
                )
                .with_volume(1000.0 + i as f64)
            })
            .collect()
    }

    fn manager() -> ChartOverlayManager<MemoryChart> {
        ChartOverlayManager::new(MemoryChart::new())
    }

    #[test]
    fn test_add_uses_defaults() {
        let mut mgr = manager();
        let id = mgr.add(IndicatorKind::Sma).unwrap();
        let config = mgr.indicator(&id).unwrap();
        assert!(id.starts_with("sma_"));
        assert!(config.enabled);
        assert_eq!(config.params.get("period"), Some(&20.0));
        assert_eq!(config.color, IndicatorKind::Sma.default_color());
        // Nothing drawn before candles arrive
        assert!(mgr.render_keys().is_empty());
    }

    #[test]
    fn test_add_defaults_from_settings() {
        let settings = Settings::with_defaults();
        settings.set("indicator.ema.period", SettingValue::Int(50));
        settings.set("indicator.ema.color", SettingValue::String("#123456".to_string()));
        settings.set("indicator.rsi.period", SettingValue::Int(0));
        let mut mgr = ChartOverlayManager::with_settings(MemoryChart::new(), settings);

        let ema = mgr.add(IndicatorKind::Ema).unwrap();
        assert_eq!(mgr.indicator(&ema).unwrap().params.get("period"), Some(&50.0));
        assert_eq!(mgr.indicator(&ema).unwrap().color, "#123456");

        // Invalid configured default falls back to the built-in one
        let rsi = mgr.add(IndicatorKind::Rsi).unwrap();
        assert_eq!(mgr.indicator(&rsi).unwrap().params.get("period"), Some(&14.0));
    }

    #[test]
    fn test_ids_unique() {
        let mut mgr = manager();
        let a = mgr.add(IndicatorKind::Sma).unwrap();
        let b = mgr.add(IndicatorKind::Sma).unwrap();
        let c = mgr.add(IndicatorKind::Sma).unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
        assert_eq!(mgr.enabled_indicators().len(), 3);
    }

    #[test]
    fn test_exclusive_add_rejected() {
        let mut mgr = manager();
        mgr.add(IndicatorKind::Rsi).unwrap();
        let before = mgr.enabled_indicators().len();

        let err = mgr.add(IndicatorKind::Rsi);
        assert_eq!(err, Err(OverlayError::DuplicateExclusive(IndicatorKind::Rsi)));
        assert_eq!(mgr.enabled_indicators().len(), before);
        assert!(err.unwrap_err().to_string().contains("only one RSI"));
    }

    #[test]
    fn test_recompute_render_keys() {
        let mut mgr = manager();
        let sma = mgr.add(IndicatorKind::Sma).unwrap();
        let bb = mgr.add(IndicatorKind::BollingerBands).unwrap();
        let rsi = mgr.add(IndicatorKind::Rsi).unwrap();
        let macd = mgr.add(IndicatorKind::Macd).unwrap();
        let stoch = mgr.add(IndicatorKind::Stochastic).unwrap();

        let report = mgr.recompute(&candles(60), &[]);
        assert!(report.is_ok());
        assert_eq!(report.rendered.len(), 5);

        assert_eq!(mgr.render_keys_for(&sma), vec![sma.as_str()]);
        assert_eq!(
            mgr.render_keys_for(&bb),
            vec![format!("{}_lower", bb), format!("{}_middle", bb), format!("{}_upper", bb)]
        );
        assert_eq!(
            mgr.render_keys_for(&rsi),
            vec![
                rsi.clone(),
                format!("{}_middle", rsi),
                format!("{}_overbought", rsi),
                format!("{}_oversold", rsi)
            ]
        );
        assert_eq!(
            mgr.render_keys_for(&macd),
            vec![
                format!("{}_histogram", macd),
                format!("{}_line", macd),
                format!("{}_signal", macd)
            ]
        );
        assert_eq!(mgr.render_keys_for(&stoch).len(), 4);

        let chart = mgr.chart();
        assert!(chart.find_by_title("SMA(20)").is_some());
        assert!(chart.find_by_title("BB Upper(20, 2)").is_some());
        assert!(chart.find_by_title("MACD(12,26,9)").is_some());
        assert!(chart.find_by_title("%K(14,3)").is_some());
        let overbought = chart.find_by_title("Overbought (70)").unwrap();
        assert_eq!(overbought.options.price_scale_id.as_deref(), Some("rsi"));
        assert_eq!(overbought.options.line_style, LineStyle::Dashed);
    }

    #[test]
    fn test_series_aligned_to_candles() {
        let mut mgr = manager();
        let sma = mgr.add(IndicatorKind::Sma).unwrap();
        let data = candles(30);
        mgr.recompute(&data, &[]);

        let series = mgr.series_for_key(&sma).unwrap();
        let times = mgr.chart().series(series).unwrap().data.times();
        assert_eq!(times.len(), 30 - 19);
        assert_eq!(times[0], data[19].time);
        assert_eq!(times.last(), data.last().map(|c| &c.time));
    }

    #[test]
    fn test_recompute_idempotent() {
        let mut mgr = manager();
        let rsi = mgr.add(IndicatorKind::Rsi).unwrap();
        mgr.add(IndicatorKind::Ema).unwrap();
        let data = candles(40);

        mgr.recompute(&data, &[]);
        let keys: Vec<String> = mgr.render_keys().iter().map(|k| k.to_string()).collect();
        let count = mgr.chart().series_count();
        let series = mgr.series_for_key(&rsi);
        let values = mgr.chart().series(series.unwrap()).unwrap().data.values();

        mgr.recompute(&data, &[]);
        let keys_again: Vec<String> = mgr.render_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, keys_again);
        assert_eq!(mgr.chart().series_count(), count);
        assert_eq!(mgr.series_for_key(&rsi), series);
        assert_eq!(mgr.chart().series(series.unwrap()).unwrap().data.values(), values);
    }

    #[test]
    fn test_toggle_removes_and_restores() {
        let mut mgr = manager();
        let rsi = mgr.add(IndicatorKind::Rsi).unwrap();
        mgr.recompute(&candles(40), &[]);
        assert!(mgr.is_pane_visible(Pane::Rsi));
        assert_eq!(mgr.render_keys_for(&rsi).len(), 4);

        assert_eq!(mgr.toggle(&rsi), Ok(false));
        assert!(mgr.render_keys_for(&rsi).is_empty());
        assert!(!mgr.is_pane_visible(Pane::Rsi));
        assert_eq!(mgr.chart().scale_visible("rsi"), Some(false));

        assert_eq!(mgr.toggle(&rsi), Ok(true));
        assert_eq!(mgr.render_keys_for(&rsi).len(), 4);
        assert!(mgr.is_pane_visible(Pane::Rsi));
    }

    #[test]
    fn test_toggle_exclusive_rejected() {
        let mut mgr = manager();
        let first = mgr.add(IndicatorKind::Macd).unwrap();
        mgr.toggle(&first).unwrap();
        let second = mgr.add(IndicatorKind::Macd).unwrap();

        assert_eq!(
            mgr.toggle(&first),
            Err(OverlayError::DuplicateExclusive(IndicatorKind::Macd))
        );
        assert!(!mgr.indicator(&first).unwrap().enabled);
        assert!(mgr.indicator(&second).unwrap().enabled);
    }

    #[test]
    fn test_update_params_validates_first() {
        let mut mgr = manager();
        let sma = mgr.add(IndicatorKind::Sma).unwrap();
        mgr.recompute(&candles(30), &[]);

        let mut bad = ParamMap::new();
        bad.insert("period".to_string(), 0.0);
        assert!(matches!(
            mgr.update_params(&sma, bad),
            Err(OverlayError::InvalidParameter { .. })
        ));
        assert_eq!(mgr.indicator(&sma).unwrap().params.get("period"), Some(&20.0));

        let mut good = ParamMap::new();
        good.insert("period".to_string(), 5.0);
        mgr.update_params(&sma, good).unwrap();
        let series = mgr.series_for_key(&sma).unwrap();
        let chart_series = mgr.chart().series(series).unwrap();
        assert_eq!(chart_series.options.title, "SMA(5)");
        assert_eq!(chart_series.data.len(), 30 - 4);
    }

    #[test]
    fn test_update_params_rejects_huge_periods() {
        let mut mgr = manager();
        let macd = mgr.add(IndicatorKind::Macd).unwrap();
        mgr.recompute(&candles(10), &[]);
        let keys = mgr.render_keys_for(&macd).len();

        let mut huge = ParamMap::new();
        huge.insert("fastPeriod".to_string(), 12.0);
        huge.insert("slowPeriod".to_string(), 1e19);
        huge.insert("signalPeriod".to_string(), 1e19);
        assert!(matches!(
            mgr.update_params(&macd, huge),
            Err(OverlayError::InvalidParameter { .. })
        ));
        assert_eq!(mgr.indicator(&macd).unwrap().params.get("slowPeriod"), Some(&26.0));
        assert_eq!(mgr.render_keys_for(&macd).len(), keys);
        assert!(mgr.recompute(&candles(10), &[]).is_ok());
    }

    #[test]
    fn test_remove_cleans_up() {
        let mut mgr = manager();
        let macd = mgr.add(IndicatorKind::Macd).unwrap();
        mgr.recompute(&candles(60), &[]);
        let before = mgr.chart().series_count();

        let removed = mgr.remove(&macd).unwrap();
        assert_eq!(removed.kind, IndicatorKind::Macd);
        assert!(mgr.render_keys_for(&macd).is_empty());
        assert_eq!(mgr.chart().series_count(), before - 3);
        assert!(!mgr.is_pane_visible(Pane::Macd));
        assert_eq!(
            mgr.remove(&macd),
            Err(OverlayError::UnknownIndicator(macd.clone()))
        );
    }

    #[test]
    fn test_insufficient_data_renders_empty() {
        let mut mgr = manager();
        let sma = mgr.add(IndicatorKind::Sma).unwrap();
        let report = mgr.recompute(&candles(5), &[]);
        assert!(report.is_ok());
        let series = mgr.series_for_key(&sma).unwrap();
        assert!(mgr.chart().series(series).unwrap().data.is_empty());
    }

    #[test]
    fn test_markers_and_volume() {
        let mut mgr = manager();
        let data = candles(10);
        let orders = vec![
            Order::new(data[7].time, 101.0, OrderSide::Sell),
            Order::new(data[2].time, 99.0, OrderSide::Buy),
        ];
        mgr.recompute(&data, &orders);

        let price = mgr.price_series().unwrap();
        let markers = &mgr.chart().series(price).unwrap().markers;
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].side, OrderSide::Buy);
        assert_eq!(markers[1].side, OrderSide::Sell);

        let volume = mgr.volume_series().unwrap();
        let volume_series = mgr.chart().series(volume).unwrap();
        assert_eq!(volume_series.options.price_scale_id.as_deref(), Some(VOLUME_SCALE_ID));
        assert_eq!(volume_series.data.len(), 10);

        let no_volume: Vec<Candle> = data
            .into_iter()
            .map(|mut c| {
                c.volume = None;
                c
            })
            .collect();
        mgr.recompute(&no_volume, &[]);
        assert!(mgr.volume_series().is_none());
    }

    #[test]
    fn test_render_error_isolated() {
        let mut chart = MemoryChart::new();
        chart.reject_titles_starting_with("RSI");
        let mut mgr = ChartOverlayManager::new(chart);
        let rsi = mgr.add(IndicatorKind::Rsi).unwrap();
        let sma = mgr.add(IndicatorKind::Sma).unwrap();

        let report = mgr.recompute(&candles(40), &[]);
        assert_eq!(report.rendered, vec![sma.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, rsi);
        assert!(mgr.series_for_key(&sma).is_some());
    }

    #[test]
    fn test_histogram_colored_by_sign() {
        let mut mgr = manager();
        let macd = mgr.add(IndicatorKind::Macd).unwrap();
        mgr.recompute(&candles(80), &[]);

        let series = mgr.series_for_key(&format!("{}_histogram", macd)).unwrap();
        let SeriesData::Points(points) = &mgr.chart().series(series).unwrap().data else {
            panic!("histogram should hold points");
        };
        assert!(!points.is_empty());
        for point in points {
            let expected = if point.value >= 0.0 {
                HISTOGRAM_UP_COLOR
            } else {
                HISTOGRAM_DOWN_COLOR
            };
            assert_eq!(point.color.as_deref(), Some(expected));
        }
    }
}

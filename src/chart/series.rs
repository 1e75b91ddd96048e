//! Rendering collaborator for chart series.
//!
//! `ChartApi` is the seam between the overlay manager and whatever widget
//! draws the chart. `MemoryChart` keeps everything in memory; it backs the
//! demo binary and the tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::marker::SeriesMarker;
use crate::error::RenderError;
use crate::trader::Candle;

/// Opaque handle of a series created by a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId(pub u64);

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Series drawing type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesType {
    Candlestick,
    Line,
    Histogram,
}

/// Line dash style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

/// Presentation options of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOptions {
    pub series_type: SeriesType,
    pub title: String,
    pub color: String,
    pub line_width: f32,
    pub line_style: LineStyle,
    /// `None` draws on the main price scale
    pub price_scale_id: Option<String>,
}

impl SeriesOptions {
    /// Solid line on the main price scale
    pub fn line(title: impl Into<String>, color: impl Into<String>, line_width: f32) -> Self {
        Self {
            series_type: SeriesType::Line,
            title: title.into(),
            color: color.into(),
            line_width,
            line_style: LineStyle::Solid,
            price_scale_id: None,
        }
    }

    /// Histogram on the main price scale
    pub fn histogram(title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            series_type: SeriesType::Histogram,
            ..Self::line(title, color, 0.0)
        }
    }

    /// Candlestick series for the price data
    pub fn candlestick(title: impl Into<String>) -> Self {
        Self {
            series_type: SeriesType::Candlestick,
            ..Self::line(title, "", 0.0)
        }
    }

    /// Draw with the given dash style
    pub fn with_style(mut self, line_style: LineStyle) -> Self {
        self.line_style = line_style;
        self
    }

    /// Draw on a separate price scale
    pub fn on_scale(mut self, scale_id: &str) -> Self {
        self.price_scale_id = Some(scale_id.to_string());
        self
    }
}

/// One timestamped value, with an optional per-point color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time: DateTime<Utc>,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SeriesPoint {
    pub fn new(time: DateTime<Utc>, value: f64) -> Self {
        Self {
            time,
            value,
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Data pushed into a series
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesData {
    Points(Vec<SeriesPoint>),
    Candles(Vec<Candle>),
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Points(points) => points.len(),
            SeriesData::Candles(candles) => candles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamps of the data, in order
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        match self {
            SeriesData::Points(points) => points.iter().map(|p| p.time).collect(),
            SeriesData::Candles(candles) => candles.iter().map(|c| c.time).collect(),
        }
    }

    /// Point values; empty for candle data
    pub fn values(&self) -> Vec<f64> {
        match self {
            SeriesData::Points(points) => points.iter().map(|p| p.value).collect(),
            SeriesData::Candles(_) => Vec::new(),
        }
    }
}

/// Pair indicator values with the timestamps of the candles they belong to.
///
/// Value `i` is paired with `candles[warmup + i]`; values beyond the end of
/// the candles are dropped.
pub fn align_points(candles: &[Candle], warmup: usize, values: &[f64]) -> Vec<SeriesPoint> {
    candles
        .iter()
        .skip(warmup)
        .zip(values)
        .map(|(candle, &value)| SeriesPoint::new(candle.time, value))
        .collect()
}

/// Constant level spanning the same timestamps as an aligned series
pub fn level_points(candles: &[Candle], warmup: usize, len: usize, level: f64) -> Vec<SeriesPoint> {
    candles
        .iter()
        .skip(warmup)
        .take(len)
        .map(|candle| SeriesPoint::new(candle.time, level))
        .collect()
}

/// Chart widget operations used by the overlay manager
pub trait ChartApi {
    /// Create a series and return its handle
    fn add_series(&mut self, options: SeriesOptions) -> Result<SeriesId, RenderError>;

    /// Replace the whole data of a series
    fn set_series_data(&mut self, series: SeriesId, data: SeriesData) -> Result<(), RenderError>;

    /// Replace the presentation options of a series
    fn apply_series_options(
        &mut self,
        series: SeriesId,
        options: SeriesOptions,
    ) -> Result<(), RenderError>;

    /// Remove a series from the chart
    fn remove_series(&mut self, series: SeriesId) -> Result<(), RenderError>;

    /// Replace the markers of a series
    fn set_markers(
        &mut self,
        series: SeriesId,
        markers: Vec<SeriesMarker>,
    ) -> Result<(), RenderError>;

    /// Show or hide a price scale
    fn set_price_scale_visible(&mut self, scale_id: &str, visible: bool)
        -> Result<(), RenderError>;
}

/// Series state held by `MemoryChart`
#[derive(Debug, Clone)]
pub struct MemorySeries {
    pub options: SeriesOptions,
    pub data: SeriesData,
    pub markers: Vec<SeriesMarker>,
}

/// In-memory chart
#[derive(Debug, Default)]
pub struct MemoryChart {
    next_id: u64,
    series: BTreeMap<SeriesId, MemorySeries>,
    scale_visibility: HashMap<String, bool>,
    rejected_titles: Vec<String>,
    disposed: bool,
}

impl MemoryChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every series; later calls fail with `ChartDisposed`
    pub fn dispose(&mut self) {
        self.series.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Refuse to create series whose title starts with `prefix`
    pub fn reject_titles_starting_with(&mut self, prefix: impl Into<String>) {
        self.rejected_titles.push(prefix.into());
    }

    /// Number of live series
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn series(&self, id: SeriesId) -> Option<&MemorySeries> {
        self.series.get(&id)
    }

    /// All live series ordered by creation
    pub fn all_series(&self) -> impl Iterator<Item = (SeriesId, &MemorySeries)> {
        self.series.iter().map(|(id, series)| (*id, series))
    }

    /// First live series with the given title
    pub fn find_by_title(&self, title: &str) -> Option<&MemorySeries> {
        self.series.values().find(|s| s.options.title == title)
    }

    /// Last visibility set for a scale, if any
    pub fn scale_visible(&self, scale_id: &str) -> Option<bool> {
        self.scale_visibility.get(scale_id).copied()
    }

    fn ensure_alive(&self) -> Result<(), RenderError> {
        if self.disposed {
            Err(RenderError::ChartDisposed)
        } else {
            Ok(())
        }
    }

    fn series_mut(&mut self, id: SeriesId) -> Result<&mut MemorySeries, RenderError> {
        self.ensure_alive()?;
        self.series
            .get_mut(&id)
            .ok_or(RenderError::UnknownSeries(id.0))
    }
}

impl ChartApi for MemoryChart {
    fn add_series(&mut self, options: SeriesOptions) -> Result<SeriesId, RenderError> {
        self.ensure_alive()?;
        if self
            .rejected_titles
            .iter()
            .any(|prefix| options.title.starts_with(prefix.as_str()))
        {
            return Err(RenderError::Rejected(format!(
                "series {} refused",
                options.title
            )));
        }

        self.next_id += 1;
        let id = SeriesId(self.next_id);
        let data = match options.series_type {
            SeriesType::Candlestick => SeriesData::Candles(Vec::new()),
            SeriesType::Line | SeriesType::Histogram => SeriesData::Points(Vec::new()),
        };
        self.series.insert(
            id,
            MemorySeries {
                options,
                data,
                markers: Vec::new(),
            },
        );
        Ok(id)
    }

    fn set_series_data(&mut self, series: SeriesId, data: SeriesData) -> Result<(), RenderError> {
        self.series_mut(series)?.data = data;
        Ok(())
    }

    fn apply_series_options(
        &mut self,
        series: SeriesId,
        options: SeriesOptions,
    ) -> Result<(), RenderError> {
        self.series_mut(series)?.options = options;
        Ok(())
    }

    fn remove_series(&mut self, series: SeriesId) -> Result<(), RenderError> {
        self.ensure_alive()?;
        self.series
            .remove(&series)
            .map(|_| ())
            .ok_or(RenderError::UnknownSeries(series.0))
    }

    fn set_markers(
        &mut self,
        series: SeriesId,
        markers: Vec<SeriesMarker>,
    ) -> Result<(), RenderError> {
        self.series_mut(series)?.markers = markers;
        Ok(())
    }

    fn set_price_scale_visible(
        &mut self,
        scale_id: &str,
        visible: bool,
    ) -> Result<(), RenderError> {
        self.ensure_alive()?;
        self.scale_visibility.insert(scale_id.to_string(), visible);
        Ok(())
    }
}

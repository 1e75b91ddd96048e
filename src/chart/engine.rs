//! Technical indicator computation.
//!
//! Pure functions over a candle slice. Every output sequence is aligned to a
//! suffix of the input: element `i` belongs to `candles[warmup + i]`, where
//! `warmup` is `IndicatorParams::warmup()`. Input shorter than the warm-up
//! yields empty sequences rather than an error or partial values.

use crate::error::Result;
use crate::trader::Candle;

use super::indicator::{check_period, check_std_dev, IndicatorParams};

/// Substitute for a zero average loss in RSI
const RSI_ZERO_LOSS: f64 = 0.001;

/// Raw %K reported when the stochastic window has no range
const STOCH_FLAT_K: f64 = 50.0;

/// Candle field an indicator reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl PriceSource {
    /// Extract the source field of every candle
    pub fn extract(&self, candles: &[Candle]) -> Vec<f64> {
        candles
            .iter()
            .map(|c| match self {
                PriceSource::Open => c.open,
                PriceSource::High => c.high,
                PriceSource::Low => c.low,
                PriceSource::Close => c.close,
            })
            .collect()
    }
}

/// MACD output lines
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdOutput {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Bollinger Bands output lines
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BollingerOutput {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Stochastic Oscillator output lines
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StochasticOutput {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

/// Values produced by one indicator
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValues {
    Line(Vec<f64>),
    Macd(MacdOutput),
    Bollinger(BollingerOutput),
    Stochastic(StochasticOutput),
}

/// Indicator values together with their timeline offset
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorOutput {
    pub warmup: usize,
    pub values: IndicatorValues,
}

impl IndicatorOutput {
    /// Named sequences, in rendering order
    pub fn series(&self) -> Vec<(&'static str, &[f64])> {
        match &self.values {
            IndicatorValues::Line(values) => vec![("value", values.as_slice())],
            IndicatorValues::Macd(out) => vec![
                ("macd", out.macd.as_slice()),
                ("signal", out.signal.as_slice()),
                ("histogram", out.histogram.as_slice()),
            ],
            IndicatorValues::Bollinger(out) => vec![
                ("upper", out.upper.as_slice()),
                ("middle", out.middle.as_slice()),
                ("lower", out.lower.as_slice()),
            ],
            IndicatorValues::Stochastic(out) => {
                vec![("k", out.k.as_slice()), ("d", out.d.as_slice())]
            }
        }
    }

    /// Length shared by all sequences
    pub fn len(&self) -> usize {
        self.series().first().map(|(_, values)| values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single dispatch point from indicator parameters to computation
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine {
    source: PriceSource,
}

impl IndicatorEngine {
    /// Create an engine reading the given price field
    pub fn new(source: PriceSource) -> Self {
        Self { source }
    }

    /// Price field used by single-source indicators
    pub fn source(&self) -> PriceSource {
        self.source
    }

    /// Compute an indicator over the candles
    pub fn compute(&self, params: &IndicatorParams, candles: &[Candle]) -> Result<IndicatorOutput> {
        params.validate()?;
        let values = match *params {
            IndicatorParams::Sma { period } => {
                IndicatorValues::Line(calculate_sma(candles, period, self.source)?)
            }
            IndicatorParams::Ema { period } => {
                IndicatorValues::Line(calculate_ema(candles, period, self.source)?)
            }
            IndicatorParams::Rsi { period } => {
                IndicatorValues::Line(calculate_rsi(candles, period, self.source)?)
            }
            IndicatorParams::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => IndicatorValues::Macd(calculate_macd(
                candles,
                fast_period,
                slow_period,
                signal_period,
                self.source,
            )?),
            IndicatorParams::BollingerBands { period, std_dev } => IndicatorValues::Bollinger(
                calculate_bollinger_bands(candles, period, std_dev, self.source)?,
            ),
            IndicatorParams::Stochastic {
                period,
                k_period,
                d_period,
            } => IndicatorValues::Stochastic(calculate_stochastic(
                candles, period, k_period, d_period,
            )?),
        };

        let output = IndicatorOutput {
            warmup: params.warmup(),
            values,
        };
        tracing::trace!(
            kind = %params.kind(),
            candles = candles.len(),
            warmup = output.warmup,
            len = output.len(),
            "indicator computed"
        );
        Ok(output)
    }
}

// ==================== Moving Averages ====================

/// Simple Moving Average
pub fn calculate_sma(candles: &[Candle], period: usize, source: PriceSource) -> Result<Vec<f64>> {
    check_period("period", period)?;
    Ok(sma_values(&source.extract(candles), period))
}

/// Exponential Moving Average seeded with the SMA of the first window
pub fn calculate_ema(candles: &[Candle], period: usize, source: PriceSource) -> Result<Vec<f64>> {
    check_period("period", period)?;
    Ok(ema_values(&source.extract(candles), period))
}

/// Trailing mean; `period` must be >= 1
fn sma_values(values: &[f64], period: usize) -> Vec<f64> {
    if values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|window| window.iter().sum::<f64>() / period as f64)
        .collect()
}

/// EMA with SMA seed; `period` must be >= 1
fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    if values.len() < period {
        return Vec::new();
    }
    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(seed);
    let mut prev = seed;
    for &value in &values[period..] {
        prev = (value - prev) * multiplier + prev;
        result.push(prev);
    }
    result
}

// ==================== Oscillators ====================

/// Relative Strength Index with Wilder smoothing
pub fn calculate_rsi(candles: &[Candle], period: usize, source: PriceSource) -> Result<Vec<f64>> {
    check_period("period", period)?;
    let values = source.extract(candles);
    if values.len() <= period {
        return Ok(Vec::new());
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = values
        .windows(2)
        .map(|pair| {
            let change = pair[1] - pair[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(gains.len() - period + 1);
    result.push(rsi_value(avg_gain, avg_loss));
    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        result.push(rsi_value(avg_gain, avg_loss));
    }
    Ok(result)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let loss = if avg_loss == 0.0 { RSI_ZERO_LOSS } else { avg_loss };
    let rs = avg_gain / loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// Moving Average Convergence Divergence.
///
/// The MACD line starts at the later of the two EMA seeds; all three lines are
/// cut to the signal line's start so they share one timeline offset.
pub fn calculate_macd(
    candles: &[Candle],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    source: PriceSource,
) -> Result<MacdOutput> {
    check_period("fastPeriod", fast_period)?;
    check_period("slowPeriod", slow_period)?;
    check_period("signalPeriod", signal_period)?;

    let values = source.extract(candles);
    let fast = ema_values(&values, fast_period);
    let slow = ema_values(&values, slow_period);

    let start = fast_period.max(slow_period) - 1;
    if values.len() <= start {
        return Ok(MacdOutput::default());
    }
    let fast_offset = start - (fast_period - 1);
    let slow_offset = start - (slow_period - 1);
    let macd_line: Vec<f64> = (0..values.len() - start)
        .map(|i| fast[fast_offset + i] - slow[slow_offset + i])
        .collect();

    let signal = ema_values(&macd_line, signal_period);
    if signal.is_empty() {
        return Ok(MacdOutput::default());
    }

    let macd: Vec<f64> = macd_line[signal_period - 1..].to_vec();
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();
    Ok(MacdOutput {
        macd,
        signal,
        histogram,
    })
}

/// Bollinger Bands using the population standard deviation of each window
pub fn calculate_bollinger_bands(
    candles: &[Candle],
    period: usize,
    std_dev: f64,
    source: PriceSource,
) -> Result<BollingerOutput> {
    check_period("period", period)?;
    check_std_dev(std_dev)?;

    let values = source.extract(candles);
    let mut output = BollingerOutput::default();
    if values.len() < period {
        return Ok(output);
    }

    for window in values.windows(period) {
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
        let band = std_dev * variance.sqrt();

        output.middle.push(mean);
        output.upper.push(mean + band);
        output.lower.push(mean - band);
    }
    Ok(output)
}

/// Stochastic Oscillator over high/low/close.
///
/// %K is smoothed with an SMA of `k_period` (unchanged when `k_period` is 1)
/// and %D is the SMA of %K. %K is cut to %D's start so both share one offset.
pub fn calculate_stochastic(
    candles: &[Candle],
    period: usize,
    k_period: usize,
    d_period: usize,
) -> Result<StochasticOutput> {
    check_period("period", period)?;
    check_period("kPeriod", k_period)?;
    check_period("dPeriod", d_period)?;

    if candles.len() < period {
        return Ok(StochasticOutput::default());
    }

    let raw_k: Vec<f64> = candles
        .windows(period)
        .map(|window| {
            let highest = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            let lowest = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            let close = window[window.len() - 1].close;
            let range = highest - lowest;
            if range == 0.0 {
                STOCH_FLAT_K
            } else {
                (close - lowest) / range * 100.0
            }
        })
        .collect();

    let smoothed = if k_period > 1 {
        sma_values(&raw_k, k_period)
    } else {
        raw_k
    };

    let d = sma_values(&smoothed, d_period);
    let k = smoothed.into_iter().skip(d_period - 1).take(d.len()).collect();
    Ok(StochasticOutput { k, d })
}

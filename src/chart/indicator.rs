//! Indicator kinds, parameters and configurations.
//!
//! `IndicatorKind` is the closed set of supported indicators. Parameters
//! travel as a loose `name -> number` map (what an edit dialog produces) and
//! are validated into the typed `IndicatorParams` before any computation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::base::{
    MACD_SCALE_ID, INFO_COLOR, PRIMARY_COLOR, RSI_SCALE_ID, SECONDARY_COLOR, STOCH_SCALE_ID,
    WARNING_COLOR,
};
use crate::error::{OverlayError, Result};

/// Parameter mapping as edited by the user
pub type ParamMap = BTreeMap<String, f64>;

/// Indicator type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    BollingerBands,
    Stochastic,
}

impl IndicatorKind {
    /// Short lowercase key, used for ids and setting names
    pub fn key(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Macd => "macd",
            IndicatorKind::BollingerBands => "bollinger",
            IndicatorKind::Stochastic => "stochastic",
        }
    }

    /// Look up a kind by its key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().into_iter().find(|kind| kind.key() == key.trim())
    }

    /// Human readable label
    pub fn display_name(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "Simple Moving Average (SMA)",
            IndicatorKind::Ema => "Exponential Moving Average (EMA)",
            IndicatorKind::BollingerBands => "Bollinger Bands",
            IndicatorKind::Rsi => "Relative Strength Index (RSI)",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Stochastic => "Stochastic Oscillator",
        }
    }

    /// All kinds in menu order
    pub fn all() -> Vec<IndicatorKind> {
        vec![
            IndicatorKind::Sma,
            IndicatorKind::Ema,
            IndicatorKind::BollingerBands,
            IndicatorKind::Rsi,
            IndicatorKind::Macd,
            IndicatorKind::Stochastic,
        ]
    }

    /// Kinds owning a dedicated pane allow a single enabled instance
    pub fn is_exclusive(&self) -> bool {
        self.pane().is_some()
    }

    /// Dedicated pane, if the kind does not overlay the price pane
    pub fn pane(&self) -> Option<Pane> {
        match self {
            IndicatorKind::Rsi => Some(Pane::Rsi),
            IndicatorKind::Macd => Some(Pane::Macd),
            IndicatorKind::Stochastic => Some(Pane::Stochastic),
            IndicatorKind::Sma | IndicatorKind::Ema | IndicatorKind::BollingerBands => None,
        }
    }

    /// Parameter names accepted by this kind
    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Sma | IndicatorKind::Ema | IndicatorKind::Rsi => &["period"],
            IndicatorKind::Macd => &["fastPeriod", "slowPeriod", "signalPeriod"],
            IndicatorKind::BollingerBands => &["period", "stdDev"],
            IndicatorKind::Stochastic => &["period", "kPeriod", "dPeriod"],
        }
    }

    /// Built-in default parameters
    pub fn default_params(&self) -> ParamMap {
        let pairs: &[(&str, f64)] = match self {
            IndicatorKind::Sma => &[("period", 20.0)],
            IndicatorKind::Ema => &[("period", 21.0)],
            IndicatorKind::BollingerBands => &[("period", 20.0), ("stdDev", 2.0)],
            IndicatorKind::Rsi => &[("period", 14.0)],
            IndicatorKind::Macd => &[
                ("fastPeriod", 12.0),
                ("slowPeriod", 26.0),
                ("signalPeriod", 9.0),
            ],
            IndicatorKind::Stochastic => &[("period", 14.0), ("kPeriod", 3.0), ("dPeriod", 3.0)],
        };
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    /// Built-in default color
    pub fn default_color(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => INFO_COLOR,
            IndicatorKind::Ema => PRIMARY_COLOR,
            IndicatorKind::BollingerBands => SECONDARY_COLOR,
            IndicatorKind::Rsi => WARNING_COLOR,
            IndicatorKind::Macd => INFO_COLOR,
            IndicatorKind::Stochastic => WARNING_COLOR,
        }
    }

    /// Metadata for building a parameter editing form
    pub fn param_specs(&self) -> Vec<ParamSpec> {
        self.param_names()
            .iter()
            .map(|name| ParamSpec::for_param(name, *self))
            .collect()
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndicatorKind::Sma => "SMA",
            IndicatorKind::Ema => "EMA",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::BollingerBands => "BOLLINGER_BANDS",
            IndicatorKind::Stochastic => "STOCHASTIC",
        };
        write!(f, "{}", name)
    }
}

/// Indicator kinds with their labels, for building an "add indicator" menu
pub fn available_indicators() -> Vec<(IndicatorKind, &'static str)> {
    IndicatorKind::all()
        .into_iter()
        .map(|kind| (kind, kind.display_name()))
        .collect()
}

/// Dedicated chart pane of an exclusive indicator kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    Rsi,
    Macd,
    Stochastic,
}

impl Pane {
    /// Price scale id of the pane
    pub fn scale_id(&self) -> &'static str {
        match self {
            Pane::Rsi => RSI_SCALE_ID,
            Pane::Macd => MACD_SCALE_ID,
            Pane::Stochastic => STOCH_SCALE_ID,
        }
    }
}

/// Editing metadata for one indicator parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub description: &'static str,
}

impl ParamSpec {
    fn for_param(name: &'static str, kind: IndicatorKind) -> Self {
        let label = match name {
            "period" => "Period",
            "fastPeriod" => "Fast Period",
            "slowPeriod" => "Slow Period",
            "signalPeriod" => "Signal Period",
            "stdDev" => "Standard Deviation",
            "kPeriod" => "K Period",
            "dPeriod" => "D Period",
            _ => name,
        };
        let (min, max, step) = match name {
            "stdDev" => (0.1, 5.0, 0.1),
            _ => (1.0, max_period(name) as f64, 1.0),
        };
        let description = match (name, kind) {
            ("period", IndicatorKind::Sma | IndicatorKind::Ema) => {
                "Number of periods to calculate the moving average"
            }
            ("period", IndicatorKind::Rsi) => "Number of periods to calculate the RSI",
            ("period", IndicatorKind::BollingerBands) => {
                "Number of periods to calculate the middle band (SMA)"
            }
            ("period", IndicatorKind::Stochastic) => {
                "Number of periods to calculate the Stochastic"
            }
            ("stdDev", _) => "Number of standard deviations for the upper and lower bands",
            ("fastPeriod", _) => "Period of the fast EMA",
            ("slowPeriod", _) => "Period of the slow EMA",
            ("signalPeriod", _) => "Period of the signal line EMA",
            ("kPeriod", _) => "Smoothing period of %K",
            ("dPeriod", _) => "Period of the %D moving average",
            _ => "Number of periods",
        };
        Self {
            name,
            label,
            min,
            max,
            step,
            description,
        }
    }
}

/// Validated, typed indicator parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorParams {
    Sma {
        period: usize,
    },
    Ema {
        period: usize,
    },
    Rsi {
        period: usize,
    },
    Macd {
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    },
    BollingerBands {
        period: usize,
        std_dev: f64,
    },
    Stochastic {
        period: usize,
        k_period: usize,
        d_period: usize,
    },
}

impl IndicatorParams {
    /// Validate a parameter map for the given kind.
    ///
    /// Every parameter of the kind must be present, no unknown names are
    /// accepted, periods must be integers >= 1 and `stdDev` must be > 0.
    pub fn from_map(kind: IndicatorKind, params: &ParamMap) -> Result<Self> {
        if let Some(unknown) = params
            .keys()
            .find(|name| !kind.param_names().contains(&name.as_str()))
        {
            return Err(OverlayError::UnknownParameter {
                kind,
                name: unknown.clone(),
            });
        }

        let get = |name: &'static str| -> Result<f64> {
            params
                .get(name)
                .copied()
                .ok_or(OverlayError::MissingParameter { kind, name })
        };
        let period = |name: &'static str| -> Result<usize> { parse_period(name, get(name)?) };

        let parsed = match kind {
            IndicatorKind::Sma => IndicatorParams::Sma {
                period: period("period")?,
            },
            IndicatorKind::Ema => IndicatorParams::Ema {
                period: period("period")?,
            },
            IndicatorKind::Rsi => IndicatorParams::Rsi {
                period: period("period")?,
            },
            IndicatorKind::Macd => IndicatorParams::Macd {
                fast_period: period("fastPeriod")?,
                slow_period: period("slowPeriod")?,
                signal_period: period("signalPeriod")?,
            },
            IndicatorKind::BollingerBands => IndicatorParams::BollingerBands {
                period: period("period")?,
                std_dev: get("stdDev")?,
            },
            IndicatorKind::Stochastic => IndicatorParams::Stochastic {
                period: period("period")?,
                k_period: period("kPeriod")?,
                d_period: period("dPeriod")?,
            },
        };
        parsed.validate()?;
        Ok(parsed)
    }

    /// Check the typed parameters against their minimums
    pub fn validate(&self) -> Result<()> {
        match *self {
            IndicatorParams::Sma { period }
            | IndicatorParams::Ema { period }
            | IndicatorParams::Rsi { period } => check_period("period", period),
            IndicatorParams::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => {
                check_period("fastPeriod", fast_period)?;
                check_period("slowPeriod", slow_period)?;
                check_period("signalPeriod", signal_period)
            }
            IndicatorParams::BollingerBands { period, std_dev } => {
                check_period("period", period)?;
                check_std_dev(std_dev)
            }
            IndicatorParams::Stochastic {
                period,
                k_period,
                d_period,
            } => {
                check_period("period", period)?;
                check_period("kPeriod", k_period)?;
                check_period("dPeriod", d_period)
            }
        }
    }

    /// Indicator kind of these parameters
    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorParams::Sma { .. } => IndicatorKind::Sma,
            IndicatorParams::Ema { .. } => IndicatorKind::Ema,
            IndicatorParams::Rsi { .. } => IndicatorKind::Rsi,
            IndicatorParams::Macd { .. } => IndicatorKind::Macd,
            IndicatorParams::BollingerBands { .. } => IndicatorKind::BollingerBands,
            IndicatorParams::Stochastic { .. } => IndicatorKind::Stochastic,
        }
    }

    /// Number of leading candles consumed before the first output value.
    ///
    /// Output element `i` belongs to `candles[warmup + i]`.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorParams::Sma { period }
            | IndicatorParams::Ema { period }
            | IndicatorParams::BollingerBands { period, .. } => period.saturating_sub(1),
            IndicatorParams::Rsi { period } => period,
            IndicatorParams::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => fast_period
                .max(slow_period)
                .saturating_sub(1)
                .saturating_add(signal_period.saturating_sub(1)),
            IndicatorParams::Stochastic {
                period,
                k_period,
                d_period,
            } => period
                .saturating_sub(1)
                .saturating_add(k_period.saturating_sub(1))
                .saturating_add(d_period.saturating_sub(1)),
        }
    }

    /// Back to the loose map representation
    pub fn to_map(&self) -> ParamMap {
        let pairs: Vec<(&str, f64)> = match *self {
            IndicatorParams::Sma { period }
            | IndicatorParams::Ema { period }
            | IndicatorParams::Rsi { period } => vec![("period", period as f64)],
            IndicatorParams::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => vec![
                ("fastPeriod", fast_period as f64),
                ("slowPeriod", slow_period as f64),
                ("signalPeriod", signal_period as f64),
            ],
            IndicatorParams::BollingerBands { period, std_dev } => {
                vec![("period", period as f64), ("stdDev", std_dev)]
            }
            IndicatorParams::Stochastic {
                period,
                k_period,
                d_period,
            } => vec![
                ("period", period as f64),
                ("kPeriod", k_period as f64),
                ("dPeriod", d_period as f64),
            ],
        };
        pairs
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

/// Largest accepted value of a period parameter
pub fn max_period(name: &str) -> usize {
    match name {
        "period" | "slowPeriod" => 200,
        _ => 50,
    }
}

fn parse_period(name: &str, value: f64) -> Result<usize> {
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
        return Err(OverlayError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: "must be a positive integer",
        });
    }
    if value > max_period(name) as f64 {
        return Err(OverlayError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: "exceeds the largest supported period",
        });
    }
    Ok(value as usize)
}

pub(crate) fn check_period(name: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(OverlayError::InvalidParameter {
            name: name.to_string(),
            value: 0.0,
            reason: "must be a positive integer",
        });
    }
    if period > max_period(name) {
        return Err(OverlayError::InvalidParameter {
            name: name.to_string(),
            value: period as f64,
            reason: "exceeds the largest supported period",
        });
    }
    Ok(())
}

pub(crate) fn check_std_dev(std_dev: f64) -> Result<()> {
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return Err(OverlayError::InvalidParameter {
            name: "stdDev".to_string(),
            value: std_dev,
            reason: "must be a positive number",
        });
    }
    Ok(())
}

/// One user-configured indicator instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: IndicatorKind,
    pub params: ParamMap,
    pub color: String,
    pub enabled: bool,
}

impl IndicatorConfig {
    /// Typed view of the parameters
    pub fn indicator_params(&self) -> Result<IndicatorParams> {
        IndicatorParams::from_map(self.kind, &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, f64)]) -> ParamMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_default_params_are_valid() {
        for kind in IndicatorKind::all() {
            let parsed = IndicatorParams::from_map(kind, &kind.default_params()).unwrap();
            assert_eq!(parsed.kind(), kind);
            assert_eq!(parsed.to_map(), kind.default_params());
        }
    }

    #[test]
    fn test_warmup_lengths() {
        let sma = IndicatorParams::Sma { period: 20 };
        assert_eq!(sma.warmup(), 19);

        let rsi = IndicatorParams::Rsi { period: 14 };
        assert_eq!(rsi.warmup(), 14);

        let macd = IndicatorParams::Macd {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        };
        assert_eq!(macd.warmup(), 25 + 8);

        let stoch = IndicatorParams::Stochastic {
            period: 14,
            k_period: 3,
            d_period: 3,
        };
        assert_eq!(stoch.warmup(), 13 + 2 + 2);

        let stoch_raw = IndicatorParams::Stochastic {
            period: 14,
            k_period: 1,
            d_period: 3,
        };
        assert_eq!(stoch_raw.warmup(), 15);
    }

    #[test]
    fn test_reject_non_positive_period() {
        let err = IndicatorParams::from_map(IndicatorKind::Sma, &params(&[("period", 0.0)]));
        assert!(matches!(err, Err(OverlayError::InvalidParameter { .. })));

        let err = IndicatorParams::from_map(IndicatorKind::Rsi, &params(&[("period", -3.0)]));
        assert!(matches!(err, Err(OverlayError::InvalidParameter { .. })));

        let err = IndicatorParams::from_map(IndicatorKind::Ema, &params(&[("period", 2.5)]));
        assert!(matches!(err, Err(OverlayError::InvalidParameter { .. })));
    }

    #[test]
    fn test_reject_period_above_limit() {
        let err = IndicatorParams::from_map(
            IndicatorKind::Macd,
            &params(&[("fastPeriod", 12.0), ("slowPeriod", 1e19), ("signalPeriod", 1e19)]),
        );
        assert!(matches!(
            err,
            Err(OverlayError::InvalidParameter { ref name, .. }) if name == "slowPeriod"
        ));

        let err = IndicatorParams::from_map(IndicatorKind::Rsi, &params(&[("period", 201.0)]));
        assert!(matches!(err, Err(OverlayError::InvalidParameter { .. })));
        let max = IndicatorParams::from_map(IndicatorKind::Rsi, &params(&[("period", 200.0)]));
        assert!(max.is_ok());

        let typed = IndicatorParams::Stochastic {
            period: 14,
            k_period: 51,
            d_period: 3,
        };
        assert!(typed.validate().is_err());
    }

    #[test]
    fn test_warmup_saturates() {
        let macd = IndicatorParams::Macd {
            fast_period: 12,
            slow_period: usize::MAX,
            signal_period: usize::MAX,
        };
        assert_eq!(macd.warmup(), usize::MAX);

        let stoch = IndicatorParams::Stochastic {
            period: usize::MAX,
            k_period: usize::MAX,
            d_period: usize::MAX,
        };
        assert_eq!(stoch.warmup(), usize::MAX);
    }

    #[test]
    fn test_reject_non_positive_std_dev() {
        let err = IndicatorParams::from_map(
            IndicatorKind::BollingerBands,
            &params(&[("period", 20.0), ("stdDev", 0.0)]),
        );
        assert!(matches!(err, Err(OverlayError::InvalidParameter { .. })));

        let err = IndicatorParams::from_map(
            IndicatorKind::BollingerBands,
            &params(&[("period", 20.0), ("stdDev", f64::NAN)]),
        );
        assert!(matches!(err, Err(OverlayError::InvalidParameter { .. })));
    }

    #[test]
    fn test_missing_and_unknown_params() {
        let err = IndicatorParams::from_map(IndicatorKind::Macd, &params(&[("fastPeriod", 12.0)]));
        assert_eq!(
            err,
            Err(OverlayError::MissingParameter {
                kind: IndicatorKind::Macd,
                name: "slowPeriod"
            })
        );

        let err = IndicatorParams::from_map(
            IndicatorKind::Sma,
            &params(&[("period", 10.0), ("length", 3.0)]),
        );
        assert!(matches!(err, Err(OverlayError::UnknownParameter { .. })));
    }

    #[test]
    fn test_exclusive_kinds() {
        let exclusive: Vec<_> = IndicatorKind::all()
            .into_iter()
            .filter(|k| k.is_exclusive())
            .collect();
        assert_eq!(
            exclusive,
            vec![IndicatorKind::Rsi, IndicatorKind::Macd, IndicatorKind::Stochastic]
        );
        assert_eq!(IndicatorKind::Stochastic.pane().map(|p| p.scale_id()), Some("stoch"));
    }

    #[test]
    fn test_available_indicators_labels() {
        let available = available_indicators();
        assert_eq!(available.len(), 6);
        assert_eq!(available[0], (IndicatorKind::Sma, "Simple Moving Average (SMA)"));
        assert_eq!(IndicatorKind::from_key("bollinger"), Some(IndicatorKind::BollingerBands));
        assert_eq!(IndicatorKind::from_key("vwap"), None);
    }

    #[test]
    fn test_param_specs() {
        let specs = IndicatorKind::BollingerBands.param_specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].label, "Standard Deviation");
        assert_eq!(specs[1].step, 0.1);
        assert_eq!(specs[0].max, 200.0);
    }

    #[test]
    fn test_config_serde_uses_type_field() {
        let config = IndicatorConfig {
            id: "rsi_1".to_string(),
            kind: IndicatorKind::Rsi,
            params: IndicatorKind::Rsi.default_params(),
            color: "#fff".to_string(),
            enabled: true,
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["type"], "RSI");
        assert_eq!(json["params"]["period"], 14.0);
    }
}

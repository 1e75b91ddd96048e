//! Error types for the chart core.
//!
//! Configuration problems are reported synchronously and never mutate
//! overlay state. Render failures come from the chart collaborator and are
//! contained per indicator by the overlay manager. Insufficient candle data
//! is not an error at all: indicators simply produce empty output.

use thiserror::Error;

use crate::chart::IndicatorKind;

/// Configuration errors raised by indicator parameters and overlay operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlayError {
    /// A parameter is outside its allowed domain.
    #[error("invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: String,
        value: f64,
        reason: &'static str,
    },

    /// A parameter required by the indicator kind is absent.
    #[error("missing parameter {name} for {kind}")]
    MissingParameter {
        kind: IndicatorKind,
        name: &'static str,
    },

    /// The parameter mapping contains a name the kind does not know.
    #[error("unknown parameter {name} for {kind}")]
    UnknownParameter { kind: IndicatorKind, name: String },

    /// Another enabled indicator already owns this kind's dedicated pane.
    #[error("duplicate exclusive indicator: only one {0} can be enabled at a time")]
    DuplicateExclusive(IndicatorKind),

    /// No indicator with this id is configured.
    #[error("unknown indicator id {0}")]
    UnknownIndicator(String),
}

/// Failures reported by the chart rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The underlying chart has been disposed.
    #[error("chart has been disposed")]
    ChartDisposed,

    /// The series handle is not (or no longer) known to the chart.
    #[error("unknown series handle {0}")]
    UnknownSeries(u64),

    /// The chart refused the request.
    #[error("chart rejected request: {0}")]
    Rejected(String),
}

/// Errors from the backtest REST client.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend answered with an error payload.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for configuration results.
pub type Result<T> = std::result::Result<T, OverlayError>;

//! Graph-subsystem error type.

use thiserror::Error;

use tg_core::Mode;

/// Errors produced by `tg-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown mode: {0}")]
    UnknownMode(Mode),

    #[error("no edge matching source={from}, target={target}, key={key:?}")]
    UnknownEdge {
        from: String,
        target: String,
        key: Option<String>,
    },

    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    #[error("no path from {from} to {target} in mode {mode}")]
    NoPath {
        mode: Mode,
        from: String,
        target: String,
    },

    #[error("source or target stop not found: {0}")]
    BadRequest(String),

    #[error("no transit edges available for nearest-edge lookup")]
    NoTransitEdges,

    #[error("failed to load GTFS feed: {0}")]
    Feed(#[from] tg_gtfs::FeedError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type GraphResult<T> = Result<T, GraphError>;

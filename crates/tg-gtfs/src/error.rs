//! GTFS-loading error type.

use thiserror::Error;

/// Errors produced while loading and narrowing a GTFS archive.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed has no stops left after narrowing to a single service date,
    /// and the unnarrowed fallback also had none.
    #[error("GTFS feed at {path} has no stops after date filtering")]
    Invalid { path: String },

    #[error("failed to read GTFS feed: {0}")]
    Gtfs(#[from] gtfs_structures::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;

//! Incident-subsystem error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IncidentError {
    #[error("incident source unavailable: {0}")]
    SourceUnavailable(String),

    #[error(transparent)]
    Graph(#[from] tg_graph::GraphError),
}

pub type IncidentResult<T> = Result<T, IncidentError>;

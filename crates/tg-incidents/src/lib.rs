//! `tg-incidents` — the periodic incident-impact loop: aggregates
//! reported incidents into per-edge weight multipliers and drives them
//! through [`tg_graph::GraphStore::update_edge`].
//!
//! # Crate layout
//!
//! | Module    | Contents                                          |
//! |-----------|-----------------------------------------------------|
//! | [`model`] | `Incident` — the external incident store's record  |
//! | [`source`]| `IncidentSource` trait + a static test/demo source  |
//! | [`loop_`] | `IncidentImpactLoop` — the polling task itself      |
//! | [`error`] | `IncidentError`, `IncidentResult<T>`                |

pub mod error;
pub mod loop_;
pub mod model;
pub mod source;

pub use error::{IncidentError, IncidentResult};
pub use loop_::IncidentImpactLoop;
pub use model::Incident;
pub use source::{IncidentSource, StaticIncidentSource};

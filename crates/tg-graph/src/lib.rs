//! `tg-graph` — graph construction, the concurrent graph store, router,
//! nearest-edge index, and event bus for the transit graph engine.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                         |
//! |-------------|--------------------------------------------------------------------|
//! | [`config`]  | `EngineConfig`, incident rules, the edge "impacted" epsilon        |
//! | [`model`]   | Plain data shared between the loader, builder, and store           |
//! | [`builder`] | Per-mode transit/walking/bike graph construction + connectivity repair |
//! | [`store`]   | `GraphStore`, `ModeGraph`, `EdgeRecord` — the concurrent core       |
//! | [`nearest`] | `NearestEdgeIndex` — R-tree nearest-transit-edge lookup             |
//! | [`router`]  | `plan_route` — Dijkstra + incident-aware rerouting                  |
//! | [`events`]  | `EventBus`, `Subscriber` — bounded, lossy event fan-out             |
//! | [`schema`]  | Wire message and request/response shapes                           |
//! | [`error`]   | `GraphError`, `GraphResult<T>`                                      |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                         |
//! |------------|------------------------------------------------------------------|
//! | `parallel` | Parallelizes connectivity-repair candidate search with Rayon.   |

pub mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod nearest;
pub mod router;
pub mod schema;
pub mod store;

pub use config::EngineConfig;
pub use error::{GraphError, GraphResult};
pub use events::{Event, EventBus, Subscriber};
pub use model::BikeParking;
pub use nearest::{Found, NearestEdgeIndex};
pub use store::{EdgeRecord, GraphStore, ModeGraph};

//! `tg-core` — foundational types for the transit graph engine.
//!
//! This crate is a dependency of every other `tg-*` crate. It intentionally
//! has no `tg-*` dependencies and minimal external ones (only `thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                  |
//! |-----------|--------------------------------------------|
//! | [`ids`]   | `NodeId`, `EdgeId` (internal graph indices) |
//! | [`geo`]   | `GeoPoint`, haversine distance              |
//! | [`mode`]  | `Mode` enum (GTFS route types + foot/bike)  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod geo;
pub mod ids;
pub mod mode;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use geo::{haversine_km, GeoPoint};
pub use ids::{EdgeId, NodeId};
pub use mode::Mode;

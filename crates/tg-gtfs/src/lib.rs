//! `tg-gtfs` — GTFS archive loading, narrowed to a single service date.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                |
//! |------------|----------------------------------------------------------|
//! | [`loader`] | `load_feed`, `LoadedFeed`, `StopRecord`, `TripSegment`  |
//! | [`error`]  | `FeedError`, `FeedResult<T>`                            |

pub mod error;
pub mod loader;

pub use error::{FeedError, FeedResult};
pub use loader::{load_feed, LoadedFeed, StopRecord, TripSegment};

//! Core primitives for a Galaxio match client: typed world model, snapshot
//! decoding, per-tick decision computation and outbound action encoding.
//!
//! Everything in this crate is transport-free so the runner binary and tests
//! can share the same state model without a live connection.

pub mod action;
pub mod session;
pub mod snapshot;
pub mod strategy;
pub mod world;

pub use action::{PlayerAction, PlayerActions};
pub use session::Session;
pub use snapshot::{decode_snapshot, SnapshotError};
pub use strategy::{RandomHeadingStrategy, Strategy, MIN_ACTION_INTERVAL};

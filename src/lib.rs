//! daytrack — a multi-panel day-planning board with drag-and-drop
//! reconciliation and realtime sync.
//!
//! The crate splits into four layers:
//! - [`store`] — the normalized entity store shared by both sides
//! - [`drag`] — the per-gesture drag engine: target resolution, preview,
//!   commit reconciliation, and grid placement
//! - [`sync`] — the wire protocol and the optimistic, transport-agnostic
//!   sync client
//! - [`server`] — the authoritative WebSocket relay with SQLite persistence

pub mod drag;
pub mod errors;
pub mod server;
pub mod store;
pub mod sync;

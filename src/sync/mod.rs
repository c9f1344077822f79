//! Client/server synchronization: the wire protocol and the optimistic
//! sync client.

pub mod client;
pub mod protocol;

pub use client::SyncClient;
pub use protocol::{ClientEvent, ServerEvent};

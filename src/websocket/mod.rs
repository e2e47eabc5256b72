//! WebSocket module for the live tick stream

mod client;
mod connection;
mod reconnect;

pub use client::{Inbound, WebSocketClient};
pub use connection::{ConnectionSettings, ConnectionState, StreamConnection};
pub use reconnect::{Backoff, ReconnectPolicy, ReconnectSettings};

//! Hustings Network Library
//!
//! Provides TCP transport for Hustings rooms.
//!
//! # Architecture
//!
//! - **Server**: accepts host and participant connections and binds them to rooms
//! - **Client**: creates or joins a room
//! - **Protocol**: Length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! // Start a server over a shared registry
//! let server = Server::start(addr, registry, None).await?;
//!
//! // A host opens a room, a participant joins it
//! let host = Client::create_room(server.addr()).await?;
//! let player = Client::join_room(server.addr(), &host.code, "ana", json!({})).await?;
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{Client, HostClient, ParticipantClient};
pub use error::{Error, Result};
pub use protocol::{ClientMessage, ServerMessage};
pub use server::{IdleSweep, Server};

/// Default port for Hustings servers
pub const DEFAULT_PORT: u16 = 7420;

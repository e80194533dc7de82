//! Mapped string handshake for netszr.
//!
//! Before any mapped string can be decoded, both peers must hold the same
//! string table. This crate synchronizes it when a channel connects:
//!
//! 1. **Server registry** ([`HandshakeServer`]): one pending record per
//!    channel, completion signalled through a [`HandshakeWaiter`]
//! 2. **Client state machine** ([`HandshakeClient`]): cache lookup,
//!    package verification and adoption
//! 3. **Drivers** ([`serve`], [`connect`]): run either side over any
//!    [`Connection`](netszr_transport::Connection)
//!
//! # How it fits in the stack
//!
//! ```text
//! Serializer (above)  ← needs a frozen string table on both peers
//!     ↕
//! Handshake Layer (this crate)  ← agrees on that table per channel
//!     ↕
//! Protocol + Transport (below)  ← message frames over a channel
//! ```

mod client;
mod config;
mod driver;
mod error;
mod server;

pub use client::HandshakeClient;
pub use config::HandshakeConfig;
pub use driver::{connect, serve};
pub use error::HandshakeError;
pub use server::{HandshakeServer, HandshakeWaiter};

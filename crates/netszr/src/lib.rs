//! # netszr
//!
//! Deterministic wire serialization for client/server game traffic.
//!
//! Strings that both peers know are sent as small indices into a shared
//! table. The table is agreed on per connection by a short handshake and
//! cached on the client, so reconnecting to the same server costs one
//! round trip.
//!
//! ## Layers
//!
//! | crate                | role                                            |
//! |----------------------|-------------------------------------------------|
//! | `netszr-transport`   | [`Connection`](transport::Connection) trait     |
//! | `netszr-wire`        | varints, NaN-safe floats, math types            |
//! | `netszr-strings`     | string dictionary, package, cache               |
//! | `netszr-protocol`    | handshake frames                                |
//! | `netszr-handshake`   | handshake state machines and drivers            |
//! | `netszr-serializer`  | type table and object serializer                |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use netszr::prelude::*;
//!
//! # async fn run() -> Result<(), NetszrError> {
//! let config = NetszrConfig::default();
//! let dict = Arc::new(MappedStringDict::default());
//! dict.add_strings(["textures/metal_wall"], "prototypes")?;
//! let table = Arc::new(TypeTableBuilder::new().build()?);
//!
//! let server = NetServer::new(dict, Arc::clone(&table), &config)?;
//! let (server_end, client_end) = netszr::transport::memory::pair();
//!
//! let (accepted, client) = tokio::join!(
//!     server.accept(&server_end),
//!     connect_client(&client_end, table, &config),
//! );
//! accepted?;
//! let client = client?;
//!
//! send_object(&server_end, server.serializer(), &String::from("wall")).await?;
//! let object = recv_object(&client_end, &client).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod peer;
mod telemetry;

pub use config::NetszrConfig;
pub use error::NetszrError;
pub use peer::{NetServer, connect_client, recv_object, send_object};
pub use telemetry::init_tracing;

pub use netszr_handshake as handshake;
pub use netszr_protocol as protocol;
pub use netszr_serializer as serializer;
pub use netszr_strings as strings;
pub use netszr_transport as transport;
pub use netszr_wire as wire;

/// The types most programs need.
pub mod prelude {
    pub use crate::{
        NetServer, NetszrConfig, NetszrError, connect_client, init_tracing, recv_object,
        send_object,
    };
    pub use netszr_serializer::{
        BinarySerializer, Codec, NetObject, NetSerializable, TypeTable, TypeTableBuilder,
    };
    pub use netszr_strings::{MappedStringDict, StringsConfig};
    pub use netszr_transport::Connection;
}

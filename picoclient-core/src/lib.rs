//! # PicoClient Core
//!
//! Pure `no_std` MQTT 3.1.1 client core library.
//!
//! This library contains the client state machine, the incremental packet
//! parser, the packet encoder and the in-flight request table. It is
//! platform-agnostic and has no async runtime dependencies: the surrounding
//! transport (TCP socket, cellular modem stack, ...) drives it through
//! [`PicoClient::transport_event`] and is driven back through the
//! [`Transport`] trait.
//!
//! ## Features
//!
//! - **no_std** compatible - Fully embedded, no standard library
//! - **MQTT 3.1.1** compliant - Protocol name "MQTT", level 4, QoS 0/1/2
//! - **Heapless** - All stack/static allocation, no heap usage
//! - **Generic transport** - Works with any byte-oriented connection
//! - **Configurable** - Compile-time capacities via const generics
//! - **Non-blocking** - Operations enqueue into a tx ring and return
//!
//! ## Limitations
//!
//! - No TLS
//! - No MQTT 5.0
//! - No persistent sessions (clean session is always requested)
//! - No automatic reconnect

#![no_std]

pub mod buffer;
pub mod client;
pub mod error;
pub mod event;
pub mod parser;
pub mod protocol;
pub mod request;
pub mod session;
pub mod time;
pub mod transport;

// Convenience re-exports
pub use buffer::RingBuffer;
pub use client::{ClientInfo, PicoClient, Will};
pub use error::{ClientError, Result};
pub use event::{ConnectStatus, Event, EventHandler, OpResult};
pub use session::ConnState;
pub use time::{DummyTimeSource, TimeSource};
pub use transport::{Transport, TransportError, TransportEvent};

// Protocol re-exports
pub use protocol::packet_type::PacketType;
pub use protocol::qos::QoS;

/// Interval between transport poll ticks, in milliseconds.
///
/// The transport adapter delivers [`TransportEvent::Poll`] at this cadence
/// while a connection exists; the keep-alive timer counts these ticks.
pub const POLL_INTERVAL_MS: u32 = 500;

//! # PicoClient Tokio
//!
//! Tokio runtime support for PicoClient.
//!
//! This crate bridges the `no_std` client core onto `tokio::net`: a driver
//! task owns the TCP stream and feeds receive fragments, send completions,
//! poll ticks and close events into the client, while the application talks
//! to the shared client handle. It re-exports all types from
//! `picoclient-core` for convenience.
//!
//! Note: the client is shared behind `std::sync::Mutex` instead of
//! `tokio::sync::Mutex` because:
//! 1. The lock is held very briefly (bounded, non-blocking state machine
//!    work per event)
//! 2. Event handlers run synchronously under the lock, matching the core's
//!    serialization contract
//! 3. It keeps the core free of async runtime types

mod driver;
mod time;
mod transport;

// Re-export core for convenience
pub use picoclient_core::*;

pub use time::StdTimeSource;
pub use transport::TokioTransport;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const DEFAULT_TX_BUFFER_LEN: usize = 1024;
const DEFAULT_RX_BUFFER_LEN: usize = 1024;
const DEFAULT_MAX_REQUESTS: usize = 8;

/// A PicoClient wired to the tokio transport.
///
/// The connection parameters are borrowed for the connection's lifetime, so
/// the driver task requires them to be `'static` (typically a `static`
/// `ClientInfo` or a leaked allocation).
pub type TokioClient<H, const TX_LEN: usize, const RX_LEN: usize, const MAX_REQUESTS: usize> =
    PicoClient<'static, TokioTransport, H, StdTimeSource, TX_LEN, RX_LEN, MAX_REQUESTS>;

/// Shared handle to a [`TokioClient`]; the driver task holds a clone.
pub type SharedClient<H, const TX_LEN: usize, const RX_LEN: usize, const MAX_REQUESTS: usize> =
    Arc<Mutex<TokioClient<H, TX_LEN, RX_LEN, MAX_REQUESTS>>>;

pub type DefaultTokioClient<H> =
    TokioClient<H, DEFAULT_TX_BUFFER_LEN, DEFAULT_RX_BUFFER_LEN, DEFAULT_MAX_REQUESTS>;

pub type DefaultSharedClient<H> =
    SharedClient<H, DEFAULT_TX_BUFFER_LEN, DEFAULT_RX_BUFFER_LEN, DEFAULT_MAX_REQUESTS>;

/// Create a client and spawn its connection driver task.
///
/// Returns the shared client handle plus the driver's join handle. The
/// driver runs until every client handle outside of it is dropped; dial,
/// send and close requests reach it through the transport command channel.
pub fn spawn_client<H, const TX_LEN: usize, const RX_LEN: usize, const MAX_REQUESTS: usize>() -> (
    SharedClient<H, TX_LEN, RX_LEN, MAX_REQUESTS>,
    JoinHandle<()>,
)
where
    H: EventHandler + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let client = Arc::new(Mutex::new(PicoClient::new(
        TokioTransport::new(command_tx),
        StdTimeSource,
    )));
    let driver = tokio::spawn(driver::driver_task(client.clone(), command_rx));
    (client, driver)
}

//! Tokio transport handle
//!
//! Implements the core's [`Transport`] trait as a handle onto the driver
//! task's command channel. Every operation is a non-blocking enqueue, which
//! keeps the trait callable from inside the client lock.

use bytes::Bytes;
use picoclient_core::{Transport, TransportError};
use tokio::sync::mpsc;

/// Commands sent from the client to the connection driver task.
#[derive(Debug)]
pub(crate) enum TransportCmd {
    Dial { host: String, port: u16 },
    Send(Bytes),
    Close,
}

/// Command-channel handle onto the tokio connection driver.
pub struct TokioTransport {
    commands: mpsc::UnboundedSender<TransportCmd>,
}

impl TokioTransport {
    pub(crate) fn new(commands: mpsc::UnboundedSender<TransportCmd>) -> Self {
        Self { commands }
    }
}

impl Transport for TokioTransport {
    fn dial(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        self.commands
            .send(TransportCmd::Dial {
                host: host.to_owned(),
                port,
            })
            .map_err(|_| TransportError::Failed)
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        // The ring buffer may be overwritten once the send completes, so
        // the driver gets its own copy of the bytes
        self.commands
            .send(TransportCmd::Send(Bytes::copy_from_slice(data)))
            .map_err(|_| TransportError::Failed)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.commands
            .send(TransportCmd::Close)
            .map_err(|_| TransportError::Failed)
    }

    fn is_attached(&self) -> bool {
        true
    }
}

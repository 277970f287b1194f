//! Transport abstraction
//!
//! The core never touches sockets. An adapter implements [`Transport`] for
//! the outgoing direction (dial, queue bytes for send, close) and feeds
//! [`TransportEvent`]s back into [`crate::PicoClient::transport_event`].
//! Every outgoing call is non-blocking; completion is reported through the
//! matching event.

/// Error enumeration for transport operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The underlying network is not attached/available.
    NotAttached,
    /// No connection exists for the requested operation.
    NotConnected,
    /// The transport refused or failed the request.
    Failed,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransportError::NotAttached => write!(f, "Network not attached"),
            TransportError::NotConnected => write!(f, "No active connection"),
            TransportError::Failed => write!(f, "Transport operation failed"),
        }
    }
}

impl core::error::Error for TransportError {}

/// Byte-oriented connection driver consumed by the client core.
pub trait Transport {
    /// Start a non-blocking TCP dial. Completion arrives as
    /// [`TransportEvent::Connected`] or [`TransportEvent::ConnectFailed`].
    fn dial(&mut self, host: &str, port: u16) -> Result<(), TransportError>;

    /// Queue bytes for transmission. The buffer must stay untouched until
    /// [`TransportEvent::Sent`] confirms the transfer, which is why the
    /// client sends straight out of its tx ring and skips it afterwards.
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Request a non-blocking close. Completion arrives as
    /// [`TransportEvent::Closed`].
    fn close(&mut self) -> Result<(), TransportError>;

    /// Whether the underlying network is attached and able to dial.
    fn is_attached(&self) -> bool;

    /// Flow-control acknowledgement that `len` received bytes were
    /// consumed. Adapters without receive windowing can ignore this.
    fn recv_complete(&mut self, len: usize) {
        let _ = len;
    }
}

/// Connection events delivered by the transport adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent<'a> {
    /// TCP connection established; the client sends CONNECT in response.
    Connected,
    /// The dial failed before a connection existed.
    ConnectFailed,
    /// A fragment of received bytes.
    Received(&'a [u8]),
    /// A previously queued send finished (or failed).
    Sent { len: usize, ok: bool },
    /// Periodic tick, every [`crate::POLL_INTERVAL_MS`] milliseconds while
    /// a connection exists.
    Poll,
    /// The connection is gone. `forced` is set when the close was locally
    /// requested rather than initiated by the peer.
    Closed { forced: bool },
}

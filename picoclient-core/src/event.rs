//! Application event surface

use crate::error::ClientError;
use crate::protocol::qos::QoS;

/// Result carried by request completion events.
pub type OpResult = core::result::Result<(), ClientError>;

/// CONNACK outcome reported with [`Event::Connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    /// Connection accepted by the server.
    Accepted,
    /// Server does not support the requested protocol level.
    RefusedProtocolVersion,
    /// Client identifier rejected.
    RefusedIdentifier,
    /// Server unavailable.
    RefusedServerUnavailable,
    /// Bad username or password.
    RefusedBadCredentials,
    /// Client not authorized.
    RefusedNotAuthorized,
    /// The TCP connection could not be established at all.
    TcpFailed,
    /// The server answered with a return code outside the MQTT 3.1.1 set.
    ProtocolError,
}

impl ConnectStatus {
    /// Map the CONNACK return code byte, surfacing unknown codes explicitly
    /// instead of trusting the wire.
    pub const fn from_return_code(code: u8) -> Self {
        match code {
            0 => ConnectStatus::Accepted,
            1 => ConnectStatus::RefusedProtocolVersion,
            2 => ConnectStatus::RefusedIdentifier,
            3 => ConnectStatus::RefusedServerUnavailable,
            4 => ConnectStatus::RefusedBadCredentials,
            5 => ConnectStatus::RefusedNotAuthorized,
            _ => ConnectStatus::ProtocolError,
        }
    }
}

/// Events delivered to the application handler.
///
/// Handlers run on whichever thread delivered the originating transport
/// event, with the client lock held: they must not block and must not call
/// back into the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// MQTT connect handshake finished (or failed to start).
    Connect { status: ConnectStatus },

    /// Connection closed. `is_accepted` is true when the close ended a
    /// session that reached the connected state (or a locally requested
    /// disconnect), mirroring the state the connection was in right before
    /// the close - a dropped live session still reports `true`.
    Disconnect { is_accepted: bool },

    /// Publish received from the server.
    PublishRecv {
        topic: &'a str,
        payload: &'a [u8],
        qos: QoS,
        dup: bool,
    },

    /// Outgoing publish completed (acknowledged, confirmed sent for QoS 0,
    /// or failed).
    Publish { arg: usize, res: OpResult },

    /// Subscribe completed.
    Subscribe { arg: usize, res: OpResult },

    /// Unsubscribe completed.
    Unsubscribe { arg: usize, res: OpResult },

    /// PINGRESP received from the server.
    KeepAlive,
}

/// Receiver for client events.
pub trait EventHandler {
    fn on_event(&mut self, event: Event<'_>);
}

impl<F> EventHandler for F
where
    F: FnMut(Event<'_>),
{
    fn on_event(&mut self, event: Event<'_>) {
        self(event)
    }
}

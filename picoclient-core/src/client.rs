//! MQTT client facade
//!
//! [`PicoClient`] ties the state machine and the incremental parser
//! together behind the application-facing API. All mutation happens inside
//! [`PicoClient::transport_event`] or one of the public operations; the
//! surrounding runtime must serialize those calls (the tokio adapter wraps
//! the whole client in a mutex).

use crate::error::ClientError;
use crate::event::EventHandler;
use crate::parser::{Frame, Parser};
use crate::protocol::qos::QoS;
use crate::session::{ConnState, Session};
use crate::time::TimeSource;
use crate::transport::{Transport, TransportEvent};

/// Last-will message registered with the server at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Will<'a> {
    pub topic: &'a str,
    pub message: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
}

/// Connection parameters, borrowed for the lifetime of the connection.
///
/// The client keeps a reference to this structure from `connect` until the
/// connection is closed; the caller guarantees it stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInfo<'a> {
    /// Client identifier, must be non-empty.
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub will: Option<Will<'a>>,
    /// Keep-alive period in seconds; 0 disables the PINGREQ handshake.
    pub keep_alive_secs: u16,
    /// When set, pending requests older than this many milliseconds are
    /// failed during poll ticks. `None` disables timeout enforcement.
    pub request_timeout_ms: Option<u32>,
}

impl<'a> ClientInfo<'a> {
    /// Parameters with a 60 second keep-alive and no credentials, will or
    /// request timeout.
    pub const fn new(client_id: &'a str) -> Self {
        Self {
            client_id,
            username: None,
            password: None,
            will: None,
            keep_alive_secs: 60,
            request_timeout_ms: None,
        }
    }
}

/// MQTT 3.1.1 client core.
///
/// # Generic Parameters
///
/// - `T`: Transport driving the byte-oriented connection
/// - `H`: Application event handler
/// - `S`: Time source for request timeout stamps
/// - `TX_LEN`: Transmit ring buffer capacity in bytes
/// - `RX_LEN`: Receive reassembly buffer capacity in bytes
/// - `MAX_REQUESTS`: In-flight request table capacity
///
/// The client is purely event-driven: the transport adapter feeds
/// [`TransportEvent`]s in, the client queues bytes through [`Transport`]
/// and reports progress through [`crate::Event`]s. Event handlers run
/// synchronously inside those calls and must not call back into the
/// client.
pub struct PicoClient<
    'a,
    T,
    H,
    S,
    const TX_LEN: usize,
    const RX_LEN: usize,
    const MAX_REQUESTS: usize,
> where
    T: Transport,
    H: EventHandler,
    S: TimeSource,
{
    session: Session<'a, T, H, S, TX_LEN, MAX_REQUESTS>,
    parser: Parser<RX_LEN>,
    arg: usize,
}

impl<'a, T, H, S, const TX_LEN: usize, const RX_LEN: usize, const MAX_REQUESTS: usize>
    PicoClient<'a, T, H, S, TX_LEN, RX_LEN, MAX_REQUESTS>
where
    T: Transport,
    H: EventHandler,
    S: TimeSource,
{
    /// Create a new client in the disconnected state.
    pub fn new(transport: T, time_source: S) -> Self {
        Self {
            session: Session::new(transport, time_source),
            parser: Parser::new(),
            arg: 0,
        }
    }

    /// Connect to an MQTT server.
    ///
    /// Starts a non-blocking TCP dial; once the transport reports the
    /// connection active, the CONNECT packet is sent automatically and the
    /// outcome arrives as [`crate::Event::Connect`]. Fails when the client
    /// is not disconnected, the network is not attached, or `info` carries
    /// an empty client id.
    pub fn connect(
        &mut self,
        host: &str,
        port: u16,
        handler: H,
        info: &'a ClientInfo<'a>,
    ) -> Result<(), ClientError> {
        self.session.connect(host, port, handler, info)
    }

    /// Request a disconnect. Pending requests are failed once the
    /// transport confirms the close.
    pub fn disconnect(&mut self) -> Result<(), ClientError> {
        self.session.disconnect()
    }

    /// Subscribe to a topic. Completion arrives as
    /// [`crate::Event::Subscribe`] carrying `arg`.
    pub fn subscribe(&mut self, topic: &str, qos: QoS, arg: usize) -> Result<(), ClientError> {
        self.session.sub_unsub(topic, qos, arg, true)
    }

    /// Unsubscribe from a topic. Completion arrives as
    /// [`crate::Event::Unsubscribe`] carrying `arg`.
    pub fn unsubscribe(&mut self, topic: &str, arg: usize) -> Result<(), ClientError> {
        self.session.sub_unsub(topic, QoS::AtMostOnce, arg, false)
    }

    /// Publish a message. Completion arrives as [`crate::Event::Publish`]
    /// carrying `arg`: for QoS 0 once the bytes are confirmed sent, for
    /// QoS 1/2 once the terminal acknowledgement arrives.
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
        arg: usize,
    ) -> Result<(), ClientError> {
        self.session.publish(topic, payload, qos, retain, arg)
    }

    /// Whether the MQTT handshake completed and the connection is usable.
    pub fn is_connected(&self) -> bool {
        self.session.state == ConnState::Connected
    }

    pub fn state(&self) -> ConnState {
        self.session.state
    }

    /// Attach a user argument to the client itself.
    pub fn set_arg(&mut self, arg: usize) {
        self.arg = arg;
    }

    pub fn get_arg(&self) -> usize {
        self.arg
    }

    pub fn transport(&self) -> &T {
        &self.session.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.session.transport
    }

    /// Deliver a transport event to the state machine.
    ///
    /// This is the single entry point for the transport adapter; events
    /// must arrive in the order the transport observed them.
    pub fn transport_event(&mut self, event: TransportEvent<'_>) {
        match event {
            TransportEvent::Connected => {
                self.parser.reset();
                self.session.on_connected();
            }
            TransportEvent::ConnectFailed => self.session.on_conn_error(),
            TransportEvent::Received(data) => self.on_recv(data),
            TransportEvent::Sent { len, ok } => self.session.on_sent(len, ok),
            TransportEvent::Poll => self.session.on_poll(),
            TransportEvent::Closed { forced } => {
                self.session.on_close(forced);
                self.parser.reset();
            }
        }
    }

    /// Feed a received fragment through the parser, dispatching every
    /// completed packet.
    fn on_recv(&mut self, data: &[u8]) {
        self.session.poll_time = 0;

        let mut pos = 0;
        while let Some(frame) = self.parser.feed(data, &mut pos) {
            match frame {
                Frame::Inline { hdr, start, len } => {
                    self.session.process_packet(hdr, &data[start..start + len]);
                }
                Frame::Buffered { hdr, len } => {
                    let session = &mut self.session;
                    session.process_packet(hdr, &self.parser.body()[..len]);
                }
            }
        }

        // Flow-control acknowledgement for the consumed fragment
        self.session.transport.recv_complete(data.len());
    }
}

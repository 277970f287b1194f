//! Client state machine
//!
//! Owns the connection state, the keep-alive timer, the in-flight request
//! table and the transmit ring. Parsed packets are dispatched here; the
//! application sees the outcome through [`Event`]s.

use log::{debug, trace, warn};

use crate::buffer::RingBuffer;
use crate::client::ClientInfo;
use crate::error::ClientError;
use crate::event::{ConnectStatus, Event, EventHandler};
use crate::protocol::{self, encoder, PacketType, QoS};
use crate::request::{RequestKind, RequestTable};
use crate::time::TimeSource;
use crate::transport::Transport;
use crate::POLL_INTERVAL_MS;

/// MQTT connection state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    #[default]
    Disconnected,
    /// TCP dial in progress.
    TcpConnecting,
    /// TCP up, CONNECT sent, awaiting CONNACK.
    MqttConnecting,
    /// CONNACK accepted; the client may publish and subscribe.
    Connected,
    /// Close requested, waiting for the transport to confirm.
    Disconnecting,
}

/// Connection state machine and bookkeeping.
///
/// Kept separate from the parser so a staged packet body can be dispatched
/// while the rest of the client mutates.
pub(crate) struct Session<'a, T, H, S, const TX: usize, const REQ: usize> {
    pub(crate) transport: T,
    pub(crate) time_source: S,
    pub(crate) state: ConnState,
    pub(crate) info: Option<&'a ClientInfo<'a>>,
    pub(crate) handler: Option<H>,
    pub(crate) tx_buff: RingBuffer<TX>,
    pub(crate) requests: RequestTable<REQ>,
    pub(crate) last_packet_id: u16,
    pub(crate) is_sending: bool,
    /// Bytes confirmed sent by the transport on this connection.
    pub(crate) sent_total: u32,
    /// Bytes handed to the transport for sending on this connection.
    pub(crate) written_total: u32,
    /// Poll ticks since the last transport activity.
    pub(crate) poll_time: u32,
}

impl<'a, T, H, S, const TX: usize, const REQ: usize> Session<'a, T, H, S, TX, REQ>
where
    T: Transport,
    H: EventHandler,
    S: TimeSource,
{
    pub(crate) fn new(transport: T, time_source: S) -> Self {
        Self {
            transport,
            time_source,
            state: ConnState::Disconnected,
            info: None,
            handler: None,
            tx_buff: RingBuffer::new(),
            requests: RequestTable::new(),
            last_packet_id: 0,
            is_sending: false,
            sent_total: 0,
            written_total: 0,
            poll_time: 0,
        }
    }

    fn emit(&mut self, event: Event<'_>) {
        if let Some(handler) = self.handler.as_mut() {
            handler.on_event(event);
        }
    }

    /// Next packet id; wraps 0xFFFF -> 1, never yields 0.
    fn create_packet_id(&mut self) -> u16 {
        self.last_packet_id = self.last_packet_id.wrapping_add(1);
        if self.last_packet_id == 0 {
            self.last_packet_id = 1;
        }
        self.last_packet_id
    }

    // ---- Outgoing operations (application -> client) ----

    pub(crate) fn connect(
        &mut self,
        host: &str,
        port: u16,
        handler: H,
        info: &'a ClientInfo<'a>,
    ) -> Result<(), ClientError> {
        if info.client_id.is_empty() {
            return Err(ClientError::Failed);
        }
        if !self.transport.is_attached() || self.state != ConnState::Disconnected {
            return Err(ClientError::Failed);
        }

        self.info = Some(info);
        self.handler = Some(handler);

        // Start a new connection in non-blocking mode
        self.transport.dial(host, port)?;
        self.state = ConnState::TcpConnecting;
        Ok(())
    }

    pub(crate) fn disconnect(&mut self) -> Result<(), ClientError> {
        self.close()
    }

    /// Request a non-blocking transport close.
    fn close(&mut self) -> Result<(), ClientError> {
        if self.state == ConnState::Disconnected || self.state == ConnState::Disconnecting {
            return Err(ClientError::Failed);
        }
        self.transport.close()?;
        self.state = ConnState::Disconnecting;
        Ok(())
    }

    pub(crate) fn sub_unsub(
        &mut self,
        topic: &str,
        qos: QoS,
        arg: usize,
        subscribe: bool,
    ) -> Result<(), ClientError> {
        if topic.is_empty() {
            return Err(ClientError::Failed);
        }
        if self.state != ConnState::Connected {
            return Err(ClientError::Closed);
        }

        // rem_len = 2 (topic length) + topic + 2 (packet id) + qos on subscribe
        let rem_len = 2 + topic.len() + 2 + usize::from(subscribe);
        if encoder::check_memory(&self.tx_buff, rem_len).is_none() {
            return Err(ClientError::OutOfMemory);
        }

        let packet_id = self.create_packet_id();
        let kind = if subscribe {
            RequestKind::Subscribe
        } else {
            RequestKind::Unsubscribe
        };
        let Some(index) = self.requests.create(kind, packet_id, arg) else {
            trace!("no free request slot for (un)subscribe");
            return Err(ClientError::OutOfMemory);
        };

        let packet_type = if subscribe {
            PacketType::Subscribe
        } else {
            PacketType::Unsubscribe
        };
        // SUBSCRIBE/UNSUBSCRIBE are sent at QoS 1, fixed by MQTT 3.1.1
        encoder::write_fixed_header(
            &mut self.tx_buff,
            packet_type,
            false,
            QoS::AtLeastOnce,
            false,
            rem_len,
        );
        encoder::write_u16(&mut self.tx_buff, packet_id);
        encoder::write_string(&mut self.tx_buff, topic);
        if subscribe {
            encoder::write_u8(&mut self.tx_buff, qos as u8);
        }

        self.requests
            .set_pending(index, self.time_source.now_millis());
        self.flush();
        Ok(())
    }

    pub(crate) fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
        arg: usize,
    ) -> Result<(), ClientError> {
        if topic.is_empty() {
            return Err(ClientError::Failed);
        }
        if self.state != ConnState::Connected {
            return Err(ClientError::Closed);
        }

        // rem_len = 2 (topic length) + topic + 2 (packet id, qos > 0 only) + payload
        let mut rem_len = 2 + topic.len() + payload.len();
        if qos != QoS::AtMostOnce {
            rem_len += 2;
        }

        let Some(raw_len) = encoder::check_memory(&self.tx_buff, rem_len) else {
            trace!("not enough memory to publish message");
            return Err(ClientError::OutOfMemory);
        };

        let packet_id = if qos != QoS::AtMostOnce {
            self.create_packet_id()
        } else {
            0
        };
        let Some(index) = self.requests.create(RequestKind::Publish, packet_id, arg) else {
            trace!("no free request slot to publish message");
            return Err(ClientError::OutOfMemory);
        };

        // QoS 0 gets no acknowledgement from the server; the publish
        // completes once this many bytes are confirmed sent
        self.requests.get_mut(index).expected_sent_len = self.written_total + raw_len as u32;

        encoder::write_fixed_header(&mut self.tx_buff, PacketType::Publish, false, qos, retain, rem_len);
        encoder::write_string(&mut self.tx_buff, topic);
        if qos != QoS::AtMostOnce {
            encoder::write_u16(&mut self.tx_buff, packet_id);
        }
        encoder::write_data(&mut self.tx_buff, payload);

        self.requests
            .set_pending(index, self.time_source.now_millis());
        self.flush();

        trace!("publish start, qos {}, packet id {}", qos as u8, packet_id);
        Ok(())
    }

    // ---- Incoming operations (transport -> client) ----

    /// TCP established: build and enqueue the CONNECT packet.
    pub(crate) fn on_connected(&mut self) {
        let Some(info) = self.info else {
            return;
        };

        let mut flags = protocol::CONNECT_FLAG_CLEAN_SESSION;

        // Variable header: protocol name (2 + 4) + level (1) + flags (1) +
        // keep alive (2), then the length-prefixed payload fields
        let mut rem_len = 10 + 2 + info.client_id.len();

        if let Some(will) = &info.will {
            flags |= protocol::CONNECT_FLAG_WILL;
            flags |= (will.qos as u8) << 3;
            if will.retain {
                flags |= protocol::CONNECT_FLAG_WILL_RETAIN;
            }
            rem_len += 2 + will.topic.len();
            rem_len += 2 + will.message.len();
        }
        if let Some(username) = info.username {
            flags |= protocol::CONNECT_FLAG_USERNAME;
            rem_len += 2 + username.len();
        }
        if let Some(password) = info.password {
            flags |= protocol::CONNECT_FLAG_PASSWORD;
            rem_len += 2 + password.len();
        }

        if encoder::check_memory(&self.tx_buff, rem_len).is_none() {
            warn!("no memory to write CONNECT packet");
            return;
        }

        encoder::write_fixed_header(
            &mut self.tx_buff,
            PacketType::Connect,
            false,
            QoS::AtMostOnce,
            false,
            rem_len,
        );
        encoder::write_string(&mut self.tx_buff, protocol::PROTOCOL_NAME);
        encoder::write_u8(&mut self.tx_buff, protocol::PROTOCOL_LEVEL);
        encoder::write_u8(&mut self.tx_buff, flags);
        encoder::write_u16(&mut self.tx_buff, info.keep_alive_secs);
        encoder::write_string(&mut self.tx_buff, info.client_id);
        if let Some(will) = &info.will {
            encoder::write_string(&mut self.tx_buff, will.topic);
            encoder::write_u16(&mut self.tx_buff, will.message.len() as u16);
            encoder::write_data(&mut self.tx_buff, will.message);
        }
        if let Some(username) = info.username {
            encoder::write_string(&mut self.tx_buff, username);
        }
        if let Some(password) = info.password {
            encoder::write_string(&mut self.tx_buff, password);
        }

        self.poll_time = 0;
        self.state = ConnState::MqttConnecting;
        self.flush();
    }

    /// Send completion from the transport.
    pub(crate) fn on_sent(&mut self, len: usize, ok: bool) {
        self.is_sending = false;
        self.sent_total += len as u32;
        self.poll_time = 0;

        // A failed transmit tears the connection down; pending requests
        // are failed from the close callback
        if !ok {
            let _ = self.close();
            return;
        }

        self.tx_buff.skip(len);

        // Drain QoS-0 publishes (packet id 0) whose bytes are now
        // confirmed on the wire, oldest slot first
        while let Some(index) = self.requests.find_pending(Some(0)) {
            if self.sent_total < self.requests.get(index).expected_sent_len {
                break;
            }
            let arg = self.requests.get(index).arg;
            self.requests.delete(index);
            self.emit(Event::Publish { arg, res: Ok(()) });
        }

        self.flush();
    }

    /// Periodic poll tick; drives keep-alive and request timeouts.
    pub(crate) fn on_poll(&mut self) {
        if self.state == ConnState::Disconnecting {
            return;
        }
        self.poll_time += 1;

        let Some(info) = self.info else {
            return;
        };

        // poll_time counts POLL_INTERVAL_MS units, keep_alive is seconds
        if info.keep_alive_secs > 0
            && self.poll_time * POLL_INTERVAL_MS >= info.keep_alive_secs as u32 * 1000
        {
            if encoder::check_memory(&self.tx_buff, 0).is_some() {
                encoder::write_fixed_header(
                    &mut self.tx_buff,
                    PacketType::PingReq,
                    false,
                    QoS::AtMostOnce,
                    false,
                    0,
                );
                self.flush();
                self.poll_time = 0;

                trace!("sending PINGREQ packet");
            } else {
                warn!("no memory to send PINGREQ packet");
            }
        }

        // Request timeouts are opt-in; the stamp is always taken
        if let Some(timeout_ms) = info.request_timeout_ms {
            let now = self.time_source.now_millis();
            for index in 0..self.requests.capacity() {
                let slot = *self.requests.get(index);
                if slot.pending && now.saturating_sub(slot.timeout_start) >= timeout_ms as u64 {
                    warn!("request timed out, packet id {}", slot.packet_id);
                    self.requests.delete(index);
                    self.fail_request(slot.kind, slot.arg);
                }
            }
        }
    }

    /// Connection gone: notify, fail every pending request, reset.
    ///
    /// `_forced` tells whether the close was locally requested; the
    /// outcome does not depend on it, only on the previous state.
    pub(crate) fn on_close(&mut self, _forced: bool) {
        let prev = self.state;

        self.state = ConnState::Disconnected;
        self.emit(Event::Disconnect {
            is_accepted: prev == ConnState::Connected || prev == ConnState::Disconnecting,
        });

        while let Some(index) = self.requests.find_pending(None) {
            let slot = *self.requests.get(index);
            self.requests.delete(index);
            self.fail_request(slot.kind, slot.arg);
        }
        self.requests.clear();

        self.is_sending = false;
        self.sent_total = 0;
        self.written_total = 0;
        self.tx_buff.reset();
    }

    /// Transport failed before a connection existed.
    pub(crate) fn on_conn_error(&mut self) {
        self.state = ConnState::Disconnected;
        self.emit(Event::Connect {
            status: ConnectStatus::TcpFailed,
        });
    }

    fn fail_request(&mut self, kind: RequestKind, arg: usize) {
        let event = match kind {
            RequestKind::Subscribe => Event::Subscribe {
                arg,
                res: Err(ClientError::Failed),
            },
            RequestKind::Unsubscribe => Event::Unsubscribe {
                arg,
                res: Err(ClientError::Failed),
            },
            RequestKind::Publish => Event::Publish {
                arg,
                res: Err(ClientError::Failed),
            },
        };
        self.emit(event);
    }

    // ---- Packet dispatch (parser -> state machine) ----

    /// Process one complete inbound packet.
    pub(crate) fn process_packet(&mut self, hdr: u8, body: &[u8]) {
        let Some(packet_type) = PacketType::from_header_byte(hdr) else {
            trace!("reserved packet type in header 0x{:02X}, ignored", hdr);
            return;
        };

        debug!("processing packet type {:?}", packet_type);

        match packet_type {
            PacketType::ConnAck => self.handle_connack(body),
            PacketType::Publish => self.handle_publish(hdr, body),
            PacketType::PingResp => {
                trace!("ping response received");
                self.emit(Event::KeepAlive);
            }
            PacketType::SubAck
            | PacketType::UnsubAck
            | PacketType::PubAck
            | PacketType::PubRec
            | PacketType::PubRel
            | PacketType::PubComp => self.handle_ack(packet_type, body),
            _ => {
                trace!("unhandled packet type {:?}, ignored", packet_type);
            }
        }
    }

    fn handle_connack(&mut self, body: &[u8]) {
        if body.len() < 2 {
            trace!("protocol violation: short CONNACK");
            return;
        }
        if self.state != ConnState::MqttConnecting {
            // Protocol violation here
            trace!("protocol violation: CONNACK received when already connected");
            return;
        }

        let status = ConnectStatus::from_return_code(body[1]);
        if status == ConnectStatus::Accepted {
            self.state = ConnState::Connected;
        }
        trace!("CONNACK received with result {:?}", status);

        self.emit(Event::Connect { status });
    }

    fn handle_publish(&mut self, hdr: u8, body: &[u8]) {
        let Some(qos) = QoS::from_u8((hdr >> 1) & 0x03) else {
            trace!("protocol violation: publish with qos 3");
            return;
        };
        let dup = (hdr >> 3) & 0x01 != 0;

        let mut offset = 0;
        let Ok(topic) = protocol::read_string(body, &mut offset) else {
            trace!("protocol violation: bad publish topic");
            return;
        };

        // Packet id is only present when quality of service is not 0
        let packet_id = if qos != QoS::AtMostOnce {
            if offset + 2 > body.len() {
                trace!("protocol violation: publish missing packet id");
                return;
            }
            let id = u16::from_be_bytes([body[offset], body[offset + 1]]);
            offset += 2;
            id
        } else {
            0
        };
        let payload = &body[offset..];

        debug!(
            "publish packet received, qos {}, packet id {}, payload {} bytes",
            qos as u8,
            packet_id,
            payload.len()
        );

        // QoS > 0 must be answered, PUBACK for QoS 1, PUBREC for QoS 2
        if qos != QoS::AtMostOnce {
            let resp_type = if qos == QoS::AtLeastOnce {
                PacketType::PubAck
            } else {
                PacketType::PubRec
            };
            self.write_ack_resp(resp_type, packet_id, qos);
        }

        self.emit(Event::PublishRecv {
            topic,
            payload,
            qos,
            dup,
        });
    }

    fn handle_ack(&mut self, packet_type: PacketType, body: &[u8]) {
        if body.len() < 2 {
            trace!("protocol violation: short {:?}", packet_type);
            return;
        }
        let packet_id = u16::from_be_bytes([body[0], body[1]]);

        match packet_type {
            PacketType::PubRec => {
                // Outgoing QoS 2, part 1 acknowledged; release follows.
                // PUBREL carries fixed header flags 0b0010
                self.write_ack_resp(PacketType::PubRel, packet_id, QoS::AtLeastOnce);
                return;
            }
            PacketType::PubRel => {
                // Inbound QoS 2, part 2; complete the exchange
                self.write_ack_resp(PacketType::PubComp, packet_id, QoS::AtMostOnce);
                return;
            }
            _ => {}
        }

        // Terminal acknowledgement: a pending request must exist for it
        let Some(index) = self.requests.find_pending(Some(packet_id)) else {
            trace!("protocol violation: received ACK without sent packet");
            return;
        };
        let slot = *self.requests.get(index);

        match packet_type {
            PacketType::SubAck => {
                // Return codes 0/1/2 grant the subscription, 0x80 refuses
                let res = if body.len() > 2 && body[2] < 3 {
                    Ok(())
                } else {
                    Err(ClientError::Failed)
                };
                self.emit(Event::Subscribe { arg: slot.arg, res });
            }
            PacketType::UnsubAck => {
                // UNSUBACK carries no return code; matching it is success
                self.emit(Event::Unsubscribe {
                    arg: slot.arg,
                    res: Ok(()),
                });
            }
            PacketType::PubAck | PacketType::PubComp => {
                self.emit(Event::Publish {
                    arg: slot.arg,
                    res: Ok(()),
                });
            }
            _ => {}
        }
        self.requests.delete(index);
    }

    /// Write and flush a 2-byte acknowledgement packet.
    fn write_ack_resp(&mut self, packet_type: PacketType, packet_id: u16, qos: QoS) -> bool {
        if encoder::check_memory(&self.tx_buff, 2).is_none() {
            trace!("no memory to write {:?} packet", packet_type);
            return false;
        }
        encoder::write_fixed_header(&mut self.tx_buff, packet_type, false, qos, false, 2);
        encoder::write_u16(&mut self.tx_buff, packet_id);
        self.flush();

        trace!("response {:?} written to output memory", packet_type);
        true
    }

    // ---- Send flush ----

    /// Hand the largest contiguous tx block to the transport, unless a send
    /// is already in flight.
    pub(crate) fn flush(&mut self) {
        if self.is_sending {
            return;
        }

        let len = self.tx_buff.linear_read().len();
        if len > 0 {
            match self.transport.send(self.tx_buff.linear_read()) {
                Ok(()) => {
                    self.written_total += len as u32;
                    self.is_sending = true;
                }
                Err(err) => {
                    warn!("cannot queue {} bytes for send: {}", len, err);
                }
            }
        } else {
            // Reset an empty ring so the next packet goes out in a single
            // contiguous send instead of two wrapped attempts
            self.tx_buff.reset();
        }
    }
}

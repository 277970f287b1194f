//! MQTT control packet types

/// Control packet type, carried in the high nibble of the fixed header
/// byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    /// Client connection request.
    Connect = 1,
    /// Server reply to a connection request.
    ConnAck = 2,
    /// Application message, flows in either direction.
    Publish = 3,
    /// QoS 1 publish acknowledgement.
    PubAck = 4,
    /// First leg of the QoS 2 handshake.
    PubRec = 5,
    /// Release leg of the QoS 2 handshake.
    PubRel = 6,
    /// Final leg of the QoS 2 handshake.
    PubComp = 7,
    /// Topic subscription request.
    Subscribe = 8,
    /// Server reply to a subscription request.
    SubAck = 9,
    /// Topic unsubscription request.
    Unsubscribe = 10,
    /// Server reply to an unsubscription request.
    UnsubAck = 11,
    /// Keep-alive probe.
    PingReq = 12,
    /// Server reply to a keep-alive probe.
    PingResp = 13,
    /// Clean shutdown notice.
    Disconnect = 14,
}

impl PacketType {
    /// Extract the packet type from the first byte of the fixed header.
    ///
    /// Nibble values 0 and 15 are reserved by MQTT 3.1.1 and yield `None`.
    pub const fn from_header_byte(byte: u8) -> Option<Self> {
        match byte >> 4 {
            1 => Some(PacketType::Connect),
            2 => Some(PacketType::ConnAck),
            3 => Some(PacketType::Publish),
            4 => Some(PacketType::PubAck),
            5 => Some(PacketType::PubRec),
            6 => Some(PacketType::PubRel),
            7 => Some(PacketType::PubComp),
            8 => Some(PacketType::Subscribe),
            9 => Some(PacketType::SubAck),
            10 => Some(PacketType::Unsubscribe),
            11 => Some(PacketType::UnsubAck),
            12 => Some(PacketType::PingReq),
            13 => Some(PacketType::PingResp),
            14 => Some(PacketType::Disconnect),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header_byte_uses_high_nibble() {
        assert_eq!(PacketType::from_header_byte(0x20), Some(PacketType::ConnAck));
        // Publish flags in the low nibble do not affect the type
        assert_eq!(PacketType::from_header_byte(0x3D), Some(PacketType::Publish));
        assert_eq!(PacketType::from_header_byte(0xD0), Some(PacketType::PingResp));
    }

    #[test]
    fn test_reserved_nibbles_are_rejected() {
        assert_eq!(PacketType::from_header_byte(0x00), None);
        assert_eq!(PacketType::from_header_byte(0x0F), None);
        assert_eq!(PacketType::from_header_byte(0xF0), None);
    }
}

//! Quality of service levels

/// Delivery guarantee requested for a publish or subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum QoS {
    /// Fire and forget, no acknowledgement.
    AtMostOnce = 0,
    /// Acknowledged delivery (PUBACK), duplicates possible.
    AtLeastOnce = 1,
    /// Assured single delivery (PUBREC/PUBREL/PUBCOMP handshake).
    ExactlyOnce = 2,
}

impl QoS {
    /// Decode the 2-bit QoS field; the value 3 is forbidden on the wire.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(QoS::AtMostOnce),
            1 => Some(QoS::AtLeastOnce),
            2 => Some(QoS::ExactlyOnce),
            _ => None,
        }
    }
}

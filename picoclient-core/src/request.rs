//! In-flight request table
//!
//! Fixed-capacity table correlating outgoing subscribe/unsubscribe/publish
//! packets with the server acknowledgement that completes them. Slots are
//! recycled in place; packet-id uniqueness is guaranteed by the client's
//! packet-id generator while slots remain live.

/// What kind of operation a request slot tracks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Subscribe,
    Unsubscribe,
    #[default]
    Publish,
}

/// One slot of the request table.
#[derive(Debug, Default, Clone, Copy)]
pub struct Request {
    pub in_use: bool,
    /// Waiting for the terminal server acknowledgement.
    pub pending: bool,
    pub kind: RequestKind,
    /// Packet id, zero for QoS-0 publishes.
    pub packet_id: u16,
    /// User argument echoed back in the completion event.
    pub arg: usize,
    /// Millisecond stamp taken when the request went pending.
    pub timeout_start: u64,
    /// For publishes: value of `written_total` after the packet was
    /// written; the request completes once `sent_total` reaches it (QoS 0).
    pub expected_sent_len: u32,
}

/// Fixed table of `N` request slots.
#[derive(Debug)]
pub struct RequestTable<const N: usize> {
    slots: [Request; N],
}

impl<const N: usize> RequestTable<N> {
    pub const fn new() -> Self {
        Self {
            slots: [Request {
                in_use: false,
                pending: false,
                kind: RequestKind::Publish,
                packet_id: 0,
                arg: 0,
                timeout_start: 0,
                expected_sent_len: 0,
            }; N],
        }
    }

    /// Claim the first free slot, or `None` when the table is full.
    pub fn create(&mut self, kind: RequestKind, packet_id: u16, arg: usize) -> Option<usize> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.in_use {
                *slot = Request {
                    in_use: true,
                    pending: false,
                    kind,
                    packet_id,
                    arg,
                    timeout_start: 0,
                    expected_sent_len: 0,
                };
                return Some(index);
            }
        }
        None
    }

    /// Release a slot for reuse.
    pub fn delete(&mut self, index: usize) {
        self.slots[index] = Request::default();
    }

    /// Flag a slot as waiting for the server reply, stamping the timeout
    /// start time.
    pub fn set_pending(&mut self, index: usize, now_millis: u64) {
        self.slots[index].pending = true;
        self.slots[index].timeout_start = now_millis;
    }

    /// Find a pending slot. `Some(id)` matches the exact packet id (zero
    /// matches QoS-0 publishes); `None` returns the first pending slot.
    pub fn find_pending(&self, packet_id: Option<u16>) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.pending && packet_id.map_or(true, |id| slot.packet_id == id)
        })
    }

    pub fn get(&self, index: usize) -> &Request {
        &self.slots[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Request {
        &mut self.slots[index]
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.slots = [Request::default(); N];
    }

    pub fn capacity(&self) -> usize {
        N
    }

    #[cfg(test)]
    pub fn in_use_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.in_use).count()
    }
}

impl<const N: usize> Default for RequestTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_until_full() {
        let mut table: RequestTable<3> = RequestTable::new();
        assert_eq!(table.create(RequestKind::Subscribe, 1, 10), Some(0));
        assert_eq!(table.create(RequestKind::Publish, 2, 20), Some(1));
        assert_eq!(table.create(RequestKind::Publish, 0, 30), Some(2));
        assert_eq!(table.create(RequestKind::Publish, 3, 40), None);
        assert_eq!(table.in_use_count(), 3);
    }

    #[test]
    fn test_delete_recycles_slot() {
        let mut table: RequestTable<2> = RequestTable::new();
        let a = table.create(RequestKind::Publish, 1, 0).unwrap();
        let _b = table.create(RequestKind::Publish, 2, 0).unwrap();
        table.delete(a);
        assert_eq!(table.create(RequestKind::Subscribe, 3, 0), Some(a));
    }

    #[test]
    fn test_find_pending_by_packet_id() {
        let mut table: RequestTable<4> = RequestTable::new();
        let a = table.create(RequestKind::Subscribe, 7, 0).unwrap();
        let b = table.create(RequestKind::Publish, 8, 0).unwrap();

        // Not pending yet
        assert_eq!(table.find_pending(Some(7)), None);

        table.set_pending(a, 100);
        table.set_pending(b, 100);
        assert_eq!(table.find_pending(Some(7)), Some(a));
        assert_eq!(table.find_pending(Some(8)), Some(b));
        assert_eq!(table.find_pending(Some(9)), None);
        assert_eq!(table.get(a).timeout_start, 100);
    }

    #[test]
    fn test_find_pending_any() {
        let mut table: RequestTable<4> = RequestTable::new();
        let a = table.create(RequestKind::Unsubscribe, 5, 0).unwrap();
        table.set_pending(a, 0);
        assert_eq!(table.find_pending(None), Some(a));
        table.delete(a);
        assert_eq!(table.find_pending(None), None);
    }

    #[test]
    fn test_packet_id_zero_matches_qos0_publishes_only() {
        let mut table: RequestTable<4> = RequestTable::new();
        let qos1 = table.create(RequestKind::Publish, 1, 0).unwrap();
        let qos0 = table.create(RequestKind::Publish, 0, 0).unwrap();
        table.set_pending(qos1, 0);
        table.set_pending(qos0, 0);
        assert_eq!(table.find_pending(Some(0)), Some(qos0));
    }

    #[test]
    fn test_clear_zeroes_everything() {
        let mut table: RequestTable<2> = RequestTable::new();
        let a = table.create(RequestKind::Publish, 1, 0).unwrap();
        table.set_pending(a, 42);
        table.clear();
        assert_eq!(table.in_use_count(), 0);
        assert_eq!(table.find_pending(None), None);
    }
}

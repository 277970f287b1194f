//! Incremental packet parser
//!
//! Byte-by-byte state machine that reassembles MQTT control packets from
//! arbitrarily fragmented receive data. Bodies that fit entirely inside the
//! fragment being fed are handed out as in-fragment ranges (zero-copy fast
//! path); everything else is staged in the parser's receive buffer.

use log::{trace, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Waiting for the first byte of a packet (type + flags).
    #[default]
    Init,
    /// Accumulating the remaining-length varint.
    CalcRemLen,
    /// Reading the body into the receive buffer.
    ReadRem,
}

/// A completed packet produced by [`Parser::feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Body staged in the parser's receive buffer; read it via
    /// [`Parser::body`]. `len` is zero for empty-body packets.
    Buffered { hdr: u8, len: usize },
    /// Body resident in the fed fragment at `start..start + len`.
    Inline { hdr: u8, start: usize, len: usize },
}

/// Incremental MQTT frame decoder with an `N`-byte receive buffer.
///
/// Bodies longer than `N` bytes are discarded with a warning but the state
/// machine still advances past them, so one oversized packet does not take
/// the connection down.
#[derive(Debug)]
pub struct Parser<const N: usize> {
    state: ParserState,
    hdr_byte: u8,
    rem_len: u32,
    rem_len_mult: u8,
    curr_pos: usize,
    buf: [u8; N],
}

impl<const N: usize> Parser<N> {
    pub const fn new() -> Self {
        Self {
            state: ParserState::Init,
            hdr_byte: 0,
            rem_len: 0,
            rem_len_mult: 0,
            curr_pos: 0,
            buf: [0; N],
        }
    }

    /// Drop any partially decoded packet and return to the initial state.
    pub fn reset(&mut self) {
        self.state = ParserState::Init;
    }

    /// Staged body storage; valid for `len` bytes of the last
    /// [`Frame::Buffered`].
    pub fn body(&self) -> &[u8] {
        &self.buf
    }

    /// Consume bytes from `data[*pos..]`, advancing `pos`.
    ///
    /// Returns at the first completed packet, or `None` once the fragment
    /// is exhausted. Call repeatedly until `None` to drain a fragment.
    pub fn feed(&mut self, data: &[u8], pos: &mut usize) -> Option<Frame> {
        while *pos < data.len() {
            let ch = data[*pos];
            *pos += 1;

            match self.state {
                ParserState::Init => {
                    trace!("parser init state, received first byte 0x{:02X}", ch);

                    self.hdr_byte = ch;
                    self.rem_len = 0;
                    self.rem_len_mult = 0;
                    self.curr_pos = 0;

                    self.state = ParserState::CalcRemLen;
                }
                ParserState::CalcRemLen => {
                    // More than 4 length bytes is forbidden by the spec;
                    // drop the garbage and hunt for the next packet start
                    if self.rem_len_mult >= 4 {
                        warn!("remaining length longer than 4 bytes, packet dropped");
                        self.state = ParserState::Init;
                        continue;
                    }

                    // Length is encoded LSB first, 7 bits per byte, bit 7
                    // flagging a continuation
                    self.rem_len |= ((ch & 0x7F) as u32) << (7 * self.rem_len_mult as u32);
                    self.rem_len_mult += 1;

                    if ch & 0x80 != 0 {
                        continue;
                    }
                    trace!("remaining length received: {} bytes", self.rem_len);

                    let rem_len = self.rem_len as usize;
                    if rem_len == 0 {
                        self.state = ParserState::Init;
                        return Some(Frame::Buffered {
                            hdr: self.hdr_byte,
                            len: 0,
                        });
                    }

                    // Whole body already inside this fragment? Hand out the
                    // range instead of staging a copy
                    if data.len() - *pos >= rem_len {
                        let start = *pos;
                        *pos += rem_len;
                        self.state = ParserState::Init;
                        return Some(Frame::Inline {
                            hdr: self.hdr_byte,
                            start,
                            len: rem_len,
                        });
                    }

                    self.state = ParserState::ReadRem;
                }
                ParserState::ReadRem => {
                    // Stage only while it fits; keep counting regardless
                    if self.curr_pos < N {
                        self.buf[self.curr_pos] = ch;
                    }
                    self.curr_pos += 1;

                    if self.curr_pos == self.rem_len as usize {
                        self.state = ParserState::Init;
                        if self.curr_pos <= N {
                            trace!("packet reassembled and ready for processing");
                            return Some(Frame::Buffered {
                                hdr: self.hdr_byte,
                                len: self.curr_pos,
                            });
                        }
                        warn!("packet too big for rx buffer, packet discarded");
                    }
                }
            }
        }
        None
    }
}

impl<const N: usize> Default for Parser<N> {
    fn default() -> Self {
        Self::new()
    }
}

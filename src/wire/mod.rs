//! Wire protocol: packet type tags, the 17-byte fragment header, and the
//! fragmenting encoder/decoder pair that sits between the codec and the
//! transport layer.

pub mod crypto;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::WireError;

pub const HEADER_LEN: usize = 17;

pub mod packet_type {
    pub const VIDEO_FRAME: u8 = 0x00;
    pub const AUDIO_FRAME: u8 = 0x01;
    pub const PARAMETER_SET: u8 = 0x02;
    pub const KEY_FRAME_REQUEST: u8 = 0x03;
    pub const INPUT_EVENT: u8 = 0x04;
    pub const HEARTBEAT: u8 = 0x05;
    pub const REGISTRATION: u8 = 0x06;
    pub const REGISTRATION_ACK: u8 = 0x07;
    pub const TELEMETRY: u8 = 0x08;
    pub const ZOOM_REQUEST: u8 = 0x09;
    pub const OMNISCIENT_STATE: u8 = 0x50;

    pub const HANDSHAKE_HELLO: u8 = 0xFE;
    pub const HANDSHAKE_RESPONSE: u8 = 0xFC;
    pub const HANDSHAKE_CONFIRM: u8 = 0xFD;
    pub const DISCONNECT: u8 = 0xFF;
    pub const RELAY_BIND: u8 = 0xAA;
    pub const RELAY_BOUND: u8 = 0xAB;
    pub const APPROVAL_REQUEST: u8 = 0xEC;
    pub const APPROVAL_GRANTED: u8 = 0xEE;
    pub const APPROVAL_DENIED: u8 = 0xEF;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    pub packet_type: u8,
    pub timestamp: u64,
    pub total_fragments: u32,
    pub fragment_index: u32,
}

impl FragmentHeader {
    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u8(self.packet_type);
        out.put_u64(self.timestamp);
        out.put_u32(self.total_fragments);
        out.put_u32(self.fragment_index);
    }

    pub fn decode(buf: &mut impl Buf) -> Result<Self, WireError> {
        if buf.remaining() < HEADER_LEN {
            return Err(WireError::MalformedHeader(format!(
                "need {HEADER_LEN} bytes, have {}",
                buf.remaining()
            )));
        }
        Ok(FragmentHeader {
            packet_type: buf.get_u8(),
            timestamp: buf.get_u64(),
            total_fragments: buf.get_u32(),
            fragment_index: buf.get_u32(),
        })
    }
}

/// Maximum payload carried in a single UDP datagram fragment, leaving
/// headroom for IP/UDP headers and the AEAD tag.
pub const MAX_FRAGMENT_PAYLOAD: usize = 1200;

/// Splits a packet into `(header, payload)` fragments no larger than
/// [`MAX_FRAGMENT_PAYLOAD`] each.
pub fn fragment(packet_type: u8, timestamp: u64, payload: &[u8]) -> Result<Vec<BytesMut>, WireError> {
    if payload.is_empty() {
        let total_fragments = 1;
        let mut out = BytesMut::with_capacity(HEADER_LEN);
        FragmentHeader { packet_type, timestamp, total_fragments, fragment_index: 0 }.encode(&mut out);
        return Ok(vec![out]);
    }

    let total_fragments = payload.len().div_ceil(MAX_FRAGMENT_PAYLOAD) as u32;
    let max_total = u32::MAX as usize;
    if total_fragments as usize > max_total {
        return Err(WireError::PayloadTooLarge(payload.len()));
    }

    let mut fragments = Vec::with_capacity(total_fragments as usize);
    for (index, chunk) in payload.chunks(MAX_FRAGMENT_PAYLOAD).enumerate() {
        let mut out = BytesMut::with_capacity(HEADER_LEN + chunk.len());
        FragmentHeader {
            packet_type,
            timestamp,
            total_fragments,
            fragment_index: index as u32,
        }
        .encode(&mut out);
        out.extend_from_slice(chunk);
        fragments.push(out);
    }
    Ok(fragments)
}

/// Reassembles fragments belonging to one packet as they arrive, in any order.
pub struct Reassembler {
    expected_total: Option<u32>,
    received: Vec<Option<Vec<u8>>>,
    packet_type: u8,
    timestamp: u64,
    count: u32,
}

impl Reassembler {
    pub fn new() -> Self {
        Reassembler {
            expected_total: None,
            received: Vec::new(),
            packet_type: 0,
            timestamp: 0,
            count: 0,
        }
    }

    /// Feed one fragment's header and payload. Returns the reassembled
    /// payload once every fragment of this packet has arrived.
    pub fn accept(&mut self, header: FragmentHeader, payload: &[u8]) -> Result<Option<Vec<u8>>, WireError> {
        match self.expected_total {
            Some(total) if total != header.total_fragments => {
                return Err(WireError::FragmentGap {
                    expected: total,
                    got: header.total_fragments,
                });
            }
            Some(_) => {}
            None => {
                self.expected_total = Some(header.total_fragments);
                self.received = vec![None; header.total_fragments as usize];
                self.packet_type = header.packet_type;
                self.timestamp = header.timestamp;
            }
        }

        let slot = header.fragment_index as usize;
        if slot >= self.received.len() {
            return Err(WireError::FragmentGap { expected: self.received.len() as u32, got: header.fragment_index });
        }
        if self.received[slot].is_none() {
            self.received[slot] = Some(payload.to_vec());
            self.count += 1;
        }

        if self.count as usize == self.received.len() {
            let mut whole = Vec::new();
            for part in self.received.drain(..) {
                whole.extend(part.expect("all slots filled once count matches len"));
            }
            self.expected_total = None;
            self.count = 0;
            return Ok(Some(whole));
        }
        Ok(None)
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_payload_is_a_single_fragment() {
        let frags = fragment(packet_type::VIDEO_FRAME, 1, b"hello").unwrap();
        assert_eq!(frags.len(), 1);
    }

    #[test]
    fn large_payload_splits_and_reassembles() {
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let frags = fragment(packet_type::VIDEO_FRAME, 42, &payload).unwrap();
        assert!(frags.len() > 1);

        let mut reassembler = Reassembler::new();
        let mut result = None;
        for mut frag in frags {
            let header = FragmentHeader::decode(&mut frag).unwrap();
            result = reassembler.accept(header, &frag).unwrap();
        }
        assert_eq!(result.unwrap(), payload);
    }

    #[test]
    fn out_of_order_fragments_still_reassemble() {
        let payload: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let mut frags = fragment(packet_type::VIDEO_FRAME, 7, &payload).unwrap();
        frags.reverse();

        let mut reassembler = Reassembler::new();
        let mut result = None;
        for mut frag in frags {
            let header = FragmentHeader::decode(&mut frag).unwrap();
            result = reassembler.accept(header, &frag).unwrap();
        }
        assert_eq!(result.unwrap(), payload);
    }

    #[test]
    fn header_round_trips() {
        let header = FragmentHeader { packet_type: 0x50, timestamp: 123456789, total_fragments: 3, fragment_index: 1 };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), HEADER_LEN);
        let decoded = FragmentHeader::decode(&mut buf).unwrap();
        assert_eq!(decoded, header);
    }
}
</content>

//! Ledger HID framing.
//!
//! Over USB HID an APDU travels in fixed 64-byte reports:
//!
//! ```text
//! first packet:  | channel (2) | tag 0x05 | seq (2) | APDU len (2) | data ... |
//! next packets:  | channel (2) | tag 0x05 | seq (2) | data ...                |
//! ```
//!
//! Integers are big-endian, the sequence starts at zero and the last packet
//! is zero-padded. Responses use the same layout.
//!
//! # Example
//!
//! ```
//! use evmos_ledger_core::device::framing::{self, ResponseReader};
//!
//! let packets = framing::wrap_apdu(framing::CHANNEL, &[0xE0, 0x06, 0x00, 0x00, 0x00]).unwrap();
//! assert_eq!(packets.len(), 1);
//!
//! // A device echoing the same framing is reassembled by a reader.
//! let mut reader = ResponseReader::new(framing::CHANNEL);
//! let apdu = reader.push(&packets[0]).unwrap().unwrap();
//! assert_eq!(apdu, vec![0xE0, 0x06, 0x00, 0x00, 0x00]);
//! ```

use crate::error::{Error, Result};

/// Size of one HID report, without the report ID byte.
pub const PACKET_SIZE: usize = 64;

/// Channel ID used by Ledger's HID transport.
pub const CHANNEL: u16 = 0x0101;

/// Tag marking an APDU packet.
pub const TAG_APDU: u8 = 0x05;

const HEADER_LEN: usize = 5;
const FIRST_HEADER_LEN: usize = HEADER_LEN + 2;

/// Splits an APDU into HID packets.
///
/// # Errors
///
/// Returns [`Error::ApduError`] if the APDU is longer than a 16-bit length
/// prefix can describe.
pub fn wrap_apdu(channel: u16, apdu: &[u8]) -> Result<Vec<[u8; PACKET_SIZE]>> {
    let total = u16::try_from(apdu.len())
        .map_err(|_| Error::ApduError(format!("APDU of {} bytes is too long", apdu.len())))?;

    let mut packets = Vec::new();
    let mut remaining = apdu;
    let mut sequence: u16 = 0;

    loop {
        let mut packet = [0u8; PACKET_SIZE];
        packet[..2].copy_from_slice(&channel.to_be_bytes());
        packet[2] = TAG_APDU;
        packet[3..5].copy_from_slice(&sequence.to_be_bytes());

        let offset = if sequence == 0 {
            packet[5..7].copy_from_slice(&total.to_be_bytes());
            FIRST_HEADER_LEN
        } else {
            HEADER_LEN
        };

        let take = remaining.len().min(PACKET_SIZE - offset);
        packet[offset..offset + take].copy_from_slice(&remaining[..take]);
        remaining = &remaining[take..];
        packets.push(packet);

        if remaining.is_empty() {
            return Ok(packets);
        }
        sequence = sequence
            .checked_add(1)
            .ok_or_else(|| Error::ApduError("packet sequence overflow".to_string()))?;
    }
}

/// Reassembles a response from HID packets.
#[derive(Debug)]
pub struct ResponseReader {
    channel: u16,
    sequence: u16,
    expected: Option<usize>,
    buffer: Vec<u8>,
}

impl ResponseReader {
    /// Creates a reader for `channel`.
    #[must_use]
    pub const fn new(channel: u16) -> Self {
        Self {
            channel,
            sequence: 0,
            expected: None,
            buffer: Vec::new(),
        }
    }

    /// Feeds one packet. Returns the complete response once the announced
    /// length has arrived, `None` while more packets are needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] on a short packet, wrong channel,
    /// wrong tag or out-of-order sequence number.
    pub fn push(&mut self, packet: &[u8]) -> Result<Option<Vec<u8>>> {
        let header_len = if self.expected.is_none() {
            FIRST_HEADER_LEN
        } else {
            HEADER_LEN
        };
        if packet.len() < header_len {
            return Err(Error::MalformedResponse(format!(
                "HID packet of {} bytes",
                packet.len()
            )));
        }

        let channel = u16::from_be_bytes([packet[0], packet[1]]);
        if channel != self.channel {
            return Err(Error::MalformedResponse(format!(
                "unexpected channel {channel:#06x}"
            )));
        }
        if packet[2] != TAG_APDU {
            return Err(Error::MalformedResponse(format!(
                "unexpected tag {:#04x}",
                packet[2]
            )));
        }
        let sequence = u16::from_be_bytes([packet[3], packet[4]]);
        if sequence != self.sequence {
            return Err(Error::MalformedResponse(format!(
                "expected packet {}, got {sequence}",
                self.sequence
            )));
        }

        let expected = match self.expected {
            Some(expected) => expected,
            None => {
                let expected = usize::from(u16::from_be_bytes([packet[5], packet[6]]));
                self.expected = Some(expected);
                self.buffer.reserve(expected);
                expected
            }
        };

        let take = (expected - self.buffer.len()).min(packet.len() - header_len);
        self.buffer
            .extend_from_slice(&packet[header_len..header_len + take]);
        self.sequence = self.sequence.wrapping_add(1);

        if self.buffer.len() == expected {
            Ok(Some(std::mem::take(&mut self.buffer)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(packets: &[[u8; PACKET_SIZE]]) -> Vec<u8> {
        let mut reader = ResponseReader::new(CHANNEL);
        let mut out = None;
        for packet in packets {
            assert!(out.is_none(), "response completed early");
            out = reader.push(packet).unwrap();
        }
        out.unwrap()
    }

    #[test]
    fn single_packet_layout() {
        let packets = wrap_apdu(CHANNEL, &[0xE0, 0x02, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(
            &packets[0][..12],
            &[0x01, 0x01, 0x05, 0x00, 0x00, 0x00, 0x05, 0xE0, 0x02, 0x00, 0x00, 0x00]
        );
        assert!(packets[0][12..].iter().all(|b| *b == 0));
    }

    #[test]
    fn multi_packet_roundtrip() {
        let apdu: Vec<u8> = (0..=200u8).collect();
        let packets = wrap_apdu(CHANNEL, &apdu).unwrap();

        // 57 bytes in the first packet, 59 in each following one.
        assert_eq!(packets.len(), 4);
        assert_eq!(&packets[1][3..5], &[0x00, 0x01]);
        assert_eq!(&packets[3][3..5], &[0x00, 0x03]);
        assert_eq!(reassemble(&packets), apdu);
    }

    #[test]
    fn exact_fit_needs_one_packet() {
        let apdu = vec![0xAA; PACKET_SIZE - FIRST_HEADER_LEN];
        let packets = wrap_apdu(CHANNEL, &apdu).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(reassemble(&packets), apdu);
    }

    #[test]
    fn rejects_wrong_channel_and_tag() {
        let mut packet = wrap_apdu(CHANNEL, &[0x90, 0x00]).unwrap()[0];

        let mut reader = ResponseReader::new(0x0202);
        assert!(matches!(
            reader.push(&packet),
            Err(Error::MalformedResponse(_))
        ));

        packet[2] = 0x02;
        let mut reader = ResponseReader::new(CHANNEL);
        assert!(matches!(
            reader.push(&packet),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejects_out_of_order_sequence() {
        let packets = wrap_apdu(CHANNEL, &[0x11; 100]).unwrap();
        let mut reader = ResponseReader::new(CHANNEL);
        assert!(matches!(
            reader.push(&packets[1]),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn rejects_short_packet() {
        let mut reader = ResponseReader::new(CHANNEL);
        assert!(reader.push(&[0x01, 0x01, 0x05]).is_err());
    }
}

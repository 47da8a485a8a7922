//! Beacon and response frames.
//!
//! Both layouts are fixed. The coordinator broadcasts a 24-byte beacon:
//!
//! | Offset  | Field                                         |
//! |---------|-----------------------------------------------|
//! | 0..2    | FCF `a0 06`                                   |
//! | 2       | sequence number                               |
//! | 3..5    | source PAN id, low byte first                 |
//! | 5..7    | source short address                          |
//! | 7..9    | cycle time, big-endian                        |
//! | 9       | client count                                  |
//! | 10..22  | one 4-byte slot per client, byte 0 = outputs  |
//! | 22..24  | FCS, filled in by the transceiver             |
//!
//! Each client answers in its slot with a 16-byte response:
//!
//! | Offset  | Field                                         |
//! |---------|-----------------------------------------------|
//! | 0..2    | FCF `a2 26`                                   |
//! | 2       | sequence number                               |
//! | 3..5    | destination PAN id, low byte first            |
//! | 5..7    | coordinator short address                     |
//! | 7..9    | source short address                          |
//! | 9       | payload length (4)                            |
//! | 10..14  | button state, three reserved bytes            |
//! | 14..16  | FCS, filled in by the transceiver             |

use crate::config::ShortAddress;
use crate::consts::{
    BEACON_CYCLE_TIME, BEACON_FCF, BEACON_LENGTH, BEACON_MARKER, BEACON_PAYLOAD_OFFSET,
    BEACON_SLOT_LEN, COORDINATOR_SHORT_ADDRESS, MAX_CLIENTS, RESPONSE_FCF, RESPONSE_LENGTH,
    RESPONSE_PAYLOAD_LEN, RESPONSE_PAYLOAD_OFFSET, TDMA_PAN_ID,
};

/// Length of the hardware-appended frame check sequence.
const FCS_LEN: usize = 2;

/// A frame ready for the transceiver's frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Frame {
    /// Coordinator beacon.
    Beacon([u8; BEACON_LENGTH]),
    /// Client response.
    Response([u8; RESPONSE_LENGTH]),
}

impl Frame {
    /// Raw bytes including the zeroed FCS.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Beacon(bytes) => bytes,
            Frame::Response(bytes) => bytes,
        }
    }

    /// Sequence number carried by the frame.
    pub fn sequence(&self) -> u8 {
        self.as_bytes()[2]
    }
}

/// Builds beacons and responses for one node.
///
/// Beacons and responses share a single sequence counter, which advances by one
/// for every frame built and wraps at 256.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    sequence: u8,
    source: ShortAddress,
}

impl FrameBuilder {
    /// A builder sending from `source`, starting at sequence number 0.
    pub fn new(source: ShortAddress) -> Self {
        Self {
            sequence: 0,
            source,
        }
    }

    /// Sequence number the next frame will carry.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    fn next_sequence(&mut self) -> u8 {
        let seq = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        seq
    }

    /// Builds a beacon announcing `outputs[n]` to the client in slot `n`.
    pub fn build_beacon(&mut self, outputs: &[u8; MAX_CLIENTS]) -> Frame {
        let mut bytes = [0u8; BEACON_LENGTH];
        bytes[0..2].copy_from_slice(&BEACON_FCF);
        bytes[2] = self.next_sequence();
        bytes[3..5].copy_from_slice(&TDMA_PAN_ID.to_le_bytes());
        bytes[5..7].copy_from_slice(&self.source.0);
        bytes[7..9].copy_from_slice(&BEACON_CYCLE_TIME.to_be_bytes());
        bytes[9] = MAX_CLIENTS as u8;
        for (slot, output) in outputs.iter().enumerate() {
            bytes[BEACON_PAYLOAD_OFFSET + slot * BEACON_SLOT_LEN] = *output;
        }
        Frame::Beacon(bytes)
    }

    /// Builds a response reporting `button_state` to the coordinator.
    pub fn build_response(&mut self, button_state: u8) -> Frame {
        let mut bytes = [0u8; RESPONSE_LENGTH];
        bytes[0..2].copy_from_slice(&RESPONSE_FCF);
        bytes[2] = self.next_sequence();
        bytes[3..5].copy_from_slice(&TDMA_PAN_ID.to_le_bytes());
        bytes[5..7].copy_from_slice(&COORDINATOR_SHORT_ADDRESS);
        bytes[7..9].copy_from_slice(&self.source.0);
        bytes[9] = RESPONSE_PAYLOAD_LEN as u8;
        bytes[RESPONSE_PAYLOAD_OFFSET] = button_state;
        Frame::Response(bytes)
    }
}

/// Whether a received PSDU is a beacon.
///
/// Only the first byte is authoritative; the length check rejects runt frames
/// whose slots could not be read.
pub fn is_beacon(bytes: &[u8]) -> bool {
    bytes.first() == Some(&BEACON_MARKER) && bytes.len() >= BEACON_LENGTH - FCS_LEN
}

/// Output byte a beacon carries for the client in `slot`.
pub fn beacon_output(bytes: &[u8], slot: usize) -> Option<u8> {
    if !is_beacon(bytes) || slot >= MAX_CLIENTS {
        return None;
    }
    bytes.get(BEACON_PAYLOAD_OFFSET + slot * BEACON_SLOT_LEN).copied()
}

/// What the coordinator learns from a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ResponseInfo {
    /// Sender's short address.
    pub source: ShortAddress,
    /// Sender's button bank.
    pub button_state: u8,
}

/// Decodes a response addressed to the coordinator.
pub fn parse_response(bytes: &[u8]) -> Option<ResponseInfo> {
    if bytes.len() < RESPONSE_PAYLOAD_OFFSET + 1 || bytes[0..2] != RESPONSE_FCF {
        return None;
    }
    if bytes[3..5] != TDMA_PAN_ID.to_le_bytes() || bytes[5..7] != COORDINATOR_SHORT_ADDRESS {
        return None;
    }
    Some(ResponseInfo {
        source: ShortAddress([bytes[7], bytes[8]]),
        button_state: bytes[RESPONSE_PAYLOAD_OFFSET],
    })
}

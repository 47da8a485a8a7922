//! Per-node configuration: radio tunables, node identity and slot timing.

use crate::consts::{
    CLIENT_PROCESSING_TIME_TICKS, MAX_CLIENTS, TDMA_BEACON_TICKS, TDMA_GUARD_TICKS,
    TDMA_SLOT_TICKS,
};
use crate::registers::SUPPORTED_INTERRUPT_MASK;

/// Address of the factory-programmed unique ID on STM32F4 parts.
pub const STM32F4_UID_ADDRESS: usize = 0x1fff_7a10;

/// Length of the unique ID in bytes.
pub const UID_LEN: usize = 12;

/// Tunables applied by the transceiver warm reset.
///
/// The defaults match the deployed TDMA nodes: automatic CRC, promiscuous
/// reception, coordinator address filtering and hardware defaults for sensitivity,
/// CCA threshold and transmit power.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct RadioConfig {
    /// Transceiver interrupt sources to enable.
    pub interrupt_mask: u8,
    /// Let the transceiver append the FCS to every transmitted frame.
    pub auto_crc: bool,
    /// Accept frames regardless of addressing.
    pub promiscuous: bool,
    /// Filter addresses as the PAN coordinator.
    pub i_am_coordinator: bool,
    /// Accepted frame versions in RX_AACK mode (0..=3).
    pub frame_version_mode: u8,
    /// Minimum receive power in dB above -90 dBm. Values above 84 are clipped.
    pub min_rx_power: Option<u8>,
    /// CCA energy threshold in dBm, clamped to -91..=-61.
    pub cca_threshold_dbm: Option<i8>,
    /// Enable the external power amplifier control.
    pub pa_ext_en: bool,
    /// Transmit power register setting (0 = +3 dBm, 15 = -17.2 dBm).
    pub tx_power: Option<u8>,
    /// Put the transceiver to sleep when the radio is switched off.
    pub sleep_when_off: bool,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            interrupt_mask: SUPPORTED_INTERRUPT_MASK,
            auto_crc: true,
            promiscuous: true,
            i_am_coordinator: true,
            frame_version_mode: 3,
            min_rx_power: None,
            cca_threshold_dbm: None,
            pa_ext_en: false,
            tx_power: None,
            sleep_when_off: false,
        }
    }
}

impl RadioConfig {
    /// RX_SYN register value for [`RadioConfig::min_rx_power`].
    pub fn rx_syn(&self) -> Option<u8> {
        self.min_rx_power.map(|power| {
            if power > 84 {
                0x0f
            } else {
                power / 6 + 1
            }
        })
    }

    /// CCA_ED_THRES field value for [`RadioConfig::cca_threshold_dbm`].
    pub fn cca_ed_threshold(&self) -> Option<u8> {
        self.cca_threshold_dbm
            .map(|dbm| ((dbm.clamp(-91, -61) as i16 + 91) / 2) as u8)
    }
}

/// A node's short address, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ShortAddress(pub [u8; 2]);

/// Identity of one physical unit, taken from its factory-programmed unique ID.
///
/// The same bytes provide the short address, the IEEE address and the key used to
/// pick the client's TDMA slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct NodeIdentity {
    uid: [u8; UID_LEN],
}

impl NodeIdentity {
    /// Wraps a unique ID.
    pub const fn from_uid(uid: [u8; UID_LEN]) -> Self {
        Self { uid }
    }

    /// Reads the unique ID from memory.
    ///
    /// # Safety
    /// `addr` must point to [`UID_LEN`] readable bytes, e.g. [`STM32F4_UID_ADDRESS`]
    /// on an STM32F4.
    pub unsafe fn read_from(addr: *const [u8; UID_LEN]) -> Self {
        // SAFETY: the caller guarantees `addr` is valid for reads.
        Self::from_uid(unsafe { core::ptr::read_volatile(addr) })
    }

    /// Key used for slot assignment: the first unique-ID byte.
    pub fn slot_key(&self) -> u8 {
        self.uid[0]
    }

    /// Short address as it appears in frames.
    pub fn short_address(&self) -> ShortAddress {
        ShortAddress([self.uid[2], self.uid[0]])
    }

    /// Values for SHORT_ADDR_0 and SHORT_ADDR_1.
    pub fn short_address_registers(&self) -> [u8; 2] {
        [self.uid[0], self.uid[2]]
    }

    /// Values for IEEE_ADDR_0 through IEEE_ADDR_7.
    pub fn ieee_address(&self) -> [u8; 8] {
        [
            self.uid[0],
            self.uid[2],
            self.uid[4],
            0xfe,
            0xff,
            0x00,
            0x00,
            0x02,
        ]
    }
}

/// Slot a client with the given identity key sends in.
///
/// Three units are provisioned; any other key shares the last slot.
pub fn slot_index_for(key: u8) -> usize {
    match key {
        0x3c => 0,
        0x2a => 1,
        _ => MAX_CLIENTS - 1,
    }
}

/// Send offset from beacon arrival for a client with the given identity key.
pub fn slot_offset_for(key: u8) -> u32 {
    TDMA_BEACON_TICKS + CLIENT_PROCESSING_TIME_TICKS + slot_index_for(key) as u32 * TDMA_SLOT_TICKS
}

/// Timing of this node inside the TDMA cycle.
///
/// Created once at initialization; afterwards only `period` (by the period
/// estimator) and `beacon_count` change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct SlotConfig {
    /// Estimated cycle period in ticks. Zero until the first estimate.
    pub period: u32,
    /// Guard interval between slots.
    pub guard_interval: u32,
    /// Number of client slots per cycle.
    pub num_clients: u8,
    /// Length of one client slot.
    pub client_slot_length: u32,
    /// Send offset from beacon arrival. Zero on the coordinator.
    pub slot_offset: u32,
    /// Beacons captured so far.
    pub beacon_count: u32,
}

impl SlotConfig {
    /// Slot timing with no send offset, as used by the coordinator.
    pub fn coordinator() -> Self {
        Self {
            period: 0,
            guard_interval: TDMA_GUARD_TICKS,
            num_clients: MAX_CLIENTS as u8,
            client_slot_length: TDMA_SLOT_TICKS,
            slot_offset: 0,
            beacon_count: 0,
        }
    }

    /// Slot timing of the client with the given identity.
    pub fn client(identity: &NodeIdentity) -> Self {
        Self {
            slot_offset: slot_offset_for(identity.slot_key()),
            ..Self::coordinator()
        }
    }
}

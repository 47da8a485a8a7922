//! Constants used across the TDMA MAC implementation.
//!
//! This module defines the slot timing budget, addressing, frame layout and
//! transceiver settle times shared by the coordinator and its clients.
//!
//! ## Key Concepts
//!
//! - **Ticks**: All slot timing is expressed in capture-timer ticks (1 µs per tick).
//! - **Cycle**: One TDMA period starts with the coordinator's beacon, followed by
//!   one response slot per client.
//! - **Slot offset**: A client sends at `beacon arrival + offset`, where the offset is
//!   derived once from the node identity (see [`crate::config::slot_offset_for`]).
//! - **Settle times**: Minimum waits after a transceiver command before its new
//!   state is valid (AT86RF231 datasheet, in microseconds).
//!
//! These values must match on every node of one TDMA group.

/// Length of one TDMA cycle in timer ticks.
pub const TDMA_PERIOD_TICKS: u32 = 10_000;

/// Time reserved for the beacon at the start of every cycle.
pub const TDMA_BEACON_TICKS: u32 = 1_500;

/// Length of one client response slot.
pub const TDMA_SLOT_TICKS: u32 = 2_000;

/// Guard interval between two neighbouring slots.
pub const TDMA_GUARD_TICKS: u32 = 100;

/// Time a client needs between beacon reception and its earliest send.
pub const CLIENT_PROCESSING_TIME_TICKS: u32 = 500;

/// Time the coordinator needs to prepare the next beacon window.
pub const COORDINATOR_PROCESSING_TIME_TICKS: u32 = 300;

/// Latency between the compare-match firing and the first bit on air.
pub const HARDWARE_DELAY_TICKS: u32 = 100;

/// Maximum number of clients one coordinator serves.
pub const MAX_CLIENTS: usize = 3;

/// Power-of-two exponent of the coarse period averaging window.
///
/// The coarse estimate spans `1 << NUM_PERIODS_BASE` beacon intervals.
pub const NUM_PERIODS_BASE: u32 = 3;

/// Number of capture timestamps kept for period estimation.
///
/// One more than the number of averaged intervals, so a full buffer spans exactly
/// `1 << NUM_PERIODS_BASE` periods.
pub const PERIOD_BUFFER_LENGTH: usize = (1 << NUM_PERIODS_BASE) + 1;

/// Number of received-frame slots filled by the receive interrupt.
pub const RX_BUFFERS: usize = MAX_CLIENTS;

/// Capacity of the interrupt-to-loop event queue.
pub const EVENT_QUEUE_LEN: usize = 8;

/// PAN identifier shared by all nodes of the TDMA group. Sent low byte first.
pub const TDMA_PAN_ID: u16 = 0xabcd;

/// Short address of the coordinator, in wire order.
pub const COORDINATOR_SHORT_ADDRESS: [u8; 2] = [0x2e, 0x1b];

/// Cycle time advertised in every beacon. Sent high byte first.
pub const BEACON_CYCLE_TIME: u16 = 1_000;

/// Frame control bytes of a beacon, in wire order.
pub const BEACON_FCF: [u8; 2] = [0xa0, 0x06];

/// Frame control bytes of a client response, in wire order.
pub const RESPONSE_FCF: [u8; 2] = [0xa2, 0x26];

/// First byte of every beacon; used by clients to recognise one.
pub const BEACON_MARKER: u8 = BEACON_FCF[0];

/// Bytes per client slot in the beacon payload.
pub const BEACON_SLOT_LEN: usize = 4;

/// Offset of the first client slot inside a beacon.
pub const BEACON_PAYLOAD_OFFSET: usize = 10;

/// Total beacon length, including the two CRC bytes filled in by the transceiver.
pub const BEACON_LENGTH: usize = BEACON_PAYLOAD_OFFSET + MAX_CLIENTS * BEACON_SLOT_LEN + 2;

/// Length of the response payload (button state plus 3 reserved bytes).
pub const RESPONSE_PAYLOAD_LEN: usize = 4;

/// Offset of the response payload.
pub const RESPONSE_PAYLOAD_OFFSET: usize = 10;

/// Total response length, including the two CRC bytes filled in by the transceiver.
pub const RESPONSE_LENGTH: usize = RESPONSE_PAYLOAD_OFFSET + RESPONSE_PAYLOAD_LEN + 2;

/// Largest PSDU the transceiver frame buffer holds.
pub const MAX_FRAME_LEN: usize = 127;

/// Heartbeat counter value at which the status LED is switched on.
pub const HEARTBEAT_ON_COUNT: u16 = 500;

/// Heartbeat counter value at which the status LED is switched off and the count restarts.
pub const HEARTBEAT_PERIOD_COUNT: u16 = 1_000;

/// Poll interval of the bounded idle wait, in microseconds.
pub const IDLE_POLL_INTERVAL_US: u32 = 1;

/// Upper bound of the idle wait, in microseconds. Past it the radio is assumed idle.
pub const IDLE_WAIT_TIMEOUT_US: u32 = 10_000;

/// Transition time from VCC applied to P_ON.
pub const TIME_TO_ENTER_P_ON_US: u32 = 510;

/// Transition time from P_ON to TRX_OFF.
pub const TIME_P_ON_TO_TRX_OFF_US: u32 = 510;

/// Transition time from SLEEP to TRX_OFF.
pub const TIME_SLEEP_TO_TRX_OFF_US: u32 = 880;

/// Transition time from a `*_NOCLK` state to being awake.
pub const TIME_NOCLK_TO_WAKE_US: u32 = 6;

/// Execution time of the FORCE_TRX_OFF command.
pub const TIME_CMD_FORCE_TRX_OFF_US: u32 = 1;

/// Transition time from TRX_OFF to any PLL-active state.
pub const TIME_TRX_OFF_TO_PLL_ACTIVE_US: u32 = 180;

/// Transition time between two PLL-active states.
pub const TIME_STATE_TRANSITION_PLL_ACTIVE_US: u32 = 1;

//! TDMA scheduler and event loop.
//!
//! [`TdmaMac`] owns the transceiver, the timer unit and the IO board and reacts to
//! the [`MacEvent`]s posted by the interrupt handlers through
//! [`TdmaShared`](crate::isr::TdmaShared).
//!
//! One cycle seen from a client:
//!
//! ```text
//!  beacon         own slot                      next beacon
//!    |--------------|--------------------------------|
//!    ^ capture      ^ compare-match sends response
//!    ^ PacketReceived: PLL_ON, upload response
//!                               ^ TX-mode timer: RX_AACK_ON
//! ```
//!
//! The coordinator uploads the next beacon when its TX-mode timer fires, lets the
//! cycle timer send it, and listens for responses until the next window.

use embedded_hal::delay::DelayNs;

use crate::config::{NodeIdentity, RadioConfig, SlotConfig, slot_index_for};
use crate::consts::{
    COORDINATOR_PROCESSING_TIME_TICKS, HARDWARE_DELAY_TICKS, HEARTBEAT_ON_COUNT,
    HEARTBEAT_PERIOD_COUNT, MAX_CLIENTS, MAX_FRAME_LEN, TDMA_PERIOD_TICKS, TIME_TO_ENTER_P_ON_US,
};
use crate::error::RadioError;
use crate::frame::{FrameBuilder, beacon_output, is_beacon, parse_response};
use crate::hal::{IoBoard, RadioInterface, TdmaTimer};
use crate::isr::{RxFrame, TdmaShared};
use crate::period::estimate_period;
use crate::registers::HardwareRadioState;
use crate::transceiver::Transceiver;

/// Which side of the TDMA cycle this node plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Role {
    /// Sends the beacon and owns the cycle timer.
    Coordinator,
    /// Follows the beacon and answers in its slot.
    Client,
}

/// Protocol state of the MAC, independent of the transceiver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LogicalMacState {
    /// Not started yet.
    Uninitialized,
    /// Starting up or switched off.
    Inactive,
    /// Listening.
    Idle,
    /// A frame is uploaded and waits for its send instant.
    Send,
    /// Taking the first period measurement.
    ActivePll,
}

/// Things the interrupt handlers report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum MacEvent {
    /// The capture timer timestamped a beacon arrival.
    BeaconCaptured,
    /// The transceiver received a frame.
    PacketReceived,
    /// The TX-mode timer expired.
    TxModeTimerExpired,
    /// The transceiver finished sending.
    FrameSent,
    /// Diagnostic request, e.g. a button press.
    ExternalSignal,
}

/// The TDMA MAC of one node.
#[derive(Debug)]
pub struct TdmaMac<'a, R, D, T, IO> {
    role: Role,
    state: LogicalMacState,
    trx: Transceiver<R, D>,
    timer: T,
    io: IO,
    shared: &'a TdmaShared,
    identity: NodeIdentity,
    config: RadioConfig,
    slot: SlotConfig,
    frames: FrameBuilder,
    heartbeat: u16,
    client_inputs: [u8; MAX_CLIENTS],
}

impl<'a, R, D, T, IO> TdmaMac<'a, R, D, T, IO>
where
    R: RadioInterface,
    D: DelayNs,
    T: TdmaTimer,
    IO: IoBoard,
{
    /// Assembles a MAC for one node.
    ///
    /// # Arguments
    /// - `role`: Coordinator or client side of the cycle.
    /// - `trx`: The transceiver controller, owning the radio interface and delay.
    /// - `timer`: Capture, compare and TX-mode timers.
    /// - `io`: The board's output LEDs and buttons.
    /// - `shared`: The instance the interrupt handlers post to.
    /// - `identity`: Addresses and slot key derived from the MCU UID.
    /// - `config`: Warm-reset tunables.
    ///
    /// # Returns
    /// A MAC in [`LogicalMacState::Uninitialized`] with its slot offset derived from
    /// `role` and `identity`.
    ///
    /// # Notes
    /// No hardware is touched until [`TdmaMac::init`]; events polled before that
    /// are dropped.
    pub fn new(
        role: Role,
        trx: Transceiver<R, D>,
        timer: T,
        io: IO,
        shared: &'a TdmaShared,
        identity: NodeIdentity,
        config: RadioConfig,
    ) -> Self {
        let slot = match role {
            Role::Coordinator => SlotConfig::coordinator(),
            Role::Client => SlotConfig::client(&identity),
        };
        Self {
            role,
            state: LogicalMacState::Uninitialized,
            trx,
            timer,
            io,
            shared,
            identity,
            config,
            slot,
            frames: FrameBuilder::new(identity.short_address()),
            heartbeat: 0,
            client_inputs: [0; MAX_CLIENTS],
        }
    }

    /// Runs the startup sequence.
    ///
    /// Resets and configures the transceiver, powers it on for the node's role and
    /// enables its interrupts. A coordinator uploads beacon 0 and starts its cycle
    /// timer. An unrecognised chip is reported but not fatal.
    pub fn init(&mut self) -> Result<(), RadioError> {
        self.set_logical(LogicalMacState::Inactive);
        // VCC may just have been applied
        self.trx.delay_us(TIME_TO_ENTER_P_ON_US);
        self.trx.init_interface()?;
        self.shared.clear_frames();

        self.trx.cold_reset()?;
        let chip = self.trx.chip_info()?;
        if !chip.is_supported() {
            warn!(
                "unsupported transceiver: version {}, manufacturer {}",
                chip.version, chip.manufacturer
            );
        }
        info!(
            "rf231: part {}, version {}, manufacturer {}",
            chip.part, chip.version, chip.manufacturer
        );
        self.trx.warm_reset(&self.config, &self.identity)?;

        self.on()?;
        self.trx.enable_interrupts(self.config.interrupt_mask)?;
        if self.role == Role::Coordinator {
            self.timer.start_cycle(TDMA_PERIOD_TICKS);
        }
        self.timer.reset_counter();
        Ok(())
    }

    /// Powers the radio up and enters the role's resting state: a coordinator goes
    /// to `Send` with the next beacon uploaded, a client starts listening.
    pub fn on(&mut self) -> Result<(), RadioError> {
        self.trx.power_on()?;
        match self.role {
            Role::Coordinator => self.send_beacon(),
            Role::Client => self.enter(LogicalMacState::Idle, HardwareRadioState::RxAackOn),
        }
    }

    /// Lets a transmission finish and switches the radio off.
    ///
    /// Pending events and buffered frames are discarded. Compares that are already
    /// armed may still fire; [`TdmaMac::handle`] drops what they post.
    pub fn off(&mut self) -> Result<(), RadioError> {
        self.trx.power_off(self.config.sleep_when_off)?;
        self.set_logical(LogicalMacState::Inactive);
        self.shared.clear_frames();
        Ok(())
    }

    /// Handles the oldest pending event, if any.
    ///
    /// Soft transceiver failures are logged and swallowed; only interface errors
    /// are returned.
    pub fn poll(&mut self) -> nb::Result<MacEvent, RadioError> {
        let event = self.shared.next_event().ok_or(nb::Error::WouldBlock)?;
        self.handle(event).map_err(nb::Error::Other)?;
        Ok(event)
    }

    /// Handles events forever.
    pub fn run(&mut self) -> ! {
        loop {
            if let Err(e) = nb::block!(self.poll()) {
                error!("event handling failed: {:?}", e);
            }
        }
    }

    /// Reacts to one event.
    ///
    /// Before [`TdmaMac::init`] and after [`TdmaMac::off`] only
    /// [`MacEvent::ExternalSignal`] is acted on; everything else is dropped.
    pub fn handle(&mut self, event: MacEvent) -> Result<(), RadioError> {
        trace!("{:?} in {:?}", event, self.state);
        let stopped = matches!(
            self.state,
            LogicalMacState::Uninitialized | LogicalMacState::Inactive
        );
        if stopped && event != MacEvent::ExternalSignal {
            trace!("radio off, dropping {:?}", event);
            return Ok(());
        }
        match (event, self.role) {
            (MacEvent::BeaconCaptured, Role::Client) => self.on_beacon_captured(),
            (MacEvent::PacketReceived, _) => self.on_packet_received(),
            (MacEvent::TxModeTimerExpired, Role::Coordinator) => {
                self.send_beacon()?;
                self.heartbeat(true);
                Ok(())
            }
            (MacEvent::TxModeTimerExpired, Role::Client) => {
                self.enter(LogicalMacState::Idle, HardwareRadioState::RxAackOn)
            }
            (MacEvent::FrameSent, Role::Coordinator) => {
                self.enter(LogicalMacState::Idle, HardwareRadioState::RxAackOn)?;
                let next = self
                    .timer
                    .send_compare()
                    .wrapping_sub(COORDINATOR_PROCESSING_TIME_TICKS);
                self.timer.set_tx_mode_timer(next);
                Ok(())
            }
            (MacEvent::ExternalSignal, _) => {
                self.report();
                Ok(())
            }
            (MacEvent::BeaconCaptured, Role::Coordinator) | (MacEvent::FrameSent, Role::Client) => {
                Ok(())
            }
        }
    }

    fn on_beacon_captured(&mut self) -> Result<(), RadioError> {
        self.slot.beacon_count = self.slot.beacon_count.wrapping_add(1);
        self.update_period();
        let at = self.send_time();
        self.timer.set_send_compare(at);
        Ok(())
    }

    fn on_packet_received(&mut self) -> Result<(), RadioError> {
        let frame = match self.shared.take_frame() {
            Some(frame) => frame,
            None => {
                let mut buf = [0u8; MAX_FRAME_LEN];
                let len = self.trx.read_frame(&mut buf)?;
                RxFrame::from_bytes(&buf[..len])
            }
        };
        let bytes = frame.bytes();

        match self.role {
            Role::Client if is_beacon(bytes) => {
                let at = self.send_time();
                self.timer.set_send_compare(at);
                if let Some(outputs) = beacon_output(bytes, self.slot_index()) {
                    self.io.set_outputs(outputs);
                }

                self.enter(LogicalMacState::Send, HardwareRadioState::PllOn)?;
                let response = self.frames.build_response(self.io.inputs());
                self.trx.upload_frame(response.as_bytes())?;

                let period = match self.slot.period {
                    0 => TDMA_PERIOD_TICKS,
                    estimated => estimated,
                };
                let back_to_idle = self
                    .shared
                    .last_beacon_time()
                    .wrapping_add(period)
                    .wrapping_sub(2 * COORDINATOR_PROCESSING_TIME_TICKS);
                self.timer.set_tx_mode_timer(back_to_idle);
                self.heartbeat(false);
            }
            Role::Coordinator => {
                if let Some(response) = parse_response(bytes) {
                    let slot = slot_index_for(response.source.0[1]);
                    self.client_inputs[slot] = response.button_state;
                    debug!("slot {} reports {}", slot, response.button_state);
                }
            }
            Role::Client => trace!("ignoring {} byte frame", bytes.len()),
        }
        Ok(())
    }

    fn send_beacon(&mut self) -> Result<(), RadioError> {
        self.enter(LogicalMacState::Send, HardwareRadioState::PllOn)?;
        let inputs = self.io.inputs();
        let beacon = self.frames.build_beacon(&[inputs; MAX_CLIENTS]);
        self.trx.upload_frame(beacon.as_bytes())
    }

    fn update_period(&mut self) {
        let (full, enough) = self
            .shared
            .with_captures(|captures| (captures.is_full(), captures.len() >= 2));
        let locking = self.slot.period == 0;
        if !enough || (locking && !full) {
            return;
        }

        let resume = self.state;
        if locking {
            self.set_logical(LogicalMacState::ActivePll);
        }
        let (state, previous) = (self.state, self.slot.period);
        if let Some(period) = self
            .shared
            .with_captures(|captures| estimate_period(state, previous, captures))
        {
            self.slot.period = period;
        }
        if locking {
            info!("period locked at {} ticks", self.slot.period);
            self.set_logical(resume);
        }
    }

    fn send_time(&self) -> u32 {
        self.shared
            .last_beacon_time()
            .wrapping_add(self.slot.slot_offset)
            .wrapping_sub(HARDWARE_DELAY_TICKS)
    }

    fn slot_index(&self) -> usize {
        slot_index_for(self.identity.slot_key())
    }

    /// Blinks the status LED once per [`HEARTBEAT_PERIOD_COUNT`] cycles. The
    /// coordinator mirrors it on the output bank.
    fn heartbeat(&mut self, drive_outputs: bool) {
        if self.heartbeat == HEARTBEAT_ON_COUNT {
            self.io.set_status_led(true);
            if drive_outputs {
                self.io.set_outputs(0xff);
            }
            self.heartbeat += 1;
        } else if self.heartbeat >= HEARTBEAT_PERIOD_COUNT {
            self.io.set_status_led(false);
            if drive_outputs {
                self.io.set_outputs(0x00);
            }
            self.heartbeat = 0;
        } else {
            self.heartbeat += 1;
        }
    }

    fn report(&self) {
        info!(
            "period {} ticks after {} beacons, {} dropped",
            self.slot.period,
            self.slot.beacon_count,
            self.shared.dropped()
        );
        if self.role == Role::Coordinator {
            info!("client inputs {:?}", self.client_inputs);
        }
    }

    fn set_logical(&mut self, state: LogicalMacState) {
        if self.state != state {
            debug!("mac {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Sets the logical state and moves the transceiver. A transceiver that does
    /// not follow is logged and left where it is.
    fn enter(
        &mut self,
        state: LogicalMacState,
        radio: HardwareRadioState,
    ) -> Result<(), RadioError> {
        self.set_logical(state);
        match self.trx.set_state(radio) {
            Err(RadioError::Interface) => Err(RadioError::Interface),
            Err(e) => {
                warn!("transceiver to {:?} failed: {:?}", radio, e);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Node role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current protocol state.
    pub fn state(&self) -> LogicalMacState {
        self.state
    }

    /// Slot timing, including the period estimate.
    pub fn slot_config(&self) -> &SlotConfig {
        &self.slot
    }

    /// Button states last reported by each client slot (coordinator only).
    pub fn client_inputs(&self) -> &[u8; MAX_CLIENTS] {
        &self.client_inputs
    }

    /// Sequence number of the next frame.
    pub fn sequence(&self) -> u8 {
        self.frames.sequence()
    }

    /// The transceiver controller.
    pub fn transceiver(&self) -> &Transceiver<R, D> {
        &self.trx
    }

    /// The transceiver controller, mutably.
    pub fn transceiver_mut(&mut self) -> &mut Transceiver<R, D> {
        &mut self.trx
    }

    /// The timer unit.
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// The timer unit, mutably.
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// The IO board.
    pub fn io(&self) -> &IO {
        &self.io
    }

    /// The IO board, mutably.
    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ShortAddress, UID_LEN};
    use crate::consts::{CLIENT_PROCESSING_TIME_TICKS, TDMA_BEACON_TICKS, TDMA_SLOT_TICKS};
    use crate::frame::Frame;
    use crate::testing::{CountingDelay, FakeIo, FakeRadio, FakeTimer};

    type TestMac<'a> = TdmaMac<'a, FakeRadio, CountingDelay, FakeTimer, FakeIo>;

    fn identity(key: u8) -> NodeIdentity {
        let mut uid = [0u8; UID_LEN];
        uid[0] = key;
        uid[2] = 0x51;
        NodeIdentity::from_uid(uid)
    }

    fn mac(role: Role, key: u8, shared: &TdmaShared) -> TestMac<'_> {
        TdmaMac::new(
            role,
            Transceiver::new(FakeRadio::new(), CountingDelay::default()),
            FakeTimer::default(),
            FakeIo::default(),
            shared,
            identity(key),
            RadioConfig::default(),
        )
    }

    fn started(role: Role, key: u8, shared: &TdmaShared) -> TestMac<'_> {
        let mut mac = mac(role, key, shared);
        mac.init().unwrap();
        mac
    }

    fn radio_state(mac: &mut TestMac<'_>) -> HardwareRadioState {
        mac.transceiver_mut().state().unwrap()
    }

    fn uploads<'m>(mac: &'m TestMac<'_>) -> &'m [Vec<u8>] {
        &mac.transceiver().radio().uploads
    }

    fn beacon(outputs: [u8; MAX_CLIENTS]) -> Frame {
        FrameBuilder::new(ShortAddress([0x2e, 0x1b])).build_beacon(&outputs)
    }

    #[test]
    fn test_coordinator_boots_into_send_with_beacon_zero() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Coordinator, 0x01, &shared);

        assert_eq!(mac.state(), LogicalMacState::Send);
        assert_eq!(radio_state(&mut mac), HardwareRadioState::PllOn);
        assert_eq!(uploads(&mac).len(), 1);
        assert_eq!(uploads(&mac)[0][0], 0xa0);
        assert_eq!(uploads(&mac)[0][2], 0);
        assert_eq!(mac.timer().cycle, Some(TDMA_PERIOD_TICKS));
        assert_eq!(mac.timer().counter_resets, 1);
        assert_eq!(
            mac.transceiver().radio().reg(crate::registers::RG_IRQ_MASK),
            crate::registers::SUPPORTED_INTERRUPT_MASK
        );
    }

    #[test]
    fn test_coordinator_cycle() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Coordinator, 0x01, &shared);
        mac.timer_mut().compare = 20_000;
        mac.io_mut().buttons = 0x5a;

        shared.post(MacEvent::FrameSent);
        assert_eq!(mac.poll(), Ok(MacEvent::FrameSent));
        assert_eq!(mac.state(), LogicalMacState::Idle);
        assert_eq!(radio_state(&mut mac), HardwareRadioState::RxAackOn);
        assert_eq!(mac.timer().tx_mode, vec![20_000 - COORDINATOR_PROCESSING_TIME_TICKS]);

        shared.post(MacEvent::TxModeTimerExpired);
        assert_eq!(mac.poll(), Ok(MacEvent::TxModeTimerExpired));
        assert_eq!(mac.state(), LogicalMacState::Send);
        assert_eq!(radio_state(&mut mac), HardwareRadioState::PllOn);
        let next = &uploads(&mac)[1];
        assert_eq!(next[2], 1);
        assert_eq!((next[10], next[14], next[18]), (0x5a, 0x5a, 0x5a));
    }

    #[test]
    fn test_coordinator_records_responses() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Coordinator, 0x01, &shared);
        let response = FrameBuilder::new(ShortAddress([0x51, 0x2a])).build_response(0x33);

        shared.frame_received(response.as_bytes());
        assert_eq!(mac.poll(), Ok(MacEvent::PacketReceived));
        assert_eq!(mac.client_inputs(), &[0, 0x33, 0]);
        assert_eq!(mac.state(), LogicalMacState::Send);
    }

    #[test]
    fn test_client_slot_offsets_follow_identity() {
        let shared = TdmaShared::new();
        let base = TDMA_BEACON_TICKS + CLIENT_PROCESSING_TIME_TICKS;
        for (key, offset) in [
            (0x3c, base),
            (0x2a, base + TDMA_SLOT_TICKS),
            (0x2b, base + 2 * TDMA_SLOT_TICKS),
            (0x00, base + 2 * TDMA_SLOT_TICKS),
        ] {
            assert_eq!(mac(Role::Client, key, &shared).slot_config().slot_offset, offset);
        }
        assert_eq!(mac(Role::Coordinator, 0x3c, &shared).slot_config().slot_offset, 0);
    }

    #[test]
    fn test_client_boots_listening() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);

        assert_eq!(mac.state(), LogicalMacState::Idle);
        assert_eq!(radio_state(&mut mac), HardwareRadioState::RxAackOn);
        assert!(uploads(&mac).is_empty());
        assert_eq!(mac.timer().cycle, None);
    }

    #[test]
    fn test_capture_arms_send_compare_only() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);
        let commands = mac.transceiver().radio().commands.len();

        shared.capture(50_000);
        assert_eq!(mac.poll(), Ok(MacEvent::BeaconCaptured));
        assert_eq!(
            mac.timer().compare,
            50_000 + TDMA_BEACON_TICKS + CLIENT_PROCESSING_TIME_TICKS - HARDWARE_DELAY_TICKS
        );
        assert_eq!(mac.slot_config().beacon_count, 1);
        assert_eq!(mac.state(), LogicalMacState::Idle);
        assert_eq!(mac.transceiver().radio().commands.len(), commands);
    }

    #[test]
    fn test_beacon_moves_client_to_send_with_response() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x2a, &shared);
        mac.io_mut().buttons = 0x12;

        shared.capture(50_000);
        shared.frame_received(beacon([0x81, 0x42, 0x07]).as_bytes());
        assert_eq!(mac.poll(), Ok(MacEvent::BeaconCaptured));
        assert_eq!(mac.poll(), Ok(MacEvent::PacketReceived));

        assert_eq!(mac.state(), LogicalMacState::Send);
        assert_eq!(radio_state(&mut mac), HardwareRadioState::PllOn);
        assert_eq!(mac.io().outputs, 0x42);
        assert_eq!(
            uploads(&mac),
            &[vec![
                0xa2, 0x26, 0x00, 0xcd, 0xab, 0x2e, 0x1b, 0x51, 0x2a, 0x04, 0x12, 0, 0, 0, 0, 0,
            ]]
        );
        assert_eq!(
            mac.timer().compare,
            50_000 + TDMA_BEACON_TICKS + CLIENT_PROCESSING_TIME_TICKS + TDMA_SLOT_TICKS
                - HARDWARE_DELAY_TICKS
        );
        assert_eq!(
            mac.timer().tx_mode,
            vec![50_000 + TDMA_PERIOD_TICKS - 2 * COORDINATOR_PROCESSING_TIME_TICKS]
        );

        shared.post(MacEvent::TxModeTimerExpired);
        assert_eq!(mac.poll(), Ok(MacEvent::TxModeTimerExpired));
        assert_eq!(mac.state(), LogicalMacState::Idle);
        assert_eq!(radio_state(&mut mac), HardwareRadioState::RxAackOn);
    }

    #[test]
    fn test_beacon_is_read_from_radio_when_not_buffered() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);
        mac.transceiver_mut().radio_mut().rx_frame = beacon([0x81, 0, 0]).as_bytes().to_vec();

        shared.post(MacEvent::PacketReceived);
        assert_eq!(mac.poll(), Ok(MacEvent::PacketReceived));
        assert_eq!(mac.state(), LogicalMacState::Send);
        assert_eq!(mac.io().outputs, 0x81);
        assert_eq!(uploads(&mac).len(), 1);
    }

    #[test]
    fn test_client_ignores_other_frames() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);

        shared.frame_received(&[0x41, 0x88, 0x01, 0xcd, 0xab]);
        assert_eq!(mac.poll(), Ok(MacEvent::PacketReceived));
        assert_eq!(mac.state(), LogicalMacState::Idle);
        assert!(uploads(&mac).is_empty());
    }

    #[test]
    fn test_client_locks_then_smooths_period() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);

        let mut t = 1_000u32;
        for _ in 0..crate::consts::PERIOD_BUFFER_LENGTH - 1 {
            shared.capture(t);
            let _ = mac.poll().unwrap();
            assert_eq!(mac.slot_config().period, 0);
            t += 10_000;
        }
        shared.capture(t);
        let _ = mac.poll().unwrap();
        assert_eq!(mac.slot_config().period, 10_000);
        assert_eq!(mac.state(), LogicalMacState::Idle);

        t += 10_400;
        shared.capture(t);
        let _ = mac.poll().unwrap();
        assert_eq!(mac.slot_config().period, 10_020);

        shared.frame_received(beacon([0; MAX_CLIENTS]).as_bytes());
        let _ = mac.poll().unwrap();
        assert_eq!(
            mac.timer().tx_mode,
            vec![t + 10_020 - 2 * COORDINATOR_PROCESSING_TIME_TICKS]
        );
    }

    #[test]
    fn test_external_signal_changes_nothing() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);

        shared.post(MacEvent::ExternalSignal);
        assert_eq!(mac.poll(), Ok(MacEvent::ExternalSignal));
        assert_eq!(mac.state(), LogicalMacState::Idle);
    }

    #[test]
    fn test_empty_queue_would_block() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);
        assert_eq!(mac.poll(), Err(nb::Error::WouldBlock));
    }

    #[test]
    fn test_stuck_transceiver_is_not_fatal() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);
        mac.transceiver_mut().radio_mut().frozen = true;

        shared.frame_received(beacon([0; MAX_CLIENTS]).as_bytes());
        assert_eq!(mac.poll(), Ok(MacEvent::PacketReceived));
        assert_eq!(mac.state(), LogicalMacState::Send);
        assert_eq!(radio_state(&mut mac), HardwareRadioState::RxAackOn);
        assert_eq!(uploads(&mac).len(), 1);
    }

    #[test]
    fn test_bus_failure_is_reported() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);
        mac.transceiver_mut().radio_mut().fail = true;

        shared.post(MacEvent::TxModeTimerExpired);
        assert_eq!(mac.poll(), Err(nb::Error::Other(RadioError::Interface)));
    }

    #[test]
    fn test_coordinator_heartbeat_blinks() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Coordinator, 0x01, &shared);

        for _ in 0..=HEARTBEAT_ON_COUNT {
            mac.heartbeat(true);
        }
        assert!(mac.io().status_led);
        assert_eq!(mac.io().outputs, 0xff);

        for _ in HEARTBEAT_ON_COUNT..HEARTBEAT_PERIOD_COUNT {
            mac.heartbeat(true);
        }
        assert!(!mac.io().status_led);
        assert_eq!(mac.io().status_history, vec![true, false]);
        assert_eq!(mac.io().outputs, 0x00);
        assert_eq!(mac.heartbeat, 0);
    }

    #[test]
    fn test_switched_off_mac_drops_radio_events() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Coordinator, 0x01, &shared);
        mac.config.sleep_when_off = true;
        shared.post(MacEvent::FrameSent);

        mac.off().unwrap();
        assert_eq!(shared.pending(), 0);
        assert!(mac.transceiver().radio().asleep);

        shared.post(MacEvent::TxModeTimerExpired);
        shared.capture(50_000);
        shared.post(MacEvent::ExternalSignal);
        assert_eq!(mac.poll(), Ok(MacEvent::TxModeTimerExpired));
        assert_eq!(mac.poll(), Ok(MacEvent::BeaconCaptured));
        assert_eq!(mac.poll(), Ok(MacEvent::ExternalSignal));

        assert_eq!(mac.state(), LogicalMacState::Inactive);
        assert!(mac.transceiver().radio().asleep);
        assert_eq!(uploads(&mac).len(), 1);
        assert!(mac.timer().tx_mode.is_empty());
    }

    #[test]
    fn test_events_before_init_are_dropped() {
        let shared = TdmaShared::new();
        let mut mac = mac(Role::Client, 0x3c, &shared);

        shared.capture(50_000);
        shared.frame_received(beacon([0x81, 0, 0]).as_bytes());
        assert_eq!(mac.poll(), Ok(MacEvent::BeaconCaptured));
        assert_eq!(mac.poll(), Ok(MacEvent::PacketReceived));

        assert_eq!(mac.state(), LogicalMacState::Uninitialized);
        assert_eq!(mac.slot_config().beacon_count, 0);
        assert!(mac.transceiver().radio().commands.is_empty());
        assert!(uploads(&mac).is_empty());
        assert_eq!(mac.io().outputs, 0);
    }

    #[test]
    fn test_off_and_on_again() {
        let shared = TdmaShared::new();
        let mut mac = started(Role::Client, 0x3c, &shared);

        mac.off().unwrap();
        assert_eq!(mac.state(), LogicalMacState::Inactive);
        assert_eq!(radio_state(&mut mac), HardwareRadioState::TrxOff);

        mac.on().unwrap();
        assert_eq!(mac.state(), LogicalMacState::Idle);
        assert_eq!(radio_state(&mut mac), HardwareRadioState::RxAackOn);
    }
}

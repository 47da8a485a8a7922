//! Transceiver State Controller.
//!
//! [`Transceiver`] owns the radio interface and a delay source and is the only
//! place that issues TRX_CMD writes. It walks the AT86RF231 state graph with the
//! datasheet settle times:
//!
//! ```text
//!             FORCE_TRX_OFF (from any state)
//!        +-----------------------------------+
//!        v                                   |
//!     TRX_OFF --180 µs--> PLL_ON <--1 µs--> RX_ON
//!                           ^  \              ^  \
//!                           |   v             |   v
//!                      TX_ARET_ON        RX_AACK_ON
//! ```
//!
//! RX_AACK_ON and TX_ARET_ON cannot reach each other directly. Requests between
//! them are routed through PLL_ON or RX_ON.

use embedded_hal::delay::DelayNs;

use crate::config::{NodeIdentity, RadioConfig};
use crate::consts::{
    IDLE_POLL_INTERVAL_US, IDLE_WAIT_TIMEOUT_US, TDMA_PAN_ID, TIME_CMD_FORCE_TRX_OFF_US,
    TIME_NOCLK_TO_WAKE_US, TIME_P_ON_TO_TRX_OFF_US, TIME_SLEEP_TO_TRX_OFF_US,
    TIME_STATE_TRANSITION_PLL_ACTIVE_US, TIME_TRX_OFF_TO_PLL_ACTIVE_US,
};
use crate::error::RadioError;
use crate::hal::RadioInterface;
use crate::registers::{
    CMD_FORCE_TRX_OFF, HardwareRadioState, RF230_REVA, RF230_REVB, RG_IEEE_ADDR_0, RG_IRQ_MASK,
    RG_IRQ_STATUS, RG_MAN_ID_0, RG_PAN_ID_0, RG_PAN_ID_1, RG_PART_NUM, RG_RX_SYN,
    RG_SHORT_ADDR_0, RG_SHORT_ADDR_1, RG_VERSION_NUM, SR_AACK_DIS_ACK, SR_AACK_FLTR_RES_FT,
    SR_AACK_FVN_MODE, SR_AACK_I_AM_COORD, SR_AACK_PROM_MODE, SR_AACK_UPLD_RES_FT,
    SR_CCA_ED_THRES, SR_MAX_CSMA_RETRIES, SR_MAX_FRAME_RETRIES, SR_PA_EXT_EN, SR_TRX_CMD,
    SR_TRX_STATUS, SR_TX_AUTO_CRC_ON, SR_TX_PWR, SUPPORTED_MANUFACTURER_ID,
};

/// Identification registers read at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ChipInfo {
    /// PART_NUM (3 on the AT86RF231).
    pub part: u8,
    /// VERSION_NUM.
    pub version: u8,
    /// MAN_ID_0.
    pub manufacturer: u8,
}

impl ChipInfo {
    /// Whether this driver knows the revision and vendor.
    pub fn is_supported(&self) -> bool {
        (self.version == RF230_REVA || self.version == RF230_REVB)
            && self.manufacturer == SUPPORTED_MANUFACTURER_ID
    }
}

/// Drives an AT86RF231 through its state machine.
#[derive(Debug)]
pub struct Transceiver<R, D> {
    radio: R,
    delay: D,
}

impl<R, D> Transceiver<R, D>
where
    R: RadioInterface,
    D: DelayNs,
{
    /// Takes ownership of the radio interface and the delay used for settle times.
    pub fn new(radio: R, delay: D) -> Self {
        Self { radio, delay }
    }

    /// Gives back the radio interface and the delay.
    pub fn release(self) -> (R, D) {
        (self.radio, self.delay)
    }

    /// The underlying radio interface.
    pub fn radio(&self) -> &R {
        &self.radio
    }

    /// The underlying radio interface, mutably. Bypasses the state controller.
    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Brings the bus and control lines into their idle state.
    pub fn init_interface(&mut self) -> Result<(), RadioError> {
        Self::io(self.radio.init())
    }

    /// Waits `us` microseconds.
    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn io<T>(result: Result<T, R::Error>) -> Result<T, RadioError> {
        result.map_err(|_| {
            error!("transceiver interface access failed");
            RadioError::Interface
        })
    }

    fn command(&mut self, cmd: u8) -> Result<(), RadioError> {
        Self::io(self.radio.write_subregister(SR_TRX_CMD, cmd))
    }

    /// Hardware state as reported in TRX_STATUS.
    pub fn state(&mut self) -> Result<HardwareRadioState, RadioError> {
        let status = Self::io(self.radio.read_subregister(SR_TRX_STATUS))?;
        Ok(HardwareRadioState::from_status(status))
    }

    /// Whether SLP_TR is high.
    pub fn is_asleep(&mut self) -> bool {
        self.radio.is_asleep()
    }

    /// True while asleep or in any non-transient state.
    pub fn is_idle(&mut self) -> Result<bool, RadioError> {
        if self.is_asleep() {
            return Ok(true);
        }
        Ok(!self.state()?.is_busy())
    }

    /// False only while a frame is being transmitted.
    pub fn is_ready_to_send(&mut self) -> Result<bool, RadioError> {
        Ok(!matches!(
            self.state()?,
            HardwareRadioState::BusyTx | HardwareRadioState::BusyTxAret
        ))
    }

    /// Polls until the transceiver is idle, for at most [`IDLE_WAIT_TIMEOUT_US`].
    ///
    /// Returns `Ok(false)` when the deadline passed; callers then proceed as if the
    /// radio were idle.
    pub fn wait_idle(&mut self) -> Result<bool, RadioError> {
        let mut waited = 0;
        loop {
            if self.is_idle()? {
                return Ok(true);
            }
            if waited >= IDLE_WAIT_TIMEOUT_US {
                warn!("transceiver still busy after {} us", waited);
                return Ok(false);
            }
            self.delay.delay_us(IDLE_POLL_INTERVAL_US);
            waited += IDLE_POLL_INTERVAL_US;
        }
    }

    /// Forces TRX_OFF from any state except SLEEP, which it leaves first.
    pub fn reset_state_machine(&mut self) -> Result<(), RadioError> {
        Self::io(self.radio.set_sleep(false))?;
        self.delay.delay_us(TIME_NOCLK_TO_WAKE_US);
        self.command(CMD_FORCE_TRX_OFF)?;
        self.delay.delay_us(TIME_CMD_FORCE_TRX_OFF_US);
        Ok(())
    }

    /// Moves the transceiver to `target`.
    ///
    /// # Arguments
    /// - `target`: One of TRX_OFF, RX_ON, PLL_ON, RX_AACK_ON or TX_ARET_ON.
    ///
    /// # Returns
    /// - `Ok(())` once TRX_STATUS reports `target`.
    /// - `InvalidArgument` for any other target, `WrongState` while asleep.
    /// - `TimedOut` when the radio did not follow the command.
    /// - `Interface` when the bus failed.
    ///
    /// # Notes
    /// A request for the current state succeeds without touching the radio.
    /// RX_AACK_ON and TX_ARET_ON are switched through PLL_ON or RX_ON, with a
    /// [`TIME_STATE_TRANSITION_PLL_ACTIVE_US`] settle before the final command.
    /// Leaving TRX_OFF waits [`TIME_TRX_OFF_TO_PLL_ACTIVE_US`] for the PLL.
    pub fn set_state(&mut self, target: HardwareRadioState) -> Result<(), RadioError> {
        let cmd = target.command().ok_or(RadioError::InvalidArgument)?;
        if self.is_asleep() {
            return Err(RadioError::WrongState);
        }
        let _ = self.wait_idle()?;

        let current = self.state()?;
        if current == target {
            return Ok(());
        }

        if target == HardwareRadioState::TrxOff {
            self.reset_state_machine()?;
        } else {
            let detour = match (current, target) {
                (HardwareRadioState::RxAackOn, HardwareRadioState::TxAretOn) => {
                    Some(HardwareRadioState::PllOn)
                }
                (HardwareRadioState::TxAretOn, HardwareRadioState::RxAackOn) => {
                    Some(HardwareRadioState::RxOn)
                }
                _ => None,
            };
            if let Some(cmd) = detour.and_then(HardwareRadioState::command) {
                self.command(cmd)?;
                self.delay.delay_us(TIME_STATE_TRANSITION_PLL_ACTIVE_US);
            }

            self.command(cmd)?;
            if current == HardwareRadioState::TrxOff {
                self.delay.delay_us(TIME_TRX_OFF_TO_PLL_ACTIVE_US);
            } else {
                self.delay.delay_us(TIME_STATE_TRANSITION_PLL_ACTIVE_US);
            }
        }

        let reached = self.state()?;
        if reached == target {
            trace!("transceiver {:?} -> {:?}", current, reached);
            Ok(())
        } else {
            warn!("transceiver stuck in {:?}, wanted {:?}", reached, target);
            Err(RadioError::TimedOut)
        }
    }

    /// Full hardware reset through RST, ending in TRX_OFF.
    ///
    /// The wake-up time is doubled since the radio may have been asleep after an
    /// MCU-only reset.
    pub fn cold_reset(&mut self) -> Result<(), RadioError> {
        Self::io(self.radio.set_reset(true))?;
        Self::io(self.radio.set_sleep(false))?;
        self.delay.delay_us(2 * TIME_SLEEP_TO_TRX_OFF_US);
        Self::io(self.radio.set_reset(false))?;
        self.command(CMD_FORCE_TRX_OFF)?;
        self.delay.delay_us(TIME_P_ON_TO_TRX_OFF_US);
        Ok(())
    }

    /// Reads the identification registers.
    pub fn chip_info(&mut self) -> Result<ChipInfo, RadioError> {
        Ok(ChipInfo {
            part: Self::io(self.radio.read_register(RG_PART_NUM))?,
            version: Self::io(self.radio.read_register(RG_VERSION_NUM))?,
            manufacturer: Self::io(self.radio.read_register(RG_MAN_ID_0))?,
        })
    }

    /// Reprograms addressing, filtering and PHY settings without a hardware reset.
    ///
    /// Idempotent; the state machine is left alone.
    pub fn warm_reset(
        &mut self,
        config: &RadioConfig,
        identity: &NodeIdentity,
    ) -> Result<(), RadioError> {
        let r = &mut self.radio;
        Self::io(r.write_register(RG_IRQ_MASK, config.interrupt_mask))?;

        // Retries off: PLL_ON sends instead of the extended TX_ARET mode.
        Self::io(r.write_subregister(SR_MAX_FRAME_RETRIES, 0))?;
        Self::io(r.write_subregister(SR_MAX_CSMA_RETRIES, 0))?;

        let [short_0, short_1] = identity.short_address_registers();
        Self::io(r.write_register(RG_SHORT_ADDR_0, short_0))?;
        Self::io(r.write_register(RG_SHORT_ADDR_1, short_1))?;
        let [pan_0, pan_1] = TDMA_PAN_ID.to_le_bytes();
        Self::io(r.write_register(RG_PAN_ID_0, pan_0))?;
        Self::io(r.write_register(RG_PAN_ID_1, pan_1))?;
        for (offset, byte) in identity.ieee_address().into_iter().enumerate() {
            Self::io(r.write_register(RG_IEEE_ADDR_0 + offset as u8, byte))?;
        }

        Self::io(r.write_subregister(SR_AACK_FVN_MODE, config.frame_version_mode & 0x03))?;
        Self::io(r.write_subregister(SR_AACK_I_AM_COORD, config.i_am_coordinator as u8))?;
        Self::io(r.write_subregister(SR_AACK_DIS_ACK, 0))?;
        Self::io(r.write_subregister(SR_AACK_FLTR_RES_FT, 1))?;
        Self::io(r.write_subregister(SR_AACK_UPLD_RES_FT, 0))?;
        Self::io(r.write_subregister(SR_AACK_PROM_MODE, config.promiscuous as u8))?;

        if let Some(rx_syn) = config.rx_syn() {
            Self::io(r.write_register(RG_RX_SYN, rx_syn))?;
        }
        if let Some(threshold) = config.cca_ed_threshold() {
            Self::io(r.write_subregister(SR_CCA_ED_THRES, threshold))?;
        }
        Self::io(r.write_subregister(SR_TX_AUTO_CRC_ON, config.auto_crc as u8))?;
        if config.pa_ext_en {
            Self::io(r.write_subregister(SR_PA_EXT_EN, 1))?;
        }
        if let Some(power) = config.tx_power {
            Self::io(r.write_subregister(SR_TX_PWR, power.min(0x0f)))?;
        }
        Ok(())
    }

    /// Wakes the transceiver if SLP_TR is high.
    pub fn power_on(&mut self) -> Result<(), RadioError> {
        if self.is_asleep() {
            Self::io(self.radio.set_sleep(false))?;
            // wake time depends on board capacitance
            self.delay.delay_us(2 * TIME_SLEEP_TO_TRX_OFF_US);
        }
        Ok(())
    }

    /// Lets a running transmission finish, forces TRX_OFF and optionally sleeps.
    pub fn power_off(&mut self, sleep: bool) -> Result<(), RadioError> {
        let _ = self.wait_idle()?;
        self.reset_state_machine()?;
        if sleep {
            Self::io(self.radio.set_sleep(true))?;
        }
        Ok(())
    }

    /// Writes a frame into the frame buffer.
    pub fn upload_frame(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        Self::io(self.radio.write_frame_buffer(frame))
    }

    /// Reads the last received frame into `buf`.
    pub fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, RadioError> {
        Self::io(self.radio.read_frame_buffer(buf))
    }

    /// Enables the given interrupt sources.
    pub fn enable_interrupts(&mut self, mask: u8) -> Result<(), RadioError> {
        Self::io(self.radio.write_register(RG_IRQ_MASK, mask))
    }

    /// Reads and clears the pending interrupt flags.
    pub fn irq_status(&mut self) -> Result<u8, RadioError> {
        Self::io(self.radio.read_register(RG_IRQ_STATUS))
    }
}

//! AT86RF231 register map and transceiver state codes.
//!
//! Only the registers the TDMA MAC touches are listed. Sub-registers are described
//! by address, mask and shift so that [`crate::hal::RadioInterface`] can offer
//! read-modify-write access to single fields.

/// A bit field inside one transceiver register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct SubRegister {
    /// Register address.
    pub addr: u8,
    /// Bit mask of the field inside the register.
    pub mask: u8,
    /// Position of the field's least significant bit.
    pub shift: u8,
}

impl SubRegister {
    const fn new(addr: u8, mask: u8, shift: u8) -> Self {
        Self { addr, mask, shift }
    }
}

/// TRX_STATUS register.
pub const RG_TRX_STATUS: u8 = 0x01;
/// TRX_STATE register.
pub const RG_TRX_STATE: u8 = 0x02;
/// TRX_CTRL_1 register.
pub const RG_TRX_CTRL_1: u8 = 0x04;
/// PHY_TX_PWR register.
pub const RG_PHY_TX_PWR: u8 = 0x05;
/// CCA_THRES register.
pub const RG_CCA_THRES: u8 = 0x09;
/// IRQ_MASK register.
pub const RG_IRQ_MASK: u8 = 0x0e;
/// IRQ_STATUS register. Reading it clears all pending flags.
pub const RG_IRQ_STATUS: u8 = 0x0f;
/// RX_SYN register.
pub const RG_RX_SYN: u8 = 0x15;
/// XAH_CTRL_1 register.
pub const RG_XAH_CTRL_1: u8 = 0x17;
/// PART_NUM register.
pub const RG_PART_NUM: u8 = 0x1c;
/// VERSION_NUM register.
pub const RG_VERSION_NUM: u8 = 0x1d;
/// MAN_ID_0 register.
pub const RG_MAN_ID_0: u8 = 0x1e;
/// SHORT_ADDR_0 register.
pub const RG_SHORT_ADDR_0: u8 = 0x20;
/// SHORT_ADDR_1 register.
pub const RG_SHORT_ADDR_1: u8 = 0x21;
/// PAN_ID_0 register.
pub const RG_PAN_ID_0: u8 = 0x22;
/// PAN_ID_1 register.
pub const RG_PAN_ID_1: u8 = 0x23;
/// IEEE_ADDR_0 register; the remaining seven bytes follow consecutively.
pub const RG_IEEE_ADDR_0: u8 = 0x24;
/// XAH_CTRL_0 register.
pub const RG_XAH_CTRL_0: u8 = 0x2c;
/// CSMA_SEED_1 register.
pub const RG_CSMA_SEED_1: u8 = 0x2e;

/// Current transceiver state.
pub const SR_TRX_STATUS: SubRegister = SubRegister::new(RG_TRX_STATUS, 0x1f, 0);
/// State change command.
pub const SR_TRX_CMD: SubRegister = SubRegister::new(RG_TRX_STATE, 0x1f, 0);
/// Automatic FCS generation on transmit.
pub const SR_TX_AUTO_CRC_ON: SubRegister = SubRegister::new(RG_TRX_CTRL_1, 0x20, 5);
/// External power amplifier enable.
pub const SR_PA_EXT_EN: SubRegister = SubRegister::new(RG_TRX_CTRL_1, 0x80, 7);
/// Transmit power setting.
pub const SR_TX_PWR: SubRegister = SubRegister::new(RG_PHY_TX_PWR, 0x0f, 0);
/// CCA energy detection threshold.
pub const SR_CCA_ED_THRES: SubRegister = SubRegister::new(RG_CCA_THRES, 0x0f, 0);
/// Promiscuous reception in RX_AACK mode.
pub const SR_AACK_PROM_MODE: SubRegister = SubRegister::new(RG_XAH_CTRL_1, 0x02, 1);
/// Upload reserved frame types.
pub const SR_AACK_UPLD_RES_FT: SubRegister = SubRegister::new(RG_XAH_CTRL_1, 0x10, 4);
/// Filter reserved frame types.
pub const SR_AACK_FLTR_RES_FT: SubRegister = SubRegister::new(RG_XAH_CTRL_1, 0x20, 5);
/// Number of automatic frame retries in TX_ARET mode.
pub const SR_MAX_FRAME_RETRIES: SubRegister = SubRegister::new(RG_XAH_CTRL_0, 0xf0, 4);
/// Number of CSMA retries in TX_ARET mode.
pub const SR_MAX_CSMA_RETRIES: SubRegister = SubRegister::new(RG_XAH_CTRL_0, 0x0e, 1);
/// Act as PAN coordinator for address filtering.
pub const SR_AACK_I_AM_COORD: SubRegister = SubRegister::new(RG_CSMA_SEED_1, 0x08, 3);
/// Disable automatic acknowledgements.
pub const SR_AACK_DIS_ACK: SubRegister = SubRegister::new(RG_CSMA_SEED_1, 0x10, 4);
/// Accepted frame versions in RX_AACK mode.
pub const SR_AACK_FVN_MODE: SubRegister = SubRegister::new(RG_CSMA_SEED_1, 0xc0, 6);

/// TRX_CMD: force TRX_OFF from any state.
pub const CMD_FORCE_TRX_OFF: u8 = 0x03;
/// TRX_CMD: force PLL_ON from any state.
pub const CMD_FORCE_PLL_ON: u8 = 0x04;

/// Frame end interrupt.
pub const IRQ_TRX_END: u8 = 0x08;
/// Receive start interrupt.
pub const IRQ_RX_START: u8 = 0x04;
/// Interrupt sources used by the TDMA MAC.
pub const SUPPORTED_INTERRUPT_MASK: u8 = IRQ_TRX_END | IRQ_RX_START;

/// Revision A of the AT86RF230.
pub const RF230_REVA: u8 = 1;
/// Revision B of the AT86RF230; also reported by the AT86RF231.
pub const RF230_REVB: u8 = 2;
/// JEDEC manufacturer ID of Atmel.
pub const SUPPORTED_MANUFACTURER_ID: u8 = 0x1f;

/// Transceiver state as reported in TRX_STATUS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum HardwareRadioState {
    /// Power-on state after VCC is applied.
    PowerOn,
    /// Receiving a frame.
    BusyRx,
    /// Transmitting a frame.
    BusyTx,
    /// Receiver enabled.
    RxOn,
    /// Crystal and SPI running, analog parts off.
    TrxOff,
    /// PLL locked, ready to transmit.
    PllOn,
    /// Sleep state.
    Sleep,
    /// Receiving a frame in auto-acknowledge mode.
    BusyRxAack,
    /// Transmitting with automatic retries.
    BusyTxAret,
    /// Receiver enabled with automatic acknowledgements.
    RxAackOn,
    /// Ready to transmit with automatic retries.
    TxAretOn,
    /// RX_ON with CLKM disabled.
    RxOnNoClk,
    /// RX_AACK_ON with CLKM disabled.
    RxAackOnNoClk,
    /// BUSY_RX_AACK with CLKM disabled.
    BusyRxAackNoClk,
    /// Between two states.
    StateTransition,
    /// A status code not listed in the datasheet.
    Unknown(u8),
}

impl HardwareRadioState {
    /// Decodes a TRX_STATUS value.
    pub fn from_status(status: u8) -> Self {
        match status {
            0x00 => Self::PowerOn,
            0x01 => Self::BusyRx,
            0x02 => Self::BusyTx,
            0x06 => Self::RxOn,
            0x08 => Self::TrxOff,
            0x09 => Self::PllOn,
            0x0f => Self::Sleep,
            0x11 => Self::BusyRxAack,
            0x12 => Self::BusyTxAret,
            0x16 => Self::RxAackOn,
            0x19 => Self::TxAretOn,
            0x1c => Self::RxOnNoClk,
            0x1d => Self::RxAackOnNoClk,
            0x1e => Self::BusyRxAackNoClk,
            0x1f => Self::StateTransition,
            other => Self::Unknown(other),
        }
    }

    /// TRX_STATUS value reporting this state.
    pub fn status(self) -> u8 {
        match self {
            Self::PowerOn => 0x00,
            Self::BusyRx => 0x01,
            Self::BusyTx => 0x02,
            Self::RxOn => 0x06,
            Self::TrxOff => 0x08,
            Self::PllOn => 0x09,
            Self::Sleep => 0x0f,
            Self::BusyRxAack => 0x11,
            Self::BusyTxAret => 0x12,
            Self::RxAackOn => 0x16,
            Self::TxAretOn => 0x19,
            Self::RxOnNoClk => 0x1c,
            Self::RxAackOnNoClk => 0x1d,
            Self::BusyRxAackNoClk => 0x1e,
            Self::StateTransition => 0x1f,
            Self::Unknown(status) => status,
        }
    }

    /// TRX_CMD code that requests this state.
    ///
    /// Only the five stable states can be commanded; every other state returns `None`.
    pub fn command(self) -> Option<u8> {
        match self {
            Self::TrxOff => Some(0x08),
            Self::RxOn => Some(0x06),
            Self::PllOn => Some(0x09),
            Self::RxAackOn => Some(0x16),
            Self::TxAretOn => Some(0x19),
            _ => None,
        }
    }

    /// Whether the transceiver is in the middle of a frame or a state change.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Self::BusyRx
                | Self::BusyTx
                | Self::BusyRxAack
                | Self::BusyTxAret
                | Self::BusyRxAackNoClk
                | Self::StateTransition
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_states_round_trip_through_command_codes() {
        for state in [
            HardwareRadioState::TrxOff,
            HardwareRadioState::RxOn,
            HardwareRadioState::PllOn,
            HardwareRadioState::RxAackOn,
            HardwareRadioState::TxAretOn,
        ] {
            let code = state.command().unwrap();
            assert_eq!(HardwareRadioState::from_status(code), state);
        }
    }

    #[test]
    fn test_transient_states_cannot_be_commanded() {
        assert_eq!(HardwareRadioState::BusyTx.command(), None);
        assert_eq!(HardwareRadioState::StateTransition.command(), None);
        assert_eq!(HardwareRadioState::Sleep.command(), None);
        assert!(HardwareRadioState::BusyRxAack.is_busy());
        assert!(!HardwareRadioState::RxAackOn.is_busy());
    }

    #[test]
    fn test_status_codes_decode_to_themselves() {
        for status in 0..0x20u8 {
            assert_eq!(HardwareRadioState::from_status(status).status(), status);
        }
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        assert_eq!(
            HardwareRadioState::from_status(0x0a),
            HardwareRadioState::Unknown(0x0a)
        );
    }
}

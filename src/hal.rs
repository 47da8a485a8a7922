//! Hardware interfaces consumed by the MAC.
//!
//! The MAC never touches peripherals directly. It talks to the transceiver through
//! [`RadioInterface`], schedules its send and mode-switch instants through
//! [`TdmaTimer`], and reflects protocol state on the board through [`IoBoard`].
//!
//! All three are assumed synchronous and non-reentrant: only the event loop calls
//! them. Interrupt handlers feed the MAC through [`crate::isr::TdmaShared`] instead.

use crate::registers::SubRegister;

/// Register, pin and frame-buffer access to an AT86RF23x transceiver.
///
/// See [`crate::spi::SpiRadio`] for an implementation over `embedded-hal` SPI.
pub trait RadioInterface {
    /// Error returned by bus or pin accesses.
    type Error: core::fmt::Debug;

    /// Brings the interface itself into a known state (pins idle, bus ready).
    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Reads one register.
    fn read_register(&mut self, addr: u8) -> Result<u8, Self::Error>;

    /// Writes one register.
    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Self::Error>;

    /// Reads a bit field of a register.
    fn read_subregister(&mut self, sr: SubRegister) -> Result<u8, Self::Error> {
        let value = self.read_register(sr.addr)?;
        Ok((value & sr.mask) >> sr.shift)
    }

    /// Writes a bit field of a register, leaving the other bits untouched.
    fn write_subregister(&mut self, sr: SubRegister, value: u8) -> Result<(), Self::Error> {
        let current = self.read_register(sr.addr)?;
        let updated = (current & !sr.mask) | ((value << sr.shift) & sr.mask);
        self.write_register(sr.addr, updated)
    }

    /// Drives the SLP_TR line. `true` puts the transceiver to sleep.
    fn set_sleep(&mut self, asleep: bool) -> Result<(), Self::Error>;

    /// Read-back of the SLP_TR line.
    fn is_asleep(&mut self) -> bool;

    /// Drives the RST line. `true` holds the transceiver in reset.
    fn set_reset(&mut self, active: bool) -> Result<(), Self::Error>;

    /// Writes a frame (PSDU including the two FCS bytes) into the frame buffer.
    fn write_frame_buffer(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Reads the last received frame into `buf`, returning its length.
    fn read_frame_buffer(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// The capture/compare timer unit that paces the TDMA cycle.
///
/// Arming a compare value overwrites the previous target; nothing already armed
/// can be cancelled.
pub trait TdmaTimer {
    /// Arms the send compare-match. When it fires the hardware starts the uploaded frame.
    fn set_send_compare(&mut self, at: u32);

    /// Currently armed send compare value.
    ///
    /// A client returns what it last passed to [`TdmaTimer::set_send_compare`]. The
    /// coordinator never arms it; there this is the compare value of the running
    /// cycle timer, i.e. the instant the next beacon goes out.
    fn send_compare(&self) -> u32;

    /// Arms the TX-mode timer, whose expiry is reported as
    /// [`crate::mac::MacEvent::TxModeTimerExpired`].
    fn set_tx_mode_timer(&mut self, at: u32);

    /// Starts the coordinator's free-running cycle timer with the given period.
    fn start_cycle(&mut self, period: u32);

    /// Resets the hardware cycle counter to zero.
    fn reset_counter(&mut self);
}

/// The node's IO board: an 8-bit output bank, an 8-bit input bank and a status LED.
///
/// See [`crate::ioboard::PinBank`] for an implementation over `embedded-hal` pins.
pub trait IoBoard {
    /// Sets every output; bit `n` drives output `n`, `1` meaning on.
    fn set_outputs(&mut self, value: u8);

    /// Last value written with [`IoBoard::set_outputs`].
    fn outputs(&self) -> u8;

    /// Samples every input; bit `n` is `1` while input `n` is pressed.
    fn inputs(&mut self) -> u8;

    /// Switches the heartbeat LED.
    fn set_status_led(&mut self, on: bool);
}

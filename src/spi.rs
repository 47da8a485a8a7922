//! AT86RF231 access over an `embedded-hal` SPI device.
//!
//! Every transfer starts with a command byte:
//!
//! | Access          | First byte       |
//! |-----------------|------------------|
//! | register read   | `0x80 \| addr`   |
//! | register write  | `0xc0 \| addr`   |
//! | frame read      | `0x20`           |
//! | frame write     | `0x60`           |
//!
//! Frame buffer transfers carry the PHR (frame length) as their second byte.

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::consts::MAX_FRAME_LEN;
use crate::error::BusError;
use crate::hal::RadioInterface;

const REGISTER_READ: u8 = 0x80;
const REGISTER_WRITE: u8 = 0xc0;
const REGISTER_ADDR_MASK: u8 = 0x3f;
const FRAME_READ: u8 = 0x20;
const FRAME_WRITE: u8 = 0x60;

fn spi_err<E: spi::Error>(e: E) -> BusError {
    BusError::Spi(e.kind())
}

fn pin_err<E: digital::Error>(e: E) -> BusError {
    BusError::Pin(e.kind())
}

/// [`RadioInterface`] over an SPI device plus the SLP_TR and RST control lines.
///
/// The sleep state is read back from the last level driven on SLP_TR.
#[derive(Debug)]
pub struct SpiRadio<SPI, SLP, RST> {
    /// SPI device with the transceiver's chip select.
    pub spi: SPI,
    /// SLP_TR line.
    pub slp_tr: SLP,
    /// RST line (active low).
    pub rst: RST,
    asleep: bool,
}

impl<SPI, SLP, RST> SpiRadio<SPI, SLP, RST>
where
    SPI: SpiDevice,
    SLP: OutputPin,
    RST: OutputPin,
{
    /// Wraps the bus and control lines. No pin is touched until [`RadioInterface::init`].
    pub fn new(spi: SPI, slp_tr: SLP, rst: RST) -> Self {
        Self {
            spi,
            slp_tr,
            rst,
            asleep: false,
        }
    }

    /// Releases the bus and pins.
    pub fn release(self) -> (SPI, SLP, RST) {
        (self.spi, self.slp_tr, self.rst)
    }
}

impl<SPI, SLP, RST> RadioInterface for SpiRadio<SPI, SLP, RST>
where
    SPI: SpiDevice,
    SLP: OutputPin,
    RST: OutputPin,
{
    type Error = BusError;

    fn init(&mut self) -> Result<(), BusError> {
        self.rst.set_high().map_err(pin_err)?;
        self.set_sleep(false)
    }

    fn read_register(&mut self, addr: u8) -> Result<u8, BusError> {
        let mut buf = [REGISTER_READ | (addr & REGISTER_ADDR_MASK), 0];
        self.spi.transfer_in_place(&mut buf).map_err(spi_err)?;
        Ok(buf[1])
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), BusError> {
        self.spi
            .write(&[REGISTER_WRITE | (addr & REGISTER_ADDR_MASK), value])
            .map_err(spi_err)
    }

    fn set_sleep(&mut self, asleep: bool) -> Result<(), BusError> {
        if asleep {
            self.slp_tr.set_high().map_err(pin_err)?;
        } else {
            self.slp_tr.set_low().map_err(pin_err)?;
        }
        self.asleep = asleep;
        Ok(())
    }

    fn is_asleep(&mut self) -> bool {
        self.asleep
    }

    fn set_reset(&mut self, active: bool) -> Result<(), BusError> {
        if active {
            self.rst.set_low().map_err(pin_err)
        } else {
            self.rst.set_high().map_err(pin_err)
        }
    }

    fn write_frame_buffer(&mut self, frame: &[u8]) -> Result<(), BusError> {
        let frame = &frame[..frame.len().min(MAX_FRAME_LEN)];
        let header = [FRAME_WRITE, frame.len() as u8];
        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Write(frame)])
            .map_err(spi_err)
    }

    fn read_frame_buffer(&mut self, buf: &mut [u8]) -> Result<usize, BusError> {
        // PHR, PSDU, LQI
        let mut raw = [0u8; MAX_FRAME_LEN + 2];
        self.spi
            .transaction(&mut [Operation::Write(&[FRAME_READ]), Operation::Read(&mut raw)])
            .map_err(spi_err)?;
        let len = (raw[0] as usize).min(MAX_FRAME_LEN).min(buf.len());
        buf[..len].copy_from_slice(&raw[1..=len]);
        Ok(len)
    }
}

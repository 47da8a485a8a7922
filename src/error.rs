//! Error types reported by the transceiver and its bus backend.

use thiserror::Error;

/// Failure of a transceiver operation.
///
/// None of these are fatal to the MAC: the event loop logs them and carries on in
/// whatever state the radio ended up in.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RadioError {
    /// The requested target is not one of the five stable transceiver states.
    #[error("requested transceiver state is not a valid transition target")]
    InvalidArgument,
    /// The transceiver is sleeping (SLP_TR high) and cannot change state.
    #[error("transceiver is asleep")]
    WrongState,
    /// The transceiver did not report the requested state after the settle delay.
    #[error("transceiver did not reach the requested state")]
    TimedOut,
    /// The register or frame-buffer access itself failed.
    #[error("transceiver interface access failed")]
    Interface,
}

/// Failure on the SPI or control-pin side of [`crate::spi::SpiRadio`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// An SPI transaction failed.
    #[error("spi transfer failed: {0:?}")]
    Spi(embedded_hal::spi::ErrorKind),
    /// Driving SLP_TR or RST failed.
    #[error("control pin failed: {0:?}")]
    Pin(embedded_hal::digital::ErrorKind),
}

//! IO board made of discrete `embedded-hal` pins.
//!
//! The board carries eight LEDs wired active-low and eight push buttons pulled up
//! to VCC, so a pressed button reads low. Pin `n` of each bank maps to bit `n`.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::hal::IoBoard;

/// Number of pins in each bank.
pub const BANK_WIDTH: usize = 8;

/// [`IoBoard`] over an LED bank, a button bank and a status LED.
#[derive(Debug)]
pub struct PinBank<LED, BTN, STATUS>
where
    LED: OutputPin,
    BTN: InputPin,
    STATUS: OutputPin,
{
    /// Output LEDs, active low.
    pub leds: [LED; BANK_WIDTH],
    /// Buttons, low while pressed.
    pub buttons: [BTN; BANK_WIDTH],
    /// Heartbeat LED, active high.
    pub status: STATUS,
    outputs: u8,
}

impl<LED, BTN, STATUS> PinBank<LED, BTN, STATUS>
where
    LED: OutputPin,
    BTN: InputPin,
    STATUS: OutputPin,
{
    /// Wraps the pins. All LEDs are switched off.
    pub fn new(leds: [LED; BANK_WIDTH], buttons: [BTN; BANK_WIDTH], status: STATUS) -> Self {
        let mut bank = Self {
            leds,
            buttons,
            status,
            outputs: 0xff,
        };
        bank.set_outputs(0);
        bank
    }
}

impl<LED, BTN, STATUS> IoBoard for PinBank<LED, BTN, STATUS>
where
    LED: OutputPin,
    BTN: InputPin,
    STATUS: OutputPin,
{
    fn set_outputs(&mut self, value: u8) {
        for (bit, led) in self.leds.iter_mut().enumerate() {
            let _ = if value & (1 << bit) != 0 {
                led.set_low()
            } else {
                led.set_high()
            };
        }
        self.outputs = value;
    }

    fn outputs(&self) -> u8 {
        self.outputs
    }

    fn inputs(&mut self) -> u8 {
        self.buttons
            .iter_mut()
            .enumerate()
            .fold(0, |acc, (bit, button)| {
                if button.is_low().unwrap_or(false) {
                    acc | (1 << bit)
                } else {
                    acc
                }
            })
    }

    fn set_status_led(&mut self, on: bool) {
        let _ = if on {
            self.status.set_high()
        } else {
            self.status.set_low()
        };
    }
}

//! Instrumented fakes of the hardware interfaces, for unit tests.

use embedded_hal::delay::DelayNs;

use crate::hal::{IoBoard, RadioInterface, TdmaTimer};
use crate::registers::{
    CMD_FORCE_PLL_ON, CMD_FORCE_TRX_OFF, HardwareRadioState, RG_MAN_ID_0, RG_PART_NUM,
    RG_TRX_STATE, RG_TRX_STATUS, RG_VERSION_NUM,
};

/// Bus failure injected through [`FakeRadio::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeBusError;

/// Register-level model of the AT86RF231 state machine.
///
/// State commands move the model immediately, except the two direct transitions
/// the chip refuses (RX_AACK_ON to TX_ARET_ON and back), which are counted in
/// `illegal` and leave the state unchanged.
#[derive(Debug)]
pub struct FakeRadio {
    pub regs: [u8; 0x40],
    pub state: HardwareRadioState,
    pub asleep: bool,
    pub in_reset: bool,
    /// TRX_CMD values in the order written.
    pub commands: Vec<u8>,
    /// States entered, in order.
    pub trail: Vec<HardwareRadioState>,
    pub illegal: usize,
    /// Frames written to the frame buffer.
    pub uploads: Vec<Vec<u8>>,
    /// Frame returned by the next frame buffer read.
    pub rx_frame: Vec<u8>,
    /// Status reads that report STATE_TRANSITION before the real state.
    pub busy_reads: u32,
    /// Ignore state commands.
    pub frozen: bool,
    /// Fail every access.
    pub fail: bool,
}

impl FakeRadio {
    pub fn new() -> Self {
        let mut regs = [0u8; 0x40];
        regs[RG_PART_NUM as usize] = 0x03;
        regs[RG_VERSION_NUM as usize] = 0x02;
        regs[RG_MAN_ID_0 as usize] = 0x1f;
        Self {
            regs,
            state: HardwareRadioState::PowerOn,
            asleep: false,
            in_reset: false,
            commands: Vec::new(),
            trail: Vec::new(),
            illegal: 0,
            uploads: Vec::new(),
            rx_frame: Vec::new(),
            busy_reads: 0,
            frozen: false,
            fail: false,
        }
    }

    /// A radio already sitting in `state`.
    pub fn in_state(state: HardwareRadioState) -> Self {
        Self {
            state,
            ..Self::new()
        }
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.regs[addr as usize]
    }

    fn enter(&mut self, state: HardwareRadioState) {
        self.state = state;
        self.trail.push(state);
    }

    fn command(&mut self, cmd: u8) {
        self.commands.push(cmd);
        if self.frozen {
            return;
        }
        let target = match cmd {
            CMD_FORCE_TRX_OFF => HardwareRadioState::TrxOff,
            CMD_FORCE_PLL_ON => HardwareRadioState::PllOn,
            other => HardwareRadioState::from_status(other),
        };
        if target.command().is_none() {
            return;
        }
        let refused = matches!(
            (self.state, target),
            (HardwareRadioState::RxAackOn, HardwareRadioState::TxAretOn)
                | (HardwareRadioState::TxAretOn, HardwareRadioState::RxAackOn)
        );
        if refused {
            self.illegal += 1;
        } else {
            self.enter(target);
        }
    }
}

impl RadioInterface for FakeRadio {
    type Error = FakeBusError;

    fn read_register(&mut self, addr: u8) -> Result<u8, FakeBusError> {
        if self.fail {
            return Err(FakeBusError);
        }
        if addr == RG_TRX_STATUS {
            if self.busy_reads > 0 {
                self.busy_reads -= 1;
                return Ok(HardwareRadioState::StateTransition.status());
            }
            return Ok(self.state.status());
        }
        Ok(self.reg(addr))
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), FakeBusError> {
        if self.fail {
            return Err(FakeBusError);
        }
        self.regs[addr as usize] = value;
        if addr == RG_TRX_STATE {
            self.command(value & 0x1f);
        }
        Ok(())
    }

    fn set_sleep(&mut self, asleep: bool) -> Result<(), FakeBusError> {
        if asleep {
            self.enter(HardwareRadioState::Sleep);
        } else if self.state == HardwareRadioState::Sleep {
            self.enter(HardwareRadioState::TrxOff);
        }
        self.asleep = asleep;
        Ok(())
    }

    fn is_asleep(&mut self) -> bool {
        self.asleep
    }

    fn set_reset(&mut self, active: bool) -> Result<(), FakeBusError> {
        if self.in_reset && !active {
            self.enter(HardwareRadioState::TrxOff);
        }
        self.in_reset = active;
        Ok(())
    }

    fn write_frame_buffer(&mut self, frame: &[u8]) -> Result<(), FakeBusError> {
        if self.fail {
            return Err(FakeBusError);
        }
        self.uploads.push(frame.to_vec());
        Ok(())
    }

    fn read_frame_buffer(&mut self, buf: &mut [u8]) -> Result<usize, FakeBusError> {
        if self.fail {
            return Err(FakeBusError);
        }
        let len = self.rx_frame.len().min(buf.len());
        buf[..len].copy_from_slice(&self.rx_frame[..len]);
        Ok(len)
    }
}

/// Delay that only adds up the requested time.
#[derive(Debug, Default)]
pub struct CountingDelay {
    pub total_ns: u64,
}

impl CountingDelay {
    pub fn total_us(&self) -> u64 {
        self.total_ns / 1_000
    }
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

/// Records every timer request.
#[derive(Debug, Default)]
pub struct FakeTimer {
    pub compare: u32,
    pub tx_mode: Vec<u32>,
    pub cycle: Option<u32>,
    pub counter_resets: u32,
}

impl TdmaTimer for FakeTimer {
    fn set_send_compare(&mut self, at: u32) {
        self.compare = at;
    }

    fn send_compare(&self) -> u32 {
        self.compare
    }

    fn set_tx_mode_timer(&mut self, at: u32) {
        self.tx_mode.push(at);
    }

    fn start_cycle(&mut self, period: u32) {
        self.cycle = Some(period);
    }

    fn reset_counter(&mut self) {
        self.counter_resets += 1;
    }
}

/// IO board with settable buttons and recorded outputs.
#[derive(Debug, Default)]
pub struct FakeIo {
    pub outputs: u8,
    pub buttons: u8,
    pub status_led: bool,
    pub status_history: Vec<bool>,
}

impl IoBoard for FakeIo {
    fn set_outputs(&mut self, value: u8) {
        self.outputs = value;
    }

    fn outputs(&self) -> u8 {
        self.outputs
    }

    fn inputs(&mut self) -> u8 {
        self.buttons
    }

    fn set_status_led(&mut self, on: bool) {
        self.status_led = on;
        self.status_history.push(on);
    }
}

//! DIV/TIMA/TMA/TAC, modelled as a 16-bit free-running counter.
//!
//! `system_counter` increments once per M-cycle and feeds a falling-edge
//! detector into TIMA. DIV is the upper bits of that same counter, not a
//! separate register.
use thiserror::Error;
use tracing::{instrument, trace};

use crate::state::{require_len, StateError};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("unknown timer register: 0x{0:04X}")]
    UnknownRegister(u16),
}

const TAC_ENABLE: u8 = 0b100;
const TAC_SELECT: u8 = 0b011;

/// The TIMA-overflow-to-reload pipeline.
///
/// `Inactive` is the resting state, `Pending` is set the M-cycle TIMA overflows
/// and persists across a `tick()` call boundary (this is the window where
/// TMA/TIMA writes take effect specially), `Due` is a transient intermediate
/// only reachable by loading serialized state mid-pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Inactive,
    Due,
    Pending,
}

impl ReloadState {
    const fn to_store_byte(self) -> u8 {
        match self {
            Self::Inactive => 0,
            Self::Due => 1,
            Self::Pending => 2,
        }
    }

    /// Anything outside `{0, 1, 2}` clamps to `Inactive` rather than being rejected.
    const fn from_store_byte(byte: u8) -> Self {
        match byte {
            1 => Self::Due,
            2 => Self::Pending,
            _ => Self::Inactive,
        }
    }
}

/// 12-byte little-endian record: counter(2), sub-cycle(1), TIMA(1), TMA(1),
/// TAC(1), reload state(1), 6 reserved zero bytes.
pub const STATE_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    system_counter: u16,
    sub_cycle_counter: u8,
    tima: u8,
    tma: u8,
    tac: u8,
    reload_delay: ReloadState,
    prev_bit: bool,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            system_counter: 0,
            sub_cycle_counter: 0,
            tima: 0,
            tma: 0,
            tac: 0,
            reload_delay: ReloadState::Inactive,
            prev_bit: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    const fn enabled(self) -> bool {
        self.tac & TAC_ENABLE != 0
    }

    const fn select_bit(self) -> u32 {
        match self.tac & TAC_SELECT {
            0b00 => 7,
            0b01 => 1,
            0b10 => 3,
            _ => 5,
        }
    }

    const fn signal(self) -> bool {
        self.enabled() && (self.system_counter >> self.select_bit()) & 1 != 0
    }

    fn increment_tima(&mut self) {
        let (new_tima, overflowed) = self.tima.overflowing_add(1);
        self.tima = new_tima;
        if overflowed {
            self.reload_delay = ReloadState::Pending;
        }
    }

    /// Advance the reload pipeline and the edge detector by exactly one M-cycle,
    /// returning whether the timer IRQ fired during this M-cycle.
    fn advance_one_mcycle(&mut self) -> bool {
        let mut irq = false;
        if self.reload_delay == ReloadState::Pending {
            self.reload_delay = ReloadState::Due;
        }
        if self.reload_delay == ReloadState::Due {
            self.tima = self.tma;
            self.reload_delay = ReloadState::Inactive;
            irq = true;
        }
        self.system_counter = self.system_counter.wrapping_add(1);
        let new_bit = self.signal();
        if self.prev_bit && !new_bit {
            self.increment_tima();
        }
        self.prev_bit = new_bit;
        irq
    }

    /// Re-sample the edge detector around a register write that can change
    /// `signal()` without advancing `system_counter` (DIV reset, TAC write). Also
    /// nudges an in-flight reload forward a slot so the write can't double-fire it.
    fn observe_edge(&mut self, old_signal: bool) {
        if self.reload_delay == ReloadState::Pending {
            self.reload_delay = ReloadState::Due;
        }
        let new_signal = self.signal();
        if old_signal && !new_signal {
            self.increment_tima();
        }
        self.prev_bit = new_signal;
    }

    /// Advance the timer by `t_cycles` T-cycles, returning whether the timer
    /// interrupt was asserted at any point during the call.
    #[instrument(skip(self), level = "trace")]
    pub fn tick(&mut self, t_cycles: u32) -> bool {
        let total = t_cycles + u32::from(self.sub_cycle_counter);
        self.sub_cycle_counter = (total % 4) as u8;
        let mut irq = false;
        for _ in 0..total / 4 {
            if self.advance_one_mcycle() {
                irq = true;
            }
        }
        if irq {
            trace!("timer interrupt raised");
        }
        irq
    }

    fn write_div(&mut self) {
        let old_signal = self.signal();
        self.system_counter = 0;
        self.sub_cycle_counter = 0;
        self.observe_edge(old_signal);
    }

    fn write_tima(&mut self, value: u8) {
        if matches!(self.reload_delay, ReloadState::Pending | ReloadState::Due) {
            self.reload_delay = ReloadState::Inactive;
        }
        self.tima = value;
    }

    fn write_tma(&mut self, value: u8) {
        self.tma = value;
        if matches!(self.reload_delay, ReloadState::Pending | ReloadState::Due) {
            self.tima = value;
        }
    }

    fn write_tac(&mut self, value: u8) {
        let old_signal = self.signal();
        self.tac = value & (TAC_ENABLE | TAC_SELECT);
        self.observe_edge(old_signal);
    }

    #[instrument(skip(self), level = "trace")]
    pub fn read(&self, addr: u16) -> Result<u8, TimerError> {
        match addr {
            0xFF04 => Ok((self.system_counter >> 6) as u8),
            0xFF05 => Ok(self.tima),
            0xFF06 => Ok(self.tma),
            0xFF07 => Ok(self.tac | 0xF8),
            _ => Err(TimerError::UnknownRegister(addr)),
        }
    }

    #[instrument(skip(self), level = "debug")]
    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), TimerError> {
        match addr {
            0xFF04 => self.write_div(),
            0xFF05 => self.write_tima(value),
            0xFF06 => self.write_tma(value),
            0xFF07 => self.write_tac(value),
            _ => return Err(TimerError::UnknownRegister(addr)),
        }
        Ok(())
    }

    #[must_use]
    pub fn serialize(&self) -> [u8; STATE_LEN] {
        let mut buf = [0u8; STATE_LEN];
        buf[0..2].copy_from_slice(&self.system_counter.to_le_bytes());
        buf[2] = self.sub_cycle_counter & 0b11;
        buf[3] = self.tima;
        buf[4] = self.tma;
        buf[5] = self.tac;
        buf[6] = self.reload_delay.to_store_byte();
        buf
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self, StateError> {
        require_len(buf, STATE_LEN)?;
        let mut timer = Self {
            system_counter: u16::from_le_bytes([buf[0], buf[1]]),
            sub_cycle_counter: buf[2] & 0b11,
            tima: buf[3],
            tma: buf[4],
            tac: buf[5] & (TAC_ENABLE | TAC_SELECT),
            reload_delay: ReloadState::from_store_byte(buf[6]),
            prev_bit: false,
        };
        timer.prev_bit = timer.signal();
        Ok(timer)
    }
}

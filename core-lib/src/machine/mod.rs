//! The composition root: owns the CPU and MMU, drives the step loop.
//!
//! The MMU in turn owns the Timer and Joypad once attached. This module also
//! defines "frame" for callers since there's no PPU here to vsync against.
//! Single-threaded and synchronous throughout: a `step`/`run_frames` call
//! always runs to completion, with no internal scheduler or suspension point.
use thiserror::Error;
use tracing::{instrument, trace};

use crate::cpu::Cpu;
use crate::interrupts::InterruptFlag;
use crate::joypad::{Button, Joypad};
use crate::mmu::Mmu;
use crate::state::{require_len, StateError};
use crate::timer::{self, Timer};

/// T-cycles in one 59.7 Hz frame; with no PPU to vsync against, this is the
/// unit `run_frames` budgets against so "frame" stays a meaningful concept.
pub const T_CYCLES_PER_FRAME: u32 = 70224;

const MAGIC: [u8; 4] = *b"GBCE";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 4 + 1 + 4 * 4;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MachineError {
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Debug)]
pub struct Machine {
    cpu: Cpu,
    mmu: Mmu,
}

impl Machine {
    /// Builds a Machine with a ROM loaded and Timer/Joypad attached in their
    /// boot state, ready to run from the documented post-boot-ROM PC (0x0100).
    #[must_use]
    pub fn new(rom: &[u8]) -> Self {
        let mut mmu = Mmu::new();
        mmu.load_rom(rom);
        mmu.attach_timer(Timer::new());
        mmu.attach_joypad(Joypad::new());
        Self {
            cpu: Cpu::new(),
            mmu,
        }
    }

    pub fn reset(&mut self) {
        self.cpu.reset();
        self.mmu.reset();
    }

    #[must_use]
    pub const fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    #[must_use]
    pub const fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    /// Runs exactly one CPU instruction (or one 4-T-cycle tick while halted
    /// or hard-locked), then ticks the Timer by the cycles just charged.
    /// Per the documented ordering, a Timer IRQ raised by that tick becomes
    /// visible to the *next* `step`'s interrupt dispatch, never this one's.
    pub fn step(&mut self) -> u32 {
        let cycles = self.cpu.step(&mut self.mmu);
        self.mmu.tick_timer(cycles);
        cycles
    }

    /// Runs for exactly `frames` frames worth of T-cycles. Instructions are
    /// never interrupted mid-execution, so the final step of the budget may
    /// overshoot by up to 24 T-cycles (the longest opcode).
    #[instrument(skip(self), level = "trace")]
    pub fn run_frames(&mut self, frames: u32) {
        let budget = u64::from(frames) * u64::from(T_CYCLES_PER_FRAME);
        let mut spent = 0u64;
        while spent < budget {
            spent += u64::from(self.step());
        }
        trace!(frames, spent, "ran frames");
    }

    pub fn press_button(&mut self, button: Button) {
        self.mmu.press_button(button);
    }

    pub fn release_button(&mut self, button: Button) {
        self.mmu.release_button(button);
    }

    pub fn request_interrupt(&mut self, flag: InterruptFlag) {
        self.mmu.request_interrupt(flag.bit());
    }

    /// `{magic, version, sizes[]}` header followed by the CPU/MMU/Timer/Joypad
    /// sub-records concatenated in that order. ROM is never included: it is
    /// reprovided to `deserialize` the same way `Mmu::deserialize` requires it.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let cpu_bytes = self.cpu.serialize();
        let mmu_bytes = self.mmu.serialize();
        let timer_bytes = self.mmu.timer().map(Timer::serialize).unwrap_or_default();
        let joypad_bytes = self
            .mmu
            .joypad()
            .map(Joypad::serialize)
            .unwrap_or_default();

        let mut buf = Vec::with_capacity(HEADER_LEN + mmu_bytes.len() + cpu_bytes.len());
        buf.extend_from_slice(&MAGIC);
        buf.push(FORMAT_VERSION);
        for len in [
            cpu_bytes.len(),
            mmu_bytes.len(),
            timer_bytes.len(),
            joypad_bytes.len(),
        ] {
            buf.extend_from_slice(&(len as u32).to_le_bytes());
        }
        buf.extend_from_slice(&cpu_bytes);
        buf.extend_from_slice(&mmu_bytes);
        buf.extend_from_slice(&timer_bytes);
        buf.extend_from_slice(&joypad_bytes);
        buf
    }

    pub fn deserialize(buf: &[u8], rom: &[u8]) -> Result<Self, MachineError> {
        require_len(buf, HEADER_LEN)?;
        if buf[0..4] != MAGIC {
            return Err(StateError::VersionMismatch {
                expected: FORMAT_VERSION,
                got: 0,
            }
            .into());
        }
        if buf[4] != FORMAT_VERSION {
            return Err(StateError::VersionMismatch {
                expected: FORMAT_VERSION,
                got: buf[4],
            }
            .into());
        }
        let mut sizes = [0usize; 4];
        for (i, size) in sizes.iter_mut().enumerate() {
            let start = 5 + i * 4;
            *size = u32::from_le_bytes(buf[start..start + 4].try_into().unwrap_or_default()) as usize;
        }
        let [cpu_len, mmu_len, timer_len, joypad_len] = sizes;
        require_len(buf, HEADER_LEN + cpu_len + mmu_len + timer_len + joypad_len)?;

        let mut offset = HEADER_LEN;
        let mut take = |len: usize| {
            let slice = &buf[offset..offset + len];
            offset += len;
            slice
        };

        let cpu = Cpu::deserialize(take(cpu_len))?;
        let mmu_record = take(mmu_len).to_vec();
        let timer_record = take(timer_len).to_vec();
        let joypad_record = take(joypad_len).to_vec();

        let mut mmu = Mmu::deserialize(&mmu_record, Some(rom))?;
        if timer_len == timer::STATE_LEN {
            mmu.attach_timer(Timer::deserialize(&timer_record)?);
        }
        if joypad_len == 1 {
            let bytes: [u8; 1] = joypad_record.try_into().unwrap_or([0]);
            mmu.attach_joypad(Joypad::deserialize(&bytes));
        }

        Ok(Self { cpu, mmu })
    }
}

//! The dispatch "tables" for the base and CB-prefixed opcode sets.
//!
//! The SM83 encoding groups most opcodes by bit pattern (register index in
//! the low bits, operation family in the middle bits), so rather than 256
//! separately named functions wired into a literal array, `execute` is one
//! exhaustive match: literal arms for the irregular single opcodes, guarded
//! arms for the regular families. The compiler lowers this to the same
//! jump-table codegen a `[fn; 256]` array would get.
mod alu;
mod cb;
mod helpers;
mod jump;
mod load_store;

use crate::cpu::Cpu;
use crate::mmu::Mmu;

/// Executes one base-table opcode (never `0xCB` or an illegal opcode; the
/// caller in [`crate::cpu::Cpu::step`] filters both before reaching here) and
/// returns its charged T-cycles.
pub(crate) fn execute(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> u32 {
    match opcode {
        0x00 => jump::nop(cpu, mmu, opcode),
        0x02 => load_store::ld_bc_a(cpu, mmu, opcode),
        0x07 => alu::rlca(cpu, mmu, opcode),
        0x08 => load_store::ld_a16_sp(cpu, mmu, opcode),
        0x0A => load_store::ld_a_bc(cpu, mmu, opcode),
        0x0F => alu::rrca(cpu, mmu, opcode),
        0x10 => jump::stop(cpu, mmu, opcode),
        0x12 => load_store::ld_de_a(cpu, mmu, opcode),
        0x17 => alu::rla(cpu, mmu, opcode),
        0x18 => jump::jr_r8(cpu, mmu, opcode),
        0x1A => load_store::ld_a_de(cpu, mmu, opcode),
        0x1F => alu::rra(cpu, mmu, opcode),
        0x22 => load_store::ld_hli_a(cpu, mmu, opcode),
        0x27 => alu::daa(cpu, mmu, opcode),
        0x2A => load_store::ld_a_hli(cpu, mmu, opcode),
        0x2F => alu::cpl(cpu, mmu, opcode),
        0x32 => load_store::ld_hld_a(cpu, mmu, opcode),
        0x37 => alu::scf(cpu, mmu, opcode),
        0x3A => load_store::ld_a_hld(cpu, mmu, opcode),
        0x3F => alu::ccf(cpu, mmu, opcode),
        0x76 => jump::halt(cpu, mmu, opcode),
        0xC3 => jump::jp_nn(cpu, mmu, opcode),
        0xC9 => jump::ret(cpu, mmu, opcode),
        0xCD => jump::call_nn(cpu, mmu, opcode),
        0xD9 => jump::reti(cpu, mmu, opcode),
        0xE0 => load_store::ldh_a8_a(cpu, mmu, opcode),
        0xE2 => load_store::ldh_c_a(cpu, mmu, opcode),
        0xE8 => alu::add_sp_r8(cpu, mmu, opcode),
        0xE9 => jump::jp_hl(cpu, mmu, opcode),
        0xEA => load_store::ld_a16_a(cpu, mmu, opcode),
        0xF0 => load_store::ldh_a_a8(cpu, mmu, opcode),
        0xF2 => load_store::ldh_a_c(cpu, mmu, opcode),
        0xF3 => jump::di(cpu, mmu, opcode),
        0xF8 => alu::ld_hl_sp_r8(cpu, mmu, opcode),
        0xF9 => load_store::ld_sp_hl(cpu, mmu, opcode),
        0xFA => load_store::ld_a_a16(cpu, mmu, opcode),
        0xFB => jump::ei(cpu, mmu, opcode),

        x if x & 0xCF == 0x01 => load_store::ld_rr_d16(cpu, mmu, opcode),
        x if x & 0xCF == 0x03 => alu::inc_r16(cpu, mmu, opcode),
        x if x & 0xCF == 0x09 => alu::add_hl_r16(cpu, mmu, opcode),
        x if x & 0xCF == 0x0B => alu::dec_r16(cpu, mmu, opcode),
        x if x & 0xC7 == 0x04 => alu::inc_r(cpu, mmu, opcode),
        x if x & 0xC7 == 0x05 => alu::dec_r(cpu, mmu, opcode),
        x if x & 0xC7 == 0x06 => load_store::ld_r_d8(cpu, mmu, opcode),
        x if x & 0xE7 == 0x20 => jump::jr_cc_r8(cpu, mmu, opcode),
        x if x & 0xC0 == 0x40 => load_store::ld_r_r(cpu, mmu, opcode),
        x if x & 0xC0 == 0x80 => alu::alu_r(cpu, mmu, opcode),
        x if x & 0xE7 == 0xC0 => jump::ret_cc(cpu, mmu, opcode),
        x if x & 0xCF == 0xC1 => jump::pop(cpu, mmu, opcode),
        x if x & 0xE7 == 0xC2 => jump::jp_cc_nn(cpu, mmu, opcode),
        x if x & 0xE7 == 0xC4 => jump::call_cc_nn(cpu, mmu, opcode),
        x if x & 0xCF == 0xC5 => jump::push(cpu, mmu, opcode),
        x if x & 0xC7 == 0xC6 => alu::alu_d8(cpu, mmu, opcode),
        x if x & 0xC7 == 0xC7 => jump::rst(cpu, mmu, opcode),

        _ => unreachable!("opcode {opcode:#04X} is illegal and filtered before dispatch"),
    }
}

/// Executes one CB-prefixed opcode. Every one of the 256 values is legal.
pub(crate) fn execute_cb(cpu: &mut Cpu, mmu: &mut Mmu, opcode: u8) -> u32 {
    cb::execute(cpu, mmu, opcode)
}

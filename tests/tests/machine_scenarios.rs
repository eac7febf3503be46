use anyhow::Result;
use core_lib::{Button, InterruptFlag, Machine};
use pretty_assertions::assert_eq;

fn rom_with(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
    rom
}

#[test]
fn every_unprefixed_and_cb_opcode_runs_without_panicking() {
    for opcode in 0x00u8..=0xFF {
        let mut machine = Machine::new(&rom_with(&[opcode]));
        machine.step();

        let mut machine = Machine::new(&rom_with(&[0xCB, opcode]));
        machine.step();
    }
}

#[test]
fn dma_copies_the_full_oam_block_through_the_machine() {
    let mut machine = Machine::new(&rom_with(&[]));
    for i in 0u16..0xA0 {
        machine.mmu_mut().write_byte(0xC000 + i, (i * 3) as u8);
    }
    machine.mmu_mut().write_byte(0xFF46, 0xC0);
    for i in 0u16..0xA0 {
        assert_eq!(machine.mmu().read_byte(0xFE00 + i), (i * 3) as u8);
    }
}

#[test]
fn writable_regions_read_back_every_byte_written() {
    let mut machine = Machine::new(&rom_with(&[]));
    for addr in [0x8000u16, 0x9FFF, 0xA000, 0xBFFF, 0xC000, 0xDFFF, 0xFE00, 0xFE9F, 0xFF80, 0xFFFE] {
        for value in [0x00u8, 0x55, 0xAA, 0xFF] {
            machine.mmu_mut().write_byte(addr, value);
            assert_eq!(machine.mmu().read_byte(addr), value, "addr {addr:#06X}");
        }
    }
}

#[test]
fn wram_and_its_echo_region_share_the_same_backing_bytes() {
    let mut machine = Machine::new(&rom_with(&[]));
    machine.mmu_mut().write_byte(0xC123, 0x42);
    assert_eq!(machine.mmu().read_byte(0xE123), 0x42);

    machine.mmu_mut().write_byte(0xE456, 0x99);
    assert_eq!(machine.mmu().read_byte(0xC456), 0x99);
}

#[test]
fn oam_unusable_region_always_reads_high_regardless_of_writes() {
    let mut machine = Machine::new(&rom_with(&[]));
    machine.mmu_mut().write_byte(0xFEA5, 0x00);
    assert_eq!(machine.mmu().read_byte(0xFEA5), 0xFF);
}

#[test]
fn pressing_a_button_then_running_a_frame_services_the_joypad_interrupt() {
    let mut machine = Machine::new(&rom_with(&[0xF3])); // DI, so the handler never actually runs
    machine.mmu_mut().write_byte(0xFFFF, InterruptFlag::Joypad.bit());
    machine.press_button(Button::Start);
    machine.step();
    assert_eq!(
        machine.mmu().read_byte(0xFF0F) & InterruptFlag::Joypad.bit(),
        InterruptFlag::Joypad.bit()
    );
}

#[test]
fn reset_is_idempotent() {
    let rom = rom_with(&[0x3C, 0x3C, 0x3C]); // INC A x3
    let mut machine = Machine::new(&rom);
    machine.step();
    machine.step();
    machine.reset();
    let first = machine.serialize();
    machine.reset();
    let second = machine.serialize();
    assert_eq!(first, second);
}

#[test]
fn full_machine_round_trip_survives_a_hard_lock() -> Result<()> {
    let rom = rom_with(&[0xED]); // illegal opcode
    let mut machine = Machine::new(&rom);
    machine.step();
    assert!(machine.cpu().hard_locked);

    let bytes = machine.serialize();
    let restored = Machine::deserialize(&bytes, &rom)?;
    assert!(restored.cpu().hard_locked);
    assert_eq!(restored.cpu().regs.pc, machine.cpu().regs.pc);
    Ok(())
}

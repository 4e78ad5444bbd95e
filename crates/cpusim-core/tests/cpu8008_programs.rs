//! Hand-assembled 8008 programs run from RAM with a scripted port device.

#[cfg(feature = "serde")]
use serde as _;
use proptest as _;
use thiserror as _;
use tracing as _;

use std::sync::Arc;

use cpusim_core::cpu8008::{
    FLAG_CARRY, FLAG_PARITY, FLAG_SIGN, FLAG_ZERO, REG_A, REG_B, REG_C, REG_D, REG_E, REG_H,
    REG_L, REG_M,
};
use cpusim_core::{
    Address, Bus, BusDevice, Cpu, Cpu8008, DeviceKind, Enabler, ErrorKind, MemoryDevice,
    SimError, StopReason,
};
use parking_lot::Mutex;
use rstest::rstest;

/// Input ports 0-7 read `C0 | port`; output ports 8-31 are captured.
#[derive(Clone, Default)]
struct ScriptedPorts {
    out: Arc<Mutex<[u8; 32]>>,
}

impl BusDevice for ScriptedPorts {
    fn name(&self) -> &str {
        "ports"
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Port
    }

    fn has_address(&self, addr: Address) -> bool {
        addr < 32
    }

    fn read(&mut self, addr: Address) -> Result<u8, SimError> {
        match u8::try_from(addr) {
            Ok(port) if port < 8 => Ok(0xC0 | port),
            _ => Err(SimError::invalid_address("ports", addr)),
        }
    }

    fn write(&mut self, addr: Address, value: u8) -> Result<(), SimError> {
        let mut out = self.out.lock();
        match out.get_mut(usize::from(addr)) {
            Some(slot) if addr >= 8 => {
                *slot = value;
                Ok(())
            }
            _ => Err(SimError::invalid_address("ports", addr)),
        }
    }
}

struct Rig {
    cpu: Cpu8008,
    bus: Bus,
    ports: ScriptedPorts,
}

impl Rig {
    fn new(image: &[(Address, &[u8])]) -> Self {
        let mut bytes = vec![0u8; 0x400];
        for (origin, chunk) in image {
            let start = usize::from(*origin);
            bytes[start..start + chunk.len()].copy_from_slice(chunk);
        }
        let mut ram = MemoryDevice::new("ram", DeviceKind::Ram, 0, 0x3FFF, false, Enabler::Always);
        ram.load(&bytes);
        let ports = ScriptedPorts::default();

        let mut bus = Bus::new();
        bus.add_memory(ram);
        bus.add_port(ports.clone());
        Self {
            cpu: Cpu8008::new("cpu"),
            bus,
            ports,
        }
    }

    fn run(&mut self) {
        let outcome = self.cpu.run_steps(&mut self.bus, 10_000).expect("program runs");
        assert_eq!(outcome.stop, StopReason::Halted, "program did not halt");
    }

    fn reg(&mut self, index: usize) -> u8 {
        self.cpu.reg(&mut self.bus, index).expect("register")
    }
}

#[test]
fn seven_level_call_chain_unwinds() {
    let mut program = vec![
        0x1E, 0x45, // MVI D, 45h
        0x26, 0x54, // MVI E, 54h
        0x46, 0x08, 0x00, // CALL 0008h
        0x00, // HLT
    ];
    // Six nested levels: INR D ; CALL next ; INR E ; RET
    for level in 1u8..=6 {
        let next = 0x08 + 6 * level;
        program.extend_from_slice(&[0x18, 0x46, next, 0x00, 0x20, 0x07]);
    }
    // MOV B, D ; MOV C, E ; RET
    program.extend_from_slice(&[0xCB, 0xD4, 0x07]);

    let mut rig = Rig::new(&[(0x000, &program)]);
    rig.run();
    assert_eq!(rig.reg(REG_B), 0x4B);
    assert_eq!(rig.reg(REG_C), 0x54);
    assert_eq!(rig.reg(REG_D), 0x4B);
    assert_eq!(rig.reg(REG_E), 0x5A);
    assert_eq!(rig.cpu.stack().pointer(), 0);
}

#[test]
fn immediate_logical_group() {
    let program = [
        0x06, 0x12, 0x24, 0x03, 0xC8, // MVI A, 12h ; ANI 03h ; MOV B, A
        0x06, 0x34, 0x34, 0x01, 0xD0, // MVI A, 34h ; ORI 01h ; MOV C, A
        0x06, 0x56, 0x2C, 0x33, 0xD8, // MVI A, 56h ; XRI 33h ; MOV D, A
        0x06, 0x78, 0x3C, 0x78, // MVI A, 78h ; CPI 78h
        0x00,
    ];
    let mut rig = Rig::new(&[(0x000, &program)]);
    rig.run();
    assert_eq!(rig.reg(REG_A), 0x78);
    assert_eq!(rig.reg(REG_B), 0x02);
    assert_eq!(rig.reg(REG_C), 0x35);
    assert_eq!(rig.reg(REG_D), 0x65);
    assert_eq!(rig.reg(FLAG_ZERO), 1);
}

#[test]
fn register_logical_group() {
    let program = [
        0x06, 0x12, 0x0E, 0x03, 0xA1, 0xC8, // MVI A, 12h ; MVI B, 03h ; ANA B ; MOV B, A
        0x06, 0x34, 0x16, 0x01, 0xB2, 0xD0, // MVI A, 34h ; MVI C, 01h ; ORA C ; MOV C, A
        0x06, 0x56, 0x1E, 0x33, 0xAB, 0xD8, // MVI A, 56h ; MVI D, 33h ; XRA D ; MOV D, A
        0x06, 0x78, 0x3C, 0x78, // MVI A, 78h ; CPI 78h
        0x00,
    ];
    let mut rig = Rig::new(&[(0x000, &program)]);
    rig.run();
    assert_eq!(rig.reg(REG_A), 0x78);
    assert_eq!(rig.reg(REG_B), 0x02);
    assert_eq!(rig.reg(REG_C), 0x35);
    assert_eq!(rig.reg(REG_D), 0x65);
    assert_eq!(rig.reg(FLAG_ZERO), 1);
}

#[rstest]
// MVI A, F0h ; ADI 20h
#[case(&[0x06, 0xF0, 0x04, 0x20], 0x10, [1, 0, 0, 0])]
// MVI A, 05h ; SUI 07h
#[case(&[0x06, 0x05, 0x14, 0x07], 0xFE, [1, 0, 1, 0])]
// MVI A, FFh ; ADI 01h ; ACI 00h
#[case(&[0x06, 0xFF, 0x04, 0x01, 0x0C, 0x00], 0x01, [0, 0, 0, 0])]
// MVI A, 00h ; SUI 01h ; SBI 00h
#[case(&[0x06, 0x00, 0x14, 0x01, 0x1C, 0x00], 0xFE, [0, 0, 1, 0])]
// MVI A, 03h ; MVI B, 05h ; ADD B
#[case(&[0x06, 0x03, 0x0E, 0x05, 0x81], 0x08, [0, 0, 0, 0])]
// MVI A, 03h ; ORA A
#[case(&[0x06, 0x03, 0xB0], 0x03, [0, 0, 0, 1])]
// MVI A, 10h ; CPI 20h
#[case(&[0x06, 0x10, 0x3C, 0x20], 0x10, [1, 0, 1, 1])]
fn arithmetic_results_and_flags(#[case] code: &[u8], #[case] acc: u8, #[case] flags: [u8; 4]) {
    let mut program = code.to_vec();
    program.push(0x00);
    let mut rig = Rig::new(&[(0x000, &program)]);
    rig.run();
    assert_eq!(rig.reg(REG_A), acc);
    let got = [FLAG_CARRY, FLAG_ZERO, FLAG_SIGN, FLAG_PARITY].map(|flag| rig.reg(flag));
    assert_eq!(got, flags, "C Z S P");
}

#[test]
fn input_ports() {
    // IN 3 ; HLT
    let mut rig = Rig::new(&[(0x000, &[0x47, 0x00])]);
    rig.run();
    assert_eq!(rig.reg(REG_A), 0xC3);
}

#[test]
fn every_output_port_is_reachable() {
    let mut program = Vec::new();
    for (port, value) in (8u8..32).zip(0xA0u8..) {
        // MVI A, value ; OUT port
        program.extend_from_slice(&[0x06, value, 0x41 | (port << 1)]);
    }
    program.push(0x00);

    let mut rig = Rig::new(&[(0x000, &program)]);
    rig.run();
    let out = *rig.ports.out.lock();
    for (port, value) in (8usize..32).zip(0xA0u8..) {
        assert_eq!(out[port], value, "port {port:02X}");
    }
}

#[test]
fn rotate_without_carry() {
    let program = [
        0x06, 0x01, 0x02, 0xC8, // MVI A, 1 ; RLC ; MOV B, A
        0x0A, 0xD0, // RRC ; MOV C, A
        0x06, 0x80, 0x02, 0xD8, // MVI A, 80h ; RLC ; MOV D, A
        0x0A, 0xE0, // RRC ; MOV E, A
        0x00,
    ];
    let mut rig = Rig::new(&[(0x000, &program)]);
    rig.run();
    assert_eq!(rig.reg(REG_B), 0x02);
    assert_eq!(rig.reg(REG_C), 0x01);
    assert_eq!(rig.reg(REG_D), 0x01);
    assert_eq!(rig.reg(REG_E), 0x80);
}

#[rstest]
#[case(0x12, 0x80, false, 0x00, true)] // RAL
#[case(0x12, 0x40, true, 0x81, false)] // RAL
#[case(0x1A, 0x01, false, 0x00, true)] // RAR
#[case(0x1A, 0x04, true, 0x82, false)] // RAR
fn rotate_through_carry(
    #[case] opcode: u8,
    #[case] acc: u8,
    #[case] carry: bool,
    #[case] acc_out: u8,
    #[case] carry_out: bool,
) {
    // MVI A, acc ; <rotate> ; HLT
    let mut rig = Rig::new(&[(0x000, &[0x06, acc, opcode, 0x00])]);
    rig.cpu
        .set_reg(&mut rig.bus, FLAG_CARRY, u8::from(carry))
        .expect("carry");
    rig.run();
    assert_eq!(rig.reg(REG_A), acc_out);
    assert_eq!(rig.reg(FLAG_CARRY), u8::from(carry_out));
}

#[test]
fn restart_vectors() {
    // Each vector loads its register then returns.
    let handlers: [(Address, [u8; 3]); 7] = [
        (0x08, [0x0E, 0x02, 0x07]),
        (0x10, [0x16, 0x03, 0x07]),
        (0x18, [0x1E, 0x04, 0x07]),
        (0x20, [0x26, 0x05, 0x07]),
        (0x28, [0x2E, 0x06, 0x07]),
        (0x30, [0x36, 0x07, 0x07]),
        (0x38, [0x06, 0x08, 0x07]),
    ];
    let mut image: Vec<(Address, &[u8])> = vec![
        // JMP 0040h
        (0x000, &[0x44, 0x40, 0x00][..]),
        // RST 1..7 ; HLT
        (0x040, &[0x0D, 0x15, 0x1D, 0x25, 0x2D, 0x35, 0x3D, 0x00][..]),
    ];
    image.extend(handlers.iter().map(|(addr, code)| (*addr, &code[..])));

    let mut rig = Rig::new(&image);
    rig.run();
    let regs = [REG_B, REG_C, REG_D, REG_E, REG_H, REG_L, REG_A].map(|r| rig.reg(r));
    assert_eq!(regs, [2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn counted_loop_with_conditional_jump() {
    let program = [
        0x0E, 0x05, // MVI B, 5
        0x06, 0x00, // MVI A, 0
        0x04, 0x03, // loop: ADI 3
        0x09, // DCR B
        0x48, 0x04, 0x00, // JNZ loop
        0x00,
    ];
    let mut rig = Rig::new(&[(0x000, &program)]);
    rig.run();
    assert_eq!(rig.reg(REG_A), 15);
    assert_eq!(rig.reg(REG_B), 0);
}

#[test]
fn conditional_call_and_return() {
    let mut rig = Rig::new(&[
        // MVI A, 0 ; ORA A ; CZ 0010h ; CNZ 0020h ; HLT
        (0x000, &[0x06, 0x00, 0xB0, 0x6A, 0x10, 0x00, 0x4A, 0x20, 0x00, 0x00]),
        // MVI B, 1 ; RZ ; MVI B, 2 ; RET
        (0x010, &[0x0E, 0x01, 0x2B, 0x0E, 0x02, 0x07]),
        // MVI C, 1 ; RET
        (0x020, &[0x16, 0x01, 0x07]),
    ]);
    rig.run();
    assert_eq!(rig.reg(REG_B), 1);
    assert_eq!(rig.reg(REG_C), 0);
}

#[test]
fn memory_register_goes_through_hl() {
    let program = [
        0x2E, 0x10, 0x36, 0x20, // MVI H, 10h ; MVI L, 20h
        0x3E, 0x5A, // MVI M, 5Ah
        0xCF, 0x08, 0xF9, // MOV B, M ; INR B ; MOV M, B
        0x00,
    ];
    let mut rig = Rig::new(&[(0x000, &program)]);
    rig.run();
    assert_eq!(rig.cpu.hl(), 0x1020);
    assert_eq!(rig.reg(REG_M), 0x5B);
    assert_eq!(rig.bus.read_memory(0x1020), Ok(0x5B));
}

#[test]
fn undefined_opcode_stops_the_run() {
    // MVI A, 1 ; <22>
    let mut rig = Rig::new(&[(0x000, &[0x06, 0x01, 0x22])]);
    let err = rig.cpu.run_steps(&mut rig.bus, 10).expect_err("invalid");
    assert_eq!(err.kind(), ErrorKind::InvalidOpcode);
    assert_eq!(rig.cpu.pc(), 3);
}

#[test]
fn return_on_empty_stack_underflows() {
    let mut rig = Rig::new(&[(0x000, &[0x07])]);
    let err = rig.cpu.step(&mut rig.bus).expect_err("underflow");
    assert_eq!(err.kind(), ErrorKind::StackUnderflow);
}

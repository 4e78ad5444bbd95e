//! Intel 8008 engine.
//!
//! Register indices follow the instruction encoding: A, B, C, D, E, H, L,
//! then M (the byte at `H:L`, masked to 14 bits), followed by the carry,
//! zero, sign and parity flags. Fetches see the whole memory map without a
//! visibility filter.

/// Opcode table and field extraction.
pub mod decode;
pub use decode::{decode, Op8008, OPCODE_TABLE};

/// Flags and accumulator arithmetic.
pub mod alu;
pub use alu::{AluOp, Flags8008, RotateOp};

/// Disassembler.
pub mod disasm;
pub use disasm::disassemble;

mod execute;

use std::fmt;

use crate::{Address, Bus, CallStack, Cpu, SimError, StepOutcome, TraceSink};

/// Accumulator index.
pub const REG_A: usize = 0;
/// Register B index.
pub const REG_B: usize = 1;
/// Register C index.
pub const REG_C: usize = 2;
/// Register D index.
pub const REG_D: usize = 3;
/// Register E index.
pub const REG_E: usize = 4;
/// Register H index.
pub const REG_H: usize = 5;
/// Register L index.
pub const REG_L: usize = 6;
/// Memory pseudo-register index.
pub const REG_M: usize = 7;
/// Carry flag index.
pub const FLAG_CARRY: usize = 8;
/// Zero flag index.
pub const FLAG_ZERO: usize = 9;
/// Sign flag index.
pub const FLAG_SIGN: usize = 10;
/// Parity flag index.
pub const FLAG_PARITY: usize = 11;
/// Total addressable register indices.
pub const REGISTER_COUNT: usize = 12;
/// Return stack depth.
pub const STACK_DEPTH: usize = 8;
/// 14-bit address mask.
pub const ADDRESS_MASK: Address = 0x3FFF;

const GENERAL_REGISTERS: usize = 7;
const REGISTER_NAMES: [&str; REGISTER_COUNT] =
    ["A", "B", "C", "D", "E", "H", "L", "M", "CF", "ZF", "SF", "PF"];

/// Plain copy of the 8008 register file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Snapshot8008 {
    /// A, B, C, D, E, H, L.
    pub regs: [u8; GENERAL_REGISTERS],
    /// Condition flags.
    pub flags: Flags8008,
    /// Program counter.
    pub pc: Address,
    /// Return stack.
    pub stack: CallStack<STACK_DEPTH>,
    /// Halt latch.
    pub halted: bool,
}

/// 8008 CPU state.
pub struct Cpu8008 {
    name: String,
    regs: [u8; GENERAL_REGISTERS],
    flags: Flags8008,
    pc: Address,
    stack: CallStack<STACK_DEPTH>,
    halted: bool,
    trace: Option<Box<dyn TraceSink>>,
}

impl Cpu8008 {
    /// Creates a reset CPU.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regs: [0; GENERAL_REGISTERS],
            flags: Flags8008::default(),
            pc: 0,
            stack: CallStack::default(),
            halted: false,
            trace: None,
        }
    }

    /// Register name for an index, e.g. `"H"` or `"CF"`.
    #[must_use]
    pub fn register_name(index: usize) -> Option<&'static str> {
        REGISTER_NAMES.get(index).copied()
    }

    /// Address held in `H:L`, masked to 14 bits.
    #[must_use]
    pub fn hl(&self) -> Address {
        u16::from_be_bytes([self.regs[REG_H], self.regs[REG_L]]) & ADDRESS_MASK
    }

    /// Reads a register by index. M reads memory through `bus`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidRegister`] for indices past
    /// [`FLAG_PARITY`], or the bus error of an M read.
    pub fn reg(&self, bus: &mut Bus, index: usize) -> Result<u8, SimError> {
        match index {
            0..GENERAL_REGISTERS => Ok(self.regs[index]),
            REG_M => bus.read_memory(self.hl()),
            FLAG_CARRY => Ok(u8::from(self.flags.carry)),
            FLAG_ZERO => Ok(u8::from(self.flags.zero)),
            FLAG_SIGN => Ok(u8::from(self.flags.sign)),
            FLAG_PARITY => Ok(u8::from(self.flags.parity)),
            _ => Err(SimError::invalid_register(&self.name, index)),
        }
    }

    /// Writes a register by index. M writes memory through `bus`; flags take
    /// bit 0 of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidRegister`] for indices past
    /// [`FLAG_PARITY`], or the bus error of an M write.
    pub fn set_reg(&mut self, bus: &mut Bus, index: usize, value: u8) -> Result<(), SimError> {
        let bit = value & 1 != 0;
        match index {
            0..GENERAL_REGISTERS => self.regs[index] = value,
            REG_M => bus.write_memory(self.hl(), value)?,
            FLAG_CARRY => self.flags.carry = bit,
            FLAG_ZERO => self.flags.zero = bit,
            FLAG_SIGN => self.flags.sign = bit,
            FLAG_PARITY => self.flags.parity = bit,
            _ => return Err(SimError::invalid_register(&self.name, index)),
        }
        Ok(())
    }

    /// Accumulator.
    #[must_use]
    pub const fn acc(&self) -> u8 {
        self.regs[REG_A]
    }

    /// Condition flags.
    #[must_use]
    pub const fn flags(&self) -> Flags8008 {
        self.flags
    }

    /// Return stack.
    #[must_use]
    pub const fn stack(&self) -> &CallStack<STACK_DEPTH> {
        &self.stack
    }

    /// Copies out the register file.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot8008 {
        Snapshot8008 {
            regs: self.regs,
            flags: self.flags,
            pc: self.pc,
            stack: self.stack.clone(),
            halted: self.halted,
        }
    }

    fn fetch(&mut self, bus: &mut Bus) -> Result<u8, SimError> {
        let byte = bus.read_memory(self.pc)?;
        self.pc = (self.pc + 1) & ADDRESS_MASK;
        Ok(byte)
    }
}

impl Cpu for Cpu8008 {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        self.regs = [0; GENERAL_REGISTERS];
        self.flags = Flags8008::default();
        self.pc = 0;
        self.stack = CallStack::default();
        self.halted = false;
    }

    fn step(&mut self, bus: &mut Bus) -> Result<StepOutcome, SimError> {
        if self.halted {
            return Ok(StepOutcome::Halted);
        }
        let pc = self.pc;
        let opcode = self.fetch(bus)?;
        let op = decode(opcode).ok_or_else(|| SimError::InvalidOpcode {
            device: self.name.clone(),
            opcode,
            pc,
        })?;
        let mut operands = [None; 2];
        for slot in operands.iter_mut().take(usize::from(op.len_bytes()) - 1) {
            *slot = Some(self.fetch(bus)?);
        }
        let [lo, hi] = operands;
        self.execute(bus, op, opcode, [lo.unwrap_or(0), hi.unwrap_or(0)])?;

        if self.trace.is_some() {
            let row = disassemble(opcode, lo, hi);
            let line = format!("{pc:04X}: [{opcode:02X} {opcode:08b}] {:<14} {self}", row.text());
            if let Some(sink) = self.trace.as_mut() {
                sink.trace(&line);
            }
        }

        Ok(if self.halted {
            StepOutcome::Halted
        } else {
            StepOutcome::Retired
        })
    }

    fn pc(&self) -> Address {
        self.pc
    }

    fn set_pc(&mut self, pc: Address) {
        self.pc = pc & ADDRESS_MASK;
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.trace = sink;
    }
}

impl fmt::Display for Cpu8008 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in REGISTER_NAMES.iter().zip(self.regs) {
            write!(f, "{name}={value:02X} ")?;
        }
        write!(
            f,
            "CF={} ZF={} SF={} PF={}",
            u8::from(self.flags.carry),
            u8::from(self.flags.zero),
            u8::from(self.flags.sign),
            u8::from(self.flags.parity)
        )
    }
}

impl fmt::Debug for Cpu8008 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu8008")
            .field("name", &self.name)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceKind, Enabler, ErrorKind, MemoryDevice, TraceBuffer};

    fn bus_with_ram() -> Bus {
        let mut bus = Bus::new();
        bus.add_memory(MemoryDevice::new("RAM", DeviceKind::Ram, 0, 0x3FFF, false, Enabler::Always));
        bus
    }

    #[test]
    fn memory_register_goes_through_hl() {
        let mut bus = bus_with_ram();
        let mut cpu = Cpu8008::new("cpu");
        cpu.set_reg(&mut bus, REG_H, 0xD2).expect("h");
        cpu.set_reg(&mut bus, REG_L, 0x34).expect("l");
        assert_eq!(cpu.hl(), 0x1234);

        cpu.set_reg(&mut bus, REG_M, 0x5A).expect("m");
        assert_eq!(bus.read_memory(0x1234), Ok(0x5A));
        assert_eq!(cpu.reg(&mut bus, REG_M), Ok(0x5A));
    }

    #[test]
    fn register_indices_are_range_checked() {
        let mut bus = bus_with_ram();
        let mut cpu = Cpu8008::new("cpu");
        assert_eq!(
            cpu.reg(&mut bus, REGISTER_COUNT).map_err(|e| e.kind()),
            Err(ErrorKind::InvalidRegister)
        );
        assert_eq!(
            cpu.set_reg(&mut bus, REGISTER_COUNT, 0).map_err(|e| e.kind()),
            Err(ErrorKind::InvalidRegister)
        );
    }

    #[test]
    fn flags_are_single_bits() {
        let mut bus = bus_with_ram();
        let mut cpu = Cpu8008::new("cpu");
        cpu.set_reg(&mut bus, FLAG_SIGN, 0xFF).expect("sign");
        assert_eq!(cpu.reg(&mut bus, FLAG_SIGN), Ok(1));
        assert!(cpu.flags().sign);
    }

    #[test]
    fn invalid_opcode_reports_its_address() {
        let mut bus = bus_with_ram();
        bus.write_memory(0, 0xC0).expect("nop");
        bus.write_memory(1, 0x22).expect("illegal");
        let mut cpu = Cpu8008::new("cpu");
        cpu.step(&mut bus).expect("mov a,a");
        let err = cpu.step(&mut bus).expect_err("illegal");
        assert_eq!(
            err,
            SimError::InvalidOpcode {
                device: "cpu".to_owned(),
                opcode: 0x22,
                pc: 1,
            }
        );
    }

    #[test]
    fn pc_wraps_at_fourteen_bits() {
        let mut bus = bus_with_ram();
        bus.write_memory(0x3FFF, 0xC0).expect("nop");
        let mut cpu = Cpu8008::new("cpu");
        cpu.set_pc(0xFFFF);
        assert_eq!(cpu.pc(), 0x3FFF);
        cpu.step(&mut bus).expect("step");
        assert_eq!(cpu.pc(), 0);
    }

    #[test]
    fn trace_line_shows_pc_opcode_and_mnemonic() {
        let mut bus = bus_with_ram();
        bus.write_memory(0, 0x06).expect("mvi");
        bus.write_memory(1, 0x2A).expect("imm");
        let buffer = TraceBuffer::new();
        let mut cpu = Cpu8008::new("cpu");
        cpu.set_trace_sink(Some(Box::new(buffer.clone())));
        cpu.step(&mut bus).expect("step");

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("0000: [06 00000110] MVI A, 2Ah"));
        assert!(lines[0].ends_with("A=2A B=00 C=00 D=00 E=00 H=00 L=00 CF=0 ZF=0 SF=0 PF=0"));
    }
}

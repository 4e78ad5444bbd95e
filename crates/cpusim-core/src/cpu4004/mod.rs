//! Intel 4004 engine.
//!
//! Register indices 0-15 are the scratch registers, followed by the
//! accumulator, the RAM control latch (CL), carry and the test input. Pair
//! index `p` in 0-7 joins R(2p) as the low nibble with R(2p+1) as the high
//! nibble; pair 8 is the SRC address latch (RC).
//!
//! Opcode fetches are restricted to ROM-kind devices. Data memory accesses
//! go to the RC address with RAM visibility, so the device answering them
//! is chosen by enablers watching CL.

/// Opcode table.
pub mod decode;
pub use decode::{decode, Op4004, OPCODE_TABLE};

/// Disassembler.
pub mod disasm;
pub use disasm::disassemble;

/// 8-bit peripheral adapter on the status lanes.
pub mod bus8bit;
pub use bus8bit::Bus8Bit;

/// ROM I/O port adapter.
pub mod romport;
pub use romport::RomPort;

mod execute;

use std::fmt;

use crate::{
    Address, Bus, ByteLatch, CallStack, Cpu, DeviceKind, Enabler, SimError, StepOutcome,
    TraceSink,
};

/// Scratch registers R0-R15.
pub const SCRATCH_REGISTERS: usize = 16;
/// Accumulator index.
pub const REG_ACC: usize = 16;
/// RAM control latch index.
pub const REG_CL: usize = 17;
/// Carry flag index.
pub const REG_CARRY: usize = 18;
/// Test input index.
pub const REG_TEST: usize = 19;
/// Total addressable register indices.
pub const REGISTER_COUNT: usize = 20;
/// Pseudo-pair naming the SRC address latch.
pub const PAIR_RC: usize = 8;
/// Return stack depth.
pub const STACK_DEPTH: usize = 3;
/// Program counter width mask.
pub const PC_MASK: Address = 0x0FFF;

/// Plain copy of the 4004 register file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Snapshot4004 {
    /// Scratch registers.
    pub regs: [u8; SCRATCH_REGISTERS],
    /// Accumulator.
    pub acc: u8,
    /// RAM control latch.
    pub cl: u8,
    /// Carry flag.
    pub carry: bool,
    /// Test input level.
    pub test: bool,
    /// SRC address latch.
    pub rc: u8,
    /// Program counter.
    pub pc: Address,
    /// Return stack.
    pub stack: CallStack<STACK_DEPTH>,
    /// Halt latch.
    pub halted: bool,
}

/// 4004 CPU state.
pub struct Cpu4004 {
    name: String,
    regs: [u8; SCRATCH_REGISTERS],
    acc: u8,
    cl: ByteLatch,
    carry: bool,
    test: bool,
    rc: u8,
    pc: Address,
    stack: CallStack<STACK_DEPTH>,
    halted: bool,
    trace: Option<Box<dyn TraceSink>>,
}

impl Cpu4004 {
    /// Creates a reset CPU.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regs: [0; SCRATCH_REGISTERS],
            acc: 0,
            cl: ByteLatch::new(0),
            carry: false,
            test: false,
            rc: 0,
            pc: 0,
            stack: CallStack::default(),
            halted: false,
            trace: None,
        }
    }

    /// Enabler that selects a device while CL equals `bank`.
    #[must_use]
    pub fn dcl_enabler(&self, bank: u8) -> Enabler {
        self.cl.match_enabler(bank)
    }

    /// Reads a register by index.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidRegister`] for indices past [`REG_TEST`].
    pub fn reg(&self, index: usize) -> Result<u8, SimError> {
        match index {
            0..SCRATCH_REGISTERS => Ok(self.regs[index]),
            REG_ACC => Ok(self.acc),
            REG_CL => Ok(self.cl.get()),
            REG_CARRY => Ok(u8::from(self.carry)),
            REG_TEST => Ok(u8::from(self.test)),
            _ => Err(SimError::invalid_register(&self.name, index)),
        }
    }

    /// Writes a register by index, truncated to its width.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidRegister`] for indices past [`REG_TEST`].
    pub fn set_reg(&mut self, index: usize, value: u8) -> Result<(), SimError> {
        match index {
            0..SCRATCH_REGISTERS => self.regs[index] = value & 0x0F,
            REG_ACC => self.acc = value & 0x0F,
            REG_CL => self.cl.set(value & 0x07),
            REG_CARRY => self.carry = value & 1 != 0,
            REG_TEST => self.test = value & 1 != 0,
            _ => return Err(SimError::invalid_register(&self.name, index)),
        }
        Ok(())
    }

    /// Reads a register pair as one byte, or RC for [`PAIR_RC`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidRegister`] for indices past [`PAIR_RC`].
    pub fn pair(&self, index: usize) -> Result<u8, SimError> {
        match index {
            PAIR_RC => Ok(self.rc),
            0..PAIR_RC => Ok((self.regs[2 * index + 1] << 4) | self.regs[2 * index]),
            _ => Err(SimError::invalid_register(&self.name, index)),
        }
    }

    /// Writes a register pair, or RC for [`PAIR_RC`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidRegister`] for indices past [`PAIR_RC`].
    pub fn set_pair(&mut self, index: usize, value: u8) -> Result<(), SimError> {
        match index {
            PAIR_RC => self.rc = value,
            0..PAIR_RC => {
                self.regs[2 * index] = value & 0x0F;
                self.regs[2 * index + 1] = value >> 4;
            }
            _ => return Err(SimError::invalid_register(&self.name, index)),
        }
        Ok(())
    }

    /// Accumulator.
    #[must_use]
    pub const fn acc(&self) -> u8 {
        self.acc
    }

    /// Carry flag.
    #[must_use]
    pub const fn carry(&self) -> bool {
        self.carry
    }

    /// Drives the TEST input pin.
    pub fn set_test(&mut self, level: bool) {
        self.test = level;
    }

    /// SRC address latch.
    #[must_use]
    pub const fn rc(&self) -> u8 {
        self.rc
    }

    /// RAM control latch.
    #[must_use]
    pub fn cl(&self) -> u8 {
        self.cl.get()
    }

    /// Return stack.
    #[must_use]
    pub const fn stack(&self) -> &CallStack<STACK_DEPTH> {
        &self.stack
    }

    /// Copies out the register file.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot4004 {
        Snapshot4004 {
            regs: self.regs,
            acc: self.acc,
            cl: self.cl.get(),
            carry: self.carry,
            test: self.test,
            rc: self.rc,
            pc: self.pc,
            stack: self.stack.clone(),
            halted: self.halted,
        }
    }

    fn fetch(&mut self, bus: &mut Bus) -> Result<u8, SimError> {
        bus.filter_kind(DeviceKind::Rom);
        let byte = bus.read_memory(self.pc)?;
        self.pc = (self.pc + 1) & PC_MASK;
        Ok(byte)
    }

    fn trace_line(&self, pc: Address, opcode: u8, operand: Option<u8>) -> String {
        let row = disassemble(opcode, operand);
        format!("{pc:03X}: [{opcode:02X} {opcode:08b}] {:<14} {self}", row.text())
    }
}

impl Cpu for Cpu4004 {
    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) {
        self.regs = [0; SCRATCH_REGISTERS];
        self.acc = 0;
        self.cl.set(0);
        self.carry = false;
        self.test = false;
        self.rc = 0;
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
        let operand = if op.len_bytes() == 2 {
            Some(self.fetch(bus)?)
        } else {
            None
        };
        self.execute(bus, op, opcode, operand.unwrap_or(0))?;

        if self.trace.is_some() {
            let line = self.trace_line(pc, opcode, operand);
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
        self.pc = pc & PC_MASK;
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.trace = sink;
    }
}

impl fmt::Display for Cpu4004 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={:X} C={} T={} CL={} RC={:02X} SP={} R=",
            self.acc,
            u8::from(self.carry),
            u8::from(self.test),
            self.cl.get(),
            self.rc,
            self.stack.pointer()
        )?;
        for reg in self.regs {
            write!(f, "{reg:X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Cpu4004 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu4004")
            .field("name", &self.name)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn register_indices_are_range_checked() {
        let mut cpu = Cpu4004::new("cpu");
        assert_eq!(
            cpu.reg(REGISTER_COUNT).map_err(|e| e.kind()),
            Err(ErrorKind::InvalidRegister)
        );
        assert_eq!(
            cpu.set_reg(REGISTER_COUNT, 1).map_err(|e| e.kind()),
            Err(ErrorKind::InvalidRegister)
        );
        assert_eq!(
            cpu.pair(PAIR_RC + 1).map_err(|e| e.kind()),
            Err(ErrorKind::InvalidRegister)
        );
    }

    #[test]
    fn registers_are_truncated_to_width() {
        let mut cpu = Cpu4004::new("cpu");
        cpu.set_reg(3, 0xFF).expect("scratch");
        cpu.set_reg(REG_CL, 0xFF).expect("cl");
        cpu.set_reg(REG_CARRY, 0xFF).expect("carry");
        assert_eq!(cpu.reg(3), Ok(0x0F));
        assert_eq!(cpu.reg(REG_CL), Ok(0x07));
        assert_eq!(cpu.reg(REG_CARRY), Ok(1));
    }

    #[test]
    fn rc_pseudo_pair_leaves_scratch_registers_alone() {
        let mut cpu = Cpu4004::new("cpu");
        cpu.set_pair(PAIR_RC, 0xE0).expect("rc");
        assert_eq!(cpu.rc(), 0xE0);
        assert!((0..SCRATCH_REGISTERS).all(|r| cpu.reg(r) == Ok(0)));
    }

    #[test]
    fn dcl_enabler_follows_cl_register() {
        let mut cpu = Cpu4004::new("cpu");
        let bank4 = cpu.dcl_enabler(4);
        assert!(!bank4.is_enabled());
        cpu.set_reg(REG_CL, 4).expect("cl");
        assert!(bank4.is_enabled());
        cpu.reset();
        assert!(!bank4.is_enabled());
    }

    proptest! {
        #[test]
        fn pair_writes_split_into_low_and_high_nibbles(pair in 0usize..8, value in any::<u8>()) {
            let mut cpu = Cpu4004::new("cpu");
            cpu.set_pair(pair, value).expect("pair");
            prop_assert_eq!(cpu.pair(pair), Ok(value));
            prop_assert_eq!(cpu.reg(2 * pair), Ok(value & 0x0F));
            prop_assert_eq!(cpu.reg(2 * pair + 1), Ok(value >> 4));
        }
    }
}

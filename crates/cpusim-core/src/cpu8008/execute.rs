use crate::{Address, Bus, SimError};

use super::alu::{AluOp, Flags8008, RotateOp};
use super::decode::{dst_field, port_field, src_field};
use super::{Cpu8008, Op8008, ADDRESS_MASK, REG_A, REG_M};

/// Little-endian 14-bit jump target.
const fn target(lo: u8, hi: u8) -> Address {
    u16::from_le_bytes([lo, hi]) & ADDRESS_MASK
}

impl Cpu8008 {
    /// Conditional forms: bits 4..3 pick the flag, bit 5 the wanted level.
    const fn condition_met(&self, opcode: u8) -> bool {
        self.flags.condition(opcode >> 3) == (opcode & 0x20 != 0)
    }

    fn call(&mut self, addr: Address) {
        self.stack.push(self.pc);
        self.pc = addr;
    }

    fn ret(&mut self) -> Result<(), SimError> {
        self.pc = self.stack.pop().ok_or_else(|| SimError::StackUnderflow {
            device: self.name.clone(),
        })?;
        Ok(())
    }

    fn step_register(&mut self, opcode: u8, delta: u8) -> Result<(), SimError> {
        let reg = dst_field(opcode);
        if reg == REG_A || reg == REG_M {
            return Err(SimError::invalid_register(&self.name, reg));
        }
        let value = self.regs[reg].wrapping_add(delta);
        self.regs[reg] = value;
        self.flags = Flags8008::from_result(value, self.flags.carry);
        Ok(())
    }

    fn accumulate(&mut self, opcode: u8, value: u8) {
        let (result, flags) = AluOp::from_opcode(opcode).apply(self.regs[REG_A], value, self.flags.carry);
        self.flags = flags;
        if let Some(result) = result {
            self.regs[REG_A] = result;
        }
    }

    pub(super) fn execute(
        &mut self,
        bus: &mut Bus,
        op: Op8008,
        opcode: u8,
        [lo, hi]: [u8; 2],
    ) -> Result<(), SimError> {
        match op {
            Op8008::Hlt => self.halted = true,
            Op8008::Mov => {
                let value = self.reg(bus, src_field(opcode))?;
                self.set_reg(bus, dst_field(opcode), value)?;
            }
            Op8008::Mvi => self.set_reg(bus, dst_field(opcode), lo)?,
            Op8008::Inr => self.step_register(opcode, 1)?,
            Op8008::Dcr => self.step_register(opcode, u8::MAX)?,
            Op8008::Alu => {
                let value = self.reg(bus, src_field(opcode))?;
                self.accumulate(opcode, value);
            }
            Op8008::AluImm => self.accumulate(opcode, lo),
            Op8008::Rotate => {
                let (acc, carry) = RotateOp::from_opcode(opcode).apply(self.regs[REG_A], self.flags.carry);
                self.regs[REG_A] = acc;
                self.flags.carry = carry;
            }
            Op8008::Jmp => self.pc = target(lo, hi),
            Op8008::Jcc => {
                if self.condition_met(opcode) {
                    self.pc = target(lo, hi);
                }
            }
            Op8008::Call => self.call(target(lo, hi)),
            Op8008::Ccc => {
                if self.condition_met(opcode) {
                    self.call(target(lo, hi));
                }
            }
            Op8008::Ret => self.ret()?,
            Op8008::Rcc => {
                if self.condition_met(opcode) {
                    self.ret()?;
                }
            }
            Op8008::Rst => self.call(Address::from(opcode & 0x38)),
            Op8008::In => self.regs[REG_A] = bus.read_port(Address::from(port_field(opcode)))?,
            Op8008::Out => bus.write_port(Address::from(port_field(opcode)), self.regs[REG_A])?,
        }
        Ok(())
    }
}

use crate::{Address, Bus, DeviceKind, SimError};

use super::{Cpu4004, Op4004, PC_MASK, REG_ACC};

/// KBP lookup: 0-4 pass through, everything above saturates at 15.
const KBP_TABLE: [u8; 16] = [0, 1, 2, 3, 4, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15, 15];

/// `acc + value + carry`; carry out set on nibble overflow.
pub(super) const fn add4(acc: u8, value: u8, carry: bool) -> (u8, bool) {
    let sum = (acc & 0x0F) + (value & 0x0F) + carry as u8;
    (sum & 0x0F, sum > 0x0F)
}

/// `acc - value` as `acc + !value + carry`; carry out clear means borrow.
pub(super) const fn sub4(acc: u8, value: u8, carry: bool) -> (u8, bool) {
    add4(acc, !value & 0x0F, carry)
}

/// Decimal adjust; carry only ever gets set, never cleared.
pub(super) const fn daa(acc: u8, carry: bool) -> (u8, bool) {
    if acc > 9 || carry {
        let sum = acc + 6;
        (sum & 0x0F, carry || sum > 0x0F)
    } else {
        (acc, carry)
    }
}

/// JCN condition: bit 3 inverts, bits 2..0 test acc == 0, carry, !test.
pub(super) const fn jcn_taken(condition: u8, acc: u8, carry: bool, test: bool) -> bool {
    let hit = (condition & 0x4 != 0 && acc == 0)
        || (condition & 0x2 != 0 && carry)
        || (condition & 0x1 != 0 && !test);
    hit != (condition & 0x8 != 0)
}

pub(super) const fn kbp(acc: u8) -> u8 {
    KBP_TABLE[(acc & 0x0F) as usize]
}

impl Cpu4004 {
    fn rc_addr(&self) -> Address {
        Address::from(self.rc)
    }

    fn page_jump(&mut self, low: u8) {
        self.pc = (self.pc & 0x0F00) | Address::from(low);
    }

    fn read_ram(&self, bus: &mut Bus) -> Result<u8, SimError> {
        bus.filter_kind(DeviceKind::Ram);
        Ok(bus.read_memory(self.rc_addr())? & 0x0F)
    }

    fn return_from_subroutine(&mut self) -> Result<(), SimError> {
        self.pc = self.stack.pop().ok_or_else(|| SimError::StackUnderflow {
            device: self.name.clone(),
        })?;
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    pub(super) fn execute(
        &mut self,
        bus: &mut Bus,
        op: Op4004,
        opcode: u8,
        operand: u8,
    ) -> Result<(), SimError> {
        let low = opcode & 0x0F;
        let reg = usize::from(low);
        let pair = usize::from(low >> 1);

        match op {
            Op4004::Nop => {}
            Op4004::Hlt => self.halted = true,
            Op4004::Jcn => {
                if jcn_taken(low, self.acc, self.carry, self.test) {
                    self.page_jump(operand);
                }
            }
            Op4004::Fim => self.set_pair(pair, operand)?,
            Op4004::Src => self.rc = self.pair(pair)?,
            Op4004::Fin => {
                let addr = (self.pc & 0x0F00) | Address::from(self.pair(0)?);
                bus.filter_kind(DeviceKind::Rom);
                let value = bus.read_memory(addr)?;
                self.set_pair(pair, value)?;
            }
            Op4004::Jin => {
                let target = self.pair(pair)?;
                self.page_jump(target);
            }
            Op4004::Jun => self.pc = ((Address::from(low) << 8) | Address::from(operand)) & PC_MASK,
            Op4004::Jms => {
                self.stack.push(self.pc);
                self.pc = ((Address::from(low) << 8) | Address::from(operand)) & PC_MASK;
            }
            Op4004::Inc => self.set_reg(reg, self.reg(reg)?.wrapping_add(1))?,
            Op4004::Isz => {
                let value = self.reg(reg)?.wrapping_add(1) & 0x0F;
                self.set_reg(reg, value)?;
                if value != 0 {
                    self.page_jump(operand);
                }
            }
            Op4004::Add => (self.acc, self.carry) = add4(self.acc, self.reg(reg)?, self.carry),
            Op4004::Sub => (self.acc, self.carry) = sub4(self.acc, self.reg(reg)?, self.carry),
            Op4004::Ld => self.acc = self.reg(reg)?,
            Op4004::Xch => {
                let value = self.reg(reg)?;
                self.set_reg(reg, self.acc)?;
                self.acc = value;
            }
            Op4004::Bbl => {
                self.return_from_subroutine()?;
                self.set_reg(REG_ACC, low)?;
            }
            Op4004::Ldm => self.acc = low,
            Op4004::Wrm => {
                bus.filter_kind(DeviceKind::Ram);
                bus.write_memory(self.rc_addr(), self.acc)?;
            }
            Op4004::Wmp => {
                bus.filter_kind(DeviceKind::RamPort);
                bus.write_memory(self.rc_addr(), self.acc)?;
            }
            Op4004::Wrr => {
                bus.filter_kind(DeviceKind::RomPort);
                bus.write_memory(self.rc_addr(), self.acc)?;
            }
            Op4004::WrStatus => {
                bus.filter_kind(DeviceKind::Ram);
                bus.write_memory_status(self.rc_addr(), opcode & 0x03, self.acc)?;
            }
            Op4004::Sbm => {
                let value = self.read_ram(bus)?;
                (self.acc, self.carry) = sub4(self.acc, value, self.carry);
            }
            Op4004::Rdm => self.acc = self.read_ram(bus)?,
            Op4004::Rdr => {
                bus.filter_kind(DeviceKind::RomPort);
                self.acc = bus.read_memory(self.rc_addr())? & 0x0F;
            }
            Op4004::Adm => {
                let value = self.read_ram(bus)?;
                (self.acc, self.carry) = add4(self.acc, value, self.carry);
            }
            Op4004::RdStatus => {
                bus.filter_kind(DeviceKind::Ram);
                self.acc = bus.read_memory_status(self.rc_addr(), opcode & 0x03)? & 0x0F;
            }
            Op4004::Clb => {
                self.acc = 0;
                self.carry = false;
            }
            Op4004::Clc => self.carry = false,
            Op4004::Iac => (self.acc, self.carry) = add4(self.acc, 1, false),
            Op4004::Cmc => self.carry = !self.carry,
            Op4004::Cma => self.acc = !self.acc & 0x0F,
            Op4004::Ral => {
                let out = self.acc & 0x08 != 0;
                self.acc = ((self.acc << 1) | u8::from(self.carry)) & 0x0F;
                self.carry = out;
            }
            Op4004::Rar => {
                let out = self.acc & 0x01 != 0;
                self.acc = (self.acc >> 1) | (u8::from(self.carry) << 3);
                self.carry = out;
            }
            Op4004::Tcc => {
                self.acc = u8::from(self.carry);
                self.carry = false;
            }
            Op4004::Dac => (self.acc, self.carry) = sub4(self.acc, 1, true),
            Op4004::Tcs => {
                self.acc = if self.carry { 10 } else { 9 };
                self.carry = false;
            }
            Op4004::Stc => self.carry = true,
            Op4004::Daa => (self.acc, self.carry) = daa(self.acc, self.carry),
            Op4004::Kbp => self.acc = kbp(self.acc),
            Op4004::Dcl => self.cl.set(self.acc & 0x07),
        }
        Ok(())
    }
}

//! Instruction disassembly shared by both CPU engines.
//!
//! Each engine provides a single-instruction `disassemble(opcode, operand)`;
//! this module holds the row type and walks ROM images into listings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{cpu4004, cpu8008, Address};

/// Instruction set selector for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Isa {
    /// 4-bit Intel 4004.
    I4004,
    /// 8-bit Intel 8008.
    I8008,
}

/// A single disassembled instruction row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the opcode byte.
    pub addr_start: Address,
    /// Length in bytes, opcode included.
    pub len_bytes: u8,
    /// Opcode followed by operand bytes.
    pub raw_bytes: Vec<u8>,
    /// Instruction mnemonic (e.g. "JCN", "MVI").
    pub mnemonic: String,
    /// Formatted operands (e.g. "R3, 1Ah"), empty when there are none.
    pub operands: String,
    /// Whether the opcode has no defined meaning.
    pub is_illegal: bool,
}

impl DisassemblyRow {
    /// Row for an opcode that decodes to nothing.
    #[must_use]
    pub fn illegal(opcode: u8) -> Self {
        Self {
            addr_start: 0,
            len_bytes: 1,
            raw_bytes: vec![opcode],
            mnemonic: ".byte".to_owned(),
            operands: format!("{opcode:02X}h ; ILLEGAL"),
            is_illegal: true,
        }
    }

    /// Mnemonic and operands joined for display.
    #[must_use]
    pub fn text(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.operands)
        }
    }
}

/// Formats an immediate operand, or `??` when it was not supplied.
pub(crate) fn hex_operand(operand: Option<u8>) -> String {
    operand.map_or_else(|| "??".to_owned(), |value| format!("{value:02X}h"))
}

/// Disassembles up to `count` instructions of `memory`, starting at `start`.
///
/// `memory[0]` is taken to sit at address 0. The walk stops early when an
/// instruction would run past the end of `memory`.
#[must_use]
pub fn disassemble_listing(isa: Isa, memory: &[u8], start: Address, count: usize) -> Vec<DisassemblyRow> {
    let mut rows = Vec::with_capacity(count);
    let mut pc = start;
    while rows.len() < count {
        let Some(&opcode) = memory.get(usize::from(pc)) else {
            break;
        };
        let len = match isa {
            Isa::I4004 => cpu4004::decode(opcode).map_or(1, cpu4004::Op4004::len_bytes),
            Isa::I8008 => cpu8008::decode(opcode).map_or(1, cpu8008::Op8008::len_bytes),
        };
        let tail = usize::from(pc) + 1..usize::from(pc) + usize::from(len);
        let Some(operands) = memory.get(tail) else {
            break;
        };
        let mut row = match isa {
            Isa::I4004 => cpu4004::disassemble(opcode, operands.first().copied()),
            Isa::I8008 => cpu8008::disassemble(opcode, operands.first().copied(), operands.get(1).copied()),
        };
        row.addr_start = pc;
        row.raw_bytes = memory[usize::from(pc)..usize::from(pc) + usize::from(len)].to_vec();
        rows.push(row);
        pc = pc.wrapping_add(Address::from(len));
    }
    rows
}

use crate::disasm::{hex_operand, DisassemblyRow};

use super::alu::{AluOp, RotateOp};
use super::decode::{dst_field, port_field, src_field};
use super::{decode, Op8008, ADDRESS_MASK};

const REGISTER_NAMES: [&str; 8] = ["A", "B", "C", "D", "E", "H", "L", "M"];
const FLAG_NAMES: [&str; 4] = ["C", "Z", "S", "P"];

fn condition_mnemonic(prefix: char, opcode: u8) -> String {
    let flag = FLAG_NAMES[usize::from((opcode >> 3) & 0x03)];
    if opcode & 0x20 != 0 {
        format!("{prefix}{flag}")
    } else {
        format!("{prefix}N{flag}")
    }
}

fn address_operand(lo: Option<u8>, hi: Option<u8>) -> String {
    match (lo, hi) {
        (Some(lo), Some(hi)) => format!("{:04X}h", u16::from_le_bytes([lo, hi]) & ADDRESS_MASK),
        _ => "????h".to_owned(),
    }
}

/// Disassembles one 8008 instruction.
///
/// `lo` and `hi` are the bytes following the opcode; immediates use `lo`,
/// addresses use both. Missing bytes print as `??`.
#[must_use]
pub fn disassemble(opcode: u8, lo: Option<u8>, hi: Option<u8>) -> DisassemblyRow {
    let Some(op) = decode(opcode) else {
        return DisassemblyRow::illegal(opcode);
    };
    let dst = REGISTER_NAMES[dst_field(opcode)];
    let src = REGISTER_NAMES[src_field(opcode)];

    let (mnemonic, operands) = match op {
        Op8008::Hlt => ("HLT".to_owned(), String::new()),
        Op8008::Mov => ("MOV".to_owned(), format!("{dst}, {src}")),
        Op8008::Mvi => ("MVI".to_owned(), format!("{dst}, {}", hex_operand(lo))),
        Op8008::Inr => ("INR".to_owned(), dst.to_owned()),
        Op8008::Dcr => ("DCR".to_owned(), dst.to_owned()),
        Op8008::Alu => (AluOp::from_opcode(opcode).mnemonic().to_owned(), src.to_owned()),
        Op8008::AluImm => (
            AluOp::from_opcode(opcode).immediate_mnemonic().to_owned(),
            hex_operand(lo),
        ),
        Op8008::Rotate => (RotateOp::from_opcode(opcode).mnemonic().to_owned(), String::new()),
        Op8008::Jmp => ("JMP".to_owned(), address_operand(lo, hi)),
        Op8008::Jcc => (condition_mnemonic('J', opcode), address_operand(lo, hi)),
        Op8008::Call => ("CALL".to_owned(), address_operand(lo, hi)),
        Op8008::Ccc => (condition_mnemonic('C', opcode), address_operand(lo, hi)),
        Op8008::Ret => ("RET".to_owned(), String::new()),
        Op8008::Rcc => (condition_mnemonic('R', opcode), String::new()),
        Op8008::Rst => ("RST".to_owned(), format!("{}", dst_field(opcode))),
        Op8008::In => ("IN".to_owned(), format!("{:02X}h", port_field(opcode))),
        Op8008::Out => ("OUT".to_owned(), format!("{:02X}h", port_field(opcode))),
    };

    let len = op.len_bytes();
    DisassemblyRow {
        addr_start: 0,
        len_bytes: len,
        raw_bytes: [Some(opcode), lo, hi]
            .into_iter()
            .take(usize::from(len))
            .flatten()
            .collect(),
        mnemonic,
        operands,
        is_illegal: false,
    }
}

use crate::disasm::{hex_operand, DisassemblyRow};

use super::{decode, Op4004};

/// Disassembles one 4004 instruction.
///
/// `operand` is the second byte of two-byte instructions; when it is missing
/// the operand prints as `??`.
#[must_use]
pub fn disassemble(opcode: u8, operand: Option<u8>) -> DisassemblyRow {
    let Some(op) = decode(opcode) else {
        return DisassemblyRow::illegal(opcode);
    };
    let low = opcode & 0x0F;
    let pair = low >> 1;

    let mut mnemonic = op.mnemonic().to_owned();
    let operands = match op {
        Op4004::Jcn => format!("{low:X}, {}", hex_operand(operand)),
        Op4004::Fim => format!("P{pair}, {}", hex_operand(operand)),
        Op4004::Src | Op4004::Fin | Op4004::Jin => format!("P{pair}"),
        Op4004::Jun | Op4004::Jms => match operand {
            Some(byte) => format!("{low:X}{byte:02X}h"),
            None => format!("{low:X}??h"),
        },
        Op4004::Inc | Op4004::Add | Op4004::Sub | Op4004::Ld | Op4004::Xch => format!("R{low}"),
        Op4004::Isz => format!("R{low}, {}", hex_operand(operand)),
        Op4004::Bbl | Op4004::Ldm => format!("{low}"),
        Op4004::WrStatus | Op4004::RdStatus => {
            mnemonic.push(char::from(b'0' + (opcode & 0x03)));
            String::new()
        }
        _ => String::new(),
    };

    DisassemblyRow {
        addr_start: 0,
        len_bytes: op.len_bytes(),
        raw_bytes: std::iter::once(opcode)
            .chain(operand.filter(|_| op.len_bytes() == 2))
            .collect(),
        mnemonic,
        operands,
        is_illegal: false,
    }
}

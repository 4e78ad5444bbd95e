//! Priority-ordered opcode classification for the 8008.
//!
//! The halt encodings overlap INR A, DCR A and MOV M,M, so they sit at the
//! head of the table.

/// Decoded 8008 operation. Register, condition and port fields stay in the
/// opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Op8008 {
    Hlt,
    Mov,
    Mvi,
    Inr,
    Dcr,
    Alu,
    AluImm,
    Rotate,
    Jmp,
    Jcc,
    Call,
    Ccc,
    Ret,
    Rcc,
    Rst,
    In,
    Out,
}

impl Op8008 {
    /// Instruction length in bytes, opcode included.
    #[must_use]
    pub const fn len_bytes(self) -> u8 {
        match self {
            Self::Mvi | Self::AluImm => 2,
            Self::Jmp | Self::Jcc | Self::Call | Self::Ccc => 3,
            _ => 1,
        }
    }
}

/// `(mask, bits, op)` rules; the first rule with `opcode & mask == bits` wins.
pub const OPCODE_TABLE: &[(u8, u8, Op8008)] = &[
    (0xFF, 0x00, Op8008::Hlt),
    (0xFF, 0x01, Op8008::Hlt),
    (0xFF, 0xFF, Op8008::Hlt),
    (0xC0, 0xC0, Op8008::Mov),
    (0xC7, 0x06, Op8008::Mvi),
    (0xC7, 0x00, Op8008::Inr),
    (0xC7, 0x01, Op8008::Dcr),
    (0xC0, 0x80, Op8008::Alu),
    (0xC7, 0x04, Op8008::AluImm),
    (0xE7, 0x02, Op8008::Rotate),
    (0xC7, 0x44, Op8008::Jmp),
    (0xC7, 0x40, Op8008::Jcc),
    (0xC7, 0x46, Op8008::Call),
    (0xC7, 0x42, Op8008::Ccc),
    (0xC7, 0x07, Op8008::Ret),
    (0xC7, 0x03, Op8008::Rcc),
    (0xC7, 0x05, Op8008::Rst),
    (0xF1, 0x41, Op8008::In),
    (0xC1, 0x41, Op8008::Out),
];

/// Classifies an opcode byte, or `None` when no rule matches.
#[must_use]
pub fn decode(opcode: u8) -> Option<Op8008> {
    OPCODE_TABLE
        .iter()
        .find(|(mask, bits, _)| opcode & mask == *bits)
        .map(|(_, _, op)| *op)
}

/// Destination register field (bits 5..3).
#[must_use]
pub const fn dst_field(opcode: u8) -> usize {
    ((opcode >> 3) & 0x07) as usize
}

/// Source register field (bits 2..0).
#[must_use]
pub const fn src_field(opcode: u8) -> usize {
    (opcode & 0x07) as usize
}

/// Port number of IN/OUT (bits 5..1).
#[must_use]
pub const fn port_field(opcode: u8) -> u8 {
    (opcode >> 1) & 0x1F
}

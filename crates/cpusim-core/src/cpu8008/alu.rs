//! 8008 flag model and accumulator arithmetic.

/// Condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct Flags8008 {
    /// Carry (set on add overflow or subtract borrow).
    pub carry: bool,
    /// Result was zero.
    pub zero: bool,
    /// Bit 7 of the result.
    pub sign: bool,
    /// Result has an even number of set bits.
    pub parity: bool,
}

impl Flags8008 {
    /// Zero, sign and parity of `result`, with `carry` passed through.
    #[must_use]
    pub const fn from_result(result: u8, carry: bool) -> Self {
        Self {
            carry,
            zero: result == 0,
            sign: result & 0x80 != 0,
            parity: result.count_ones() % 2 == 0,
        }
    }

    /// Reads the flag selected by a condition field (C, Z, S, P).
    #[must_use]
    pub const fn condition(self, field: u8) -> bool {
        match field & 0x03 {
            0 => self.carry,
            1 => self.zero,
            2 => self.sign,
            _ => self.parity,
        }
    }
}

/// Accumulator group operation, from bits 5..3 of the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    /// A + v.
    Add,
    /// A + v + carry.
    Adc,
    /// A - v.
    Sub,
    /// A - v - carry.
    Sbb,
    /// A & v.
    Ana,
    /// A ^ v.
    Xra,
    /// A | v.
    Ora,
    /// A - v, flags only.
    Cmp,
}

impl AluOp {
    /// Extracts the operation from an ALU opcode.
    #[must_use]
    pub const fn from_opcode(opcode: u8) -> Self {
        match (opcode >> 3) & 0x07 {
            0 => Self::Add,
            1 => Self::Adc,
            2 => Self::Sub,
            3 => Self::Sbb,
            4 => Self::Ana,
            5 => Self::Xra,
            6 => Self::Ora,
            _ => Self::Cmp,
        }
    }

    /// Register-operand mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Adc => "ADC",
            Self::Sub => "SUB",
            Self::Sbb => "SBB",
            Self::Ana => "ANA",
            Self::Xra => "XRA",
            Self::Ora => "ORA",
            Self::Cmp => "CMP",
        }
    }

    /// Immediate-operand mnemonic.
    #[must_use]
    pub const fn immediate_mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADI",
            Self::Adc => "ACI",
            Self::Sub => "SUI",
            Self::Sbb => "SBI",
            Self::Ana => "ANI",
            Self::Xra => "XRI",
            Self::Ora => "ORI",
            Self::Cmp => "CPI",
        }
    }

    /// Returns `(result, flags)`; `result` is `None` for compare.
    #[must_use]
    pub const fn apply(self, acc: u8, value: u8, carry: bool) -> (Option<u8>, Flags8008) {
        let wide = match self {
            Self::Add => acc as u16 + value as u16,
            Self::Adc => acc as u16 + value as u16 + carry as u16,
            Self::Sub | Self::Cmp => (acc as u16).wrapping_sub(value as u16),
            Self::Sbb => (acc as u16)
                .wrapping_sub(value as u16)
                .wrapping_sub(carry as u16),
            Self::Ana => return logical(acc & value),
            Self::Xra => return logical(acc ^ value),
            Self::Ora => return logical(acc | value),
        };
        let result = (wide & 0xFF) as u8;
        let flags = Flags8008::from_result(result, wide & 0x100 != 0);
        match self {
            Self::Cmp => (None, flags),
            _ => (Some(result), flags),
        }
    }
}

const fn logical(result: u8) -> (Option<u8>, Flags8008) {
    (Some(result), Flags8008::from_result(result, false))
}

/// Rotate group operation, from bits 4..3 of the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotateOp {
    /// Rotate left, bit 7 into bit 0 and carry.
    Rlc,
    /// Rotate right, bit 0 into bit 7 and carry.
    Rrc,
    /// Rotate left through carry.
    Ral,
    /// Rotate right through carry.
    Rar,
}

impl RotateOp {
    /// Extracts the operation from a rotate opcode.
    #[must_use]
    pub const fn from_opcode(opcode: u8) -> Self {
        match (opcode >> 3) & 0x03 {
            0 => Self::Rlc,
            1 => Self::Rrc,
            2 => Self::Ral,
            _ => Self::Rar,
        }
    }

    /// Assembler mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Rlc => "RLC",
            Self::Rrc => "RRC",
            Self::Ral => "RAL",
            Self::Rar => "RAR",
        }
    }

    /// Returns the rotated accumulator and the new carry.
    #[must_use]
    pub const fn apply(self, acc: u8, carry: bool) -> (u8, bool) {
        match self {
            Self::Rlc => (acc.rotate_left(1), acc & 0x80 != 0),
            Self::Rrc => (acc.rotate_right(1), acc & 0x01 != 0),
            Self::Ral => ((acc << 1) | carry as u8, acc & 0x80 != 0),
            Self::Rar => ((acc >> 1) | ((carry as u8) << 7), acc & 0x01 != 0),
        }
    }
}

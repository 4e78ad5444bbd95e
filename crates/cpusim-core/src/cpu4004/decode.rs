//! Priority-ordered opcode classification for the 4004.

/// Decoded 4004 operation. Operand fields stay in the opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Op4004 {
    Nop,
    Hlt,
    Jcn,
    Fim,
    Src,
    Fin,
    Jin,
    Jun,
    Jms,
    Inc,
    Isz,
    Add,
    Sub,
    Ld,
    Xch,
    Bbl,
    Ldm,
    Wrm,
    Wmp,
    Wrr,
    WrStatus,
    Sbm,
    Rdm,
    Rdr,
    Adm,
    RdStatus,
    Clb,
    Clc,
    Iac,
    Cmc,
    Cma,
    Ral,
    Rar,
    Tcc,
    Dac,
    Tcs,
    Stc,
    Daa,
    Kbp,
    Dcl,
}

impl Op4004 {
    /// Instruction length in bytes, opcode included.
    #[must_use]
    pub const fn len_bytes(self) -> u8 {
        match self {
            Self::Jcn | Self::Fim | Self::Jun | Self::Jms | Self::Isz => 2,
            _ => 1,
        }
    }

    /// Assembler mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Hlt => "HLT",
            Self::Jcn => "JCN",
            Self::Fim => "FIM",
            Self::Src => "SRC",
            Self::Fin => "FIN",
            Self::Jin => "JIN",
            Self::Jun => "JUN",
            Self::Jms => "JMS",
            Self::Inc => "INC",
            Self::Isz => "ISZ",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Ld => "LD",
            Self::Xch => "XCH",
            Self::Bbl => "BBL",
            Self::Ldm => "LDM",
            Self::Wrm => "WRM",
            Self::Wmp => "WMP",
            Self::Wrr => "WRR",
            Self::WrStatus => "WR",
            Self::Sbm => "SBM",
            Self::Rdm => "RDM",
            Self::Rdr => "RDR",
            Self::Adm => "ADM",
            Self::RdStatus => "RD",
            Self::Clb => "CLB",
            Self::Clc => "CLC",
            Self::Iac => "IAC",
            Self::Cmc => "CMC",
            Self::Cma => "CMA",
            Self::Ral => "RAL",
            Self::Rar => "RAR",
            Self::Tcc => "TCC",
            Self::Dac => "DAC",
            Self::Tcs => "TCS",
            Self::Stc => "STC",
            Self::Daa => "DAA",
            Self::Kbp => "KBP",
            Self::Dcl => "DCL",
        }
    }
}

/// `(mask, bits, op)` rules; the first rule with `opcode & mask == bits` wins.
pub const OPCODE_TABLE: &[(u8, u8, Op4004)] = &[
    (0xFF, 0x00, Op4004::Nop),
    (0xFF, 0x01, Op4004::Hlt),
    (0xF0, 0x10, Op4004::Jcn),
    (0xF1, 0x20, Op4004::Fim),
    (0xF1, 0x21, Op4004::Src),
    (0xF1, 0x30, Op4004::Fin),
    (0xF1, 0x31, Op4004::Jin),
    (0xF0, 0x40, Op4004::Jun),
    (0xF0, 0x50, Op4004::Jms),
    (0xF0, 0x60, Op4004::Inc),
    (0xF0, 0x70, Op4004::Isz),
    (0xF0, 0x80, Op4004::Add),
    (0xF0, 0x90, Op4004::Sub),
    (0xF0, 0xA0, Op4004::Ld),
    (0xF0, 0xB0, Op4004::Xch),
    (0xF0, 0xC0, Op4004::Bbl),
    (0xF0, 0xD0, Op4004::Ldm),
    (0xFF, 0xE0, Op4004::Wrm),
    (0xFF, 0xE1, Op4004::Wmp),
    (0xFF, 0xE2, Op4004::Wrr),
    (0xFC, 0xE4, Op4004::WrStatus),
    (0xFF, 0xE8, Op4004::Sbm),
    (0xFF, 0xE9, Op4004::Rdm),
    (0xFF, 0xEA, Op4004::Rdr),
    (0xFF, 0xEB, Op4004::Adm),
    (0xFC, 0xEC, Op4004::RdStatus),
    (0xFF, 0xF0, Op4004::Clb),
    (0xFF, 0xF1, Op4004::Clc),
    (0xFF, 0xF2, Op4004::Iac),
    (0xFF, 0xF3, Op4004::Cmc),
    (0xFF, 0xF4, Op4004::Cma),
    (0xFF, 0xF5, Op4004::Ral),
    (0xFF, 0xF6, Op4004::Rar),
    (0xFF, 0xF7, Op4004::Tcc),
    (0xFF, 0xF8, Op4004::Dac),
    (0xFF, 0xF9, Op4004::Tcs),
    (0xFF, 0xFA, Op4004::Stc),
    (0xFF, 0xFB, Op4004::Daa),
    (0xFF, 0xFC, Op4004::Kbp),
    (0xFF, 0xFD, Op4004::Dcl),
];

/// Classifies an opcode byte, or `None` when no rule matches.
#[must_use]
pub fn decode(opcode: u8) -> Option<Op4004> {
    OPCODE_TABLE
        .iter()
        .find(|(mask, bits, _)| opcode & mask == *bits)
        .map(|(_, _, op)| *op)
}

use bimap::BiMap;
use once_cell::sync::Lazy;
use strum::{Display, EnumIter, EnumString};

use crate::inst::ModeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum OpKind {
    // Binary
    LOAD,
    ADD,
    SUB,
    CMP,
    MULS,
    MULL,
    CHCK,
    DIV,
    MOD,
    #[strum(to_string = "DVMOD", serialize = "DVMD")]
    DVMOD,
    AND,
    OR,
    XOR,
    STOR,

    // Unary
    JMP,
    JSR,
    CLRI,
    SETI,
    PSEM,
    VSEM,

    // Branch
    BRA,
    BRS,
    BEQ,
    BNE,
    BCS,
    BCC,
    BLS,
    BHI,
    BVC,
    BVS,
    BPL,
    BMI,
    BLT,
    BGE,
    BLE,
    BGT,

    // Trap
    TRA0,
    TRA1,
    TRA2,
    TRA3,
    TRA4,
    TRA5,
    TRA6,
    TRA7,
    TRA8,
    TRA9,
    TRA10,
    TRA11,
    TRA12,
    TRA13,
    TRA14,
    TRA15,
    RST,
    RTE,

    // Raw word
    CONS,

    // Simplified, rewritten by the assembler before encoding
    RTS,
    PUSH,
    PULL,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    /// Opcode in bits 17..14 (2..=15)
    Binary(u8),
    /// Index into the unary order, bits 13..11
    Unary(u8),
    /// Index into the branch order, bits 12..9
    Branch(u8),
    Trap(u8),
    Reset,
    ReturnFromException,
    Constant,
    Simplified,
}

use OpKind::*;

const BINARY: [OpKind; 14] = [
    LOAD, ADD, SUB, CMP, MULS, MULL, CHCK, DIV, MOD, DVMOD, AND, OR, XOR, STOR,
];
const UNARY: [OpKind; 6] = [JMP, JSR, CLRI, SETI, PSEM, VSEM];
const BRANCH: [OpKind; 16] = [
    BRA, BRS, BEQ, BNE, BCS, BCC, BLS, BHI, BVC, BVS, BPL, BMI, BLT, BGE, BLE, BGT,
];
const TRAP: [OpKind; 16] = [
    TRA0, TRA1, TRA2, TRA3, TRA4, TRA5, TRA6, TRA7, TRA8, TRA9, TRA10, TRA11, TRA12, TRA13,
    TRA14, TRA15,
];

fn index_table(order: &[OpKind], base: u8) -> BiMap<OpKind, u8> {
    let mut map = BiMap::new();
    for (idx, kind) in order.iter().enumerate() {
        map.insert(*kind, base + idx as u8);
    }
    map
}

static BINARY_CODE: Lazy<BiMap<OpKind, u8>> = Lazy::new(|| index_table(&BINARY, 2));
static UNARY_CODE: Lazy<BiMap<OpKind, u8>> = Lazy::new(|| index_table(&UNARY, 0));
static BRANCH_CODE: Lazy<BiMap<OpKind, u8>> = Lazy::new(|| index_table(&BRANCH, 0));
static TRAP_CODE: Lazy<BiMap<OpKind, u8>> = Lazy::new(|| index_table(&TRAP, 0));

const ANY: &[ModeKind] = &[
    ModeKind::Value,
    ModeKind::Register,
    ModeKind::Indexed,
    ModeKind::RegIndexed,
    ModeKind::PostInc,
    ModeKind::PreDec,
    ModeKind::IndIndexed,
    ModeKind::IndRegIndexed,
];
const NOT_VALUE: &[ModeKind] = &[
    ModeKind::Register,
    ModeKind::Indexed,
    ModeKind::RegIndexed,
    ModeKind::PostInc,
    ModeKind::PreDec,
    ModeKind::IndIndexed,
    ModeKind::IndRegIndexed,
];
const MEMORY: &[ModeKind] = &[
    ModeKind::Indexed,
    ModeKind::RegIndexed,
    ModeKind::PostInc,
    ModeKind::PreDec,
    ModeKind::IndIndexed,
    ModeKind::IndRegIndexed,
];
const VALUE: &[ModeKind] = &[ModeKind::Value];
const REGISTER: &[ModeKind] = &[ModeKind::Register];

impl OpKind {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.parse::<Self>() {
            Ok(a) => Ok(a),
            Err(_) => Err(format!("Undefined Op: {s}")),
        }
    }

    pub fn class(&self) -> OpClass {
        if let Some(code) = BINARY_CODE.get_by_left(self) {
            return OpClass::Binary(*code);
        }
        if let Some(id) = UNARY_CODE.get_by_left(self) {
            return OpClass::Unary(*id);
        }
        if let Some(id) = BRANCH_CODE.get_by_left(self) {
            return OpClass::Branch(*id);
        }
        if let Some(id) = TRAP_CODE.get_by_left(self) {
            return OpClass::Trap(*id);
        }
        match self {
            RST => OpClass::Reset,
            RTE => OpClass::ReturnFromException,
            CONS => OpClass::Constant,
            _ => OpClass::Simplified,
        }
    }

    pub fn binary(opcode: u8) -> Option<Self> {
        BINARY_CODE.get_by_right(&opcode).copied()
    }

    pub fn unary(id: u8) -> Option<Self> {
        UNARY_CODE.get_by_right(&id).copied()
    }

    pub fn branch(id: u8) -> Option<Self> {
        BRANCH_CODE.get_by_right(&id).copied()
    }

    pub fn trap(id: u8) -> Option<Self> {
        TRAP_CODE.get_by_right(&id).copied()
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.class(), OpClass::Branch(_))
    }

    pub fn arity(&self) -> usize {
        self.arg_modes().len()
    }

    /// Addressing modes accepted at each operand position.
    pub fn arg_modes(&self) -> Vec<&'static [ModeKind]> {
        match self.class() {
            OpClass::Binary(_) => match self {
                STOR => vec![REGISTER, MEMORY],
                _ => vec![REGISTER, ANY],
            },
            OpClass::Unary(_) => match self {
                JMP | JSR => vec![NOT_VALUE],
                PSEM | VSEM => vec![MEMORY],
                _ => vec![ANY],
            },
            OpClass::Branch(_) => vec![VALUE],
            OpClass::Constant => vec![VALUE],
            OpClass::Trap(_) | OpClass::Reset | OpClass::ReturnFromException => vec![],
            OpClass::Simplified => match self {
                PUSH | PULL => vec![REGISTER],
                _ => vec![],
            },
        }
    }
}

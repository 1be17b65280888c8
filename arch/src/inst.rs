use std::fmt;

use color_print::cformat;
use strum::Display;
use thiserror::Error;

use crate::{
    op::{OpClass, OpKind},
    reg::Reg,
    word::{self, Word, WORD_BITS, WORD_MASK},
};

pub const RTE_WORD: Word = (0b111 << 11) | (1 << 6);
pub const RST_WORD: Word = (0b111 << 11) | (1 << 5);
/// Low 9 bits of a long branch's first word. A short branch to -256 has the
/// same bits; only the group length tells them apart.
pub const BRANCH_ESCAPE: Word = 1 << 8;
pub const VALUE_ESCAPE: Word = 0x80;
pub const DISP_ESCAPE: Word = 0x1F;

const POST_INC: Word = 0b10001;
const PRE_DEC: Word = 0b11111;

pub fn trap_word(id: u8) -> Word {
    let id = id as Word;
    (0b111 << 11) | (id << 7) | (1 << 4) | id
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Unknown instruction: `{0}` with {1} operand(s)")]
    UnknownInstruction(String, usize),

    #[error("Value 0x{value:X} does not fit in {bits} bits")]
    EncodingOverflow { value: u64, bits: u32 },
}

fn check(value: Word) -> Result<Word, EncodeError> {
    if value > WORD_MASK {
        Err(EncodeError::EncodingOverflow {
            value: value as u64,
            bits: WORD_BITS,
        })
    } else {
        Ok(value)
    }
}

// ----------------------------------------------------------------------------
// Addressing mode

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ModeKind {
    #[strum(to_string = "value")]
    Value,
    #[strum(to_string = "register")]
    Register,
    #[strum(to_string = "[reg+disp]")]
    Indexed,
    #[strum(to_string = "[reg+reg]")]
    RegIndexed,
    #[strum(to_string = "[reg++]")]
    PostInc,
    #[strum(to_string = "[--reg]")]
    PreDec,
    #[strum(to_string = "[[reg]+disp]")]
    IndIndexed,
    #[strum(to_string = "[[reg]+reg]")]
    IndRegIndexed,
}

impl ModeKind {
    /// The `aaa` field. 2 and 3 are reserved.
    pub fn selector(&self) -> Word {
        match self {
            ModeKind::Value => 0,
            ModeKind::Register => 1,
            ModeKind::Indexed => 4,
            ModeKind::RegIndexed | ModeKind::PostInc | ModeKind::PreDec => 5,
            ModeKind::IndIndexed => 6,
            ModeKind::IndRegIndexed => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Value(Word),
    Register(Reg),
    Indexed(Reg, Word),
    RegIndexed(Reg, Reg),
    PostInc(Reg),
    PreDec(Reg),
    IndIndexed(Reg, Word),
    IndRegIndexed(Reg, Reg),
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Value(_) => ModeKind::Value,
            Mode::Register(_) => ModeKind::Register,
            Mode::Indexed(..) => ModeKind::Indexed,
            Mode::RegIndexed(..) => ModeKind::RegIndexed,
            Mode::PostInc(_) => ModeKind::PostInc,
            Mode::PreDec(_) => ModeKind::PreDec,
            Mode::IndIndexed(..) => ModeKind::IndIndexed,
            Mode::IndRegIndexed(..) => ModeKind::IndRegIndexed,
        }
    }

    /// Returns `(aaa << 8) | sss` and the second word when the operand escapes.
    pub fn to_bin(&self) -> Result<(Word, Option<Word>), EncodeError> {
        fn displaced(reg: Reg, disp: Word) -> Result<(Word, Option<Word>), EncodeError> {
            let disp = check(disp)?;
            if word::fits_disp(disp) {
                Ok(((reg.bits() << 5) | disp, None))
            } else {
                Ok(((reg.bits() << 5) | DISP_ESCAPE, Some(disp)))
            }
        }

        let (sss, long) = match *self {
            Mode::Value(v) => {
                let v = check(v)?;
                if word::fits_value(v) {
                    (v & 0xFF, None)
                } else {
                    (VALUE_ESCAPE, Some(v))
                }
            }
            Mode::Register(r) => (r.bits(), None),
            Mode::Indexed(r, d) | Mode::IndIndexed(r, d) => displaced(r, d)?,
            Mode::RegIndexed(r0, r1) | Mode::IndRegIndexed(r0, r1) => {
                ((r0.bits() << 5) | r1.bits(), None)
            }
            Mode::PostInc(r) => ((r.bits() << 5) | POST_INC, None),
            Mode::PreDec(r) => ((r.bits() << 5) | PRE_DEC, None),
        };
        Ok(((self.kind().selector() << 8) | sss, long))
    }

    /// Decodes the low 11 bits of an instruction word. The flag tells whether
    /// `next` was consumed as the long operand.
    pub fn from_bin(field: Word, next: Option<Word>) -> Option<(Mode, bool)> {
        let aaa = (field >> 8) & 0b111;
        let sss = field & 0xFF;
        let reg = Reg::from_field(sss >> 5);
        let low = sss & 0x1F;
        let mode = match aaa {
            0 => match (sss, next) {
                (VALUE_ESCAPE, Some(v)) => return Some((Mode::Value(v), true)),
                _ => Mode::Value(word::sign_extend(sss, 8)),
            },
            1 => Mode::Register(Reg::from_field(sss)),
            4 | 6 => {
                let disp = match (low, next) {
                    (DISP_ESCAPE, Some(v)) => v,
                    (DISP_ESCAPE, None) => return None,
                    _ => low,
                };
                let mode = match aaa {
                    4 => Mode::Indexed(reg, disp),
                    _ => Mode::IndIndexed(reg, disp),
                };
                return Some((mode, low == DISP_ESCAPE));
            }
            5 => match low {
                POST_INC => Mode::PostInc(reg),
                PRE_DEC => Mode::PreDec(reg),
                0..=7 => Mode::RegIndexed(reg, Reg::from_field(low)),
                _ => return None,
            },
            7 if low <= 7 => Mode::IndRegIndexed(reg, Reg::from_field(low)),
            _ => return None,
        };
        Some((mode, false))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Value(v) => write!(f, "{}", word::to_signed(*v)),
            Mode::Register(r) => write!(f, "{r}"),
            Mode::Indexed(r, d) => write!(f, "[{r}+{}]", word::to_signed(*d)),
            Mode::RegIndexed(r0, r1) => write!(f, "[{r0}+{r1}]"),
            Mode::PostInc(r) => write!(f, "[{r}++]"),
            Mode::PreDec(r) => write!(f, "[--{r}]"),
            Mode::IndIndexed(r, d) => write!(f, "[[{r}]+{}]", word::to_signed(*d)),
            Mode::IndRegIndexed(r0, r1) => write!(f, "[[{r0}]+{r1}]"),
        }
    }
}

// ----------------------------------------------------------------------------
// Instruction

/// A fully resolved instruction. Branch operands hold the displacement.
/// `long` is the layout's width decision and only steers branch encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inst {
    pub op: OpKind,
    pub args: Vec<Mode>,
    pub long: bool,
}

impl Inst {
    pub fn new(op: OpKind, args: Vec<Mode>) -> Self {
        Self {
            op,
            args,
            long: false,
        }
    }

    pub fn to_bin(&self) -> Result<Vec<Word>, EncodeError> {
        let mut words = vec![];
        match (self.op.class(), self.args.as_slice()) {
            (OpClass::Constant, [Mode::Value(v)]) => words.push(check(*v)?),
            (OpClass::ReturnFromException, []) => words.push(RTE_WORD),
            (OpClass::Reset, []) => words.push(RST_WORD),
            (OpClass::Trap(id), []) => words.push(trap_word(id)),
            (OpClass::Branch(id), [Mode::Value(disp)]) => {
                let id = id as Word;
                let disp = check(*disp)?;
                if self.long || !word::fits_branch(disp) {
                    words.push((id << 9) | BRANCH_ESCAPE);
                    words.push(disp);
                } else {
                    words.push((id << 9) | (disp & 0x1FF));
                }
            }
            (OpClass::Unary(id), [mode]) => {
                let (field, long) = mode.to_bin()?;
                words.push((1 << 14) | ((id as Word) << 11) | field);
                words.extend(long);
            }
            (OpClass::Binary(opcode), [Mode::Register(reg), mode]) => {
                let (field, long) = mode.to_bin()?;
                words.push(((opcode as Word) << 14) | (reg.bits() << 11) | field);
                words.extend(long);
            }
            _ => {
                return Err(EncodeError::UnknownInstruction(
                    self.op.to_string(),
                    self.args.len(),
                ))
            }
        }
        Ok(words)
    }

    /// Decodes one instruction group of one or two words.
    pub fn from_bin(words: &[Word]) -> Option<Inst> {
        let (&first, rest) = words.split_first()?;
        if rest.len() > 1 || first > WORD_MASK {
            return None;
        }
        let next = rest.first().copied();

        let with_mode = |op: OpKind, mut args: Vec<Mode>| {
            let (mode, used) = Mode::from_bin(first & 0x7FF, next)?;
            if used != next.is_some() {
                return None;
            }
            args.push(mode);
            Some(Inst { op, args, long: used })
        };

        match first >> 14 {
            0 => {
                if next.is_none() {
                    match first {
                        RTE_WORD => return Some(Inst::new(OpKind::RTE, vec![])),
                        RST_WORD => return Some(Inst::new(OpKind::RST, vec![])),
                        _ => {}
                    }
                    if (first >> 11) & 0b111 == 0b111 {
                        let id = ((first >> 7) & 0xF) as u8;
                        return match trap_word(id) == first {
                            true => Some(Inst::new(OpKind::trap(id)?, vec![])),
                            false => None,
                        };
                    }
                }
                if first & (1 << 13) != 0 {
                    return None;
                }
                let op = OpKind::branch(((first >> 9) & 0xF) as u8)?;
                match next {
                    Some(disp) if first & 0x1FF == BRANCH_ESCAPE => Some(Inst {
                        op,
                        args: vec![Mode::Value(disp)],
                        long: true,
                    }),
                    Some(_) => None,
                    None => Some(Inst::new(
                        op,
                        vec![Mode::Value(word::sign_extend(first & 0x1FF, 9))],
                    )),
                }
            }
            1 => with_mode(OpKind::unary(((first >> 11) & 0b111) as u8)?, vec![]),
            opcode => with_mode(
                OpKind::binary(opcode as u8)?,
                vec![Mode::Register(Reg::from_field(first >> 11))],
            ),
        }
    }

    pub fn operands(&self) -> String {
        self.args
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn cformat(&self) -> String {
        cformat!("<r>{:<6}</><b>{}</>", self.op.to_string(), self.operands())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::wrap;

    macro_rules! test_inst {
        ($($name:ident: $inst:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    let inst: Inst = $inst;
                    let bin = inst.to_bin().unwrap();
                    let back = Inst::from_bin(&bin).unwrap();
                    assert_eq!(inst.op, back.op);
                    assert_eq!(inst.args, back.args);
                }
            )*
        }
    }

    test_inst! {
        test_load_value: Inst::new(OpKind::LOAD, vec![Mode::Register(Reg::R0), Mode::Value(5)]),
        test_add_negative: Inst::new(OpKind::ADD, vec![Mode::Register(Reg::R1), Mode::Value(wrap(-128))]),
        test_add_long: Inst::new(OpKind::ADD, vec![Mode::Register(Reg::R1), Mode::Value(300)]),
        test_sub_register: Inst::new(OpKind::SUB, vec![Mode::Register(Reg::R2), Mode::Register(Reg::R3)]),
        test_cmp_indexed: Inst::new(OpKind::CMP, vec![Mode::Register(Reg::R4), Mode::Indexed(Reg::GB, 30)]),
        test_muls_indexed_long: Inst::new(OpKind::MULS, vec![Mode::Register(Reg::R4), Mode::Indexed(Reg::GB, 31)]),
        test_mod_reg_indexed: Inst::new(OpKind::MOD, vec![Mode::Register(Reg::R0), Mode::RegIndexed(Reg::R1, Reg::R2)]),
        test_dvmod_post_inc: Inst::new(OpKind::DVMOD, vec![Mode::Register(Reg::R0), Mode::PostInc(Reg::SP)]),
        test_stor_pre_dec: Inst::new(OpKind::STOR, vec![Mode::Register(Reg::R5), Mode::PreDec(Reg::SP)]),
        test_xor_ind_indexed: Inst::new(OpKind::XOR, vec![Mode::Register(Reg::R1), Mode::IndIndexed(Reg::R2, 7)]),
        test_or_ind_indexed_long: Inst::new(OpKind::OR, vec![Mode::Register(Reg::R1), Mode::IndIndexed(Reg::R2, wrap(-1))]),
        test_and_ind_reg_indexed: Inst::new(OpKind::AND, vec![Mode::Register(Reg::R1), Mode::IndRegIndexed(Reg::R2, Reg::R3)]),
        test_jmp: Inst::new(OpKind::JMP, vec![Mode::PostInc(Reg::SP)]),
        test_jsr: Inst::new(OpKind::JSR, vec![Mode::Indexed(Reg::GB, 100)]),
        test_seti: Inst::new(OpKind::SETI, vec![Mode::Value(8)]),
        test_vsem: Inst::new(OpKind::VSEM, vec![Mode::Indexed(Reg::GB, 2)]),
        test_bra_back: Inst::new(OpKind::BRA, vec![Mode::Value(wrap(-3))]),
        test_bgt_edge: Inst::new(OpKind::BGT, vec![Mode::Value(255)]),
        test_beq_long: Inst::new(OpKind::BEQ, vec![Mode::Value(400)]),
        test_rte: Inst::new(OpKind::RTE, vec![]),
        test_rst: Inst::new(OpKind::RST, vec![]),
        test_tra0: Inst::new(OpKind::TRA0, vec![]),
        test_tra15: Inst::new(OpKind::TRA15, vec![]),
    }

    #[test]
    fn jmp_post_inc_sp() {
        let inst = Inst::new(OpKind::JMP, vec![Mode::PostInc(Reg::R7)]);
        assert_eq!(inst.to_bin(), Ok(vec![0x45F1]));
    }

    #[test]
    fn add_escapes_large_value() {
        let inst = Inst::new(OpKind::ADD, vec![Mode::Register(Reg::R1), Mode::Value(300)]);
        let bin = inst.to_bin().unwrap();
        assert_eq!(bin, vec![(3 << 14) | (1 << 11) | 0x080, 300]);
    }

    #[test]
    fn value_boundaries() {
        let len = |v: i64| {
            Inst::new(OpKind::LOAD, vec![Mode::Register(Reg::R0), Mode::Value(wrap(v))])
                .to_bin()
                .unwrap()
                .len()
        };
        assert_eq!(len(127), 1);
        assert_eq!(len(-128), 1);
        assert_eq!(len(128), 2);
        assert_eq!(len(-129), 2);
    }

    #[test]
    fn disp_boundaries() {
        let bin = |d| {
            Inst::new(OpKind::LOAD, vec![Mode::Register(Reg::R0), Mode::Indexed(Reg::R1, d)])
                .to_bin()
                .unwrap()
        };
        assert_eq!(bin(30), vec![(2 << 14) | (4 << 8) | (1 << 5) | 30]);
        assert_eq!(bin(31), vec![(2 << 14) | (4 << 8) | (1 << 5) | 0x1F, 31]);
    }

    #[test]
    fn branch_forms() {
        let short = Inst::new(OpKind::BNE, vec![Mode::Value(wrap(-2))]);
        assert_eq!(short.to_bin(), Ok(vec![(3 << 9) | 0x1FE]));

        let mut long = Inst::new(OpKind::BRA, vec![Mode::Value(10)]);
        long.long = true;
        assert_eq!(long.to_bin(), Ok(vec![1 << 8, 10]));

        let far = Inst::new(OpKind::BRA, vec![Mode::Value(600)]);
        assert_eq!(far.to_bin(), Ok(vec![1 << 8, 600]));
    }

    #[test]
    fn short_branch_shares_escape_bits() {
        let short = Inst::new(OpKind::BEQ, vec![Mode::Value(wrap(-256))]);
        let bin = short.to_bin().unwrap();
        assert_eq!(bin, vec![(2 << 9) | BRANCH_ESCAPE]);
        assert_eq!(Inst::from_bin(&bin), Some(short));

        let mut long = Inst::new(OpKind::BEQ, vec![Mode::Value(wrap(-256))]);
        long.long = true;
        let bin = long.to_bin().unwrap();
        assert_eq!(bin, vec![(2 << 9) | BRANCH_ESCAPE, wrap(-256)]);
        assert_eq!(Inst::from_bin(&bin), Some(long));
    }

    #[test]
    fn fixed_patterns() {
        assert_eq!(trap_word(2), (7 << 11) | (2 << 7) | (1 << 4) | 2);
        assert_eq!(Inst::new(OpKind::TRA2, vec![]).to_bin(), Ok(vec![trap_word(2)]));
        assert_eq!(Inst::new(OpKind::CONS, vec![Mode::Value(0x12345)]).to_bin(), Ok(vec![0x12345]));
    }

    #[test]
    fn unknown_combinations() {
        let err = Inst::new(OpKind::PUSH, vec![Mode::Register(Reg::R1)]).to_bin();
        assert_eq!(err, Err(EncodeError::UnknownInstruction("PUSH".into(), 1)));
        let err = Inst::new(OpKind::ADD, vec![Mode::Value(1), Mode::Value(1)]).to_bin();
        assert!(matches!(err, Err(EncodeError::UnknownInstruction(..))));
        let err = Inst::new(OpKind::RTE, vec![Mode::Value(1)]).to_bin();
        assert!(matches!(err, Err(EncodeError::UnknownInstruction(..))));
    }

    #[test]
    fn overflow_is_reported() {
        let err = Inst::new(OpKind::CONS, vec![Mode::Value(1 << 18)]).to_bin();
        assert!(matches!(err, Err(EncodeError::EncodingOverflow { bits: 18, .. })));
    }

    #[test]
    fn display_operands() {
        let inst = Inst::new(
            OpKind::LOAD,
            vec![Mode::Register(Reg::R1), Mode::IndIndexed(Reg::GB, wrap(-2))],
        );
        assert_eq!(inst.operands(), "R1, [[R6]+-2]");
    }
}

use std::collections::BTreeSet;

use arch::{
    word::{self, Word},
    Inst, Mode, OpClass, OpKind,
};

use crate::{
    error::Error,
    ident::{Ident, Idents, Segment},
    operand::{Disp, Operand},
    parser::{Stmt, Token},
};

/// Answer of the long-form question for one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongForm {
    Required,
    NotRequired,
    /// Some operand refers to a label without an address yet.
    Unknown,
}

impl LongForm {
    pub fn might_be_long(self) -> bool {
        self != LongForm::NotRequired
    }

    pub fn is_long(self) -> bool {
        self == LongForm::Required
    }

    fn join(self, other: LongForm) -> LongForm {
        use LongForm::*;
        match (self, other) {
            (Required, _) | (_, Required) => Required,
            (Unknown, _) | (_, Unknown) => Unknown,
            _ => NotRequired,
        }
    }
}

fn disp_value(disp: &Disp, idents: &Idents) -> Option<Word> {
    match disp {
        Disp::Value(v) => Some(*v),
        Disp::Label(name) => idents.get_val(name),
    }
}

/// Decide whether `op operands` placed at `addr` needs its two word form.
pub fn long_form(op: OpKind, operands: &[Operand], addr: Word, idents: &Idents) -> LongForm {
    if op.class() == OpClass::Constant {
        return LongForm::NotRequired;
    }
    let check = |value: Option<Word>, fits: fn(Word) -> bool| match value {
        None => LongForm::Unknown,
        Some(v) if fits(v) => LongForm::NotRequired,
        Some(_) => LongForm::Required,
    };
    operands
        .iter()
        .map(|operand| {
            let value = match operand {
                Operand::Value(v) => Some(*v),
                Operand::Label(name) => idents.get_val(name),
                Operand::Indexed(_, d) | Operand::IndIndexed(_, d) => {
                    return check(disp_value(d, idents), word::fits_disp)
                }
                _ => return LongForm::NotRequired,
            };
            if op.is_branch() {
                let disp = value.map(|v| word::wrap(v as i64 - (addr as i64 + 1)));
                check(disp, word::fits_branch)
            } else {
                check(value, word::fits_value)
            }
        })
        .fold(LongForm::NotRequired, LongForm::join)
}

/// Branch whose target stays put while the code around it shrinks: a
/// number, a constant or a data label.
fn fixed_target(op: OpKind, operands: &[Operand], idents: &Idents) -> bool {
    if !op.is_branch() {
        return false;
    }
    match operands.first() {
        Some(Operand::Value(_)) => true,
        Some(Operand::Label(name)) => idents
            .get(name)
            .is_some_and(|alias| alias.kind != Ident::Label(Segment::Code)),
        _ => false,
    }
}

/// `long_form` over every address the statement may still reach. `slack` is
/// the number of long candidates placed before it, each of which can release
/// one word.
fn placed_long_form(
    op: OpKind,
    operands: &[Operand],
    addr: Word,
    slack: Word,
    idents: &Idents,
) -> LongForm {
    let here = long_form(op, operands, addr, idents);
    if slack == 0 || !fixed_target(op, operands, idents) {
        return here;
    }
    here.join(long_form(op, operands, addr - slack, idents))
}

// ----------------------------------------------------------------------------
// Layout

/// Final placement of a statement list. `addresses` runs parallel to the
/// statements and is relative to the start of each statement's segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub addresses: Vec<Word>,
    pub segments: Vec<Segment>,
    /// Indices of the statements encoded in two words
    pub long: BTreeSet<usize>,
    pub rounds: usize,
}

impl Layout {
    pub fn is_long(&self, idx: usize) -> bool {
        self.long.contains(&idx)
    }

    pub fn width(&self, idx: usize) -> Word {
        if self.is_long(idx) {
            2
        } else {
            1
        }
    }

    pub fn long_form_addresses(&self) -> Vec<Word> {
        self.long.iter().map(|&i| self.addresses[i]).collect()
    }
}

/// Place every statement and assign every label its address.
///
/// Starts from a layout where anything that might be long is long, then
/// releases candidates that turn out to fit until nothing changes.
pub fn resolve(stmts: &[Stmt], idents: &mut Idents) -> Result<Layout, Error> {
    let mut addresses = Vec::with_capacity(stmts.len());
    let mut segments = Vec::with_capacity(stmts.len());
    let mut long = BTreeSet::new();

    let mut pc: Word = 0;
    let mut segment = Segment::Code;
    for (idx, stmt) in stmts.iter().enumerate() {
        match &stmt.token {
            Token::CodeSegmentStart(_) => {
                pc = 0;
                segment = Segment::Code;
                addresses.push(pc);
            }
            Token::DataSegmentStart(_) => {
                pc = 0;
                segment = Segment::Data;
                addresses.push(pc);
            }
            Token::Label(name) => {
                idents.set(name, pc).map_err(|e| e.at(stmt.line))?;
                addresses.push(pc);
            }
            Token::Data(_) => {
                addresses.push(pc);
                pc += 1;
            }
            Token::Mnemonic(op, operands) => {
                addresses.push(pc);
                let slack = long.len() as Word;
                if placed_long_form(*op, operands, pc, slack, idents).might_be_long() {
                    long.insert(idx);
                    pc += 2;
                } else {
                    pc += 1;
                }
            }
        }
        segments.push(segment);
    }

    let limit = long.len() + 1;
    let mut rounds = 0;
    loop {
        rounds += 1;
        if rounds > limit {
            return Err(Error::Internal(format!(
                "layout did not settle within {limit} rounds"
            )));
        }

        let mut removed = vec![];
        for (idx, stmt) in stmts.iter().enumerate() {
            let Token::Mnemonic(op, operands) = &stmt.token else {
                continue;
            };
            let slack = long.range(..idx).count() as Word;
            let form = placed_long_form(*op, operands, addresses[idx], slack, idents);
            match (long.contains(&idx), form) {
                (true, LongForm::NotRequired) => removed.push(idx),
                (false, LongForm::Required) => {
                    return Err(Error::Internal(format!(
                        "`{op}` grew back to long form during layout"
                    ))
                    .at(stmt.line))
                }
                _ => {}
            }
        }
        if removed.is_empty() {
            break;
        }

        let slots: Vec<Word> = removed.iter().map(|&i| addresses[i]).collect();
        for idx in &removed {
            long.remove(idx);
        }
        for (addr, seg) in addresses.iter_mut().zip(&segments) {
            if *seg == Segment::Code {
                let shift = slots.iter().filter(|g| *addr > **g).count() as Word;
                *addr -= shift;
            }
        }
        idents.shrink_labels(Segment::Code, &slots);
    }

    Ok(Layout {
        addresses,
        segments,
        long,
        rounds,
    })
}

/// Substitute every label and turn branch targets into displacements.
pub fn resolve_inst(
    op: OpKind,
    operands: &[Operand],
    addr: Word,
    long: bool,
    idents: &Idents,
) -> Result<Inst, Error> {
    let lookup = |name: &str| {
        idents
            .get_val(name)
            .ok_or_else(|| Error::UnresolvedLabel(name.to_string()))
    };
    let disp = |d: &Disp| match d {
        Disp::Value(v) => Ok(*v),
        Disp::Label(name) => lookup(name),
    };
    let width: Word = if long { 2 } else { 1 };

    let mut args = vec![];
    for operand in operands {
        let target = match operand {
            Operand::Value(v) if op.is_branch() => Some(*v),
            Operand::Label(name) if op.is_branch() => Some(lookup(name)?),
            _ => None,
        };
        if let Some(target) = target {
            args.push(Mode::Value(word::wrap(
                target as i64 - (addr + width) as i64,
            )));
            continue;
        }
        let mode = match operand {
            Operand::Value(v) => Mode::Value(*v),
            Operand::Label(name) => Mode::Value(lookup(name)?),
            Operand::Register(r) => Mode::Register(*r),
            Operand::Indexed(r, d) => Mode::Indexed(*r, disp(d)?),
            Operand::RegIndexed(r0, r1) => Mode::RegIndexed(*r0, *r1),
            Operand::PostInc(r) => Mode::PostInc(*r),
            Operand::PreDec(r) => Mode::PreDec(*r),
            Operand::IndIndexed(r, d) => Mode::IndIndexed(*r, disp(d)?),
            Operand::IndRegIndexed(r0, r1) => Mode::IndRegIndexed(*r0, *r1),
        };
        args.push(mode);
    }
    Ok(Inst { op, args, long })
}

use arch::{
    word::{self, Word, WORD_BITS, WORD_MASK},
    ModeKind, Reg,
};

use crate::error::Error;

// ----------------------------------------------------------------------------
// Operand

/// Displacement of an indexed mode, possibly still a label reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disp {
    Value(Word),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Value(Word),
    Label(String),
    Register(Reg),
    Indexed(Reg, Disp),
    RegIndexed(Reg, Reg),
    PostInc(Reg),
    PreDec(Reg),
    IndIndexed(Reg, Disp),
    IndRegIndexed(Reg, Reg),
}

impl Operand {
    /// Classifies one operand term. Anything that is not a register, a
    /// numeric literal or a bracket expression is taken to be a label.
    pub fn parse(s: &str) -> Result<Operand, Error> {
        if s.starts_with('[') {
            return parse_bracket(s);
        }
        if let Ok(reg) = Reg::parse(s) {
            return Ok(Operand::Register(reg));
        }
        match parse_value(s)? {
            Some(v) => Ok(Operand::Value(v)),
            None => Ok(Operand::Label(s.to_string())),
        }
    }

    /// Addressing mode this operand encodes as. A label is a value.
    pub fn kind(&self) -> ModeKind {
        match self {
            Operand::Value(_) | Operand::Label(_) => ModeKind::Value,
            Operand::Register(_) => ModeKind::Register,
            Operand::Indexed(..) => ModeKind::Indexed,
            Operand::RegIndexed(..) => ModeKind::RegIndexed,
            Operand::PostInc(_) => ModeKind::PostInc,
            Operand::PreDec(_) => ModeKind::PreDec,
            Operand::IndIndexed(..) => ModeKind::IndIndexed,
            Operand::IndRegIndexed(..) => ModeKind::IndRegIndexed,
        }
    }
}

fn parse_bracket(s: &str) -> Result<Operand, Error> {
    let bad = || Error::Parse(s.to_string(), "addressing mode".to_string());
    let inner = s
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(bad)?;

    // [reg++]
    if let Some(reg) = inner.strip_suffix("++") {
        return Reg::parse(reg).map(Operand::PostInc).map_err(|_| bad());
    }
    // [--reg]
    if let Some(reg) = inner.strip_prefix("--") {
        return Reg::parse(reg).map(Operand::PreDec).map_err(|_| bad());
    }
    // [[reg] + x]
    if let Some(rest) = inner.strip_prefix('[') {
        let (reg, tail) = rest.split_once(']').ok_or_else(bad)?;
        let reg = Reg::parse(reg).map_err(|_| bad())?;
        return match split_offset(tail, s)? {
            Offset::None => Ok(Operand::IndIndexed(reg, Disp::Value(0))),
            Offset::Reg(r) => Ok(Operand::IndRegIndexed(reg, r)),
            Offset::Disp(d) => Ok(Operand::IndIndexed(reg, d)),
        };
    }
    // [reg + x]
    let at = inner.find(['+', '-']).unwrap_or(inner.len());
    let (reg, tail) = inner.split_at(at);
    let reg = Reg::parse(reg).map_err(|_| bad())?;
    match split_offset(tail, s)? {
        Offset::None => Ok(Operand::Indexed(reg, Disp::Value(0))),
        Offset::Reg(r) => Ok(Operand::RegIndexed(reg, r)),
        Offset::Disp(d) => Ok(Operand::Indexed(reg, d)),
    }
}

enum Offset {
    None,
    Reg(Reg),
    Disp(Disp),
}

/// Reads `""`, `+reg`, `+disp` or `-value` following the base register.
fn split_offset(tail: &str, term: &str) -> Result<Offset, Error> {
    let bad = || Error::Parse(term.to_string(), "addressing mode".to_string());
    if tail.is_empty() {
        return Ok(Offset::None);
    }
    if let Some(neg) = tail.strip_prefix('-') {
        return match parse_value(neg)? {
            Some(v) => Ok(Offset::Disp(Disp::Value(word::wrap(-(v as i64))))),
            None => Err(bad()),
        };
    }
    let x = tail.strip_prefix('+').ok_or_else(bad)?;
    if x.is_empty() || x.contains(['[', ']', '+']) {
        return Err(bad());
    }
    if let Ok(r) = Reg::parse(x) {
        return Ok(Offset::Reg(r));
    }
    match parse_value(x)? {
        Some(v) => Ok(Offset::Disp(Disp::Value(v))),
        None => Ok(Offset::Disp(Disp::Label(x.to_string()))),
    }
}

// ----------------------------------------------------------------------------
// Value

/// Parses a numeric or character literal. `Ok(None)` means the term is not
/// a literal at all (a label); a literal with bad digits is an error.
pub fn parse_value(s: &str) -> Result<Option<Word>, Error> {
    let err = |what: &str| Error::Parse(s.to_string(), what.to_string());
    let Some(head) = s.chars().next() else {
        return Ok(None);
    };
    let value = match head {
        '$' => {
            let v = u32::from_str_radix(&s[1..], 16).map_err(|_| err("hexadecimal"))?;
            if v > WORD_MASK {
                return Err(err("18-bit hexadecimal"));
            }
            v
        }
        '%' => {
            let digits = &s[1..];
            if digits.len() > WORD_BITS as usize {
                return Err(err("18-bit binary"));
            }
            let v = u32::from_str_radix(digits, 2).map_err(|_| err("binary"))?;
            word::sign_extend(v, digits.len() as u32)
        }
        '\'' | '"' => parse_chars(s).ok_or_else(|| err("character literal"))?,
        '-' | '0'..='9' => {
            let v: i64 = s.parse().map_err(|_| err("decimal"))?;
            if v < -(1 << (WORD_BITS - 1)) || v > WORD_MASK as i64 {
                return Err(err("18-bit decimal"));
            }
            word::wrap(v)
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// `'x'` or `"xy"`, first character in the low byte.
fn parse_chars(s: &str) -> Option<Word> {
    let quote = s.chars().next()?;
    let body = s.strip_prefix(quote)?.strip_suffix(quote)?;
    let bytes = body.as_bytes();
    if !body.is_ascii() || bytes.is_empty() || bytes.len() > 2 {
        return None;
    }
    Some(
        bytes
            .iter()
            .enumerate()
            .fold(0, |acc, (i, b)| acc | ((*b as Word) << (8 * i))),
    )
}

use arch::{OpKind, Reg, Word};

use crate::{
    error::Error,
    ident::{sizeof_key, Ident, Idents, Segment},
    lexer::Line,
    msg::Msg,
    operand::{parse_value, Operand},
};

/// Segment address used when a start directive gives none.
pub const DEFAULT_ADDRESS: Word = 0x3FFFF;

// ----------------------------------------------------------------------------
// Token

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    CodeSegmentStart(Word),
    DataSegmentStart(Word),
    Label(String),
    Data(Word),
    Mnemonic(OpKind, Vec<Operand>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub token: Token,
    /// 0-based source line
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
    pub idents: Idents,
    pub code: Option<Word>,
    pub data: Option<Word>,
    pub warnings: Vec<(usize, Msg)>,
}

// ----------------------------------------------------------------------------
// Builder

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NoSegment,
    Code,
    Data,
}

enum Flow {
    Continue,
    End,
}

struct Builder {
    state: State,
    program: Program,
    /// Data label waiting for the `DW`/`DS` on a following line
    pending: Option<String>,
    seen_label: bool,
    warned: bool,
}

pub fn build(lines: &[Line]) -> Result<Program, Error> {
    let mut builder = Builder {
        state: State::NoSegment,
        program: Program::default(),
        pending: None,
        seen_label: false,
        warned: false,
    };
    for line in lines {
        let terms = line.texts();
        if terms.is_empty() {
            continue;
        }
        match builder.line(&terms, line.idx).map_err(|e| e.at(line.idx))? {
            Flow::Continue => {}
            Flow::End => break,
        }
    }
    Ok(builder.program)
}

impl Builder {
    fn push(&mut self, token: Token, line: usize) {
        self.program.stmts.push(Stmt { token, line });
    }

    fn line(&mut self, terms: &[&str], line: usize) -> Result<Flow, Error> {
        if terms[0].starts_with('@') {
            return self.directive(terms, line);
        }
        if self.state == State::NoSegment {
            return Err(Error::Structural(format!(
                "No active segment for `{}`",
                terms[0]
            )));
        }
        if terms.len() > 1 && terms[1].eq_ignore_ascii_case("EQU") {
            self.equ(terms, line)?;
            return Ok(Flow::Continue);
        }
        match self.state {
            State::Data => self.data(terms, line)?,
            _ => self.code(terms, line)?,
        }
        Ok(Flow::Continue)
    }

    fn directive(&mut self, terms: &[&str], line: usize) -> Result<Flow, Error> {
        let (name, inline) = match terms[0].split_once('=') {
            Some((name, addr)) => (name, Some(addr)),
            None => (terms[0], None),
        };
        let name = name.to_ascii_uppercase();
        let arg = match (inline, terms.get(1)) {
            (Some(addr), None) => Some(addr),
            (None, arg) => arg.copied(),
            (Some(_), Some(extra)) => {
                return Err(Error::Structural(format!("Unexpected term `{extra}`")))
            }
        };
        if terms.len() > 2 {
            return Err(Error::Structural(format!("Unexpected term `{}`", terms[2])));
        }

        match name.as_str() {
            "@CODE" => {
                if self.program.code.is_some() {
                    return Err(Error::Structural(
                        "CODE segment can only be started once".to_string(),
                    ));
                }
                let addr = self.start_address(arg)?;
                self.program.code = Some(addr);
                self.push(Token::CodeSegmentStart(addr), line);
                self.state = State::Code;
            }
            "@DATA" => {
                if self.program.data.is_some() {
                    return Err(Error::Structural(
                        "DATA segment can only be started once".to_string(),
                    ));
                }
                let addr = self.start_address(arg)?;
                self.program.data = Some(addr);
                self.push(Token::DataSegmentStart(addr), line);
                self.state = State::Data;
                self.pending = None;
            }
            "@END" => return Ok(Flow::End),
            "@INCLUDE" | "@STACK" | "@STACKSIZE" => {
                return Err(Error::Unsupported(name.to_string()))
            }
            _ => return Err(Error::Structural(format!("Unknown directive `{name}`"))),
        }
        Ok(Flow::Continue)
    }

    fn start_address(&self, arg: Option<&str>) -> Result<Word, Error> {
        match arg {
            Some(arg) => self.value(arg),
            None => Ok(DEFAULT_ADDRESS),
        }
    }

    /// A literal or an already known constant.
    fn value(&self, term: &str) -> Result<Word, Error> {
        if let Some(v) = parse_value(term)? {
            return Ok(v);
        }
        match self.program.idents.get(term) {
            Some(alias) if alias.kind == Ident::Equ || alias.kind == Ident::SizeOf => {
                alias.value.ok_or_else(|| Error::UnresolvedLabel(term.to_string()))
            }
            _ => Err(Error::UnresolvedLabel(term.to_string())),
        }
    }

    fn equ(&mut self, terms: &[&str], line: usize) -> Result<(), Error> {
        if terms.len() != 3 {
            return Err(Error::Structural("Expected `NAME EQU value`".to_string()));
        }
        let value = self.value(terms[2])?;
        self.program
            .idents
            .define(terms[0], Ident::Equ, line, Some(value))
    }

    fn label(&mut self, name: &str, segment: Segment, line: usize) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::Lex(":".to_string()));
        }
        self.program
            .idents
            .define(name, Ident::Label(segment), line, None)?;
        self.push(Token::Label(name.to_string()), line);
        Ok(())
    }

    fn data(&mut self, terms: &[&str], line: usize) -> Result<(), Error> {
        let is_directive = |t: &str| t.eq_ignore_ascii_case("DW") || t.eq_ignore_ascii_case("DS");

        let (owner, rest) = if is_directive(terms[0]) {
            (self.pending.take(), terms)
        } else {
            let name = terms[0].strip_suffix(':').unwrap_or(terms[0]);
            self.label(name, Segment::Data, line)?;
            if terms.len() == 1 {
                self.pending = Some(name.to_string());
                return Ok(());
            }
            self.pending = None;
            (Some(name.to_string()), &terms[1..])
        };

        let count = match rest[0].to_ascii_uppercase().as_str() {
            "DW" => {
                if rest.len() < 2 {
                    return Err(Error::Structural("DW needs at least one value".to_string()));
                }
                for term in &rest[1..] {
                    let value = self.value(term)?;
                    self.push(Token::Data(value), line);
                }
                rest.len() - 1
            }
            "DS" => {
                if rest.len() != 2 {
                    return Err(Error::Structural("Expected `DS count`".to_string()));
                }
                let n = self.value(rest[1])?;
                for _ in 0..n {
                    self.push(Token::Data(0), line);
                }
                n as usize
            }
            other => {
                return Err(Error::Structural(format!(
                    "Expected DW or DS, found `{other}`"
                )))
            }
        };

        if let Some(owner) = owner {
            self.program.idents.define(
                &sizeof_key(&owner),
                Ident::SizeOf,
                line,
                Some(count as Word),
            )?;
        }
        Ok(())
    }

    fn code(&mut self, terms: &[&str], line: usize) -> Result<(), Error> {
        let mut rest = terms;
        if let Some(name) = rest[0].strip_suffix(':') {
            self.label(name, Segment::Code, line)?;
            self.seen_label = true;
            rest = &rest[1..];
            if rest.is_empty() {
                return Ok(());
            }
        }

        let op = OpKind::parse(rest[0]).map_err(|_| Error::UnknownOperation(rest[0].to_string()))?;
        let args = &rest[1..];
        let modes = op.arg_modes();
        if args.len() < modes.len() {
            return Err(Error::MissingArgument(op));
        }
        if let Some(extra) = args.get(modes.len()) {
            return Err(Error::Structural(format!("Unexpected term `{extra}`")));
        }

        let mut operands = vec![];
        for (text, allowed) in args.iter().zip(modes) {
            let operand = Operand::parse(text)?;
            if !allowed.contains(&operand.kind()) {
                return Err(Error::InvalidOperandType {
                    op,
                    expected: allowed.to_vec(),
                    found: text.to_string(),
                });
            }
            operands.push(operand);
        }

        let (op, operands) = canonicalize(op, operands)?;

        if !self.seen_label && !self.warned {
            self.warned = true;
            self.program.warnings.push((
                line,
                Msg::Warn("Instruction detected before first label".to_string()),
            ));
            self.program.warnings.push((
                line,
                Msg::Note("It is assembled as part of an implicit block `0`".to_string()),
            ));
        }
        self.push(Token::Mnemonic(op, operands), line);
        Ok(())
    }
}

/// Rewrite the simplified mnemonics into the instructions they stand for.
fn canonicalize(op: OpKind, operands: Vec<Operand>) -> Result<(OpKind, Vec<Operand>), Error> {
    let register = |operands: &[Operand]| match operands {
        [Operand::Register(r)] => Ok(*r),
        _ => Err(Error::Internal(format!("`{op}` expects one register"))),
    };
    match op {
        OpKind::RTS => Ok((OpKind::JMP, vec![Operand::PostInc(Reg::SP)])),
        OpKind::PUSH => Ok((
            OpKind::STOR,
            vec![Operand::Register(register(&operands)?), Operand::PreDec(Reg::SP)],
        )),
        OpKind::PULL => Ok((
            OpKind::LOAD,
            vec![Operand::Register(register(&operands)?), Operand::PostInc(Reg::SP)],
        )),
        _ => Ok((op, operands)),
    }
}

use arch::{Inst, Word};

use crate::{
    error::Error,
    ident::Idents,
    image::{Image, Segment},
    layout::{resolve, resolve_inst, Layout},
    lexer::lex,
    msg::Msg,
    parser::{build, Token, DEFAULT_ADDRESS},
};

/// One encoded instruction, as shown by the verbose listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub addr: Word,
    pub line: usize,
    pub words: Vec<Word>,
    pub inst: Inst,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub image: Image,
    pub listing: Vec<Row>,
    pub warnings: Vec<(usize, Msg)>,
    pub layout: Layout,
    pub idents: Idents,
}

pub fn assemble(source: &str) -> Result<Assembly, Error> {
    let lines = lex(source)?;
    let mut program = build(&lines)?;
    let layout = resolve(&program.stmts, &mut program.idents)?;

    let mut image = Image::default();
    image.code.address = program.code.unwrap_or(DEFAULT_ADDRESS);
    let mut data = program.data.map(Segment::new);
    let mut listing = vec![];

    for (idx, stmt) in program.stmts.iter().enumerate() {
        match &stmt.token {
            Token::Mnemonic(op, operands) => {
                let addr = layout.addresses[idx];
                let inst = resolve_inst(*op, operands, addr, layout.is_long(idx), &program.idents)
                    .map_err(|e| e.at(stmt.line))?;
                let words = inst.to_bin().map_err(|e| Error::from(e).at(stmt.line))?;
                if words.len() as Word != layout.width(idx) {
                    return Err(Error::Internal(format!(
                        "`{op}` encoded in {} word(s), layout reserved {}",
                        words.len(),
                        layout.width(idx)
                    ))
                    .at(stmt.line));
                }
                image.code.push(words.clone());
                listing.push(Row {
                    addr,
                    line: stmt.line,
                    words,
                    inst,
                });
            }
            Token::Data(value) => {
                let segment = data.as_mut().ok_or_else(|| {
                    Error::Internal("data word outside the data segment".to_string())
                        .at(stmt.line)
                })?;
                segment.push(vec![*value]);
            }
            Token::CodeSegmentStart(_) | Token::DataSegmentStart(_) | Token::Label(_) => {}
        }
    }
    image.data = data;

    Ok(Assembly {
        image,
        listing,
        warnings: program.warnings,
        layout,
        idents: program.idents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::OpKind;

    #[test]
    fn return_from_subroutine() {
        let asm = assemble("@CODE=0\nstart: RTS\n").unwrap();
        assert_eq!(asm.image.code.words, vec![vec![0x45F1]]);
        assert_eq!(asm.listing[0].inst.op, OpKind::JMP);
    }

    #[test]
    fn long_value() {
        let asm = assemble("@CODE\nloop: ADD r1, 300\n").unwrap();
        assert_eq!(
            asm.image.code.words,
            vec![vec![(3 << 14) | (1 << 11) | 0x80, 300]]
        );
        assert_eq!(asm.image.code.size, 2);
    }

    #[test]
    fn data_segment_words() {
        let asm = assemble("@DATA $40\narr DW 1,2,3\n@CODE\nm: LOAD R0, arr\n").unwrap();
        let data = asm.image.data.unwrap();
        assert_eq!(data.address, 0x40);
        assert_eq!(data.size, 3);
        assert_eq!(data.words, vec![vec![1], vec![2], vec![3]]);
        assert_eq!(asm.idents.get_val("sizeof(arr)"), Some(3));
    }

    #[test]
    fn errors_carry_lines() {
        let err = assemble("@CODE\nm: RTS\n BRA missing\n").unwrap_err();
        assert!(matches!(err.kind(), Error::UnresolvedLabel(_)));
        assert_eq!(err.line(), Some(2));
    }
}

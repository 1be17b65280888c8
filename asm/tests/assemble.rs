use arch::{Inst, OpKind, Word};
use pp2asm::{assemble, Error};

fn case(src: &str, expects: Vec<Vec<Word>>) {
    let asm = assemble(src).unwrap();
    for row in &asm.listing {
        let words: Vec<String> = row.words.iter().map(|w| format!("{:05x}", w)).collect();
        println!("[{:05x}] {:<12} {}", row.addr, words.join(" "), row.inst.cformat());
    }
    assert_eq!(asm.image.code.words, expects);
}

fn fails(src: &str, line: usize) -> Error {
    let err = assemble(src).unwrap_err();
    println!("{err}");
    assert_eq!(err.line(), Some(line));
    err
}

#[test]
fn single_instructions() {
    case("@CODE\nstart: RTS\n", vec![vec![0x45F1]]);
    case("@CODE\nloop: ADD r1, 300\n", vec![vec![0xC880, 300]]);
    case("@CODE\nm: LOAD R2, -1\n", vec![vec![(2 << 14) | (2 << 11) | 0xFF]]);
    case("@CODE\nm: STOR R0, [GB+3]\n", vec![vec![(15 << 14) | (4 << 8) | (6 << 5) | 3]]);
    case(
        "@CODE\nm: STOR R0, [SP+40]\n",
        vec![vec![(15 << 14) | (4 << 8) | (7 << 5) | 0x1F, 40]],
    );
    case("@CODE\nm: PUSH R3\n", vec![vec![(15 << 14) | (3 << 11) | (5 << 8) | 0xFF]]);
    case("@CODE\nm: PULL R3\n", vec![vec![(2 << 14) | (3 << 11) | 0x5F1]]);
    case("@CODE\nm: RTE\n RST\n TRA2\n", vec![vec![0x3840], vec![0x3820], vec![0x3912]]);
    case("@CODE\nm: CONS $3FFFF\n", vec![vec![0x3FFFF]]);
}

#[test]
fn branches() {
    // a branch onto itself
    case("@CODE\nm: BRA m\n", vec![vec![0x1FF]]);
    case("@CODE\nm: BRA next\nnext: BEQ m\n", vec![vec![0], vec![(2 << 9) | 0x1FE]]);

    let filler = " ADD R0, 1\n".repeat(500);
    let asm = assemble(&format!("@CODE\nstart: BRA target\n{filler}target: RTS\n")).unwrap();
    assert_eq!(asm.layout.long_form_addresses(), vec![0]);
    assert_eq!(asm.image.code.words[0], vec![1 << 8, 500]);
    assert_eq!(asm.image.code.size, 503);
}

#[test]
fn branches_to_fixed_targets() {
    // the target does not move when `BRA b` shrinks, so the second branch ends up 256 away
    let long = vec![vec![2], vec![0xC001], vec![0xC001], vec![1 << 8, 255]];
    case("@CODE\na: BRA b\n ADD R0, 1\n ADD R0, 1\nb: BRA 260\n", long.clone());
    case("@CODE\nT EQU 260\na: BRA b\n ADD R0, 1\n ADD R0, 1\nb: BRA T\n", long);
}

#[test]
fn decoded_groups_match_source() {
    let src = "\
@DATA
table DW 10, 20, 30
@CODE $100
size EQU 3
main:   LOAD R1, table      ; address of the table
        LOAD R2, sizeof(table)
loop:   LOAD R3, [R1+R2]
        ADD  R4, [[GB]+R1]
        SUB  R2, 1
        BNE  loop
        PUSH R4
        JSR  [GB+100]
        CLRI 2
        PSEM [--SP]
        PULL R4
        BRA  main
        RTS
";
    let asm = assemble(src).unwrap();
    assert_eq!(asm.image.code.address, 0x100);
    for row in &asm.listing {
        let back = Inst::from_bin(&row.words).unwrap();
        assert_eq!(back.op, row.inst.op);
        assert_eq!(back.args.len(), row.inst.args.len());
    }
    let ops: Vec<OpKind> = asm.listing.iter().map(|r| r.inst.op).collect();
    assert_eq!(ops[6], OpKind::STOR);
    assert_eq!(ops[ops.len() - 1], OpKind::JMP);
}

#[test]
fn hex_output() {
    let asm = assemble("@DATA=$10\nv: DW 1, -1\n@CODE 0\nm: RTS\n").unwrap();
    assert_eq!(
        asm.image.to_hex(),
        "@C 00000 00001\n045f1\n\n@D 00010 00002\n00001 3ffff\n\n@S 3ffff 000f0\n.\n"
    );
    let asm = assemble("@CODE\nm: RTS\n").unwrap();
    assert_eq!(asm.image.to_hex(), "@C 3ffff 00001\n045f1\n\n@S 3ffff 000f0\n.\n");
}

#[test]
fn warnings() {
    let asm = assemble("@CODE\n RTS\nmain: RTS\n").unwrap();
    assert_eq!(asm.warnings.len(), 2);
    assert_eq!(asm.warnings[0].0, 1);
}

#[test]
fn errors() {
    let err = fails("@CODE\nfoo: RTS\nfoo: RTS\n", 2);
    assert!(matches!(err.kind(), Error::DuplicateDefinition(_)));
    let err = fails("@CODE\nm: BRA nowhere\n", 1);
    assert!(matches!(err.kind(), Error::UnresolvedLabel(_)));
    let err = fails("@CODE\nm: LOAD R1, [R2+nowhere]\n", 1);
    assert!(matches!(err.kind(), Error::UnresolvedLabel(_)));
    let err = fails("@CODE\nm: JMP 5\n", 1);
    assert!(matches!(err.kind(), Error::InvalidOperandType { .. }));
    let err = fails("@CODE\nm: LOAD R1, %102\n", 1);
    assert!(matches!(err.kind(), Error::Parse(..)));
    let err = fails("@CODE\nm: LOAD R1, [R2+1\n", 1);
    assert!(matches!(err.kind(), Error::Lex(_)));
    let err = fails("\n\n@STACK\n", 2);
    assert!(matches!(err.kind(), Error::Unsupported(_)));
}

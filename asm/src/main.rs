use std::{io::Write, path::Path};

use pp2asm::{assemble, Error};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {author}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(author, version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input file
    input: Option<String>,

    /// Output file [default: input with .hex extension]
    output: Option<String>,

    /// Print the encoded instructions
    #[clap(short, long)]
    verbose: bool,
}

fn main() {
    use clap::{CommandFactory, Parser};

    let args: Args = Args::parse();
    let Some(input) = args.input.clone() else {
        // help only fails on a closed stdout
        let _ = Args::command().print_help();
        return;
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| Path::new(&input).with_extension("hex").display().to_string());

    println!("PP2 Assembler");

    println!("1. Read Source");
    println!("  < {}", input);
    let source = match std::fs::read_to_string(&input) {
        Ok(source) => source,
        Err(e) => fail(&Error::FileOpen(input.clone(), e), &input, &[]),
    };
    let lines: Vec<String> = source.lines().map(|s| s.to_string()).collect();

    println!("2. Resolve Layout & Encode");
    let asm = match assemble(&source) {
        Ok(asm) => asm,
        Err(e) => fail(&e, &input, &lines),
    };
    for (line, msg) in &asm.warnings {
        let raw = lines.get(*line).map(|s| s.as_str()).unwrap_or("");
        msg.diag(&input, *line, raw);
    }
    println!(
        "  code {} word(s), {} long, settled in {} round(s)",
        asm.image.code.size,
        asm.layout.long.len(),
        asm.layout.rounds
    );
    if args.verbose {
        pp2asm::util::print_listing(&asm.listing, &lines);
    }

    println!("3. Write Hex");
    println!("  > {}", output);
    let mut file = match std::fs::File::create(&output) {
        Ok(file) => file,
        Err(e) => fail(&Error::FileCreate(output.clone(), e), &input, &lines),
    };
    if let Err(e) = file.write_all(asm.image.to_hex().as_bytes()) {
        fail(&Error::FileWrite(output.clone(), e), &input, &lines);
    }
}

fn fail(e: &Error, file: &str, lines: &[String]) -> ! {
    e.print_diag(file, lines);
    std::process::exit(1);
}

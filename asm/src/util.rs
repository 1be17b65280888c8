use arch::Word;
use color_print::cformat;

use crate::assemble::Row;

fn words_str(words: &[Word]) -> String {
    let mut s = words
        .iter()
        .map(|w| format!("{:05X}", w))
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() < 2 {
        s.push_str(&" ".repeat(6));
    }
    s
}

/// Print the encoded code segment next to the source it came from.
pub fn print_listing(listing: &[Row], lines: &[String]) {
    println!("--------+-------------+-----------------------------------------------");
    for row in listing {
        let source = lines.get(row.line).map(|s| s.trim()).unwrap_or("");
        println!(
            "[{:05X}] | {} | {:>4}: {}  {}",
            row.addr,
            words_str(&row.words),
            row.line + 1,
            row.inst.cformat(),
            cformat!("<dim>; {}</>", source)
        );
    }
    println!("--------+-------------+-----------------------------------------------");
}

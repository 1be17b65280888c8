use color_print::cprintln;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Warn(String),
    Note(String),
}

impl Msg {
    pub fn diag(&self, file: &str, line: usize, raw: &str) {
        match self {
            Msg::Warn(msg) => cprintln!("<yellow,bold>warn</>: {}", msg),
            Msg::Note(msg) => cprintln!("<green,bold>note</>: {}", msg),
        }
        cprintln!("     <blue>--></> <underline>{}:{}</>", file, line + 1);
        cprintln!("      <blue>|</>");
        cprintln!(" <blue>{:>4} |</> {}", line + 1, raw);
        cprintln!("      <blue>|</>");
    }
}

use arch::{EncodeError, ModeKind, OpKind};
use color_print::cprintln;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed term: `{0}`")]
    Lex(String),

    #[error("Cannot parse `{0}` as {1}")]
    Parse(String, String),

    #[error("{0}")]
    Structural(String),

    #[error("Unsupported directive: `{0}`")]
    Unsupported(String),

    #[error("Re-defined identifier: `{0}`")]
    DuplicateDefinition(String),

    #[error("Invalid operand `{found}` for `{op}`: expected {}", fmt_modes(.expected))]
    InvalidOperandType {
        op: OpKind,
        expected: Vec<ModeKind>,
        found: String,
    },

    #[error("Undefined label: `{0}`")]
    UnresolvedLabel(String),

    #[error("Unknown operation: `{0}`")]
    UnknownOperation(String),

    #[error("More argument required for `{0}`")]
    MissingArgument(OpKind),

    #[error("{0}")]
    Encode(#[from] EncodeError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to create file: {0}")]
    FileCreate(String, #[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),

    #[error("{source}")]
    At {
        line: usize,
        #[source]
        source: Box<Error>,
    },
}

fn fmt_modes(modes: &[ModeKind]) -> String {
    modes
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

impl Error {
    /// Attach a 0-based source line, keeping the innermost one.
    pub fn at(self, line: usize) -> Self {
        match self {
            Error::At { .. } => self,
            other => Error::At {
                line,
                source: Box::new(other),
            },
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Error::At { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// The error without its location wrapper.
    pub fn kind(&self) -> &Error {
        match self {
            Error::At { source, .. } => source.kind(),
            other => other,
        }
    }

    /// Print error with diagnostic information showing file location and line content
    pub fn print_diag(&self, file: &str, lines: &[String]) {
        cprintln!("<red,bold>error</>: {}", self);

        let Some(line_idx) = self.line() else {
            return;
        };
        let line_num = line_idx + 1;
        cprintln!("     <blue>--></> <underline>{}:{}</>", file, line_num);
        cprintln!("      <blue>|</>");

        let line_content = lines.get(line_idx).map(|s| s.as_str()).unwrap_or("");

        cprintln!(" <blue>{:>4} |</> {}", line_num, line_content);
        cprintln!("      <blue>|</>");
    }
}

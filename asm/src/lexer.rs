use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    pub col: usize,
}

#[derive(Debug, Clone)]
pub struct Line {
    pub idx: usize,
    pub raw: String,
    pub comment: Option<String>,
    pub terms: Vec<Term>,
}

impl Line {
    pub fn texts(&self) -> Vec<&str> {
        self.terms.iter().map(|t| t.text.as_str()).collect()
    }
}

pub fn lex(source: &str) -> Result<Vec<Line>, Error> {
    source
        .lines()
        .enumerate()
        .map(|(idx, raw)| lex_line(idx, raw).map_err(|e| e.at(idx)))
        .collect()
}

/// Splits one source line into terms. Whitespace and commas separate terms,
/// `;` starts a comment, a `[...]` group is a single term with its inner
/// whitespace removed and a quoted character literal is a single term.
pub fn lex_line(idx: usize, raw: &str) -> Result<Line, Error> {
    let mut terms = vec![];
    let mut comment = None;
    let mut buf = String::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    let flush = |buf: &mut String, start: usize, terms: &mut Vec<Term>| {
        if !buf.is_empty() {
            terms.push(Term {
                text: std::mem::take(buf),
                col: start,
            });
        }
    };

    for (col, chr) in raw.char_indices() {
        if let Some(q) = quote {
            buf.push(chr);
            if chr == q {
                quote = None;
            }
            continue;
        }
        match chr {
            ';' => {
                comment = Some(raw[col + 1..].to_string());
                break;
            }
            '\'' | '"' => {
                if buf.is_empty() {
                    start = col;
                }
                quote = Some(chr);
                buf.push(chr);
            }
            '[' => {
                if buf.is_empty() {
                    start = col;
                }
                depth += 1;
                buf.push(chr);
            }
            ']' => {
                if depth == 0 {
                    return Err(Error::Lex(format!("{buf}]")));
                }
                depth -= 1;
                buf.push(chr);
            }
            c if c.is_whitespace() && depth > 0 => continue,
            c if c.is_whitespace() || c == ',' => flush(&mut buf, start, &mut terms),
            _ => {
                if buf.is_empty() {
                    start = col;
                }
                buf.push(chr);
            }
        }
    }

    if quote.is_some() || depth > 0 {
        return Err(Error::Lex(buf));
    }
    flush(&mut buf, start, &mut terms);

    Ok(Line {
        idx,
        raw: raw.to_string(),
        comment,
        terms,
    })
}

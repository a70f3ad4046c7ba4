use crate::error::{Error, Result};

/// Statement of a script, along with its source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Stmt {
    pub line: u32,
    pub kind: StmtKind,
}

/// Kind of statement.
///
/// Text arguments are kept as templates: their `$name` references are
/// resolved when the statement is executed, and `$$` stands for `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StmtKind {
    Print(String),
    EPrint(String),
    Let { name: String, value: String },
    Node { id: String, label: String },
    Edge { from: String, to: String, label: String },
    Define { name: String, body: Vec<Stmt> },
    Call(String),
    Repeat { count: u64, body: Vec<Stmt> },
    Sleep(u64),
    Busy(u64),
    Fail(String),
    PrintGraph,
    Commit,
}

/// Single source line, parsed on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line {
    Blank,
    Comment(String),
    Open(Header),
    Close,
    Stmt(StmtKind),
}

/// Line opening a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Header {
    Fn(String),
    Repeat(u64),
}

/// Parses a whole script.
pub(crate) fn parse_program(source: &str) -> Result<Vec<Stmt>> {
    // innermost block last, with the header that opened it
    let mut blocks: Vec<(Option<(u32, Header)>, Vec<Stmt>)> = vec![(None, Vec::new())];

    for (line, text) in (1..).zip(source.lines()) {
        match parse_line(line, text)? {
            Line::Blank | Line::Comment(_) => (),
            Line::Open(header) => blocks.push((Some((line, header)), Vec::new())),
            Line::Close => {
                let (Some((open_line, header)), body) = blocks.pop().unwrap_or((None, Vec::new()))
                else {
                    return Err(parse_error(line, "unmatched `}`"));
                };

                let kind = match header {
                    Header::Fn(name) => StmtKind::Define { name, body },
                    Header::Repeat(count) => StmtKind::Repeat { count, body },
                };

                push_stmt(&mut blocks, open_line, kind);
            }
            Line::Stmt(kind) => push_stmt(&mut blocks, line, kind),
        }
    }

    match blocks.pop() {
        Some((None, program)) if blocks.is_empty() => Ok(program),
        Some((Some((line, _)), _)) => Err(parse_error(line, "block is never closed")),
        _ => Err(parse_error(0, "inconsistent block nesting")),
    }
}

fn push_stmt(blocks: &mut [(Option<(u32, Header)>, Vec<Stmt>)], line: u32, kind: StmtKind) {
    if let Some((_, stmts)) = blocks.last_mut() {
        stmts.push(Stmt { line, kind });
    }
}

/// Parses a single line of a script.
pub(crate) fn parse_line(line: u32, text: &str) -> Result<Line> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(Line::Blank);
    }

    if let Some(comment) = text.strip_prefix('#') {
        return Ok(Line::Comment(comment.trim().to_owned()));
    }

    if text == "}" {
        return Ok(Line::Close);
    }

    let (keyword, rest) = text
        .split_once(char::is_whitespace)
        .map_or((text, ""), |(keyword, rest)| (keyword, rest.trim()));

    let kind = match keyword {
        "fn" | "repeat" => {
            let Some(arg) = rest.strip_suffix('{') else {
                return Err(parse_error(line, format!("expected `{{` after `{keyword}`")));
            };

            let arg = arg.trim();

            let header = if keyword == "fn" {
                Header::Fn(identifier(line, arg)?.to_owned())
            } else {
                Header::Repeat(number(line, arg)?)
            };

            return Ok(Line::Open(header));
        }
        "print" => StmtKind::Print(text_arg(line, rest)?),
        "eprint" => StmtKind::EPrint(text_arg(line, rest)?),
        "let" => {
            let Some((name, value)) = rest.split_once('=') else {
                return Err(parse_error(line, "expected `let <name> = <text>`"));
            };

            StmtKind::Let {
                name: identifier(line, name.trim())?.to_owned(),
                value: text_arg(line, value)?,
            }
        }
        "node" => {
            let (id, rest) = token(line, rest)?;

            StmtKind::Node {
                id,
                label: text_arg(line, rest)?,
            }
        }
        "edge" => {
            let (from, rest) = token(line, rest)?;
            let (to, rest) = token(line, rest)?;

            StmtKind::Edge {
                from,
                to,
                label: text_arg(line, rest)?,
            }
        }
        "call" => StmtKind::Call(identifier(line, rest)?.to_owned()),
        "sleep" => StmtKind::Sleep(number(line, rest)?),
        "busy" => StmtKind::Busy(number(line, rest)?),
        "fail" => StmtKind::Fail(text_arg(line, rest)?),
        "printgraph" | "commit" if !rest.is_empty() => {
            return Err(parse_error(line, format!("`{keyword}` takes no argument")));
        }
        "printgraph" => StmtKind::PrintGraph,
        "commit" => StmtKind::Commit,
        _ => return Err(parse_error(line, format!("unknown statement `{keyword}`"))),
    };

    Ok(Line::Stmt(kind))
}

/// Parses a text argument, either quoted or spanning the rest of the line.
fn text_arg(line: u32, text: &str) -> Result<String> {
    let text = text.trim();

    if !text.starts_with('"') {
        return Ok(text.to_owned());
    }

    let (value, rest) = quoted(line, text)?;

    if rest.trim().is_empty() {
        Ok(value)
    } else {
        Err(parse_error(line, "unexpected text after closing quote"))
    }
}

/// Parses the next whitespace-separated (or quoted) token.
fn token(line: u32, text: &str) -> Result<(String, &str)> {
    let text = text.trim_start();

    if text.starts_with('"') {
        return quoted(line, text);
    }

    let end = text.find(char::is_whitespace).unwrap_or(text.len());

    if end == 0 {
        return Err(parse_error(line, "missing argument"));
    }

    Ok((text[..end].to_owned(), &text[end..]))
}

/// Parses a quoted string at the start of `text`, returning the unescaped
/// value and what follows the closing quote.
fn quoted(line: u32, text: &str) -> Result<(String, &str)> {
    let mut value = String::new();
    let mut chars = text.char_indices().skip(1);

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &text[i + 1..])),
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, c @ ('"' | '\\'))) => value.push(c),
                _ => return Err(parse_error(line, "invalid escape sequence")),
            },
            c => value.push(c),
        }
    }

    Err(parse_error(line, "missing closing quote"))
}

fn identifier(line: u32, text: &str) -> Result<&str> {
    if is_identifier(text) {
        Ok(text)
    } else {
        Err(parse_error(line, format!("invalid identifier `{text}`")))
    }
}

pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();

    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn number(line: u32, text: &str) -> Result<u64> {
    text.parse()
        .map_err(|_| parse_error(line, format!("invalid number `{text}`")))
}

fn parse_error(line: u32, message: impl Into<String>) -> Error {
    Error::Parse {
        line,
        message: message.into(),
    }
}

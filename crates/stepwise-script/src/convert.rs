use std::fmt::Write;

use stepwise_protocol::runtime::{AbortSignal, RunContext};
use stepwise_protocol::{GraphSnapshot, NodeId};

use crate::error::Result;
use crate::graph::Graph;
use crate::interp::{Interpreter, Silent};
use crate::parse::{Header, Line, StmtKind, parse_line, parse_program};
use crate::store::WorkingState;

const INDENT: &str = "    ";

/// Re-indents a script, with its text arguments quoted.
///
/// Comments are kept, runs of blank lines are collapsed.
pub(crate) fn format(source: &str) -> Result<String> {
    // rejects unbalanced blocks
    parse_program(source)?;

    let mut formatted = String::new();
    let mut level = 0usize;
    let mut blank = false;

    for (line, text) in (1..).zip(source.lines()) {
        let line = parse_line(line, text)?;

        match line {
            Line::Blank => {
                blank = !formatted.is_empty();
                continue;
            }
            Line::Close => level = level.saturating_sub(1),
            _ => (),
        }

        if std::mem::take(&mut blank) {
            formatted.push('\n');
        }

        formatted.push_str(&INDENT.repeat(level));
        formatted.push_str(&render_line(&line));
        formatted.push('\n');

        if let Line::Open(_) = line {
            level += 1;
        }
    }

    Ok(formatted)
}

fn render_line(line: &Line) -> String {
    match line {
        Line::Blank => String::new(),
        Line::Comment(comment) if comment.is_empty() => "#".to_owned(),
        Line::Comment(comment) => format!("# {comment}"),
        Line::Open(Header::Fn(name)) => format!("fn {name} {{"),
        Line::Open(Header::Repeat(count)) => format!("repeat {count} {{"),
        Line::Close => "}".to_owned(),
        Line::Stmt(kind) => render_stmt(kind),
    }
}

fn render_stmt(kind: &StmtKind) -> String {
    match kind {
        StmtKind::Print(text) => format!("print {}", quote(text)),
        StmtKind::EPrint(text) => format!("eprint {}", quote(text)),
        StmtKind::Let { name, value } => format!("let {name} = {}", quote(value)),
        StmtKind::Node { id, label } if label.is_empty() => format!("node {}", token(id)),
        StmtKind::Node { id, label } => format!("node {} {}", token(id), quote(label)),
        StmtKind::Edge { from, to, label } if label.is_empty() => {
            format!("edge {} {}", token(from), token(to))
        }
        StmtKind::Edge { from, to, label } => {
            format!("edge {} {} {}", token(from), token(to), quote(label))
        }
        StmtKind::Define { name, .. } => format!("fn {name} {{"),
        StmtKind::Call(name) => format!("call {name}"),
        StmtKind::Repeat { count, .. } => format!("repeat {count} {{"),
        StmtKind::Sleep(ms) => format!("sleep {ms}"),
        StmtKind::Busy(ms) => format!("busy {ms}"),
        StmtKind::Fail(message) => format!("fail {}", quote(message)),
        StmtKind::PrintGraph => "printgraph".to_owned(),
        StmtKind::Commit => "commit".to_owned(),
    }
}

/// Renders `text` as a quoted string literal.
pub(crate) fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');

    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}

fn token(text: &str) -> String {
    if text.is_empty() || text.starts_with('"') || text.contains(char::is_whitespace) {
        quote(text)
    } else {
        text.to_owned()
    }
}

/// Evaluates a script silently, and renders the graph it builds in the
/// Graphviz format.
pub(crate) fn dot(source: &str) -> Result<String> {
    let program = parse_program(source)?;

    let mut hook = Silent;
    let mut output = Silent;
    let abort = AbortSignal::new();
    let mut state = WorkingState::default();

    let graph = Interpreter::new(
        Graph::default(),
        RunContext {
            hook: &mut hook,
            output: &mut output,
            abort: &abort,
        },
        &mut state,
    )
    .run(&program)?;

    Ok(render_dot(&graph.snapshot()))
}

fn render_dot(graph: &GraphSnapshot) -> String {
    let mut dot = String::from("digraph {\n");

    // writing to a `String` never fails
    for node in &graph.nodes {
        let _ = writeln!(
            dot,
            "{INDENT}{} [label={}];",
            dot_id(&node.id),
            quote(&node.label)
        );
    }

    for edge in &graph.edges {
        let _ = write!(dot, "{INDENT}{} -> {}", dot_id(&edge.from), dot_id(&edge.to));

        if edge.label.is_empty() {
            dot.push_str(";\n");
        } else {
            let _ = writeln!(dot, " [label={}];", quote(&edge.label));
        }
    }

    dot.push_str("}\n");
    dot
}

fn dot_id(id: &NodeId) -> String {
    quote(&id.to_string())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::{dot, format};
    use crate::Error;

    #[test]
    fn format_reindents() {
        let formatted = format(indoc! {r#"
            # build
              let who =   world
            fn visit {
            node 1   A($who)
                   edge 1 1
            }


            repeat 2 {
            call visit
            }
            print "tab\tand \"quotes\""

        "#})
        .unwrap();

        assert_eq!(
            formatted,
            indoc! {r#"
                # build
                let who = "world"
                fn visit {
                    node 1 "A($who)"
                    edge 1 1
                }

                repeat 2 {
                    call visit
                }
                print "tab\tand \"quotes\""
            "#}
        );

        assert_eq!(format(&formatted).unwrap(), formatted);
    }

    #[test]
    fn format_rejects_invalid_scripts() {
        assert!(matches!(
            format("repeat 2 {\n"),
            Err(Error::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn dot_renders_the_built_graph() {
        let rendered = dot(indoc! {"
            print ignored
            node 1 A
            node x \"B c\"
            edge 1 x likes
            edge x 1
        "})
        .unwrap();

        assert_eq!(
            rendered,
            indoc! {r#"
                digraph {
                    "1" [label="A"];
                    "x" [label="B c"];
                    "1" -> "x" [label="likes"];
                    "x" -> "1";
                }
            "#}
        );
    }

    #[test]
    fn dot_reports_script_errors() {
        assert!(matches!(dot("fail nope"), Err(Error::Failed(_))));
    }
}

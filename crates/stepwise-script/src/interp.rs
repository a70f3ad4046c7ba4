use std::collections::HashMap;
use std::time::{Duration, Instant};

use stepwise_protocol::runtime::{Interrupt, OutputSink, RunContext, TraceHook};

use crate::error::{Error, Result};
use crate::graph::{Graph, node_id};
use crate::parse::{Stmt, StmtKind, is_identifier};
use crate::store::WorkingState;

/// Maximum depth of nested calls.
pub(crate) const MAX_DEPTH: usize = 64;

/// Granularity at which a sleeping script checks for abort requests.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Tree-walking interpreter of a parsed script.
pub(crate) struct Interpreter<'p, 'cx, 's> {
    functions: HashMap<&'p str, &'p [Stmt]>,
    variables: HashMap<String, String>,
    graph: Graph,
    cx: RunContext<'cx>,
    state: &'s mut WorkingState,
}

impl<'p, 'cx, 's> Interpreter<'p, 'cx, 's> {
    pub fn new(graph: Graph, cx: RunContext<'cx>, state: &'s mut WorkingState) -> Self {
        Self {
            functions: HashMap::new(),
            variables: HashMap::new(),
            graph,
            cx,
            state,
        }
    }

    /// Executes `program`, returning the graph it built.
    pub fn run(mut self, program: &'p [Stmt]) -> Result<Graph> {
        self.exec_block(program, 0)?;
        Ok(self.graph)
    }

    fn exec_block(&mut self, stmts: &'p [Stmt], depth: usize) -> Result<()> {
        stmts.iter().try_for_each(|stmt| self.exec(stmt, depth))
    }

    fn exec(&mut self, stmt: &'p Stmt, depth: usize) -> Result<()> {
        self.cx.hook.line(stmt.line, depth)?;

        match &stmt.kind {
            StmtKind::Print(text) => {
                let text = self.interpolate(text)?;
                self.cx.output.stdout(&format!("{text}\n"));
            }
            StmtKind::EPrint(text) => {
                let text = self.interpolate(text)?;
                self.cx.output.stderr(&format!("{text}\n"));
            }
            StmtKind::Let { name, value } => {
                let value = self.interpolate(value)?;
                self.variables.insert(name.clone(), value);
            }
            StmtKind::Node { id, label } => {
                let id = node_id(&self.interpolate(id)?);
                let label = self.interpolate(label)?;
                self.graph.node(id, label);
            }
            StmtKind::Edge { from, to, label } => {
                let from = node_id(&self.interpolate(from)?);
                let to = node_id(&self.interpolate(to)?);
                let label = self.interpolate(label)?;
                self.graph.edge(from, to, label)?;
            }
            StmtKind::Define { name, body } => {
                self.functions.insert(name.as_str(), body.as_slice());
            }
            StmtKind::Call(name) => {
                let body = self
                    .functions
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| Error::Undefined(format!("function `{name}`")))?;

                if depth >= MAX_DEPTH {
                    return Err(Error::Failed(format!(
                        "maximum call depth ({MAX_DEPTH}) exceeded"
                    )));
                }

                self.exec_block(body, depth + 1)?;
            }
            StmtKind::Repeat { count, body } => {
                for _ in 0..*count {
                    self.exec_block(body, depth)?;
                }
            }
            StmtKind::Sleep(ms) => self.sleep(Duration::from_millis(*ms))?,
            StmtKind::Busy(ms) => std::thread::sleep(Duration::from_millis(*ms)),
            StmtKind::Fail(message) => return Err(Error::Failed(self.interpolate(message)?)),
            StmtKind::PrintGraph => {
                let json = serde_json::to_string(&self.graph.snapshot())?;
                self.cx.output.stdout(&format!("{json}\n"));
            }
            StmtKind::Commit => self.state.commit(&self.graph.snapshot())?,
        }

        Ok(())
    }

    /// Sleeps for `duration`, unless an abort is requested.
    fn sleep(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;

        loop {
            self.cx.abort.check()?;

            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }

            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }

    /// Resolves the `$name` references of a text template.
    fn interpolate(&self, template: &str) -> Result<String> {
        let mut text = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(i) = rest.find('$') {
            text.push_str(&rest[..i]);
            rest = &rest[i + 1..];

            if let Some(after) = rest.strip_prefix('$') {
                text.push('$');
                rest = after;
                continue;
            }

            let end = rest
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(rest.len());
            let name = &rest[..end];

            if !is_identifier(name) {
                text.push('$');
                continue;
            }

            let value = self
                .variables
                .get(name)
                .ok_or_else(|| Error::Undefined(format!("variable `{name}`")))?;

            text.push_str(value);
            rest = &rest[end..];
        }

        text.push_str(rest);

        Ok(text)
    }
}

/// Trace hook and output sink of evaluations nobody watches.
pub(crate) struct Silent;

impl TraceHook for Silent {
    fn line(&mut self, _line: u32, _depth: usize) -> core::result::Result<(), Interrupt> {
        Ok(())
    }
}

impl OutputSink for Silent {
    fn stdout(&mut self, _text: &str) {}

    fn stderr(&mut self, _text: &str) {}
}

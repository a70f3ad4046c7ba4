use std::path::PathBuf;

use stepwise_protocol::runtime::{ExpectedTermination, Interrupt, RunContext, Runtime};

use crate::convert;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::interp::Interpreter;
use crate::parse::parse_program;
use crate::store::WorkingState;

/// [Runtime] executing graph scripts.
///
/// The graph committed by a script (with `commit`) is loaded by the next
/// run. It is kept in memory, unless a data directory is configured with
/// [with_data_dir](Self::with_data_dir).
#[derive(Debug, Default)]
pub struct ScriptRuntime {
    state: WorkingState,
}

impl ScriptRuntime {
    /// Creates a runtime keeping its working state in memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runtime persisting its working state in `dir`.
    ///
    /// The directory is created when the runtime is initialized, and wiped
    /// before every debugged run.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            state: WorkingState::new(Some(dir.into())),
        }
    }
}

impl Runtime for ScriptRuntime {
    type Error = Error;

    fn initialize(&mut self) -> Result<()> {
        self.state.prepare()
    }

    fn reset_working_state(&mut self) -> Result<()> {
        self.state.reset()
    }

    fn graph_epilogue(&self, start_marker: &str, end_marker: &str) -> String {
        format!(
            "print {}\nprintgraph\nprint {}\n",
            convert::quote(&start_marker.replace('$', "$$")),
            convert::quote(&end_marker.replace('$', "$$")),
        )
    }

    #[tracing::instrument(name = "Script", skip_all)]
    fn run(&mut self, source: &str, cx: RunContext<'_>) -> Result<()> {
        let program = parse_program(source)?;

        let graph = self
            .state
            .load()?
            .map(Graph::from_snapshot)
            .unwrap_or_default();

        tracing::debug!(statements = program.len(), "script parsed");

        Interpreter::new(graph, cx, &mut self.state).run(&program)?;

        Ok(())
    }

    fn convert(&mut self, kind: &str, input: &str) -> Result<String> {
        match kind {
            "fmt" => convert::format(input),
            "dot" => convert::dot(input),
            _ => Err(Error::UnsupportedConversion(kind.to_owned())),
        }
    }

    fn classify(error: &Error) -> Option<ExpectedTermination> {
        match error {
            Error::Interrupted(Interrupt::Terminated) => Some(ExpectedTermination::UserAbort),
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Some(ExpectedTermination::MissingWorkingState)
            }
            _ => None,
        }
    }
}

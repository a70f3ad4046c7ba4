use std::sync::Arc;

use stepwise_protocol::runtime::{AbortSignal, Interrupt, RunContext, Runtime, TraceHook};
use stepwise_protocol::{Event, GRAPH_END_MARKER, GRAPH_START_MARKER, RunOutcome, SignalChannel};

use crate::breakpoint::BreakpointSet;
use crate::bus::WorkerBus;
use crate::scanner::SentinelScanner;
use crate::session::DebugSession;

/// Prepares and executes runs on the worker thread, and reports their
/// outcome over the message bus.
pub(crate) struct ExecutionOrchestrator<R> {
    runtime: R,
    channel: Arc<SignalChannel>,

    /// Breakpoints applied when the next run starts.
    breakpoints: BreakpointSet,

    initialized: bool,
}

impl<R: Runtime> ExecutionOrchestrator<R> {
    pub fn new(runtime: R, channel: Arc<SignalChannel>, breakpoints: BreakpointSet) -> Self {
        Self {
            runtime,
            channel,
            breakpoints,
            initialized: false,
        }
    }

    #[tracing::instrument(name = "Initialize", skip_all)]
    pub fn initialize(&mut self, bus: &WorkerBus) {
        self.initialized = match self.runtime.initialize() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "runtime failed to load");
                false
            }
        };

        tracing::info!(success = self.initialized, "runtime initialized");

        bus.emit(Event::Initialized {
            success: self.initialized,
        });
    }

    pub fn set_breakpoints(&mut self, lines: Vec<u32>) {
        tracing::debug!(?lines, "breakpoints buffered for the next run");
        self.breakpoints.replace(lines);
    }

    /// Runs `source` under a debug session.
    #[tracing::instrument(name = "DebugRun", skip_all)]
    pub fn run_debug(&mut self, source: &str, abort: AbortSignal, bus: &mut WorkerBus) {
        if !self.ensure_initialized(bus) {
            return;
        }

        // a command left over by an abandoned run must not resume this one
        self.channel.reset();

        if let Err(e) = self.runtime.reset_working_state() {
            let outcome = self.conclude(Err(e), None, bus);
            bus.emit(Event::RunEnded { outcome });
            return;
        }

        let user_lines = u32::try_from(source.lines().count()).unwrap_or(u32::MAX);
        let program = format!(
            "{source}\n{}",
            self.runtime
                .graph_epilogue(GRAPH_START_MARKER, GRAPH_END_MARKER)
        );

        tracing::info!(user_lines, "run started");

        let mut output = SentinelScanner::new(bus.sender());

        let result = {
            let Self {
                runtime,
                channel,
                breakpoints,
                ..
            } = &mut *self;

            let mut session = DebugSession::new(
                channel.as_ref(),
                bus,
                breakpoints,
                abort.clone(),
                user_lines,
            );
            session.begin();

            let result = runtime.run(
                &program,
                RunContext {
                    hook: &mut session,
                    output: &mut output,
                    abort: &abort,
                },
            );

            session.end();
            result
        };

        let graph = output.finish();
        let outcome = self.conclude(result, graph, bus);

        bus.emit(Event::RunEnded { outcome });
    }

    /// Runs `source` without debugging: no pause, no graph extraction.
    #[tracing::instrument(name = "PlainRun", skip_all)]
    pub fn run_plain(&mut self, source: &str, abort: AbortSignal, bus: &mut WorkerBus) {
        if !self.ensure_initialized(bus) {
            return;
        }

        let mut hook = AbortOnly(abort.clone());
        let mut output = bus.sender();

        let result = self.runtime.run(
            source,
            RunContext {
                hook: &mut hook,
                output: &mut output,
                abort: &abort,
            },
        );

        let outcome = self.conclude(result, None, bus);

        bus.emit(Event::RunEnded { outcome });
    }

    /// Converts `input`, reporting failures inline as a commented message.
    #[tracing::instrument(name = "Convert", skip(self, input))]
    pub fn convert(&mut self, kind: &str, input: &str) -> String {
        if !self.initialized {
            return conversion_error("runtime is not initialized");
        }

        match self.runtime.convert(kind, input) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "conversion failed");
                conversion_error(e)
            }
        }
    }

    /// Reports a failed run if the runtime is not initialized.
    fn ensure_initialized(&self, bus: &WorkerBus) -> bool {
        if self.initialized {
            return true;
        }

        tracing::warn!("run requested before the runtime was initialized");

        let reason = "runtime is not initialized".to_owned();
        bus.emit(Event::Stderr {
            text: format!("Execution error: {reason}\n"),
        });
        bus.emit(Event::RunEnded {
            outcome: RunOutcome::Failed(reason),
        });

        false
    }

    /// Turns the result of a run into its outcome, emitting the graph
    /// snapshot or the error report beforehand.
    fn conclude(
        &self,
        result: Result<(), R::Error>,
        graph: Option<stepwise_protocol::GraphSnapshot>,
        bus: &WorkerBus,
    ) -> RunOutcome {
        match result {
            Ok(()) => {
                tracing::info!(graph = graph.is_some(), "run completed");

                if let Some(graph) = graph {
                    bus.emit(Event::GraphReady { graph });
                }

                RunOutcome::Completed
            }
            Err(e) => match R::classify(&e) {
                Some(termination) => {
                    tracing::info!(?termination, "run terminated");
                    RunOutcome::Terminated
                }
                None => {
                    let reason = e.to_string();
                    tracing::info!(%reason, "run failed");

                    bus.emit(Event::Stderr {
                        text: format!("Execution error: {reason}\n"),
                    });

                    RunOutcome::Failed(reason)
                }
            },
        }
    }
}

fn conversion_error(e: impl std::fmt::Display) -> String {
    format!("// Error during conversion:\n// {e}")
}

/// Trace hook of plain runs, which only honors abort requests.
struct AbortOnly(AbortSignal);

impl TraceHook for AbortOnly {
    fn line(&mut self, _line: u32, _depth: usize) -> Result<(), Interrupt> {
        self.0.check()
    }
}

use std::sync::Arc;
use std::time::Duration;

use stepwise_protocol::SignalChannel;
use stepwise_protocol::runtime::Runtime;

use crate::breakpoint::BreakpointSet;
use crate::bus::message_bus;
use crate::controller::Controller;
use crate::orchestrator::ExecutionOrchestrator;

/// Debugger, ready to spawn its worker thread.
pub struct Debugger<R> {
    /// Runtime executing the workloads.
    runtime: R,

    /// Bound on the time a termination may take.
    termination_timeout: Duration,

    /// Breakpoints of the first run.
    breakpoints: BreakpointSet,
}

impl Debugger<()> {
    /// Creates a debugger builder.
    pub const fn builder() -> Builder<NeedsRuntime> {
        Builder::new()
    }
}

impl<R: Runtime> Debugger<R> {
    /// Spawns the worker thread, moving the runtime into it.
    ///
    /// # Note
    ///
    /// The runtime is not loaded until [Controller::initialize] is called.
    #[tracing::instrument(name = "Spawn", skip_all)]
    pub fn spawn(self) -> crate::Result<Controller> {
        let channel = Arc::new(SignalChannel::new());
        let (controller_bus, worker_bus) = message_bus();

        let orchestrator =
            ExecutionOrchestrator::new(self.runtime, channel.clone(), self.breakpoints);

        crate::worker::spawn(orchestrator, worker_bus)?;

        tracing::info!(
            timeout_ms = self.termination_timeout.as_millis(),
            "worker spawned"
        );

        Ok(Controller::new(
            channel,
            controller_bus,
            self.termination_timeout,
        ))
    }
}

/// Builder for [Debugger].
///
/// It is usually created by calling [Debugger::builder], and allows to
/// specify which runtime executes the workloads and how runs are stopped.
pub struct Builder<S> {
    state: S,
}

impl Builder<NeedsRuntime> {
    const fn new() -> Self {
        Self {
            state: NeedsRuntime,
        }
    }

    /// Specifies the runtime executing the workloads.
    pub fn with_runtime<R: Runtime>(self, runtime: R) -> Builder<Ready<R>> {
        Builder {
            state: Ready {
                runtime,
                termination_timeout: crate::DEFAULT_TERMINATION_TIMEOUT,
                breakpoints: BreakpointSet::new(),
            },
        }
    }
}

impl<R: Runtime> Builder<Ready<R>> {
    /// Specifies how long [Controller::terminate] waits for the worker to
    /// acknowledge, before reporting the run as terminated anyway.
    pub fn termination_timeout(mut self, timeout: Duration) -> Self {
        self.state.termination_timeout = timeout;
        self
    }

    /// Specifies the breakpoints of the first run.
    pub fn breakpoints(mut self, lines: impl IntoIterator<Item = u32>) -> Self {
        self.state.breakpoints.replace(lines);
        self
    }

    /// Builds the debugger.
    pub fn build(self) -> Debugger<R> {
        Debugger {
            runtime: self.state.runtime,
            termination_timeout: self.state.termination_timeout,
            breakpoints: self.state.breakpoints,
        }
    }
}

pub struct NeedsRuntime;

pub struct Ready<R> {
    runtime: R,
    termination_timeout: Duration,
    breakpoints: BreakpointSet,
}

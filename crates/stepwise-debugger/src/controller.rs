use std::sync::Arc;
use std::time::Duration;

use stepwise_protocol::runtime::AbortSignal;
use stepwise_protocol::{Command, Event, Request, RunOutcome, SignalChannel};
use tokio::time::Instant;

use crate::bus::ControllerBus;
use crate::error::Error;

/// Run state, as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    /// No run is active.
    Idle,

    /// A run is executing.
    Running,

    /// The run is paused, and awaits a command.
    Paused {
        /// Line the run is paused at.
        line: u32,
    },

    /// A termination was requested, and the run has not ended yet.
    Terminating,
}

/// Handle over a spawned debugger, living on the controller side.
///
/// None of its functions block: requests are queued to the worker thread,
/// and events are received with [next_event](Self::next_event).
///
/// # Note
///
/// If the controller is dropped, the active run (if any) is asked to abort,
/// and the worker thread exits once idle.
pub struct Controller {
    channel: Arc<SignalChannel>,
    bus: ControllerBus,
    state: ControlState,

    /// Abort request of the active run.
    abort: Option<AbortSignal>,

    termination_timeout: Duration,

    /// Instant at which a requested termination is considered done.
    deadline: Option<Instant>,

    /// Number of runs reported as terminated while their worker was still
    /// busy. Their remaining events are dropped.
    orphaned_runs: usize,

    termination_timeouts: usize,
}

impl Controller {
    pub(crate) const fn new(
        channel: Arc<SignalChannel>,
        bus: ControllerBus,
        termination_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            bus,
            state: ControlState::Idle,
            abort: None,
            termination_timeout,
            deadline: None,
            orphaned_runs: 0,
            termination_timeouts: 0,
        }
    }

    /// Current run state.
    pub const fn state(&self) -> ControlState {
        self.state
    }

    /// Number of terminations the worker did not acknowledge in time.
    pub const fn termination_timeouts(&self) -> usize {
        self.termination_timeouts
    }

    /// Returns whether the last command sent is not consumed by the worker
    /// yet.
    ///
    /// Only one command can be in flight: a command sent while another one
    /// is pending overwrites it.
    pub fn command_pending(&self) -> bool {
        self.channel.is_pending()
    }

    /// Asks the worker to load the runtime.
    ///
    /// The outcome is reported with [Event::Initialized]. Fails with
    /// [Error::RunInProgress] while a run is active.
    pub fn initialize(&self) -> crate::Result<()> {
        self.ensure_idle()?;

        self.send(Request::Initialize)
    }

    /// Replaces the breakpoints of the active run, or of the next run if
    /// none is active.
    pub fn set_breakpoints(&self, lines: impl IntoIterator<Item = u32>) -> crate::Result<()> {
        self.send(Request::SetBreakpoints {
            lines: lines.into_iter().collect(),
        })
    }

    /// Starts a debugged run of `source`.
    ///
    /// The run ends with an [Event::RunEnded], optionally preceded by an
    /// [Event::GraphReady] carrying the final data graph.
    #[tracing::instrument(name = "StartRun", skip_all)]
    pub fn start_run(&mut self, source: impl Into<String>) -> crate::Result<()> {
        self.ensure_idle()?;

        let abort = AbortSignal::new();

        self.send(Request::StartRun {
            source: source.into(),
            abort: abort.clone(),
        })?;

        self.begin_run(abort);

        Ok(())
    }

    /// Runs `source` without debugging: breakpoints are ignored and no
    /// graph snapshot is retrieved.
    #[tracing::instrument(name = "ExecutePlain", skip_all)]
    pub fn execute_plain(&mut self, source: impl Into<String>) -> crate::Result<()> {
        self.ensure_idle()?;

        let abort = AbortSignal::new();

        self.send(Request::ExecutePlain {
            source: source.into(),
            abort: abort.clone(),
        })?;

        self.begin_run(abort);

        Ok(())
    }

    /// Converts `input` with the runtime's conversion pipeline identified by
    /// `kind`.
    ///
    /// The result is reported with [Event::ConversionResult].
    pub fn convert(&self, kind: impl Into<String>, input: impl Into<String>) -> crate::Result<()> {
        self.ensure_idle()?;

        self.send(Request::Convert {
            kind: kind.into(),
            input: input.into(),
        })
    }

    /// Sends a command to the paused run.
    ///
    /// [Command::Terminate] is handled as [terminate](Self::terminate).
    pub fn send_command(&mut self, command: Command) -> crate::Result<()> {
        if command == Command::Terminate {
            return self.terminate();
        }

        let ControlState::Paused { line } = self.state else {
            return Err(Error::NotPaused);
        };

        tracing::debug!(?command, line, "sending command");

        self.channel.send_command(command);

        if command.resumes() {
            self.state = ControlState::Running;
        }

        Ok(())
    }

    /// Asks the active run to stop.
    ///
    /// The run is guaranteed to end (from the controller's perspective)
    /// within the termination timeout: if the worker does not acknowledge
    /// the termination in time, [next_event](Self::next_event) reports the
    /// run as terminated anyway, and the worker is abandoned.
    #[tracing::instrument(name = "Terminate", skip(self))]
    pub fn terminate(&mut self) -> crate::Result<()> {
        match self.state {
            ControlState::Idle => return Err(Error::NoActiveRun),
            ControlState::Terminating => return Ok(()),
            ControlState::Running | ControlState::Paused { .. } => (),
        }

        if let Some(abort) = &self.abort {
            abort.request();
        }

        // also wakes a worker pausing right now, whose pause is not
        // received yet
        self.channel.send_command(Command::Terminate);

        self.state = ControlState::Terminating;
        self.deadline = Some(Instant::now() + self.termination_timeout);

        tracing::info!("termination requested");

        Ok(())
    }

    /// Receives the next event from the worker.
    ///
    /// Returns `None` once the worker thread is gone.
    pub async fn next_event(&mut self) -> Option<Event> {
        loop {
            let received = match self.deadline {
                Some(deadline) => tokio::select! {
                    biased;
                    event = self.bus.events.recv() => Some(event),
                    () = tokio::time::sleep_until(deadline) => None,
                },
                None => Some(self.bus.events.recv().await),
            };

            let Some(event) = received else {
                self.abandon_run();
                return Some(Event::RunEnded {
                    outcome: RunOutcome::Terminated,
                });
            };

            let Some(event) = event else {
                tracing::info!("worker is gone");
                self.end_run();
                return None;
            };

            if self.orphaned_runs > 0 {
                if let Event::RunEnded { .. } = event {
                    self.orphaned_runs -= 1;
                    tracing::debug!("abandoned run ended");
                } else {
                    tracing::trace!("event of abandoned run dropped");
                }

                continue;
            }

            match event {
                Event::PauseHit { line } if self.state == ControlState::Running => {
                    self.state = ControlState::Paused { line };
                }
                Event::RunEnded { ref outcome } => {
                    tracing::info!(?outcome, "run ended");
                    self.end_run();
                }
                _ => (),
            }

            return Some(event);
        }
    }

    /// Asks the worker thread to exit once idle.
    ///
    /// A worker busy with a run that ignores termination is not waited for.
    pub fn shutdown(self) -> crate::Result<()> {
        self.send(Request::Shutdown)
    }

    fn send(&self, request: Request) -> crate::Result<()> {
        self.bus
            .requests
            .send(request)
            .map_err(|_| Error::WorkerGone)
    }

    fn ensure_idle(&self) -> crate::Result<()> {
        if self.state == ControlState::Idle {
            Ok(())
        } else {
            Err(Error::RunInProgress)
        }
    }

    fn begin_run(&mut self, abort: AbortSignal) {
        self.abort = Some(abort);
        self.state = ControlState::Running;
    }

    fn end_run(&mut self) {
        self.abort = None;
        self.deadline = None;
        self.state = ControlState::Idle;
    }

    fn abandon_run(&mut self) {
        tracing::warn!(
            timeout_ms = self.termination_timeout.as_millis(),
            "TerminationTimeout: worker did not acknowledge termination, run abandoned"
        );

        self.termination_timeouts += 1;
        self.orphaned_runs += 1;
        self.end_run();
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let Some(abort) = self.abort.take() {
            abort.request();
            self.channel.send_command(Command::Terminate);
        }
    }
}

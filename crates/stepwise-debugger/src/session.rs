use stepwise_protocol::runtime::{AbortSignal, Interrupt, TraceHook};
use stepwise_protocol::{Command, Event, Request, SignalChannel};

use crate::breakpoint::BreakpointSet;
use crate::bus::WorkerBus;

/// State of a [DebugSession].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The run has not started yet.
    Idle,

    /// The workload is executing.
    Running,

    /// The worker is blocked on the signal channel, awaiting a command.
    Paused,

    /// An abort was requested and is being propagated through the runtime.
    Terminating,

    /// The run is over.
    Terminated,
}

/// Next-pause policy, configured by the command resuming a paused run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepPolicy {
    /// Pause on breakpoints only.
    Continue,

    /// Pause on the next line at a depth lower or equal to `depth`.
    StepOver { depth: usize },

    /// Pause on the next line.
    StepInto,

    /// Pause on the next line at a depth strictly lower than `depth`.
    StepOut { depth: usize },
}

impl StepPolicy {
    const fn stops_at(self, depth: usize) -> bool {
        match self {
            Self::Continue => false,
            Self::StepOver { depth: max } => depth <= max,
            Self::StepInto => true,
            Self::StepOut { depth: max } => depth < max,
        }
    }
}

/// Debugging state of a single run, living on the worker thread.
///
/// The session is the [TraceHook] of the runtime: before each line, it
/// decides whether to pause and, if so, blocks the worker on the signal
/// channel until a resuming command arrives.
pub struct DebugSession<'w> {
    state: SessionState,
    breakpoints: BreakpointSet,
    policy: StepPolicy,
    pause_line: Option<u32>,

    /// Number of lines of the user's source. Lines past it belong to the
    /// injected epilogue and never pause.
    user_lines: u32,

    channel: &'w SignalChannel,
    bus: &'w mut WorkerBus,
    abort: AbortSignal,

    /// Breakpoints kept by the worker for upcoming runs.
    persistent_breakpoints: &'w mut BreakpointSet,
}

impl<'w> DebugSession<'w> {
    pub(crate) fn new(
        channel: &'w SignalChannel,
        bus: &'w mut WorkerBus,
        persistent_breakpoints: &'w mut BreakpointSet,
        abort: AbortSignal,
        user_lines: u32,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            breakpoints: persistent_breakpoints.clone(),
            policy: StepPolicy::Continue,
            pause_line: None,
            user_lines,
            channel,
            bus,
            abort,
            persistent_breakpoints,
        }
    }

    /// Current state of the session.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Line the run is paused at, if any.
    pub const fn pause_line(&self) -> Option<u32> {
        self.pause_line
    }

    /// Breakpoints of the session.
    pub const fn breakpoints(&self) -> &BreakpointSet {
        &self.breakpoints
    }

    pub(crate) fn begin(&mut self) {
        tracing::info!(breakpoints = self.breakpoints.len(), "session started");
        self.state = SessionState::Running;
    }

    pub(crate) fn end(&mut self) {
        tracing::info!(from = ?self.state, "session ended");
        self.state = SessionState::Terminated;
        self.pause_line = None;
    }

    /// Applies the requests that reached the worker while the run is active.
    fn drain_requests(&mut self) {
        while let Some(request) = self.bus.try_recv() {
            match request {
                Request::SetBreakpoints { lines } => {
                    tracing::debug!(?lines, "breakpoints replaced");
                    self.breakpoints.replace(lines.iter().copied());
                    self.persistent_breakpoints.replace(lines);
                }
                Request::Shutdown => {
                    tracing::info!("shutdown requested during run");
                    self.bus.request_shutdown();
                }
                request => {
                    tracing::warn!(request = request.kind(), "request rejected during run");
                    self.bus.emit(Event::Stderr {
                        text: format!(
                            "Request `{}` rejected: a run is already active\n",
                            request.kind()
                        ),
                    });
                }
            }
        }
    }

    #[tracing::instrument(name = "Pause", skip(self))]
    fn pause(&mut self, line: u32, depth: usize) -> Result<(), Interrupt> {
        self.state = SessionState::Paused;
        self.pause_line = Some(line);

        tracing::info!("paused");
        self.bus.emit(Event::PauseHit { line });

        loop {
            let command = self.channel.recv_command(None).inspect_err(|e| {
                tracing::error!(error = %e, "malformed command");
                self.state = SessionState::Terminating;
            })?;

            tracing::debug!(?command, "command received");

            self.policy = match command {
                Command::ClearBreakpoints => {
                    self.breakpoints.clear();
                    continue;
                }
                Command::SetBreakpoint(line) => {
                    self.breakpoints.set(line);
                    continue;
                }
                Command::Continue => StepPolicy::Continue,
                Command::StepOver => StepPolicy::StepOver { depth },
                Command::StepInto => StepPolicy::StepInto,
                Command::StepOut => StepPolicy::StepOut { depth },
                Command::Terminate => {
                    self.abort.request();
                    self.state = SessionState::Terminating;
                    self.pause_line = None;
                    return Err(Interrupt::Terminated);
                }
            };

            break;
        }

        self.state = SessionState::Running;
        self.pause_line = None;

        Ok(())
    }
}

impl TraceHook for DebugSession<'_> {
    fn line(&mut self, line: u32, depth: usize) -> Result<(), Interrupt> {
        if self.abort.is_requested() {
            self.state = SessionState::Terminating;
            return Err(Interrupt::Terminated);
        }

        self.drain_requests();

        if line > self.user_lines {
            return Ok(());
        }

        if self.breakpoints.contains(line) || self.policy.stops_at(depth) {
            self.pause(line, depth)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use stepwise_protocol::runtime::{AbortSignal, Interrupt, TraceHook};
    use stepwise_protocol::{Command, Event, Request, SignalChannel};
    use test_log::test;

    use super::{DebugSession, SessionState, StepPolicy};
    use crate::breakpoint::BreakpointSet;
    use crate::bus::message_bus;

    #[test]
    fn step_policies() {
        assert!(!StepPolicy::Continue.stops_at(0));

        assert!(StepPolicy::StepInto.stops_at(0));
        assert!(StepPolicy::StepInto.stops_at(5));

        let over = StepPolicy::StepOver { depth: 1 };
        assert!(over.stops_at(0));
        assert!(over.stops_at(1));
        assert!(!over.stops_at(2));

        let out = StepPolicy::StepOut { depth: 1 };
        assert!(out.stops_at(0));
        assert!(!out.stops_at(1));
        assert!(!StepPolicy::StepOut { depth: 0 }.stops_at(0));
    }

    #[test]
    fn pauses_on_breakpoint_and_applies_edits_in_place() {
        let (mut controller, mut worker) = message_bus();
        let channel = Arc::new(SignalChannel::new());
        let mut persistent: BreakpointSet = [2].into_iter().collect();

        // queued before the worker pauses, consumed one at a time
        let commander = {
            let channel = channel.clone();
            std::thread::spawn(move || {
                for command in [
                    Command::ClearBreakpoints,
                    Command::SetBreakpoint(4),
                    Command::Continue,
                ] {
                    channel.send_command(command);
                    while channel.is_pending() {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
            })
        };

        let mut session = DebugSession::new(
            &channel,
            &mut worker,
            &mut persistent,
            AbortSignal::new(),
            10,
        );
        session.begin();

        assert_eq!(session.line(1, 0), Ok(()));
        assert_eq!(session.line(2, 0), Ok(()));
        assert_eq!(session.state(), SessionState::Running);
        assert!(!session.breakpoints().contains(2));
        assert!(session.breakpoints().contains(4));

        commander.join().unwrap();
        session.end();
        drop(session);

        assert_eq!(
            controller.events.try_recv().ok(),
            Some(Event::PauseHit { line: 2 })
        );
        assert!(controller.events.try_recv().is_err());

        // edits made while paused only last for the run
        assert!(persistent.contains(2));
        assert!(!persistent.contains(4));
    }

    #[test]
    fn terminate_while_paused_interrupts() {
        let (_controller, mut worker) = message_bus();
        let channel = SignalChannel::new();
        let mut persistent: BreakpointSet = [1].into_iter().collect();
        let abort = AbortSignal::new();

        channel.send_command(Command::Terminate);

        let mut session =
            DebugSession::new(&channel, &mut worker, &mut persistent, abort.clone(), 3);
        session.begin();

        assert_eq!(session.line(1, 0), Err(Interrupt::Terminated));
        assert_eq!(session.state(), SessionState::Terminating);
        assert!(abort.is_requested());
        assert_eq!(session.line(2, 0), Err(Interrupt::Terminated));
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let (_controller, mut worker) = message_bus();
        let channel = SignalChannel::new();
        let mut persistent: BreakpointSet = [1].into_iter().collect();

        channel.notify(99, 0);

        let mut session = DebugSession::new(
            &channel,
            &mut worker,
            &mut persistent,
            AbortSignal::new(),
            3,
        );

        assert_eq!(
            session.line(1, 0),
            Err(Interrupt::Protocol(stepwise_protocol::Error::UnknownOpcode(
                99
            )))
        );
    }

    #[test]
    fn epilogue_lines_never_pause() {
        let (_controller, mut worker) = message_bus();
        let channel = SignalChannel::new();
        let mut persistent: BreakpointSet = [3].into_iter().collect();

        let mut session = DebugSession::new(
            &channel,
            &mut worker,
            &mut persistent,
            AbortSignal::new(),
            2,
        );

        // would block forever if line 3 paused
        assert_eq!(session.line(3, 0), Ok(()));
    }

    #[test]
    fn breakpoints_requested_during_run_are_applied_and_kept() {
        let (controller, mut worker) = message_bus();
        let channel = SignalChannel::new();
        let mut persistent = BreakpointSet::new();

        controller
            .requests
            .send(Request::SetBreakpoints { lines: vec![8] })
            .unwrap();

        let mut session = DebugSession::new(
            &channel,
            &mut worker,
            &mut persistent,
            AbortSignal::new(),
            10,
        );

        assert_eq!(session.line(1, 0), Ok(()));
        assert!(session.breakpoints().contains(8));

        drop(session);
        assert!(persistent.contains(8));
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reason for a trace hook to interrupt the run.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The debugger asked for the run to stop.
    #[error("Execution terminated by the debugger")]
    Terminated,

    /// The controller broke the command protocol.
    #[error("Debugger protocol violation: {0}")]
    Protocol(#[from] crate::Error),
}

/// Trait implemented by the debugger, called by a runtime before executing
/// each source line.
pub trait TraceHook {
    /// Called before `line` is executed, at call depth `depth` (`0` being the
    /// top level of the workload).
    ///
    /// This function may block the calling thread for as long as the run is
    /// paused. On error, the runtime must stop executing the workload and
    /// report the interruption.
    fn line(&mut self, line: u32, depth: usize) -> Result<(), Interrupt>;
}

/// Trait implemented by the debugger, receiving the workload's output.
///
/// Text is forwarded in chunks, as generated by the workload.
pub trait OutputSink {
    /// Called when the workload writes to its standard output.
    fn stdout(&mut self, text: &str);

    /// Called when the workload writes to its standard error.
    fn stderr(&mut self, text: &str);
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn stdout(&mut self, text: &str) {
        (**self).stdout(text);
    }

    fn stderr(&mut self, text: &str) {
        (**self).stderr(text);
    }
}

/// Cooperative abort request, shared between the controller and a run.
///
/// Runtimes check it at their own pace (e.g., within long sleeps).
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    /// Creates a signal with no abort requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the run to abort.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns whether an abort was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Fails with [Interrupt::Terminated] if an abort was requested.
    pub fn check(&self) -> Result<(), Interrupt> {
        if self.is_requested() {
            Err(Interrupt::Terminated)
        } else {
            Ok(())
        }
    }
}

/// Error signatures that denote an intentional stop rather than a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedTermination {
    /// The run was aborted on the user's request.
    UserAbort,

    /// The workload's working state vanished, following the cleanup step
    /// performed before each run.
    MissingWorkingState,
}

/// Facilities handed to a runtime for the duration of a run.
pub struct RunContext<'a> {
    /// Hook to call before executing each source line.
    pub hook: &'a mut dyn TraceHook,

    /// Destination of the workload's output.
    pub output: &'a mut dyn OutputSink,

    /// Abort request of this run.
    pub abort: &'a AbortSignal,
}

/// Trait implementing an interpreter able to run a workload under the
/// debugger.
///
/// All functions are called from the worker thread, which may block.
pub trait Runtime: Send + 'static {
    /// Error returned by this trait.
    type Error: std::error::Error + Send + 'static;

    /// Loads the runtime. Called before any other function.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Deletes any state persisted by previous runs, so that the next run
    /// starts from a clean data area.
    fn reset_working_state(&mut self) -> Result<(), Self::Error>;

    /// Returns source code that, appended to a workload, prints the final
    /// data graph as JSON on standard output, between the `start_marker` and
    /// `end_marker` lines.
    fn graph_epilogue(&self, start_marker: &str, end_marker: &str) -> String;

    /// Runs the given source to completion.
    ///
    /// If the trace hook returns an [Interrupt], the run must stop and return
    /// an error that [classify](Self::classify) recognizes (for
    /// [Interrupt::Terminated]).
    fn run(&mut self, source: &str, cx: RunContext<'_>) -> Result<(), Self::Error>;

    /// Converts `input` with the conversion pipeline identified by `kind`.
    fn convert(&mut self, kind: &str, input: &str) -> Result<String, Self::Error>;

    /// Recognizes the errors denoting an intentional stop.
    fn classify(error: &Self::Error) -> Option<ExpectedTermination>;
}

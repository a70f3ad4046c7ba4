use std::time::Duration;

use stepwise_debugger::{Controller, Debugger};
use stepwise_protocol::runtime::{ExpectedTermination, RunContext, Runtime};
use stepwise_protocol::{Command, Event, GraphSnapshot, RunOutcome};
use stepwise_script::ScriptRuntime;

/// Bound on the wait for any single event.
const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawns a debugger over `runtime` and initializes it.
pub async fn initialized<R: Runtime>(runtime: R, breakpoints: &[u32]) -> Controller {
    let mut controller = Debugger::builder()
        .with_runtime(runtime)
        .breakpoints(breakpoints.iter().copied())
        .build()
        .spawn()
        .unwrap();

    controller.initialize().unwrap();

    assert_eq!(
        next(&mut controller).await,
        Event::Initialized { success: true }
    );

    controller
}

/// Receives the next event, which must arrive in a timely manner.
pub async fn next(controller: &mut Controller) -> Event {
    tokio::time::timeout(EVENT_TIMEOUT, controller.next_event())
        .await
        .expect("no event received")
        .expect("worker is gone")
}

/// Sends `command` once the previous one is consumed by the worker.
pub async fn send(controller: &mut Controller, command: Command) {
    while controller.command_pending() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    controller.send_command(command).unwrap();
}

/// Everything observed during a run.
#[derive(Debug, Default)]
pub struct Transcript {
    pub events: Vec<Event>,
    pub pauses: Vec<u32>,
    pub stdout: String,
    pub stderr: String,
    pub graph: Option<GraphSnapshot>,
    pub outcome: Option<RunOutcome>,
}

/// Receives the events of the active run until it ends, answering each
/// pause with the commands returned by `on_pause`.
pub async fn drive(
    controller: &mut Controller,
    mut on_pause: impl FnMut(u32) -> Vec<Command>,
) -> Transcript {
    let mut transcript = Transcript::default();

    loop {
        let event = next(controller).await;

        match &event {
            Event::PauseHit { line } => {
                transcript.pauses.push(*line);

                for command in on_pause(*line) {
                    send(controller, command).await;
                }
            }
            Event::Stdout { text } => transcript.stdout.push_str(text),
            Event::Stderr { text } => transcript.stderr.push_str(text),
            Event::GraphReady { graph } => transcript.graph = Some(graph.clone()),
            Event::RunEnded { outcome } => transcript.outcome = Some(outcome.clone()),
            Event::Initialized { .. } | Event::ConversionResult { .. } => (),
        }

        let ended = matches!(event, Event::RunEnded { .. });
        transcript.events.push(event);

        if ended {
            return transcript;
        }
    }
}

/// Script runtime that takes its time to unwind an aborted run.
pub struct Lingering {
    inner: ScriptRuntime,
    linger: Duration,
}

impl Lingering {
    pub fn new(linger: Duration) -> Self {
        Self {
            inner: ScriptRuntime::new(),
            linger,
        }
    }
}

impl Runtime for Lingering {
    type Error = stepwise_script::Error;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.inner.initialize()
    }

    fn reset_working_state(&mut self) -> Result<(), Self::Error> {
        self.inner.reset_working_state()
    }

    fn graph_epilogue(&self, start_marker: &str, end_marker: &str) -> String {
        self.inner.graph_epilogue(start_marker, end_marker)
    }

    fn run(&mut self, source: &str, cx: RunContext<'_>) -> Result<(), Self::Error> {
        let result = self.inner.run(source, cx);

        if let Err(e) = &result {
            if Self::classify(e) == Some(ExpectedTermination::UserAbort) {
                std::thread::sleep(self.linger);
            }
        }

        result
    }

    fn convert(&mut self, kind: &str, input: &str) -> Result<String, Self::Error> {
        self.inner.convert(kind, input)
    }

    fn classify(error: &Self::Error) -> Option<ExpectedTermination> {
        ScriptRuntime::classify(error)
    }
}

use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::{IntoDiagnostic, miette};
use stepwise_debugger::{ControlState, Controller, Debugger};
use stepwise_protocol::{Event, GraphSnapshot, RunOutcome};
use stepwise_script::ScriptRuntime;

use crate::RunConfig;
use crate::console::{Console, PROMPT, parse_command};

/// Prefix of the text returned by a failed conversion.
const CONVERSION_ERROR_PREFIX: &str = "// Error during conversion:";

/// Runs the subcommand for running a script under the debugger.
///
/// On success, the exit code of the run is returned.
pub fn evaluate_run(
    config: Option<String>,
    breakpoints: Vec<u32>,
    graph: Option<PathBuf>,
    script: PathBuf,
) -> miette::Result<i32> {
    let config = parse_run_config(config)?;
    let source = std::fs::read_to_string(&script).into_diagnostic()?;

    block_on(async move {
        let breakpoints = config
            .breakpoints
            .iter()
            .map(|bp| bp.line)
            .chain(breakpoints);

        let mut controller = spawn(&config, breakpoints).await?;
        let mut console = Console::new();

        controller.start_run(source).into_diagnostic()?;

        let (outcome, snapshot) = follow(&mut controller, &mut console).await?;

        if let Some(path) = graph {
            match snapshot {
                Some(snapshot) => write_graph(&path, &snapshot)?,
                None => tracing::warn!("no graph was produced"),
            }
        }

        let _ = controller.shutdown();

        Ok(exit_code(&outcome))
    })
}

/// Runs the subcommand for running a script without debugging.
///
/// On success, the exit code of the run is returned.
pub fn evaluate_exec(config: Option<String>, script: PathBuf) -> miette::Result<i32> {
    let config = parse_run_config(config)?;
    let source = std::fs::read_to_string(&script).into_diagnostic()?;

    block_on(async move {
        let mut controller = spawn(&config, std::iter::empty()).await?;
        let mut console = Console::new();

        controller.execute_plain(source).into_diagnostic()?;

        let (outcome, _) = follow(&mut controller, &mut console).await?;

        let _ = controller.shutdown();

        Ok(exit_code(&outcome))
    })
}

/// Runs the subcommand for converting a script.
///
/// On success, the exit code of the conversion is returned.
pub fn evaluate_convert(kind: String, script: PathBuf) -> miette::Result<i32> {
    let source = std::fs::read_to_string(&script).into_diagnostic()?;

    block_on(async move {
        let config = parse_run_config(None)?;
        let mut controller = spawn(&config, std::iter::empty()).await?;
        let mut console = Console::new();

        controller.convert(kind, source).into_diagnostic()?;

        let text = loop {
            match controller.next_event().await {
                Some(Event::ConversionResult { text }) => break text,
                Some(_) => (),
                None => miette::bail!("debugger worker exited unexpectedly"),
            }
        };

        let failed = text.starts_with(CONVERSION_ERROR_PREFIX);

        if failed {
            console.err(&text).await.into_diagnostic()?;
            console.err("\n").await.into_diagnostic()?;
        } else {
            console.out(&text).await.into_diagnostic()?;
        }

        let _ = controller.shutdown();

        Ok(i32::from(failed))
    })
}

fn block_on<T>(future: impl Future<Output = miette::Result<T>>) -> miette::Result<T> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;

    runtime.block_on(future)
}

/// Spawns the debugger and waits for its runtime to be loaded.
async fn spawn(
    config: &RunConfig,
    breakpoints: impl IntoIterator<Item = u32>,
) -> miette::Result<Controller> {
    let runtime = match &config.data_dir {
        Some(dir) => ScriptRuntime::with_data_dir(dir),
        None => ScriptRuntime::new(),
    };

    let mut controller = Debugger::builder()
        .with_runtime(runtime)
        .termination_timeout(Duration::from_millis(config.termination_timeout_ms))
        .breakpoints(breakpoints)
        .build()
        .spawn()
        .into_diagnostic()?;

    controller.initialize().into_diagnostic()?;

    loop {
        match controller.next_event().await {
            Some(Event::Initialized { success: true }) => return Ok(controller),
            Some(Event::Initialized { success: false }) => {
                miette::bail!("script runtime failed to initialize")
            }
            Some(_) => (),
            None => miette::bail!("debugger worker exited unexpectedly"),
        }
    }
}

/// Forwards the events of the active run to the console until the run
/// ends, reading debugger commands whenever it is paused.
async fn follow(
    controller: &mut Controller,
    console: &mut Console,
) -> miette::Result<(RunOutcome, Option<GraphSnapshot>)> {
    let mut graph = None;
    let mut input_closed = false;

    loop {
        let paused = matches!(controller.state(), ControlState::Paused { .. });

        tokio::select! {
            event = controller.next_event() => {
                let Some(event) = event else {
                    miette::bail!("debugger worker exited unexpectedly");
                };

                let written = match event {
                    Event::PauseHit { line } => match pause_prompt(controller.state(), line) {
                        Some(prompt) => console.err(&prompt).await,
                        None => Ok(()),
                    },
                    Event::Stdout { text } => console.out(&text).await,
                    Event::Stderr { text } => console.err(&text).await,
                    Event::GraphReady { graph: snapshot } => {
                        graph = Some(snapshot);
                        Ok(())
                    }
                    Event::RunEnded { outcome } => return Ok((outcome, graph)),
                    Event::Initialized { .. } | Event::ConversionResult { .. } => Ok(()),
                };

                written.into_diagnostic()?;
            }
            line = console.next_line(), if paused && !input_closed => {
                let Some(line) = line.into_diagnostic()? else {
                    tracing::info!("input closed, terminating the run");
                    input_closed = true;
                    controller.terminate().into_diagnostic()?;
                    continue;
                };

                match parse_command(&line) {
                    Ok(command) => {
                        // only one command may be in flight
                        while controller.command_pending() {
                            tokio::time::sleep(Duration::from_millis(1)).await;
                        }

                        controller.send_command(command).into_diagnostic()?;
                    }
                    Err(message) => {
                        let message = message.trim_end();
                        console.err(&format!("{message}\n{PROMPT}")).await.into_diagnostic()?;
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.into_diagnostic()?;
                tracing::info!("interrupted, terminating the run");

                match controller.terminate() {
                    Ok(()) | Err(stepwise_debugger::Error::NoActiveRun) => (),
                    Err(e) => return Err(e).into_diagnostic(),
                }
            }
        }
    }
}

/// Prompt announcing a pause at `line`, if the run is still paused there.
///
/// A pause reported after a termination request is not announced, as no
/// command is read anymore.
fn pause_prompt(state: ControlState, line: u32) -> Option<String> {
    match state {
        ControlState::Paused { .. } => Some(format!("Paused at line {line}\n{PROMPT}")),
        ControlState::Idle | ControlState::Running | ControlState::Terminating => None,
    }
}

fn write_graph(path: &Path, graph: &GraphSnapshot) -> miette::Result<()> {
    let json = serde_json::to_string_pretty(graph).into_diagnostic()?;
    std::fs::write(path, json).map_err(|e| miette!("failed to write {}: {e}", path.display()))
}

const fn exit_code(outcome: &RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Completed => 0,
        RunOutcome::Failed(_) => 1,
        RunOutcome::Terminated => 130,
    }
}

fn parse_run_config(config: Option<String>) -> miette::Result<RunConfig> {
    let Some(config) = config else {
        return Ok(knus::parse("<content>", "")?);
    };

    let path = Path::new(&config);

    let config = if let Some((filename, "kdl")) = path
        .file_name()
        .and_then(OsStr::to_str)
        .zip(path.extension().and_then(OsStr::to_str))
    {
        let content = std::fs::read_to_string(path).into_diagnostic()?;
        knus::parse(filename, &content)?
    } else {
        knus::parse("<content>", &config)?
    };

    Ok(config)
}

use stepwise_protocol::runtime::Runtime;
use stepwise_protocol::{Event, Request};

use crate::bus::WorkerBus;
use crate::orchestrator::ExecutionOrchestrator;

/// Spawns the worker thread, serving requests until a shutdown or until the
/// controller is gone.
pub(crate) fn spawn<R: Runtime>(
    orchestrator: ExecutionOrchestrator<R>,
    bus: WorkerBus,
) -> crate::Result<()> {
    std::thread::Builder::new()
        .name("stepwise-worker".to_owned())
        .spawn(move || serve(orchestrator, bus))
        .map_err(crate::Error::Spawn)?;

    Ok(())
}

#[tracing::instrument(name = "Worker", skip_all)]
fn serve<R: Runtime>(mut orchestrator: ExecutionOrchestrator<R>, mut bus: WorkerBus) {
    tracing::info!("worker started");

    while let Some(request) = bus.recv_blocking() {
        tracing::debug!(request = request.kind(), "request received");

        match request {
            Request::Initialize => orchestrator.initialize(&bus),
            Request::SetBreakpoints { lines } => orchestrator.set_breakpoints(lines),
            Request::StartRun { source, abort } => orchestrator.run_debug(&source, abort, &mut bus),
            Request::ExecutePlain { source, abort } => {
                orchestrator.run_plain(&source, abort, &mut bus);
            }
            Request::Convert { kind, input } => {
                let text = orchestrator.convert(&kind, &input);
                bus.emit(Event::ConversionResult { text });
            }
            Request::Shutdown => bus.request_shutdown(),
        }
    }

    tracing::info!("worker exited");
}

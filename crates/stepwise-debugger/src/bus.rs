use stepwise_protocol::runtime::OutputSink;
use stepwise_protocol::{Event, Request};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Creates both ends of the message bus.
///
/// Both directions are unbounded FIFO queues: sending never blocks and no
/// backpressure is applied.
pub(crate) fn message_bus() -> (ControllerBus, WorkerBus) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let controller = ControllerBus {
        requests: request_tx,
        events: event_rx,
    };

    let worker = WorkerBus {
        requests: request_rx,
        events: EventSender(event_tx),
        shutdown_requested: false,
    };

    (controller, worker)
}

/// Controller end of the message bus.
pub(crate) struct ControllerBus {
    pub requests: UnboundedSender<Request>,
    pub events: UnboundedReceiver<Event>,
}

/// Worker end of the message bus.
pub(crate) struct WorkerBus {
    requests: UnboundedReceiver<Request>,
    events: EventSender,
    shutdown_requested: bool,
}

impl WorkerBus {
    /// Blocks the worker thread until the next request.
    ///
    /// Returns `None` once the controller is gone or asked for a shutdown.
    pub fn recv_blocking(&mut self) -> Option<Request> {
        if self.shutdown_requested {
            return None;
        }

        self.requests.blocking_recv()
    }

    /// Returns the next request, if one is already queued.
    pub fn try_recv(&mut self) -> Option<Request> {
        self.requests.try_recv().ok()
    }

    /// Makes [recv_blocking](Self::recv_blocking) stop yielding requests.
    pub fn request_shutdown(&mut self) {
        self.shutdown_requested = true;
    }

    pub fn emit(&self, event: Event) {
        self.events.emit(event);
    }

    pub fn sender(&self) -> EventSender {
        self.events.clone()
    }
}

/// Sending half of the worker-to-controller direction.
#[derive(Clone)]
pub(crate) struct EventSender(UnboundedSender<Event>);

impl EventSender {
    pub fn emit(&self, event: Event) {
        if self.0.send(event).is_err() {
            tracing::debug!("controller is gone, event dropped");
        }
    }
}

impl OutputSink for EventSender {
    fn stdout(&mut self, text: &str) {
        self.emit(Event::Stdout {
            text: text.to_owned(),
        });
    }

    fn stderr(&mut self, text: &str) {
        self.emit(Event::Stderr {
            text: text.to_owned(),
        });
    }
}

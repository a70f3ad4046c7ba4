//! This crate defines the protocol spoken between the controller side and
//! the worker side of a Stepwise debugging session.
//!
//! Two channels connect both sides:
//!
//! - An ordered, non-blocking message bus carrying [Request]s (controller to
//!   worker) and [Event]s (worker to controller). Everything that is not a
//!   mid-pause command travels through it.
//! - A [SignalChannel], a tiny shared-memory monitor holding a single
//!   [Command]. The worker blocks on it while a run is paused, keeping the
//!   interpreted call stack intact, until the controller writes the next
//!   command.
//!
//! The [runtime] module provides the traits to implement for plugging an
//! interpreter behind the worker.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use stepwise_protocol::{Command, SignalChannel};
//!
//! let channel = Arc::new(SignalChannel::new());
//!
//! let worker = {
//!     let channel = channel.clone();
//!     std::thread::spawn(move || channel.recv_command(None))
//! };
//!
//! channel.send_command(Command::StepOver);
//!
//! assert_eq!(worker.join().unwrap(), Ok(Command::StepOver));
//! ```

mod channel;
mod command;
mod error;
mod message;

/// Module containing traits for implementing a debuggable runtime.
pub mod runtime;

pub use self::channel::{ARG, FLAG, OPCODE, SignalChannel};
pub use self::command::{Command, opcode};
pub use self::error::{Error, Result};
pub use self::message::{Event, GraphEdge, GraphNode, GraphSnapshot, NodeId, Request, RunOutcome};
pub use self::message::{GRAPH_END_MARKER, GRAPH_START_MARKER};

//! This crate runs a workload on an isolated worker thread and lets a
//! controller pause, step through and stop it.
//!
//! The workload is executed by a [Runtime](stepwise_protocol::runtime::Runtime)
//! implementation, which calls back into a [DebugSession] before each
//! source line. When a breakpoint is hit, the worker thread blocks on a
//! [SignalChannel](stepwise_protocol::SignalChannel) with the interpreted
//! call stack intact, while the controller, which never blocks, receives a
//! [PauseHit](stepwise_protocol::Event::PauseHit) event and writes the next
//! command.
//!
//! ```no_run
//! use stepwise_debugger::Debugger;
//! use stepwise_protocol::{Command, Event};
//! use stepwise_script::ScriptRuntime;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut controller = Debugger::builder()
//!         .with_runtime(ScriptRuntime::new())
//!         .breakpoints([2])
//!         .build()
//!         .spawn()
//!         .unwrap();
//!
//!     controller.initialize().unwrap();
//!     controller.start_run("print \"one\"\nprint \"two\"\n").unwrap();
//!
//!     while let Some(event) = controller.next_event().await {
//!         match event {
//!             Event::PauseHit { .. } => controller.send_command(Command::Continue).unwrap(),
//!             Event::RunEnded { .. } => break,
//!             _ => (),
//!         }
//!     }
//! }
//! ```

mod breakpoint;
mod builder;
mod bus;
mod controller;
mod error;
mod orchestrator;
mod scanner;
mod session;
mod worker;

pub use self::breakpoint::BreakpointSet;
pub use self::builder::{Builder, Debugger};
pub use self::controller::{ControlState, Controller};
pub use self::error::{Error, Result};
pub use self::scanner::SentinelScanner;
pub use self::session::{DebugSession, SessionState};

/// Default bound on the time a termination may take, from the caller's
/// perspective.
pub const DEFAULT_TERMINATION_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(1000);

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::{Command, Error, Result};

/// Index of the cell telling whether a command is waiting to be consumed.
pub const FLAG: usize = 0;

/// Index of the cell holding the command opcode.
pub const OPCODE: usize = 1;

/// Index of the cell holding the command argument.
pub const ARG: usize = 2;

const IDLE: i32 = 0;
const SIGNALED: i32 = 1;

/// Single-slot command channel shared by the controller and a worker.
///
/// The channel is made of three cells (see [FLAG], [OPCODE] and [ARG])
/// guarded by a monitor. The controller is the only writer of the payload
/// cells and the only one setting the flag; the worker is the only one
/// resetting it.
///
/// # Warning
///
/// There is no queue. Notifying again before the worker consumed the
/// previous command overwrites it, so the controller must wait for the
/// worker to acknowledge a command (or check [is_pending](Self::is_pending))
/// before sending another one.
#[derive(Debug, Default)]
pub struct SignalChannel {
    cells: Mutex<[i32; 3]>,
    signaled: Condvar,
}

impl SignalChannel {
    /// Creates an idle channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a raw `(opcode, arg)` payload, raises the flag and wakes the
    /// waiting worker (if any).
    pub fn notify(&self, opcode: i32, arg: i32) {
        let mut cells = self.lock();

        if cells[FLAG] != IDLE {
            tracing::warn!(
                pending = cells[OPCODE],
                opcode,
                "unconsumed command overwritten"
            );
        }

        cells[OPCODE] = opcode;
        cells[ARG] = arg;
        cells[FLAG] = SIGNALED;

        drop(cells);
        self.signaled.notify_one();
    }

    /// Blocks until the flag is raised, then consumes the raw payload.
    ///
    /// The flag is checked before every wait, so a payload notified before
    /// the call is returned right away.
    ///
    /// If `timeout` is given and elapses first, [Error::TimedOut] is
    /// returned and the channel is left untouched.
    pub fn wait_and_consume(&self, timeout: Option<Duration>) -> Result<(i32, i32)> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);

        let mut cells = self.lock();

        while cells[FLAG] == IDLE {
            cells = match deadline {
                None => self
                    .signaled
                    .wait(cells)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                        return Err(Error::TimedOut);
                    };

                    self.signaled
                        .wait_timeout(cells, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }

        cells[FLAG] = IDLE;

        Ok((cells[OPCODE], cells[ARG]))
    }

    /// Encodes and notifies the given command.
    pub fn send_command(&self, command: Command) {
        let (opcode, arg) = command.encode();
        self.notify(opcode, arg);
    }

    /// Waits for the next command and decodes it.
    pub fn recv_command(&self, timeout: Option<Duration>) -> Result<Command> {
        let (opcode, arg) = self.wait_and_consume(timeout)?;
        Command::decode(opcode, arg)
    }

    /// Returns whether a notified command has not been consumed yet.
    pub fn is_pending(&self) -> bool {
        self.lock()[FLAG] != IDLE
    }

    /// Drops any unconsumed command and zeroes all cells.
    pub fn reset(&self) {
        *self.lock() = [IDLE, 0, 0];
    }

    /// Copy of the three cells, in wire layout order.
    pub fn cells(&self) -> [i32; 3] {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, [i32; 3]> {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use test_log::test;

    use super::{ARG, FLAG, OPCODE, SignalChannel};
    use crate::{Command, Error};

    #[test]
    fn command_notified_before_wait_is_not_lost() {
        let channel = SignalChannel::new();

        channel.send_command(Command::SetBreakpoint(9));
        assert!(channel.is_pending());

        assert_eq!(
            channel.recv_command(Some(Duration::ZERO)),
            Ok(Command::SetBreakpoint(9))
        );
        assert!(!channel.is_pending());
    }

    #[test]
    fn cells_follow_wire_layout() {
        let channel = SignalChannel::new();
        channel.send_command(Command::SetBreakpoint(12));

        let cells = channel.cells();
        assert_eq!(cells[FLAG], 1);
        assert_eq!(cells[OPCODE], 2);
        assert_eq!(cells[ARG], 12);

        channel.wait_and_consume(None).unwrap();
        assert_eq!(channel.cells()[FLAG], 0);
    }

    #[test]
    fn wait_times_out_without_consuming() {
        let channel = SignalChannel::new();

        let start = Instant::now();
        assert_eq!(
            channel.wait_and_consume(Some(Duration::from_millis(30))),
            Err(Error::TimedOut)
        );
        assert!(start.elapsed() >= Duration::from_millis(30));

        channel.send_command(Command::Continue);
        assert_eq!(channel.recv_command(None), Ok(Command::Continue));
    }

    #[test]
    fn blocked_worker_is_woken_up() {
        let channel = Arc::new(SignalChannel::new());

        let worker = {
            let channel = channel.clone();
            std::thread::spawn(move || channel.recv_command(Some(Duration::from_secs(5))))
        };

        std::thread::sleep(Duration::from_millis(20));
        channel.send_command(Command::Terminate);

        assert_eq!(worker.join().unwrap(), Ok(Command::Terminate));
    }

    #[test]
    fn second_notify_overwrites_unconsumed_command() {
        let channel = SignalChannel::new();

        channel.send_command(Command::StepInto);
        channel.send_command(Command::StepOut);

        assert_eq!(channel.recv_command(None), Ok(Command::StepOut));
        assert_eq!(
            channel.recv_command(Some(Duration::from_millis(5))),
            Err(Error::TimedOut)
        );
    }

    #[test]
    fn reset_drops_pending_command() {
        let channel = SignalChannel::new();

        channel.send_command(Command::Terminate);
        channel.reset();

        assert!(!channel.is_pending());
        assert_eq!(channel.cells(), [0, 0, 0]);
    }

    #[test]
    fn unknown_opcode_is_reported() {
        let channel = SignalChannel::new();

        channel.notify(42, 0);

        assert_eq!(channel.recv_command(None), Err(Error::UnknownOpcode(42)));
    }
}

/// Error type of this crate.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The signal channel holds an opcode outside of the command set.
    #[error("Unknown command opcode {0}")]
    UnknownOpcode(i32),

    /// A breakpoint command carries a line number that is not positive.
    #[error("Invalid breakpoint line {0}")]
    InvalidLine(i32),

    /// No command was signaled before the wait timeout elapsed.
    #[error("Timed out waiting for a command")]
    TimedOut,
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;

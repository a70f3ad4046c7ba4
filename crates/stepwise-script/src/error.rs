use stepwise_protocol::runtime::Interrupt;

/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The script is malformed.
    #[error("line {line}: {message}")]
    Parse {
        /// Line of the malformed statement.
        line: u32,

        /// What is wrong with it.
        message: String,
    },

    /// A variable, function or node is used before being defined.
    #[error("{0} is not defined")]
    Undefined(String),

    /// The script raised an error (e.g., with `fail`).
    #[error("{0}")]
    Failed(String),

    /// The debugger interrupted the run.
    #[error(transparent)]
    Interrupted(#[from] Interrupt),

    /// The working state could not be read or written.
    #[error("working state I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted graph could not be (de)serialized.
    #[error("malformed graph: {0}")]
    Graph(#[from] serde_json::Error),

    /// The requested conversion does not exist.
    #[error("unsupported conversion `{0}`")]
    UnsupportedConversion(String),
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;

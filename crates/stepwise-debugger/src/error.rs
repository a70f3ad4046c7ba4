/// Error type of this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A run was requested while another one is still active.
    #[error("A run is already in progress")]
    RunInProgress,

    /// A command was sent while the run is not paused.
    #[error("The run is not paused")]
    NotPaused,

    /// A run operation was requested while no run is active.
    #[error("No active run")]
    NoActiveRun,

    /// The worker thread has exited.
    #[error("Worker thread is gone")]
    WorkerGone,

    /// The worker thread could not be spawned.
    #[error("Failed to spawn the worker thread")]
    Spawn(#[source] std::io::Error),
}

/// Result type of this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Configuration of a debugged run.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct RunConfig {
    /// Time given to a run to stop, once terminated.
    #[knus(child, default = 1000, unwrap(argument))]
    pub termination_timeout_ms: u64,

    /// Directory where scripts persist their working state.
    #[knus(child, unwrap(argument))]
    pub data_dir: Option<String>,

    /// Lines to break on.
    #[knus(children(name = "breakpoint"))]
    pub breakpoints: Vec<Breakpoint>,
}

/// Configuration of a breakpoint.
#[derive(Debug, PartialEq, knus::Decode)]
pub struct Breakpoint {
    /// Line to break on.
    #[knus(argument)]
    pub line: u32,
}

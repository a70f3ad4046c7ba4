use std::path::PathBuf;

/// The Stepwise debugger.
#[derive(clap::Parser)]
pub struct CliOpts {
    /// The command to run.
    #[clap(subcommand)]
    pub action: CliAction,
}

/// The command to run.
#[derive(clap::Subcommand)]
pub enum CliAction {
    /// Command to run a script under the debugger.
    ///
    /// When the run pauses, debugger commands are read from the standard
    /// input (`help` lists them).
    Run {
        /// Debugger configuration (KDL format).
        ///
        /// If it ends with `.kdl`, it is treated as a path to a configuration
        /// file. Otherwise it is directly parsed as inline KDL-formatted
        /// configuration.
        #[clap(short, long, value_name = "CONTENT/PATH")]
        config: Option<String>,

        /// Line to break on, in addition to the configured ones.
        #[clap(short = 'b', long = "breakpoint", value_name = "LINE")]
        breakpoints: Vec<u32>,

        /// Path where to store the final data graph (JSON format).
        #[clap(short, long, value_name = "PATH")]
        graph: Option<PathBuf>,

        /// Path to the script to run.
        script: PathBuf,
    },

    /// Command to run a script without debugging.
    Exec {
        /// Debugger configuration (KDL format), see `run`.
        #[clap(short, long, value_name = "CONTENT/PATH")]
        config: Option<String>,

        /// Path to the script to run.
        script: PathBuf,
    },

    /// Command to convert a script.
    Convert {
        /// The conversion to perform (`fmt` or `dot`).
        #[clap(short, long, default_value = "fmt")]
        kind: String,

        /// Path to the script to convert.
        script: PathBuf,
    },
}

impl CliOpts {
    /// Parses the CLI from the command-line.
    ///
    /// # Warning
    ///
    /// Exits on error.
    pub fn parse_from_cmdline() -> Self {
        <Self as clap::Parser>::parse()
    }
}

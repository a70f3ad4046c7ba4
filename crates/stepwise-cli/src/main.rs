#![allow(missing_docs)]
#![allow(clippy::print_stderr)]

use stepwise_cli::{CliAction, CliOpts};

use tracing_subscriber::EnvFilter;

fn main() {
    let cli = CliOpts::parse_from_cmdline();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_env_var("STEPWISE_LOG")
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let res = match cli.action {
        CliAction::Run {
            config,
            breakpoints,
            graph,
            script,
        } => stepwise_cli::evaluate_run(config, breakpoints, graph, script),
        CliAction::Exec { config, script } => stepwise_cli::evaluate_exec(config, script),
        CliAction::Convert { kind, script } => stepwise_cli::evaluate_convert(kind, script),
    };

    match res {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    }
}

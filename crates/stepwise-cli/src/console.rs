use stepwise_protocol::Command;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stderr, Stdin, Stdout};

/// Prompt displayed while a run is paused.
pub(crate) const PROMPT: &str = "(stepwise) ";

pub(crate) const HELP: &str = "\
Commands:
  c, continue     resume until the next breakpoint
  n, next         step over the current line
  s, step         step into the current line
  o, out          step out of the current function
  b, break LINE   break on LINE
  clear           remove every breakpoint
  q, quit         terminate the run
";

/// Parses a debugger command typed while a run is paused.
///
/// On error, the returned message tells what is wrong.
pub fn parse_command(input: &str) -> Result<Command, String> {
    let mut words = input.split_whitespace();

    let command = match words.next() {
        Some("c" | "continue") => Command::Continue,
        Some("n" | "next") => Command::StepOver,
        Some("s" | "step") => Command::StepInto,
        Some("o" | "out") => Command::StepOut,
        Some("clear") => Command::ClearBreakpoints,
        Some("q" | "quit") => Command::Terminate,
        Some("b" | "break") => {
            let line = words
                .next()
                .and_then(|line| line.parse::<u32>().ok())
                .filter(|&line| line > 0)
                .ok_or_else(|| "expected a line number (e.g., `b 3`)".to_owned())?;

            Command::SetBreakpoint(line)
        }
        Some("h" | "help") | None => return Err(HELP.to_owned()),
        Some(other) => return Err(format!("unknown command `{other}` (try `help`)")),
    };

    match words.next() {
        Some(extra) => Err(format!("unexpected argument `{extra}`")),
        None => Ok(command),
    }
}

/// Standard streams of the CLI.
pub(crate) struct Console {
    input: Lines<BufReader<Stdin>>,
    stdout: Stdout,
    stderr: Stderr,
}

impl Console {
    pub fn new() -> Self {
        Self {
            input: BufReader::new(tokio::io::stdin()).lines(),
            stdout: tokio::io::stdout(),
            stderr: tokio::io::stderr(),
        }
    }

    pub async fn out(&mut self, text: &str) -> std::io::Result<()> {
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.flush().await
    }

    pub async fn err(&mut self, text: &str) -> std::io::Result<()> {
        self.stderr.write_all(text.as_bytes()).await?;
        self.stderr.flush().await
    }

    /// Reads the next input line, or `None` once the input is closed.
    ///
    /// Cancellation safe.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.input.next_line().await
    }
}

#[cfg(test)]
mod tests {
    use stepwise_protocol::Command;

    use super::{HELP, parse_command};

    #[test]
    fn commands() {
        assert_eq!(parse_command("c"), Ok(Command::Continue));
        assert_eq!(parse_command("  continue "), Ok(Command::Continue));
        assert_eq!(parse_command("n"), Ok(Command::StepOver));
        assert_eq!(parse_command("step"), Ok(Command::StepInto));
        assert_eq!(parse_command("out"), Ok(Command::StepOut));
        assert_eq!(parse_command("clear"), Ok(Command::ClearBreakpoints));
        assert_eq!(parse_command("q"), Ok(Command::Terminate));
        assert_eq!(parse_command("b 12"), Ok(Command::SetBreakpoint(12)));
    }

    #[test]
    fn invalid_commands() {
        assert_eq!(parse_command(""), Err(HELP.to_owned()));
        assert_eq!(parse_command("help"), Err(HELP.to_owned()));
        assert!(parse_command("b").is_err());
        assert!(parse_command("b 0").is_err());
        assert!(parse_command("b x").is_err());
        assert!(parse_command("c now").is_err());
        assert!(parse_command("jump").is_err());
    }
}

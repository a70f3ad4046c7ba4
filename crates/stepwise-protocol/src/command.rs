use crate::{Error, Result};

/// Opcodes stored in the [OPCODE](crate::OPCODE) cell of the signal channel.
///
/// The set is closed and versioned with the protocol.
pub mod opcode {
    /// Opcode of [Command::ClearBreakpoints](super::Command::ClearBreakpoints).
    pub const CLEAR_BREAKPOINTS: i32 = 1;

    /// Opcode of [Command::SetBreakpoint](super::Command::SetBreakpoint).
    pub const SET_BREAKPOINT: i32 = 2;

    /// Opcode of [Command::Continue](super::Command::Continue).
    pub const CONTINUE: i32 = 3;

    /// Opcode of [Command::StepOver](super::Command::StepOver).
    pub const STEP_OVER: i32 = 4;

    /// Opcode of [Command::StepInto](super::Command::StepInto).
    pub const STEP_INTO: i32 = 5;

    /// Opcode of [Command::StepOut](super::Command::StepOut).
    pub const STEP_OUT: i32 = 6;

    /// Opcode of [Command::Terminate](super::Command::Terminate).
    pub const TERMINATE: i32 = 7;
}

/// Debugger command handed to a paused worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Removes every breakpoint of the session.
    ClearBreakpoints,

    /// Adds a breakpoint on the given source line.
    SetBreakpoint(u32),

    /// Resumes until the next breakpoint (or the end of the run).
    Continue,

    /// Resumes until the next line at the same or a shallower call depth.
    StepOver,

    /// Resumes until the next line, whatever its call depth.
    StepInto,

    /// Resumes until the current frame has returned.
    StepOut,

    /// Aborts the run.
    Terminate,
}

impl Command {
    /// Encodes the command into its `(opcode, arg)` cell values.
    ///
    /// Commands without payload use `0` as argument.
    pub fn encode(self) -> (i32, i32) {
        match self {
            Self::ClearBreakpoints => (opcode::CLEAR_BREAKPOINTS, 0),
            Self::SetBreakpoint(line) => (
                opcode::SET_BREAKPOINT,
                i32::try_from(line).unwrap_or(i32::MAX),
            ),
            Self::Continue => (opcode::CONTINUE, 0),
            Self::StepOver => (opcode::STEP_OVER, 0),
            Self::StepInto => (opcode::STEP_INTO, 0),
            Self::StepOut => (opcode::STEP_OUT, 0),
            Self::Terminate => (opcode::TERMINATE, 0),
        }
    }

    /// Decodes a command from its `(opcode, arg)` cell values.
    pub fn decode(opcode: i32, arg: i32) -> Result<Self> {
        let command = match opcode {
            opcode::CLEAR_BREAKPOINTS => Self::ClearBreakpoints,
            opcode::SET_BREAKPOINT => {
                let line = u32::try_from(arg)
                    .ok()
                    .filter(|line| *line > 0)
                    .ok_or(Error::InvalidLine(arg))?;
                Self::SetBreakpoint(line)
            }
            opcode::CONTINUE => Self::Continue,
            opcode::STEP_OVER => Self::StepOver,
            opcode::STEP_INTO => Self::StepInto,
            opcode::STEP_OUT => Self::StepOut,
            opcode::TERMINATE => Self::Terminate,
            unknown => return Err(Error::UnknownOpcode(unknown)),
        };

        Ok(command)
    }

    /// Returns whether the command leaves the paused state.
    ///
    /// Breakpoint edits are applied in place and keep the worker paused.
    pub const fn resumes(self) -> bool {
        !matches!(self, Self::ClearBreakpoints | Self::SetBreakpoint(_))
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, opcode};
    use crate::Error;

    #[test]
    fn opcodes_match_wire_layout() {
        assert_eq!(Command::ClearBreakpoints.encode(), (1, 0));
        assert_eq!(Command::SetBreakpoint(42).encode(), (2, 42));
        assert_eq!(Command::Continue.encode(), (3, 0));
        assert_eq!(Command::StepOver.encode(), (4, 0));
        assert_eq!(Command::StepInto.encode(), (5, 0));
        assert_eq!(Command::StepOut.encode(), (6, 0));
        assert_eq!(Command::Terminate.encode(), (7, 0));
    }

    #[test]
    fn decode_ignores_argument_of_payloadless_commands() {
        assert_eq!(
            Command::decode(opcode::STEP_OUT, 1234),
            Ok(Command::StepOut)
        );
        assert_eq!(
            Command::decode(opcode::SET_BREAKPOINT, 7),
            Ok(Command::SetBreakpoint(7))
        );
    }

    #[test]
    fn decode_rejects_unknown_opcodes() {
        assert_eq!(Command::decode(0, 0), Err(Error::UnknownOpcode(0)));
        assert_eq!(Command::decode(8, 3), Err(Error::UnknownOpcode(8)));
        assert_eq!(Command::decode(-1, 0), Err(Error::UnknownOpcode(-1)));
    }

    #[test]
    fn decode_rejects_non_positive_lines() {
        assert_eq!(
            Command::decode(opcode::SET_BREAKPOINT, 0),
            Err(Error::InvalidLine(0))
        );
        assert_eq!(
            Command::decode(opcode::SET_BREAKPOINT, -5),
            Err(Error::InvalidLine(-5))
        );
    }

    #[test]
    fn only_breakpoint_edits_keep_the_pause() {
        assert!(!Command::ClearBreakpoints.resumes());
        assert!(!Command::SetBreakpoint(1).resumes());
        assert!(Command::Continue.resumes());
        assert!(Command::StepOver.resumes());
        assert!(Command::StepInto.resumes());
        assert!(Command::StepOut.resumes());
        assert!(Command::Terminate.resumes());
    }
}

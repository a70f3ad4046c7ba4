//! This crate provides [ScriptRuntime], a small line-oriented scripting
//! language building a data graph, runnable under the Stepwise debugger.
//!
//! Each non-blank, non-comment line holds one statement, and is reported to
//! the debugger's trace hook before being executed:
//!
//! | statement                 | effect                                             |
//! |---------------------------|----------------------------------------------------|
//! | `print <text>`            | writes a line to standard output                   |
//! | `eprint <text>`           | writes a line to standard error                    |
//! | `let <name> = <text>`     | sets a variable, referenced as `$name` in texts    |
//! | `node <id> [label]`       | adds (or relabels) a graph node                    |
//! | `edge <from> <to> [label]`| adds a graph edge between existing nodes           |
//! | `fn <name> {` ... `}`     | defines a function                                 |
//! | `call <name>`             | calls a function, one level deeper                 |
//! | `repeat <n> {` ... `}`    | repeats a block                                    |
//! | `sleep <ms>`              | sleeps, unless the run is aborted                  |
//! | `busy <ms>`               | sleeps, whatever happens                           |
//! | `fail <text>`             | fails the run                                      |
//! | `printgraph`              | writes the graph as JSON to standard output        |
//! | `commit`                  | persists the graph for the next run                |
//!
//! Texts are either quoted (with `\n`, `\t`, `\"` and `\\` escapes) or span
//! the rest of the line.
//!
//! ```
//! use stepwise_protocol::runtime::Runtime;
//! use stepwise_script::ScriptRuntime;
//!
//! let mut runtime = ScriptRuntime::new();
//!
//! let formatted = runtime.convert("fmt", "repeat 2 {\nprint hi\n}").unwrap();
//! assert_eq!(formatted, "repeat 2 {\n    print \"hi\"\n}\n");
//! ```

mod convert;
mod error;
mod graph;
mod interp;
mod parse;
mod runtime;
mod store;

pub use self::error::{Error, Result};
pub use self::runtime::ScriptRuntime;

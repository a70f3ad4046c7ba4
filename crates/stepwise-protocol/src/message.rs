use std::fmt;

use serde::{Deserialize, Serialize};

use crate::runtime::AbortSignal;

/// Sentinel line printed right before the serialized graph snapshot.
///
/// Sentinel lines are reserved: a workload printing one itself splits its
/// output at that point.
pub const GRAPH_START_MARKER: &str = "<==START PRINT GRAPH==>";

/// Sentinel line printed right after the serialized graph snapshot.
pub const GRAPH_END_MARKER: &str = "<==END PRINT GRAPH==>";

/// Message sent by the controller to the worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Request {
    /// Loads the runtime. Answered by [Event::Initialized].
    Initialize,

    /// Replaces the breakpoints of the current session, or of the next one
    /// if no run is active.
    SetBreakpoints {
        /// Source lines to break on.
        lines: Vec<u32>,
    },

    /// Starts a debugged run of the given source.
    StartRun {
        /// Source of the workload.
        source: String,

        /// Abort request shared with the controller for this run only.
        #[serde(skip)]
        abort: AbortSignal,
    },

    /// Converts a source with the runtime's conversion pipeline.
    /// Answered by [Event::ConversionResult].
    Convert {
        /// Conversion to perform.
        kind: String,

        /// Source to convert.
        input: String,
    },

    /// Runs the given source without debugging.
    ExecutePlain {
        /// Source of the workload.
        source: String,

        /// Abort request shared with the controller for this run only.
        #[serde(skip)]
        abort: AbortSignal,
    },

    /// Stops the worker loop once the current request is handled.
    Shutdown,
}

impl Request {
    /// Short name of the request kind, for diagnostics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::SetBreakpoints { .. } => "setBreakpoints",
            Self::StartRun { .. } => "startRun",
            Self::Convert { .. } => "convert",
            Self::ExecutePlain { .. } => "executePlain",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Message sent by the worker to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    /// Outcome of [Request::Initialize].
    Initialized {
        /// Whether the runtime is ready to run workloads.
        success: bool,
    },

    /// Text written by the workload to its standard output.
    Stdout {
        /// Output text, as generated.
        text: String,
    },

    /// Text written by the workload to its standard error, or an error
    /// reported on its behalf.
    Stderr {
        /// Output text, as generated.
        text: String,
    },

    /// The run is paused before executing the given line.
    PauseHit {
        /// Line the worker is paused at.
        line: u32,
    },

    /// Data graph built by a run that completed normally.
    GraphReady {
        /// Graph snapshot.
        graph: GraphSnapshot,
    },

    /// The run is over. Emitted exactly once per run.
    RunEnded {
        /// How the run ended.
        outcome: RunOutcome,
    },

    /// Outcome of [Request::Convert].
    ConversionResult {
        /// Converted text, or a commented error message.
        text: String,
    },
}

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum RunOutcome {
    /// The workload ran to its end.
    Completed,

    /// The run was stopped on purpose.
    Terminated,

    /// The workload raised an unexpected error.
    Failed(String),
}

/// Snapshot of the data graph built by a workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Graph nodes, in creation order.
    pub nodes: Vec<GraphNode>,

    /// Graph edges, in creation order.
    pub edges: Vec<GraphEdge>,
}

/// Node of a [GraphSnapshot].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Node identifier.
    pub id: NodeId,

    /// Human-readable rendering of the node's data record.
    pub label: String,
}

/// Edge of a [GraphSnapshot].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node.
    pub from: NodeId,

    /// Destination node.
    pub to: NodeId,

    /// Human-readable rendering of the edge's data record.
    #[serde(default)]
    pub label: String,
}

/// Identifier of a graph node.
///
/// Runtimes are free to use numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    /// Numeric identifier.
    Number(u64),

    /// Textual identifier.
    Text(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

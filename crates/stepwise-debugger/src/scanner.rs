use stepwise_protocol::runtime::OutputSink;
use stepwise_protocol::{GRAPH_END_MARKER, GRAPH_START_MARKER, GraphSnapshot};

/// Output sink splitting a workload's standard output into user-visible
/// text and an embedded graph snapshot.
///
/// Lines between the [GRAPH_START_MARKER] and [GRAPH_END_MARKER] lines are
/// buffered and decoded as a [GraphSnapshot]; every other line is forwarded
/// to the inner sink as soon as it is complete. The markers are never
/// forwarded. Standard error passes through untouched.
///
/// # Note
///
/// The marker lines are reserved: a workload printing them by itself splits
/// its output at that point.
pub struct SentinelScanner<S> {
    inner: S,
    /// Text of the current line, not terminated yet.
    partial: String,
    state: ScanState,
    graph: Option<GraphSnapshot>,
}

enum ScanState {
    Outside,
    Inside { payload: String },
}

impl<S: OutputSink> SentinelScanner<S> {
    /// Creates a scanner forwarding to `inner`.
    pub const fn new(inner: S) -> Self {
        Self {
            inner,
            partial: String::new(),
            state: ScanState::Outside,
            graph: None,
        }
    }

    /// Flushes the last unterminated line and returns the decoded graph
    /// snapshot, if any.
    ///
    /// A snapshot missing its end marker is dropped.
    pub fn finish(mut self) -> Option<GraphSnapshot> {
        if !self.partial.is_empty() {
            let line = std::mem::take(&mut self.partial);
            self.scan_line(&line);
        }

        if let ScanState::Inside { .. } = self.state {
            tracing::warn!("graph snapshot is missing its end marker");
        }

        self.graph
    }

    fn scan_line(&mut self, line: &str) {
        let content = line.trim_end_matches(['\n', '\r']);

        if let ScanState::Inside { payload } = &mut self.state {
            if content == GRAPH_END_MARKER {
                let payload = std::mem::take(payload);
                self.state = ScanState::Outside;
                self.decode(&payload);
            } else {
                payload.push_str(line);
            }
        } else if content == GRAPH_START_MARKER {
            self.state = ScanState::Inside {
                payload: String::new(),
            };
        } else {
            self.inner.stdout(line);
        }
    }

    fn decode(&mut self, payload: &str) {
        match serde_json::from_str::<GraphSnapshot>(payload) {
            Ok(graph) => {
                tracing::debug!(
                    nodes = graph.nodes.len(),
                    edges = graph.edges.len(),
                    "graph snapshot decoded"
                );

                self.graph = Some(graph);
            }
            Err(e) => {
                tracing::warn!(error = %e, "bad graph snapshot");

                self.inner
                    .stderr(&format!("Graph snapshot could not be decoded: {e}\n"));
            }
        }
    }
}

impl<S: OutputSink> OutputSink for SentinelScanner<S> {
    fn stdout(&mut self, text: &str) {
        self.partial.push_str(text);

        while let Some(end) = self.partial.find('\n') {
            let line = self.partial.drain(..=end).collect::<String>();
            self.scan_line(&line);
        }
    }

    fn stderr(&mut self, text: &str) {
        self.inner.stderr(text);
    }
}

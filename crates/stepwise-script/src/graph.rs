use std::collections::HashMap;

use stepwise_protocol::{GraphEdge, GraphNode, GraphSnapshot, NodeId};

use crate::error::{Error, Result};

/// Data graph built by a script.
#[derive(Debug, Default)]
pub(crate) struct Graph {
    nodes: Vec<GraphNode>,

    /// Position of each node in `nodes`.
    index: HashMap<NodeId, usize>,

    edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let index = snapshot
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id.clone(), i))
            .collect();

        Self {
            nodes: snapshot.nodes,
            index,
            edges: snapshot.edges,
        }
    }

    /// Adds a node, or relabels it if it already exists.
    pub fn node(&mut self, id: NodeId, label: String) {
        match self.index.get(&id) {
            Some(&i) => self.nodes[i].label = label,
            None => {
                self.index.insert(id.clone(), self.nodes.len());
                self.nodes.push(GraphNode { id, label });
            }
        }
    }

    /// Adds an edge between two existing nodes.
    pub fn edge(&mut self, from: NodeId, to: NodeId, label: String) -> Result<()> {
        for id in [&from, &to] {
            if !self.index.contains_key(id) {
                return Err(Error::Undefined(format!("node `{id}`")));
            }
        }

        self.edges.push(GraphEdge { from, to, label });

        Ok(())
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}

/// Identifier of the node named `text` in a script.
pub(crate) fn node_id(text: &str) -> NodeId {
    text.parse()
        .map_or_else(|_| NodeId::Text(text.to_owned()), NodeId::Number)
}

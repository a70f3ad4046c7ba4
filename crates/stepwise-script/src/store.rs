use std::io;
use std::path::PathBuf;

use stepwise_protocol::GraphSnapshot;

use crate::error::Result;

/// Name of the file holding the committed graph, within the data directory.
pub(crate) const GRAPH_FILE: &str = "graph.json";

/// Graph committed by previous runs, persisted in a data directory if one
/// is configured, or in memory otherwise.
#[derive(Debug, Default)]
pub(crate) struct WorkingState {
    data_dir: Option<PathBuf>,
    committed: Option<GraphSnapshot>,
}

impl WorkingState {
    pub const fn new(data_dir: Option<PathBuf>) -> Self {
        Self {
            data_dir,
            committed: None,
        }
    }

    /// Creates the data directory, if missing.
    pub fn prepare(&self) -> Result<()> {
        if let Some(dir) = &self.data_dir {
            std::fs::create_dir_all(dir)?;
        }

        Ok(())
    }

    /// Deletes the committed graph, starting over with an empty data
    /// directory.
    pub fn reset(&mut self) -> Result<()> {
        self.committed = None;

        let Some(dir) = &self.data_dir else {
            return Ok(());
        };

        match std::fs::remove_dir_all(dir) {
            Ok(()) => tracing::debug!(dir = %dir.display(), "data directory removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (),
            Err(e) => return Err(e.into()),
        }

        self.prepare()
    }

    /// Returns the committed graph, if any.
    pub fn load(&self) -> Result<Option<GraphSnapshot>> {
        let Some(dir) = &self.data_dir else {
            return Ok(self.committed.clone());
        };

        match std::fs::read(dir.join(GRAPH_FILE)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Commits `graph`, overwriting the previous one.
    ///
    /// The data directory is not created: if it vanished during the run,
    /// the commit fails.
    pub fn commit(&mut self, graph: &GraphSnapshot) -> Result<()> {
        match &self.data_dir {
            Some(dir) => std::fs::write(dir.join(GRAPH_FILE), serde_json::to_vec(graph)?)?,
            None => self.committed = Some(graph.clone()),
        }

        Ok(())
    }
}

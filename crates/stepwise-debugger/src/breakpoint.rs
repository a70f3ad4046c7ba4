use std::collections::HashSet;

/// Set of source lines to break on.
///
/// Membership is checked before every executed line of a workload, so
/// lookups are constant time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointSet {
    lines: HashSet<u32>,
}

impl BreakpointSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a breakpoint on `line`.
    ///
    /// Line `0` does not exist and is ignored.
    pub fn set(&mut self, line: u32) {
        if line == 0 {
            tracing::warn!("ignoring breakpoint on line 0");
            return;
        }

        self.lines.insert(line);
    }

    /// Removes every breakpoint.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Replaces every breakpoint with the given lines.
    pub fn replace(&mut self, lines: impl IntoIterator<Item = u32>) {
        self.clear();
        lines.into_iter().for_each(|line| self.set(line));
    }

    /// Returns whether there is a breakpoint on `line`.
    pub fn contains(&self, line: u32) -> bool {
        self.lines.contains(&line)
    }

    /// Number of breakpoints.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterates over the breakpoint lines, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines.iter().copied()
    }
}

impl FromIterator<u32> for BreakpointSet {
    fn from_iter<I: IntoIterator<Item = u32>>(lines: I) -> Self {
        let mut set = Self::new();
        set.replace(lines);
        set
    }
}

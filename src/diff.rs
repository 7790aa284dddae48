use std::collections::HashSet;

use crate::menu::{MenuItem, Snapshot};

/// Items that appeared and disappeared between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diff {
    pub added: Vec<MenuItem>,
    pub removed: Vec<MenuItem>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Set difference keyed by name only.
///
/// An item whose name is in both snapshots counts as unchanged even if its
/// description or image differs. Both lists keep their snapshot's order.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Diff {
    let previous_names: HashSet<&str> = previous.names().collect();
    let current_names: HashSet<&str> = current.names().collect();

    let added = current
        .iter()
        .filter(|item| !previous_names.contains(item.name.as_str()))
        .cloned()
        .collect();
    let removed = previous
        .iter()
        .filter(|item| !current_names.contains(item.name.as_str()))
        .cloned()
        .collect();

    Diff { added, removed }
}

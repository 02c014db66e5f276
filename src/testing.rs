use std::cell::RefCell;

use rustc_hash::FxHashMap;

use crate::graph::NodeId;
use crate::path::Path;

thread_local! {
    /// The paths each node's function was run at, in order.
    static CALLS: RefCell<FxHashMap<NodeId, Vec<Path>>> = RefCell::new(FxHashMap::default());
}

/// How often a node's function ran since the last reset.
pub fn call_count(node: NodeId) -> usize {
    CALLS.with(|calls| calls.borrow().get(&node).map_or(0, Vec::len))
}

/// The paths a node's function ran at since the last reset.
pub fn evaluated_paths(node: NodeId) -> Vec<Path> {
    CALLS.with(|calls| calls.borrow().get(&node).cloned().unwrap_or_default())
}

/// Forgets all recorded calls.
pub fn reset() {
    CALLS.with(|calls| calls.borrow_mut().clear())
}

/// Records that a node's function ran at a path.
pub(crate) fn register_call(node: NodeId, path: &Path) {
    CALLS.with(|calls| calls.borrow_mut().entry(node).or_default().push(path.clone()))
}

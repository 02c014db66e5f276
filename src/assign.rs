//! Installing and removing overrides, and undoing that.

use crate::assignment::{Assigned, Assignment};
use crate::error::{Error, Result};
use crate::graph::{Graph, NodeId};
use crate::path::Path;
use crate::value::Value;

/// How a node's overrides changed.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideChange {
    Added(Assignment),
    Removed(Assignment),
}

/// A change to a node's overrides, together with the position in the
/// node's override list it happened at.
///
/// Undo and redo replay these through
/// [`insert_override_at`](Graph::insert_override_at) and
/// [`remove_override_at`](Graph::remove_override_at).
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideEvent {
    pub node: NodeId,
    pub change: OverrideChange,
    pub index: usize,
}

/// An assignment addressed to a node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Change {
    pub node: NodeId,
    pub assignment: Assignment,
}

/// Groups of override events that can be undone and redone.
#[derive(Debug, Default)]
pub(crate) struct Journal {
    undo: Vec<Vec<OverrideEvent>>,
    redo: Vec<Vec<OverrideEvent>>,
    pending: Vec<OverrideEvent>,
    replaying: bool,
}

impl Journal {
    fn record(&mut self, event: OverrideEvent) {
        if !self.replaying {
            self.pending.push(event);
        }
    }

    /// Closes the pending group. A new group clears the redo history.
    pub fn commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.undo.push(std::mem::take(&mut self.pending));
        self.redo.clear();
    }
}

impl Graph {
    /// Assigns a value to part of a node.
    ///
    /// If the node does not accept overrides, the assignment is inverted
    /// into ancestors that do. Fails, leaving everything unchanged, when no
    /// ancestor can take it or when the choice among several is cancelled.
    pub fn assign(&mut self, id: NodeId, path: Path, value: impl Into<Value>) -> Result<()> {
        self.apply_assignment(id, Assignment::new(path, value))
    }

    /// Assigns a value known only within bounds. The stored value is
    /// rounded to the precision the bounds allow.
    pub fn assign_with_tolerance(
        &mut self,
        id: NodeId,
        path: Path,
        value: impl Into<Value>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> Result<()> {
        self.apply_assignment(id, Assignment::new(path, value).with_tolerance(lower, upper))
    }

    /// Restores the computed value of part of a node, masking the node's
    /// earlier overrides there.
    pub fn assign_default(&mut self, id: NodeId, path: Path) -> Result<()> {
        self.apply_assignment(id, Assignment::default_at(path))
    }

    pub fn apply_assignment(&mut self, id: NodeId, assignment: Assignment) -> Result<()> {
        let node = self.node(id)?;
        let change = Change { node: id, assignment };
        if change.assignment.is_default() {
            if node.overrider.is_empty() {
                return Ok(());
            }
            return self.apply_group(vec![change]);
        }
        let resolution = self.resolve(change)?;
        self.apply_group(resolution.group)?;
        self.remember_choices(resolution.choices);
        Ok(())
    }

    /// Overrides part of a node directly, whether or not it accepts
    /// overrides.
    pub fn override_at(&mut self, id: NodeId, assignment: Assignment) -> Result<()> {
        self.apply_group(vec![Change { node: id, assignment }])
    }

    /// Installs a group of overrides as one undoable step.
    ///
    /// Every override is checked against its node's value first. If any
    /// does not fit, nothing is installed.
    pub(crate) fn apply_group(&mut self, group: Vec<Change>) -> Result<()> {
        let mut prepared = Vec::with_capacity(group.len());
        for Change { node: id, assignment } in group {
            if assignment.is_default() && self.node(id)?.overrider.is_empty() {
                continue;
            }
            let assignment = self.prepare(id, assignment)?;
            prepared.push((id, assignment));
        }
        self.batched(|graph| {
            for (id, assignment) in prepared {
                graph.install(id, assignment);
            }
        });
        Ok(())
    }

    /// Rounds, simplifies and templates an assignment and checks that it
    /// can be written into the node's value.
    fn prepare(&mut self, id: NodeId, mut assignment: Assignment) -> Result<Assignment> {
        let current = self.value_valid_at(id, None)?;
        if self.config.simplify_assignments {
            assignment = assignment.rounded()?.simplified(&current);
        } else {
            assignment.tolerance = None;
        }
        if let Some(template) = self.node(id)?.template
            && let Assigned::Value(value) = &assignment.value
        {
            assignment.value = Assigned::Value(template.convert(value)?);
        }
        let written = match &assignment.value {
            Assigned::Value(value) => current.with(&assignment.path, value.clone()).map(drop),
            Assigned::Default => current.get(&assignment.path).map(drop),
        };
        written.map_err(|source| Error::InvalidAssignment { node: id, source })?;
        Ok(assignment)
    }

    fn install(&mut self, id: NodeId, assignment: Assignment) {
        let path = assignment.path.clone();
        let Some(node) = self.get_mut(id) else { return };
        let (index, replaced) = node.overrider.add(assignment.clone());
        tracing::debug!(node = %id, %assignment, "installed override");
        if let Some((old, replaced)) = replaced {
            let change = OverrideChange::Removed(replaced);
            self.emit(OverrideEvent { node: id, change, index: old });
        }
        self.emit(OverrideEvent { node: id, change: OverrideChange::Added(assignment), index });
        self.overrides_changed(id, &path);
    }

    /// Removes the override at a path, if there is one.
    pub fn remove_override(&mut self, id: NodeId, path: &Path) -> Result<()> {
        let node = self.node_mut(id)?;
        let Some((index, removed)) = node.overrider.remove(path) else {
            return Ok(());
        };
        self.batched(|graph| {
            graph.emit(OverrideEvent { node: id, change: OverrideChange::Removed(removed), index });
            graph.overrides_changed(id, path);
        });
        Ok(())
    }

    /// Inserts an override at a position in a node's override list,
    /// clamped to its end.
    pub fn insert_override_at(
        &mut self,
        id: NodeId,
        index: usize,
        assignment: Assignment,
    ) -> Result<()> {
        let node = self.node_mut(id)?;
        let index = index.min(node.overrider.len());
        let path = assignment.path.clone();
        node.overrider.insert_at(index, assignment.clone());
        self.batched(|graph| {
            let change = OverrideChange::Added(assignment);
            graph.emit(OverrideEvent { node: id, change, index });
            graph.overrides_changed(id, &path);
        });
        Ok(())
    }

    /// Removes the override at a position in a node's override list.
    pub fn remove_override_at(&mut self, id: NodeId, index: usize) -> Result<Assignment> {
        let node = self.node_mut(id)?;
        let removed =
            node.overrider.remove_at(index).ok_or(Error::NoOverrideIndex { node: id, index })?;
        let path = removed.path.clone();
        self.batched(|graph| {
            let change = OverrideChange::Removed(removed.clone());
            graph.emit(OverrideEvent { node: id, change, index });
            graph.overrides_changed(id, &path);
        });
        Ok(removed)
    }

    /// Removes all overrides of a node.
    pub fn clear_overrides(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        let removed = node.overrider.clear();
        self.batched(|graph| {
            for (index, assignment) in removed.into_iter().enumerate().rev() {
                let path = assignment.path.clone();
                let change = OverrideChange::Removed(assignment);
                graph.emit(OverrideEvent { node: id, change, index });
                graph.overrides_changed(id, &path);
            }
        });
        Ok(())
    }

    fn emit(&mut self, event: OverrideEvent) {
        self.notify(&event);
        self.journal.record(event);
    }

    /// Overrides are applied on top of the cache, so only the children
    /// need invalidating.
    fn overrides_changed(&mut self, id: NodeId, path: &Path) {
        self.schedule_redraw(id);
        self.invalidate_children(id, path);
    }

    pub fn can_undo(&self) -> bool {
        !self.journal.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.journal.redo.is_empty()
    }

    /// Reverts the last group of override changes. Returns whether there
    /// was one.
    ///
    /// A group touching a node that no longer exists stays in the journal
    /// and the undo fails.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(group) = self.journal.undo.pop() else {
            return Ok(false);
        };
        let replayed = self.replayable(&group).and_then(|()| self.replay(group.iter().rev(), true));
        if let Err(err) = replayed {
            self.journal.undo.push(group);
            return Err(err);
        }
        self.journal.redo.push(group);
        Ok(true)
    }

    /// Reapplies the last undone group. Returns whether there was one.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(group) = self.journal.redo.pop() else {
            return Ok(false);
        };
        let replayed = self.replayable(&group).and_then(|()| self.replay(group.iter(), false));
        if let Err(err) = replayed {
            self.journal.redo.push(group);
            return Err(err);
        }
        self.journal.undo.push(group);
        Ok(true)
    }

    /// Checks that every node of a group is still alive.
    fn replayable(&self, group: &[OverrideEvent]) -> Result<()> {
        match group.iter().find(|event| !self.contains(event.node)) {
            Some(event) => Err(Error::UnknownNode(event.node)),
            None => Ok(()),
        }
    }

    fn replay<'a>(
        &mut self,
        events: impl Iterator<Item = &'a OverrideEvent>,
        backwards: bool,
    ) -> Result<()> {
        self.journal.replaying = true;
        let replayed = self.batched(|graph| -> Result<()> {
            for event in events {
                match (&event.change, backwards) {
                    (OverrideChange::Added(_), true) | (OverrideChange::Removed(_), false) => {
                        graph.remove_override_at(event.node, event.index)?;
                    }
                    (OverrideChange::Removed(assignment), true)
                    | (OverrideChange::Added(assignment), false) => {
                        graph.insert_override_at(event.node, event.index, assignment.clone())?;
                    }
                }
            }
            Ok(())
        });
        self.journal.replaying = false;
        replayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, array, path};

    #[test]
    fn test_journal_groups_batches() {
        let mut graph = Graph::default();
        let a = graph.input(array![1, 2, 3]);
        {
            let mut batch = graph.aggregate();
            batch.assign(a, path![0], 10).unwrap();
            batch.assign(a, path![1], 20).unwrap();
        }
        assert_eq!(graph.value(a).unwrap(), Value::from(array![10, 20, 3]));
        assert!(graph.undo().unwrap());
        assert_eq!(graph.value(a).unwrap(), Value::from(array![1, 2, 3]));
        assert!(!graph.can_undo());
        assert!(graph.redo().unwrap());
        assert_eq!(graph.value(a).unwrap(), Value::from(array![10, 20, 3]));
    }

    #[test]
    fn test_replacing_override_undoes_to_previous() {
        let mut graph = Graph::default();
        let a = graph.input(array![1, 2]);
        graph.assign(a, path![0], 5).unwrap();
        graph.assign(a, path![1], 6).unwrap();
        graph.assign(a, path![0], 7).unwrap();
        assert_eq!(graph.overrides(a).unwrap()[1], Assignment::new(path![0], 7));

        graph.undo().unwrap();
        let restored = [Assignment::new(path![0], 5), Assignment::new(path![1], 6)];
        assert_eq!(graph.overrides(a).unwrap(), &restored);
        graph.redo().unwrap();
        assert_eq!(graph.value(a).unwrap(), Value::from(array![7, 6]));
    }

    #[test]
    fn test_invalid_assignment_changes_nothing() {
        let mut graph = Graph::default();
        let a = graph.input(array![1, 2]);
        let result = graph.assign(a, path![5], 1);
        assert!(matches!(result, Err(Error::InvalidAssignment { .. })));
        assert!(!graph.is_overridden(a).unwrap());
        assert!(!graph.can_undo());
    }

    #[test]
    fn test_remove_missing_override() {
        let mut graph = Graph::default();
        let a = graph.input(array![1, 2]);
        graph.remove_override(a, &path![0]).unwrap();
        assert!(graph.overrides(a).unwrap().is_empty());
        assert!(!graph.can_undo());
        assert!(matches!(graph.remove_override_at(a, 0), Err(Error::NoOverrideIndex { .. })));
        graph.assign_default(a, path![0]).unwrap();
        assert!(!graph.is_overridden(a).unwrap());
    }

    #[test]
    fn test_undo_keeps_group_of_released_node() {
        let mut graph = Graph::default();
        let a = graph.input(array![1, 2]);
        graph.assign(a, path![0], 5).unwrap();
        graph.release(a).unwrap();
        assert!(!graph.contains(a));
        assert!(matches!(graph.undo(), Err(Error::UnknownNode(id)) if id == a));
        assert!(graph.can_undo());
        assert!(!graph.can_redo());
    }

    #[test]
    fn test_template_coerces_assigned_values() {
        let mut graph = Graph::default();
        let a = graph.input(array![1, 2]);
        graph
            .set_assignment_template(a, Some(crate::AssignmentTemplate::bound(0.0, 5.0)))
            .unwrap();
        graph.assign(a, path![0], 9).unwrap();
        assert_eq!(graph.value(a).unwrap(), Value::from(array![5, 2]));
    }

    #[test]
    fn test_override_at_ignores_allow_overriding() {
        let mut graph = Graph::default();
        let a = graph.input(array![1, 2]);
        let b = graph.apply("negative", args![a]).unwrap();
        graph.override_at(b, Assignment::new(path![1], 0)).unwrap();
        assert_eq!(graph.value(b).unwrap(), Value::from(array![-1, 0]));
        graph.clear_overrides(b).unwrap();
        assert_eq!(graph.value(b).unwrap(), Value::from(array![-1, -2]));
        graph.undo().unwrap();
        assert_eq!(graph.value(b).unwrap(), Value::from(array![-1, 0]));
    }
}

//! The overrides layered on top of a node's computed value.

use crate::array::{Mask, Region};
use crate::assignment::{Assigned, Assignment};
use crate::path::Path;
use crate::value::Value;

/// An ordered list of assignments, replayed over computed values.
///
/// At most one assignment is kept per path: adding an assignment at a path
/// that already has one replaces it and moves it to the end.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Overrider {
    assignments: Vec<Assignment>,
}

impl Overrider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Assignment> {
        self.assignments.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Assignment> {
        self.assignments.get(index)
    }

    /// The position of the assignment at a path.
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.assignments.iter().position(|a| a.path == *path)
    }

    /// Appends an assignment, replacing one at the same path.
    ///
    /// Returns the index the assignment landed at and the assignment it
    /// replaced together with that one's former index.
    pub fn add(&mut self, assignment: Assignment) -> (usize, Option<(usize, Assignment)>) {
        let replaced = self.remove(&assignment.path);
        self.assignments.push(assignment);
        (self.assignments.len() - 1, replaced)
    }

    /// Removes the assignment at a path. Removing where nothing is assigned
    /// is a no-op.
    pub fn remove(&mut self, path: &Path) -> Option<(usize, Assignment)> {
        let index = self.position(path)?;
        let removed = self.assignments.remove(index);
        // Keep the one-per-path invariant even if it was broken by inserts.
        self.assignments.retain(|a| a.path != *path);
        Some((index, removed))
    }

    /// Inserts an assignment at a position, clamped to the end.
    pub fn insert_at(&mut self, index: usize, assignment: Assignment) {
        let index = index.min(self.assignments.len());
        self.assignments.insert(index, assignment);
    }

    /// Removes the assignment at a position.
    pub fn remove_at(&mut self, index: usize) -> Option<Assignment> {
        (index < self.assignments.len()).then(|| self.assignments.remove(index))
    }

    pub fn clear(&mut self) -> Vec<Assignment> {
        std::mem::take(&mut self.assignments)
    }

    /// Replays all assignments over a computed value.
    ///
    /// Default assignments restore the computed value at their path.
    /// Assignments that no longer fit the value (e.g. after its shape
    /// changed) are skipped.
    pub fn apply(&self, computed: &Value) -> Value {
        let mut value = computed.clone();
        for assignment in &self.assignments {
            let written = match &assignment.value {
                Assigned::Value(new) => value.set(&assignment.path, new.clone()),
                Assigned::Default => computed
                    .get(&assignment.path)
                    .and_then(|old| value.set(&assignment.path, old)),
            };
            if let Err(err) = written {
                tracing::warn!(%assignment, %err, "skipping override that does not fit the value");
            }
        }
        value
    }

    /// Which elements of an array of the given shape are overridden.
    pub fn override_mask(&self, shape: &[usize]) -> Mask {
        let mut mask = Mask::none(shape);
        for assignment in &self.assignments {
            let Ok(region) = Region::of_path(shape, &assignment.path) else {
                continue;
            };
            let touched = region.to_mask(shape);
            mask = if assignment.is_default() {
                mask.and(&touched.not())
            } else {
                mask.or(&touched)
            };
        }
        mask
    }

    /// Whether every part of `value` addressed by `path` is overridden, so
    /// that upstream changes there can no longer show.
    pub fn covers(&self, value: &Value, path: &Path) -> bool {
        if self.assignments.is_empty() {
            return false;
        }
        if let Value::Array(array) = value
            && let Ok(region) = Region::of_path(array.shape(), path)
        {
            let mask = self.override_mask(array.shape());
            return region.flat.iter().all(|&i| mask.data()[i]);
        }
        let mut covered = false;
        for assignment in &self.assignments {
            if path.starts_with(&assignment.path) {
                covered = !assignment.is_default();
            }
        }
        covered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{array, path};

    #[test]
    fn test_later_assignments_win() {
        let mut overrider = Overrider::new();
        overrider.add(Assignment::new(path![], array![0, 0, 0]));
        overrider.add(Assignment::new(path![1], 5));
        let value = overrider.apply(&Value::from(array![1, 2, 3]));
        assert_eq!(value, Value::from(array![0, 5, 0]));
    }

    #[test]
    fn test_re_adding_moves_to_end() {
        let mut overrider = Overrider::new();
        overrider.add(Assignment::new(path![0], 1));
        overrider.add(Assignment::new(path![1], 2));
        let (index, replaced) = overrider.add(Assignment::new(path![0], 3));
        assert_eq!(index, 1);
        assert_eq!(replaced, Some((0, Assignment::new(path![0], 1))));
        assert_eq!(overrider.get(0).unwrap().path, path![1]);
    }

    #[test]
    fn test_default_restores_computed() {
        let mut overrider = Overrider::new();
        overrider.add(Assignment::new(path![], array![0, 0, 0]));
        overrider.add(Assignment::default_at(path![2]));
        assert_eq!(overrider.apply(&Value::from(array![1, 2, 3])), Value::from(array![0, 0, 3]));
        let mask = overrider.override_mask(&[3]);
        assert_eq!(mask.data(), &[true, true, false]);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut overrider = Overrider::new();
        overrider.add(Assignment::new(path![0], 1));
        assert_eq!(overrider.remove(&path![1]), None);
        assert_eq!(overrider.len(), 1);
        assert!(overrider.remove(&path![0]).is_some());
        assert!(overrider.is_empty());
    }

    #[test]
    fn test_stale_assignment_is_skipped() {
        let mut overrider = Overrider::new();
        overrider.add(Assignment::new(path![5], 1));
        assert_eq!(overrider.apply(&Value::from(array![1, 2])), Value::from(array![1, 2]));
    }

    #[test]
    fn test_covers() {
        let mut overrider = Overrider::new();
        let value = Value::from(array![1, 2, 3]);
        overrider.add(Assignment::new(path![0], 9));
        assert!(overrider.covers(&value, &path![0]));
        assert!(!overrider.covers(&value, &path![]));

        let mut dict = Overrider::new();
        dict.add(Assignment::new(path!["k"], 1));
        assert!(dict.covers(&Value::None, &path!["k", 0]));
        assert!(!dict.covers(&Value::None, &path!["j"]));
    }
}

use crate::error::{Error, Result};
use crate::func::{ArgRef, FuncCall};
use crate::path::{Index, Path, PathComponent};
use crate::value::Value;

use super::{BackwardsTranslator, ForwardsTranslator};

/// Translates through indexing into lists and mappings. Indexing into arrays
/// is left to [`Transpositional`](super::Transpositional).
#[derive(Debug, Default, Copy, Clone)]
pub struct GetItem;

impl GetItem {
    /// The index of a call into a non-array container. Negative list indices
    /// are counted from the end.
    pub(crate) fn index(call: &FuncCall) -> Result<Index> {
        let container = call.args.positional.first().ok_or(Error::CannotTranslatePath)?;
        if matches!(container, Value::Array(_)) {
            return Err(Error::CannotTranslatePath);
        }
        let index = Index::from_value(call.args.positional.get(1).unwrap_or(&Value::None))?;
        if index.is_array_only() {
            return Err(Error::CannotTranslatePath);
        }
        Ok(from_end(index, container))
    }
}

/// Resolves a negative index against the length of a list.
fn from_end(index: Index, container: &Value) -> Index {
    match (index, container) {
        (Index::Int(i), Value::List(items)) if i < 0 && i + items.len() as i64 >= 0 => {
            Index::Int(i + items.len() as i64)
        }
        (index, _) => index,
    }
}

/// Whether two indices can be told apart without knowing the container.
/// A negative and a non-negative integer may address the same item.
fn disjoint(a: &Index, b: &Index) -> bool {
    match (a, b) {
        (Index::Int(x), Index::Int(y)) => (*x < 0) == (*y < 0) && x != y,
        (Index::Key(x), Index::Key(y)) => x != y,
        _ => false,
    }
}

/// Relates a node sitting at `location` inside a container to a `requested`
/// path into that container.
///
/// Returns the part of the node the request touches: the rest of the path
/// when the node lies on it, the whole node when the request covers it or
/// cannot be compared, and `None` when the two are disjoint.
pub(crate) fn relate(location: &[PathComponent], requested: &[PathComponent]) -> Option<Path> {
    for (l, r) in location.iter().zip(requested) {
        if l.index == r.index {
            continue;
        }
        if disjoint(&l.index, &r.index) {
            return None;
        }
        return Some(Path::root());
    }
    if location.len() <= requested.len() {
        Some(requested[location.len()..].iter().cloned().collect())
    } else {
        Some(Path::root())
    }
}

impl BackwardsTranslator for GetItem {
    fn translate_backwards(&self, call: &FuncCall, path: &Path) -> Result<Vec<(usize, Path)>> {
        let index = Self::index(call)?;
        let requested = Path::root().child(index).join(path);
        Ok(call
            .data_sources()
            .filter(|&s| call.sources[s].location.arg == ArgRef::Position(0))
            .filter_map(|s| relate(&call.sources[s].location.path, &requested).map(|p| (s, p)))
            .collect())
    }
}

impl ForwardsTranslator for GetItem {
    fn translate_forwards(&self, call: &FuncCall, source: usize, path: &Path) -> Result<Vec<Path>> {
        let index = Self::index(call)?;
        let location = &call.sources[source].location;
        if location.arg != ArgRef::Position(0) {
            return Err(Error::CannotTranslatePath);
        }
        let changed = location.path.join(path);
        let Some(first) = changed.first() else {
            return Ok(vec![Path::root()]);
        };
        let first = from_end(first.index.clone(), &call.args.positional[0]);
        Ok(if first == index {
            vec![changed.tail()]
        } else if disjoint(&first, &index) {
            vec![]
        } else {
            vec![Path::root()]
        })
    }
}

//! Path-indexed caches of computed values.

use std::collections::BTreeMap;

use crate::array::{Array, Mask, Region, normalize};
use crate::error::{Error, Result};
use crate::path::{Index, Path};
use crate::translate::mask_path;
use crate::value::{Value, ValueError};

/// How much of a cache is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    AllValid,
    Partial,
    AllInvalid,
}

/// The last computed value of a node together with which parts of it are
/// still valid.
///
/// Arrays track validity per element, lists per item and dictionaries per
/// key. Everything else, and the results of functions that must be cached
/// as a whole, is valid or invalid as one piece.
#[derive(Debug, Clone, PartialEq)]
pub enum Cache {
    Holistic { value: Value, valid: bool },
    Array { value: Array, invalid: Mask },
    List { value: Vec<Value>, invalid: Vec<bool> },
    Dict { value: BTreeMap<String, Value>, invalid: BTreeMap<String, bool> },
}

impl Cache {
    /// A cache shaped like `value` in which nothing is valid yet.
    pub fn create(value: &Value, holistic: bool) -> Self {
        if holistic {
            return Self::Holistic { value: value.clone(), valid: false };
        }
        match value {
            Value::Array(array) if array.ndim() > 0 => Self::Array {
                value: array.clone(),
                invalid: Mask::full(array.shape(), true),
            },
            Value::List(items) => {
                Self::List { value: items.clone(), invalid: vec![true; items.len()] }
            }
            Value::Dict(map) => Self::Dict {
                value: map.clone(),
                invalid: map.keys().map(|key| (key.clone(), true)).collect(),
            },
            other => Self::Holistic { value: other.clone(), valid: false },
        }
    }

    /// The stored value, valid or not.
    pub fn value(&self) -> Value {
        match self {
            Self::Holistic { value, .. } => value.clone(),
            Self::Array { value, .. } => Value::Array(value.clone()),
            Self::List { value, .. } => Value::List(value.clone()),
            Self::Dict { value, .. } => Value::Dict(value.clone()),
        }
    }

    pub fn is_holistic(&self) -> bool {
        matches!(self, Self::Holistic { .. })
    }

    /// Whether a freshly computed result fits into this cache.
    pub fn matches(&self, result: &Value) -> bool {
        match (self, result) {
            (Self::Holistic { value, .. }, result) => value.type_name() == result.type_name(),
            (Self::Array { value, .. }, Value::Array(array)) => value.shape() == array.shape(),
            (Self::List { value, .. }, Value::List(items)) => value.len() == items.len(),
            (Self::Dict { value, .. }, Value::Dict(map)) => value.keys().eq(map.keys()),
            _ => false,
        }
    }

    pub fn status(&self) -> CacheStatus {
        let (invalid, total) = match self {
            Self::Holistic { valid, .. } => (usize::from(!valid), 1),
            Self::Array { invalid, .. } => (invalid.count(), invalid.len()),
            Self::List { invalid, .. } => (invalid.iter().filter(|&&b| b).count(), invalid.len()),
            Self::Dict { invalid, .. } => (invalid.values().filter(|&&b| b).count(), invalid.len()),
        };
        match invalid {
            0 => CacheStatus::AllValid,
            n if n == total => CacheStatus::AllInvalid,
            _ => CacheStatus::Partial,
        }
    }

    /// The parts within `path` that must be recomputed.
    ///
    /// Paths the cache cannot resolve, for example because they point past
    /// the end of the stored value, are returned whole.
    pub fn uncached(&self, path: &Path) -> Vec<Path> {
        match self.try_uncached(path) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::trace!(%path, %err, "cache cannot resolve path");
                vec![path.clone()]
            }
        }
    }

    fn try_uncached(&self, path: &Path) -> Result<Vec<Path>, ValueError> {
        let paths = match self {
            Self::Holistic { valid, .. } => {
                if *valid { vec![] } else { vec![Path::root()] }
            }
            Self::Array { invalid, .. } => {
                let region = Region::of_path(invalid.shape(), path)?;
                let wanted = region.to_mask(invalid.shape()).and(invalid);
                if !wanted.any() {
                    vec![]
                } else if wanted.count() == region.flat.len() && !path.is_root() {
                    vec![path.clone()]
                } else {
                    vec![mask_path(wanted)]
                }
            }
            Self::List { invalid, .. } => {
                let Some(first) = path.first() else {
                    return Ok(spread(invalid.iter().copied(), |i| Index::Int(i as i64)));
                };
                match &first.index {
                    Index::Int(i) => {
                        let i = normalize(*i, invalid.len())?;
                        if invalid[i] { vec![path.truncated(1)] } else { vec![] }
                    }
                    Index::Slice(slice) => slice
                        .indices(invalid.len())
                        .into_iter()
                        .filter(|&i| invalid[i])
                        .map(|i| Path::root().child(i))
                        .collect(),
                    _ => vec![path.clone()],
                }
            }
            Self::Dict { invalid, .. } => {
                let Some(first) = path.first() else {
                    let keys: Vec<_> = invalid.keys().cloned().collect();
                    return Ok(spread(invalid.values().copied(), |i| Index::Key(keys[i].clone())));
                };
                match &first.index {
                    Index::Key(key) => match invalid.get(key) {
                        Some(false) => vec![],
                        _ => vec![path.truncated(1)],
                    },
                    _ => vec![path.clone()],
                }
            }
        };
        Ok(paths)
    }

    /// Stores the part of `result` at `path` and marks it valid.
    ///
    /// `result` is a value computed to be valid at `path`. Holistic caches
    /// can only be set at the root and fail with
    /// [`Error::PathCannotHaveComponents`] otherwise.
    pub fn set_valid(&mut self, path: &Path, result: &Value) -> Result<()> {
        match self {
            Self::Holistic { value, valid } => {
                if !path.is_root() {
                    return Err(Error::PathCannotHaveComponents);
                }
                *value = result.clone();
                *valid = true;
            }
            Self::Array { value, invalid } => {
                let Value::Array(result) = result else {
                    let found = result.type_name();
                    return Err(ValueError::Type { expected: "array", found }.into());
                };
                let region = Region::of_path(value.shape(), path)?;
                value.scatter(&region, &result.gather(&region))?;
                invalid.scatter(&region, &Mask::scalar(false))?;
            }
            Self::List { value, invalid } => {
                let Value::List(result) = result else {
                    let found = result.type_name();
                    return Err(ValueError::Type { expected: "list", found }.into());
                };
                let positions = match path.first().map(|c| &c.index) {
                    None => (0..value.len()).collect(),
                    Some(Index::Int(i)) => vec![normalize(*i, value.len())?],
                    Some(Index::Slice(slice)) => slice.indices(value.len()),
                    Some(index) => {
                        let index = index.to_string();
                        return Err(ValueError::BadIndex { kind: "list", index }.into());
                    }
                };
                for i in positions {
                    let item = result
                        .get(i)
                        .ok_or(ValueError::OutOfBounds { index: i as i64, len: result.len() })?;
                    if path.len() > 1 {
                        value[i].set(&path.tail(), item.get(&path.tail())?)?;
                    } else {
                        value[i] = item.clone();
                        invalid[i] = false;
                    }
                }
            }
            Self::Dict { value, invalid } => {
                let Value::Dict(result) = result else {
                    let found = result.type_name();
                    return Err(ValueError::Type { expected: "dict", found }.into());
                };
                let keys: Vec<String> = match path.first().map(|c| &c.index) {
                    None => value.keys().cloned().collect(),
                    Some(Index::Key(key)) => vec![key.clone()],
                    Some(index) => {
                        let index = index.to_string();
                        return Err(ValueError::BadIndex { kind: "dict", index }.into());
                    }
                };
                for key in keys {
                    let item =
                        result.get(&key).ok_or_else(|| ValueError::MissingKey(key.clone()))?;
                    match value.get_mut(&key) {
                        Some(slot) if path.len() > 1 => {
                            slot.set(&path.tail(), item.get(&path.tail())?)?
                        }
                        _ => {
                            value.insert(key.clone(), item.clone());
                            invalid.insert(key, false);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Marks the part at `path` invalid. Paths the cache cannot resolve
    /// invalidate everything.
    pub fn set_invalid(&mut self, path: &Path) {
        if let Err(err) = self.try_set_invalid(path) {
            tracing::trace!(%path, %err, "invalidating whole cache");
            self.invalidate_all();
        }
    }

    fn try_set_invalid(&mut self, path: &Path) -> Result<(), ValueError> {
        match self {
            Self::Holistic { valid, .. } => *valid = false,
            Self::Array { invalid, .. } => {
                let region = Region::of_path(invalid.shape(), path)?;
                invalid.scatter(&region, &Mask::scalar(true))?;
            }
            Self::List { invalid, .. } => match path.first().map(|c| &c.index) {
                None => invalid.fill(true),
                Some(Index::Int(i)) => {
                    let k = normalize(*i, invalid.len())?;
                    invalid[k] = true;
                }
                Some(Index::Slice(slice)) => {
                    for i in slice.indices(invalid.len()) {
                        invalid[i] = true;
                    }
                }
                Some(index) => {
                    return Err(ValueError::BadIndex { kind: "list", index: index.to_string() });
                }
            },
            Self::Dict { invalid, .. } => match path.first().map(|c| &c.index) {
                None => invalid.values_mut().for_each(|b| *b = true),
                Some(Index::Key(key)) => {
                    let slot =
                        invalid.get_mut(key).ok_or_else(|| ValueError::MissingKey(key.clone()))?;
                    *slot = true;
                }
                Some(index) => {
                    return Err(ValueError::BadIndex { kind: "dict", index: index.to_string() });
                }
            },
        }
        Ok(())
    }

    fn invalidate_all(&mut self) {
        match self {
            Self::Holistic { valid, .. } => *valid = false,
            Self::Array { invalid, .. } => *invalid = Mask::full(invalid.shape(), true),
            Self::List { invalid, .. } => invalid.fill(true),
            Self::Dict { invalid, .. } => invalid.values_mut().for_each(|b| *b = true),
        }
    }
}

/// One path per invalid position, or the root when everything is invalid.
fn spread(invalid: impl Iterator<Item = bool>, index: impl Fn(usize) -> Index) -> Vec<Path> {
    let flags: Vec<bool> = invalid.collect();
    if !flags.is_empty() && flags.iter().all(|&b| b) {
        return vec![Path::root()];
    }
    flags
        .iter()
        .enumerate()
        .filter(|(_, b)| **b)
        .map(|(i, _)| Path::root().child(index(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{array, path};

    #[test]
    fn test_array_cache_tracks_elements() {
        let computed = Value::from(array![1, 2, 3]);
        let mut cache = Cache::create(&computed, false);
        assert_eq!(cache.status(), CacheStatus::AllInvalid);
        assert_eq!(cache.uncached(&path![]), vec![path![]]);

        cache.set_valid(&path![1], &Value::from(array![0, 20, 0])).unwrap();
        assert_eq!(cache.status(), CacheStatus::Partial);
        assert_eq!(cache.value(), Value::from(array![1, 20, 3]));
        assert!(cache.uncached(&path![1]).is_empty());
        assert_eq!(cache.uncached(&path![0]), vec![path![0]]);

        let uncached = cache.uncached(&path![]);
        let mask = crate::array::Mask::from_vec(vec![true, false, true]);
        assert_eq!(uncached, vec![path![mask]]);
    }

    #[test]
    fn test_array_cache_past_the_end() {
        let cache = Cache::create(&Value::from(array![1, 2]), false);
        assert_eq!(cache.uncached(&path![5]), vec![path![5]]);
    }

    #[test]
    fn test_holistic_cache_rejects_components() {
        let mut cache = Cache::create(&Value::Int(1), false);
        assert!(cache.is_holistic());
        assert!(matches!(
            cache.set_valid(&path![0], &Value::Int(2)),
            Err(Error::PathCannotHaveComponents)
        ));
        cache.set_valid(&path![], &Value::Int(2)).unwrap();
        assert_eq!(cache.status(), CacheStatus::AllValid);
        cache.set_invalid(&path![3]);
        assert_eq!(cache.status(), CacheStatus::AllInvalid);
    }

    #[test]
    fn test_list_cache() {
        let computed = Value::List(vec![1.into(), 2.into(), 3.into()]);
        let mut cache = Cache::create(&computed, false);
        cache.set_valid(&path![], &computed).unwrap();
        cache.set_invalid(&path![2]);
        assert_eq!(cache.uncached(&path![]), vec![path![2]]);
        assert_eq!(cache.uncached(&path![-1]), vec![path![-1]]);
        assert!(cache.uncached(&path![0]).is_empty());
        assert!(cache.matches(&Value::List(vec![0.into(); 3])));
        assert!(!cache.matches(&Value::List(vec![])));
    }

    #[test]
    fn test_dict_cache() {
        let mut map = BTreeMap::new();
        map.insert("j".to_string(), Value::Int(0));
        map.insert("k".to_string(), Value::Int(1));
        let computed = Value::Dict(map);
        let mut cache = Cache::create(&computed, false);
        cache.set_valid(&path!["k"], &computed).unwrap();
        assert_eq!(cache.status(), CacheStatus::Partial);
        assert_eq!(cache.uncached(&path![]), vec![path!["j"]]);
        cache.set_invalid(&path!["missing"]);
        assert_eq!(cache.status(), CacheStatus::AllInvalid);
    }

    #[test]
    fn test_holistic_when_requested() {
        let cache = Cache::create(&Value::from(array![1, 2]), true);
        assert!(cache.is_holistic());
        assert_eq!(cache.uncached(&path![0]), vec![path![]]);
    }
}

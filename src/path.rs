//! Paths addressing parts of values.

use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

use crate::array::Mask;
use crate::value::{Value, ValueError};

/// A Python-style slice with optional bounds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: i64,
}

impl Slice {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: i64) -> Self {
        Self { start, stop, step }
    }

    /// The slice `[:]`.
    pub fn full() -> Self {
        Self::new(None, None, 1)
    }

    /// The slice `[start:stop]`.
    pub fn range(start: i64, stop: i64) -> Self {
        Self::new(Some(start), Some(stop), 1)
    }
}

impl Display for Slice {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{start}")?;
        }
        f.write_str(":")?;
        if let Some(stop) = self.stop {
            write!(f, "{stop}")?;
        }
        if self.step != 1 {
            write!(f, ":{}", self.step)?;
        }
        Ok(())
    }
}

/// A single indexing operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Index {
    /// A position in a sequence or along the first array axis.
    Int(i64),
    /// A range of positions.
    Slice(Slice),
    /// One index per array axis.
    Tuple(Vec<Index>),
    /// A boolean selection over the leading array axes.
    Mask(Mask),
    /// A mapping key.
    Key(String),
}

impl Index {
    /// Whether this index can only address arrays.
    pub fn is_array_only(&self) -> bool {
        matches!(self, Self::Tuple(_) | Self::Mask(_))
    }

    /// Converts an argument value of an indexing call into an index.
    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        Ok(match value {
            Value::Int(i) => Self::Int(*i),
            Value::Bool(b) => Self::Int(*b as i64),
            Value::Str(s) => Self::Key(s.clone()),
            Value::Slice(slice) => Self::Slice(*slice),
            Value::List(items) => {
                Self::Tuple(items.iter().map(Self::from_value).collect::<Result<_, _>>()?)
            }
            Value::Array(array) if array.kind() == crate::ScalarKind::Bool => {
                Self::Mask(array.map(|x| x.as_bool()))
            }
            other => {
                return Err(ValueError::BadIndex {
                    kind: "index",
                    index: other.type_name().into(),
                });
            }
        })
    }

    /// Converts this index back into an argument value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::Int(*i),
            Self::Slice(slice) => Value::Slice(*slice),
            Self::Tuple(items) => Value::List(items.iter().map(Self::to_value).collect()),
            Self::Mask(mask) => Value::from(mask.clone()),
            Self::Key(key) => Value::Str(key.clone()),
        }
    }
}

impl Display for Index {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Slice(slice) => write!(f, "{slice}"),
            Self::Tuple(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Mask(mask) => write!(f, "<mask {}/{}>", mask.count(), mask.len()),
            Self::Key(key) => write!(f, "'{key}'"),
        }
    }
}

/// What kind of container a path component indexes into.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Unknown; resolved against the actual value.
    #[default]
    Any,
    Sequence,
    Mapping,
    Array,
}

/// An index together with the kind of container it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathComponent {
    pub index: Index,
    pub kind: ContainerKind,
}

impl PathComponent {
    /// A component whose container kind is inferred from the index.
    pub fn new(index: Index) -> Self {
        let kind = match &index {
            Index::Key(_) => ContainerKind::Mapping,
            Index::Tuple(_) | Index::Mask(_) => ContainerKind::Array,
            Index::Int(_) | Index::Slice(_) => ContainerKind::Any,
        };
        Self { index, kind }
    }

    /// Whether the component can only address an array.
    pub fn is_array_only(&self) -> bool {
        self.kind == ContainerKind::Array || self.index.is_array_only()
    }
}

macro_rules! component_from {
    ($($ty:ty),*) => {$(
        impl From<$ty> for PathComponent {
            fn from(index: $ty) -> Self {
                Self::new(index.into())
            }
        }
    )*};
}

component_from!(Index, i32, i64, usize, &str, String, Slice, Mask);

impl<A: Into<Index>, B: Into<Index>> From<(A, B)> for PathComponent {
    fn from(pair: (A, B)) -> Self {
        Self::new(pair.into())
    }
}

impl<A: Into<Index>, B: Into<Index>, C: Into<Index>> From<(A, B, C)> for PathComponent {
    fn from(triple: (A, B, C)) -> Self {
        Self::new(triple.into())
    }
}

/// A sequence of indices addressing part of a value.
///
/// The empty path is the root and addresses the whole value.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathComponent>);

impl Path {
    /// The empty path.
    pub fn root() -> Self {
        Self(vec![])
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The path with one more component.
    pub fn child(&self, component: impl Into<PathComponent>) -> Self {
        let mut path = self.clone();
        path.0.push(component.into());
        path
    }

    /// Appends a component.
    pub fn push(&mut self, component: impl Into<PathComponent>) {
        self.0.push(component.into());
    }

    /// This path followed by another one.
    pub fn join(&self, tail: &[PathComponent]) -> Self {
        let mut path = self.clone();
        path.0.extend_from_slice(tail);
        path
    }

    /// The path cut down to at most `depth` components.
    pub fn truncated(&self, depth: usize) -> Self {
        Self(self.0.iter().take(depth).cloned().collect())
    }

    /// The path without its first component.
    pub fn tail(&self) -> Self {
        Self(self.0.iter().skip(1).cloned().collect())
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.0
    }
}

impl Deref for Path {
    type Target = [PathComponent];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<PathComponent>> for Path {
    fn from(components: Vec<PathComponent>) -> Self {
        Self(components)
    }
}

impl FromIterator<Index> for Path {
    fn from_iter<I: IntoIterator<Item = Index>>(iter: I) -> Self {
        Self(iter.into_iter().map(PathComponent::new).collect())
    }
}

impl FromIterator<PathComponent> for Path {
    fn from_iter<I: IntoIterator<Item = PathComponent>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("[]");
        }
        for component in &self.0 {
            write!(f, "[{}]", component.index)?;
        }
        Ok(())
    }
}

impl From<i32> for Index {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<i64> for Index {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<usize> for Index {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<&str> for Index {
    fn from(key: &str) -> Self {
        Self::Key(key.into())
    }
}

impl From<String> for Index {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<Slice> for Index {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

impl From<Mask> for Index {
    fn from(mask: Mask) -> Self {
        Self::Mask(mask)
    }
}

impl<A: Into<Index>, B: Into<Index>> From<(A, B)> for Index {
    fn from((a, b): (A, B)) -> Self {
        Self::Tuple(vec![a.into(), b.into()])
    }
}

impl<A: Into<Index>, B: Into<Index>, C: Into<Index>> From<(A, B, C)> for Index {
    fn from((a, b, c): (A, B, C)) -> Self {
        Self::Tuple(vec![a.into(), b.into(), c.into()])
    }
}

/// Build a [`Path`] from a list of indices.
///
/// Integers, strings, slices, masks, and tuples of those convert into path
/// components.
///
/// ```
/// # use quibs::{path, Slice};
/// let path = path![1, "key", (0, Slice::full())];
/// assert_eq!(path.to_string(), "[1]['key'][0, :]");
/// ```
#[macro_export]
macro_rules! path {
    () => { $crate::Path::root() };
    ($($index:expr),+ $(,)?) => {
        $crate::Path::from(vec![$($crate::PathComponent::from($index)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array;
    use crate::path;

    #[test]
    fn test_display() {
        assert_eq!(Path::root().to_string(), "[]");
        assert_eq!(path![1, Slice::range(0, 2)].to_string(), "[1][0:2]");
        assert_eq!(path![Slice::new(None, None, -1)].to_string(), "[::-1]");
        assert_eq!(path![(1, 0)].to_string(), "[1, 0]");
    }

    #[test]
    fn test_inferred_kinds() {
        assert_eq!(path!["a"][0].kind, ContainerKind::Mapping);
        assert_eq!(path![(1, 2)][0].kind, ContainerKind::Array);
        assert_eq!(path![3][0].kind, ContainerKind::Any);
    }

    #[test]
    fn test_truncate_and_join() {
        let path = path![1, 2, 3];
        assert_eq!(path.truncated(1), path![1]);
        assert_eq!(path.tail(), path![2, 3]);
        assert_eq!(path![1].join(&path![2, 3]), path);
        assert!(path.truncated(0).is_root());
    }

    #[test]
    fn test_index_from_value() {
        assert_eq!(Index::from_value(&Value::Int(2)).unwrap(), Index::Int(2));
        assert_eq!(Index::from_value(&"k".into()).unwrap(), Index::Key("k".into()));
        let mask = Value::from(array![true, false]);
        assert!(matches!(Index::from_value(&mask).unwrap(), Index::Mask(_)));
        assert!(Index::from_value(&Value::from(array![1, 2])).is_err());
    }
}

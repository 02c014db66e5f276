//! Dynamic values flowing through a graph.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::array::{Array, Mask, NdArray, normalize};
use crate::path::{Index, Path, Slice};

/// Errors raised by value manipulation and by node functions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("index {index} is out of bounds for length {len}")]
    OutOfBounds { index: i64, len: usize },
    #[error("key '{0}' not found")]
    MissingKey(String),
    #[error("cannot index {kind} with {index}")]
    BadIndex { kind: &'static str, index: String },
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("expected {expected}, found {found}")]
    Type { expected: &'static str, found: &'static str },
    #[error("integer overflow")]
    Overflow,
    #[error("missing argument `{0}`")]
    MissingArgument(String),
    #[error("{0}")]
    Custom(String),
}

/// The element type of an array, in promotion order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
}

/// A single numeric element.
#[derive(Debug, Copy, Clone)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    pub fn kind(self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::Float(_) => ScalarKind::Float,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(b) => b as i64 as f64,
            Self::Int(i) => i as f64,
            Self::Float(x) => x,
        }
    }

    /// The integer value, truncating floats toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Bool(b) => b as i64,
            Self::Int(i) => i,
            Self::Float(x) => x as i64,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(i) => i != 0,
            Self::Float(x) => x != 0.0,
        }
    }

    pub fn is_finite(self) -> bool {
        match self {
            Self::Float(x) => x.is_finite(),
            _ => true,
        }
    }

    /// Converts to another element type. Floats cast to integers round to
    /// the nearest integer.
    pub fn cast(self, kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Bool => Self::Bool(self.as_bool()),
            ScalarKind::Int => match self {
                Self::Float(x) => Self::Int(x.round() as i64),
                other => Self::Int(other.as_i64()),
            },
            ScalarKind::Float => Self::Float(self.as_f64()),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(_), _) | (_, Self::Float(_)) => self.as_f64() == other.as_f64(),
            _ => self.as_i64() == other.as_i64(),
        }
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Float(_), _) | (_, Self::Float(_)) => {
                self.as_f64().partial_cmp(&other.as_f64())
            }
            _ => Some(self.as_i64().cmp(&other.as_i64())),
        }
    }
}

impl Eq for Scalar {}

impl std::hash::Hash for Scalar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match *self {
            Self::Float(x) if x.fract() != 0.0 || !x.is_finite() => x.to_bits().hash(state),
            other => other.as_i64().hash(state),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Scalar {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl Array {
    /// The widest element kind in the array.
    pub fn kind(&self) -> ScalarKind {
        self.iter().map(|x| x.kind()).max().unwrap_or(ScalarKind::Float)
    }

    /// Converts every element to one kind.
    pub fn cast(&self, kind: ScalarKind) -> Array {
        self.map(|x| x.cast(kind))
    }
}

/// Build an [`Array`] from nested brackets of numbers.
///
/// ```
/// # use quibs::array;
/// let row = array![1, 2, 3];
/// let grid = array![[1.0, 2.0], [3.0, 4.0]];
/// assert_eq!(grid.shape(), &[2, 2]);
/// # assert_eq!(row.len(), 3);
/// ```
#[macro_export]
macro_rules! array {
    ($([$($x:expr),* $(,)?]),+ $(,)?) => {{
        let rows: ::std::vec::Vec<::std::vec::Vec<$crate::Scalar>> =
            vec![$(vec![$($crate::Scalar::from($x)),*]),+];
        let shape = vec![rows.len(), rows[0].len()];
        match $crate::Array::new(shape, rows.into_iter().flatten().collect()) {
            Ok(array) => array,
            Err(err) => panic!("ragged array literal: {err}"),
        }
    }};
    ($($x:expr),* $(,)?) => {
        $crate::Array::from_vec(vec![$($crate::Scalar::from($x)),*])
    };
}

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Slice(Slice),
    List(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    Array(Array),
}

impl Value {
    /// A short name of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Slice(_) => "slice",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Array(_) => "array",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The value as a scalar, if it is a number or a zero-dimensional array.
    pub fn scalar(&self) -> Option<Scalar> {
        match self {
            Self::Bool(b) => Some(Scalar::Bool(*b)),
            Self::Int(i) => Some(Scalar::Int(*i)),
            Self::Float(x) => Some(Scalar::Float(*x)),
            Self::Array(array) => array.item().copied(),
            _ => None,
        }
    }

    /// Whether this value is a single number.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Int(_) | Self::Float(_))
    }

    /// Converts numbers and nested lists of numbers into an array.
    pub fn to_array(&self) -> Result<Array, ValueError> {
        match self {
            Self::Array(array) => Ok(array.clone()),
            Self::List(items) => {
                let rows = items.iter().map(Self::to_array).collect::<Result<Vec<_>, _>>()?;
                let inner = rows.first().map(|r| r.shape().to_vec()).unwrap_or_default();
                if rows.iter().any(|r| r.shape() != inner.as_slice()) {
                    return Err(ValueError::Shape("ragged nested list".into()));
                }
                let mut shape = vec![rows.len()];
                shape.extend(inner);
                Array::new(shape, rows.into_iter().flat_map(NdArray::into_data).collect())
            }
            other => match other.scalar() {
                Some(scalar) => Ok(Array::scalar(scalar)),
                None => Err(ValueError::Type { expected: "array", found: other.type_name() }),
            },
        }
    }

    /// The array shape of this value. Scalars have an empty shape.
    pub fn shape(&self) -> Result<Vec<usize>, ValueError> {
        match self {
            Self::Array(array) => Ok(array.shape().to_vec()),
            other => other.to_array().map(|array| array.shape().to_vec()),
        }
    }

    /// Wraps an array, unwrapping zero-dimensional arrays into scalars.
    pub fn from_array(array: Array) -> Self {
        match array.item() {
            Some(&scalar) => scalar.into(),
            None => Self::Array(array),
        }
    }

    /// The part of this value a path addresses.
    pub fn get(&self, path: &Path) -> Result<Value, ValueError> {
        let mut current = self.clone();
        for component in path.iter() {
            current = current.get_index(&component.index)?;
        }
        Ok(current)
    }

    /// Replaces the part of this value a path addresses.
    pub fn set(&mut self, path: &Path, value: Value) -> Result<(), ValueError> {
        let Some((first, rest)) = path.split_first() else {
            *self = value;
            return Ok(());
        };
        if rest.is_empty() {
            return self.set_index(&first.index, value);
        }
        if let Self::Array(array) = self {
            let mut sub = array.select(&first.index).map(Self::Array)?;
            sub.set(&Path::from(rest.to_vec()), value)?;
            return array.assign(&first.index, &sub.to_array()?);
        }
        let mut child = self.get_index(&first.index)?;
        child.set(&Path::from(rest.to_vec()), value)?;
        self.set_index(&first.index, child)
    }

    /// A copy of this value with the part at a path replaced.
    pub fn with(&self, path: &Path, value: Value) -> Result<Value, ValueError> {
        let mut copy = self.clone();
        copy.set(path, value)?;
        Ok(copy)
    }

    /// Looks up a single index.
    pub fn get_index(&self, index: &Index) -> Result<Value, ValueError> {
        match (self, index) {
            (Self::Array(array), _) => array.select(index).map(Self::from_array),
            (Self::List(items), Index::Int(i)) => Ok(items[normalize(*i, items.len())?].clone()),
            (Self::List(items), Index::Slice(slice)) => {
                let indices = slice.indices(items.len());
                Ok(Self::List(indices.into_iter().map(|i| items[i].clone()).collect()))
            }
            (Self::List(items), Index::Mask(mask)) if mask.shape() == [items.len()] => {
                let kept = items.iter().zip(mask.iter()).filter(|(_, b)| **b);
                Ok(Self::List(kept.map(|(x, _)| x.clone()).collect()))
            }
            (Self::List(_), Index::Tuple(parts)) => parts
                .iter()
                .try_fold(self.clone(), |value, part| value.get_index(part)),
            (Self::Dict(map), Index::Key(key)) => {
                map.get(key).cloned().ok_or_else(|| ValueError::MissingKey(key.clone()))
            }
            (other, index) => Err(ValueError::BadIndex {
                kind: other.type_name(),
                index: index.to_string(),
            }),
        }
    }

    /// Replaces the part at a single index.
    pub fn set_index(&mut self, index: &Index, value: Value) -> Result<(), ValueError> {
        match (self, index) {
            (Self::Array(array), _) => array.assign(index, &value.to_array()?),
            (Self::List(items), Index::Int(i)) => {
                let i = normalize(*i, items.len())?;
                items[i] = value;
                Ok(())
            }
            (Self::List(items), Index::Slice(slice)) => {
                let positions = slice.indices(items.len());
                spread(items, &positions, value)
            }
            (Self::List(items), Index::Mask(mask)) if mask.shape() == [items.len()] => {
                let positions: Vec<usize> =
                    mask.iter().enumerate().filter(|(_, b)| **b).map(|(i, _)| i).collect();
                spread(items, &positions, value)
            }
            (list @ Self::List(_), Index::Tuple(parts)) => {
                let path = parts.iter().cloned().collect::<Path>();
                list.set(&path, value)
            }
            (Self::Dict(map), Index::Key(key)) => {
                map.insert(key.clone(), value);
                Ok(())
            }
            (other, index) => Err(ValueError::BadIndex {
                kind: other.type_name(),
                index: index.to_string(),
            }),
        }
    }

    /// Whether two values have the same structure: the same kind, array
    /// shape, list length, or key set.
    pub fn same_structure(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Array(a), Self::Array(b)) => a.shape() == b.shape(),
            (Self::List(a), Self::List(b)) => a.len() == b.len(),
            (Self::Dict(a), Self::Dict(b)) => a.keys().eq(b.keys()),
            (a, b) => a.is_scalar() && b.is_scalar() || a.type_name() == b.type_name(),
        }
    }
}

/// Writes a value into several list positions, either element-wise from a
/// sequence of equal length or by repeating a single value.
fn spread(items: &mut [Value], positions: &[usize], value: Value) -> Result<(), ValueError> {
    let values = match value {
        Value::List(values) => values,
        Value::Array(array) if array.ndim() > 0 => {
            let rows = array.shape()[0];
            (0..rows as i64)
                .map(|i| array.select(&Index::Int(i)).map(Value::from_array))
                .collect::<Result<_, _>>()?
        }
        single => vec![single; positions.len()],
    };
    if values.len() != positions.len() {
        return Err(ValueError::Shape(format!(
            "cannot assign {} values to {} positions",
            values.len(),
            positions.len()
        )));
    }
    for (&p, v) in positions.iter().zip(values) {
        items[p] = v;
    }
    Ok(())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Slice(a), Self::Slice(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Dict(a), Self::Dict(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (a, b) if a.is_scalar() && b.is_scalar() => a.scalar() == b.scalar(),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", Scalar::Float(*x)),
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Slice(s) => write!(f, "{s}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Dict(map) => {
                f.write_str("{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{key}': {item}")?;
                }
                f.write_str("}")
            }
            Self::Array(array) => write!(f, "array({array})"),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Bool(b) => Self::Bool(b),
            Scalar::Int(i) => Self::Int(i),
            Scalar::Float(x) => Self::Float(x),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Slice> for Value {
    fn from(slice: Slice) -> Self {
        Self::Slice(slice)
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Self::Array(array)
    }
}

impl From<Mask> for Value {
    fn from(mask: Mask) -> Self {
        Self::Array(mask.map(|&b| Scalar::Bool(b)))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Dict(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;

    #[test]
    fn test_numeric_equality() {
        assert_eq!(Value::Int(5), Value::Float(5.0));
        assert_eq!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Int(5), Value::Str("5".into()));
        assert_eq!(array![1, 2], array![1.0, 2.0]);
    }

    #[test]
    fn test_nested_list_to_array() {
        let list = Value::List(vec![
            Value::List(vec![1.into(), 2.into()]),
            Value::List(vec![3.into(), 4.into()]),
        ]);
        assert_eq!(list.to_array().unwrap(), array![[1, 2], [3, 4]]);
        let ragged = Value::List(vec![Value::List(vec![1.into()]), 2.into()]);
        assert!(ragged.to_array().is_err());
    }

    #[test]
    fn test_get_and_set_nested() {
        let mut map = BTreeMap::new();
        map.insert("xs".to_string(), Value::List(vec![1.into(), 2.into(), 3.into()]));
        let mut value = Value::Dict(map);

        assert_eq!(value.get(&path!["xs", 1]).unwrap(), Value::Int(2));
        value.set(&path!["xs", -1], Value::Int(30)).unwrap();
        let xs = Value::from(vec![1.into(), 2.into(), 30.into()]);
        assert_eq!(value.get(&path!["xs"]).unwrap(), xs);
        assert_eq!(value.get(&path!["ys"]), Err(ValueError::MissingKey("ys".into())));
    }

    #[test]
    fn test_array_get_set() {
        let mut value = Value::from(array![[1, 2, 3], [4, 5, 6]]);
        assert_eq!(value.get(&path![(1, 2)]).unwrap(), Value::Int(6));
        assert_eq!(value.get(&path![0, 1]).unwrap(), Value::Int(2));

        value.set(&path![1, 0], Value::Int(40)).unwrap();
        value.set(&path![0], Value::Int(0)).unwrap();
        assert_eq!(value, Value::from(array![[0, 0, 0], [40, 5, 6]]));
    }

    #[test]
    fn test_list_slice_assignment() {
        let mut value = Value::List(vec![1.into(), 2.into(), 3.into()]);
        let slice = Slice::new(Some(1), None, 1);
        value.set(&path![slice], Value::List(vec![7.into(), 8.into()])).unwrap();
        assert_eq!(value, Value::List(vec![1.into(), 7.into(), 8.into()]));
        assert!(value.set(&path![slice], Value::List(vec![1.into()])).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(array![1.0, 2.5]).to_string(), "array([1.0, 2.5])");
        assert_eq!(Value::List(vec![1.into(), "a".into()]).to_string(), "[1, 'a']");
    }
}

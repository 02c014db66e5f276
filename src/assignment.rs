//! Assignments of values to parts of nodes.

use std::fmt::{self, Display, Formatter};

use crate::array::{Array, unravel};
use crate::path::{Index, Path, PathComponent};
use crate::value::{Scalar, ScalarKind, Value, ValueError};

/// What an assignment writes.
#[derive(Debug, Clone, PartialEq)]
pub enum Assigned {
    /// A new value.
    Value(Value),
    /// The computed value, undoing earlier overlapping assignments.
    Default,
}

/// Bounds accompanying an assigned value, for assignments made at limited
/// precision (e.g. by dragging with the mouse).
#[derive(Debug, Clone, PartialEq)]
pub struct Tolerance {
    pub lower: Value,
    pub upper: Value,
}

/// A value assigned at a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub path: Path,
    pub value: Assigned,
    pub tolerance: Option<Tolerance>,
}

impl Assignment {
    pub fn new(path: Path, value: impl Into<Value>) -> Self {
        Self { path, value: Assigned::Value(value.into()), tolerance: None }
    }

    /// An assignment restoring the computed value at a path.
    pub fn default_at(path: Path) -> Self {
        Self { path, value: Assigned::Default, tolerance: None }
    }

    /// Adds tolerance bounds.
    pub fn with_tolerance(mut self, lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        self.tolerance = Some(Tolerance { lower: lower.into(), upper: upper.into() });
        self
    }

    pub fn is_default(&self) -> bool {
        matches!(self.value, Assigned::Default)
    }

    /// The assigned value, unless this is a default assignment.
    pub fn value(&self) -> Option<&Value> {
        match &self.value {
            Assigned::Value(value) => Some(value),
            Assigned::Default => None,
        }
    }

    /// Rounds the value to the precision its tolerance allows and drops the
    /// tolerance.
    pub fn rounded(mut self) -> Result<Self, ValueError> {
        if let Some(tolerance) = self.tolerance.take()
            && let Assigned::Value(value) = &self.value
        {
            let rounded = round_within(value, &tolerance)?;
            self.value = Assigned::Value(rounded);
        }
        Ok(self)
    }

    /// Normalizes the assignment against the current value of its target.
    ///
    /// A trailing mask selecting a single element becomes a plain index, a
    /// single-element array becomes a scalar, and values assigned into an
    /// integer or boolean array take on its element type.
    pub fn simplified(mut self, target: &Value) -> Self {
        if let Some(last) = self.path.last()
            && let Index::Mask(mask) = &last.index
            && mask.count() == 1
            && let Some(flat) = mask.iter().position(|&b| b)
        {
            let position = unravel(flat, mask.shape());
            let index = match position.as_slice() {
                [i] => Index::Int(*i as i64),
                many => Index::Tuple(many.iter().map(|&i| Index::Int(i as i64)).collect()),
            };
            let mut components = self.path.components().to_vec();
            components.pop();
            components.push(PathComponent::new(index));
            self.path = Path::from(components);
            if let Assigned::Value(Value::Array(array)) = &self.value
                && array.len() == 1
            {
                let item = array.iter().next().copied().map(Value::from).unwrap_or_default();
                self.value = Assigned::Value(item);
            }
        }

        if let Value::Array(array) = target
            && let Assigned::Value(value) = &self.value
            && array.kind() != ScalarKind::Float
        {
            let cast = cast(value, array.kind());
            self.value = Assigned::Value(cast);
        }
        self
    }
}

impl Display for Assignment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.value {
            Assigned::Value(value) => write!(f, "{} = {value}", self.path),
            Assigned::Default => write!(f, "{} = default", self.path),
        }
    }
}

/// Casts numbers in a value to an element type, leaving other values as
/// they are.
fn cast(value: &Value, kind: ScalarKind) -> Value {
    match value {
        Value::Array(array) => Value::Array(array.cast(kind)),
        Value::List(items) => Value::List(items.iter().map(|item| cast(item, kind)).collect()),
        other => match other.scalar() {
            Some(scalar) => Value::from(scalar.cast(kind)),
            None => other.clone(),
        },
    }
}

/// Rounds a value to the decimals that its tolerance allows.
fn round_within(value: &Value, tolerance: &Tolerance) -> Result<Value, ValueError> {
    if let Some(x) = value.scalar() {
        let lower = tolerance.lower.scalar().map(Scalar::as_f64);
        let upper = tolerance.upper.scalar().map(Scalar::as_f64);
        return Ok(match (lower, upper) {
            (Some(lower), Some(upper)) => round_scalar(x, lower, upper).into(),
            _ => value.clone(),
        });
    }
    let array = value.to_array()?;
    let shape = array.shape().to_vec();
    let lower = tolerance.lower.to_array()?.broadcast_to(&shape)?;
    let upper = tolerance.upper.to_array()?.broadcast_to(&shape)?;
    let data = array
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .map(|(&x, (lo, hi))| round_scalar(x, lo.as_f64(), hi.as_f64()))
        .collect();
    Ok(Value::Array(Array::new(shape, data)?))
}

/// Rounds a number to the fewest decimals that keep it within half the
/// width of its bounds.
fn round_scalar(x: Scalar, lower: f64, upper: f64) -> Scalar {
    let Scalar::Float(nominal) = x else {
        return x;
    };
    let tolerance = (upper - lower).abs() / 2.0;
    if tolerance.is_nan() || tolerance <= 0.0 || !nominal.is_finite() {
        return x;
    }
    let decimals = (-tolerance.log10()).ceil() as i32;
    Scalar::Float(round_decimals(nominal, decimals))
}

/// Rounds to a number of decimals, which may be negative.
pub(crate) fn round_decimals(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let rounded = (x * scale).round() / scale;
    // Reparse to shed representation noise like 0.30000000000000004.
    if decimals > 0 {
        format!("{rounded:.prec$}", prec = decimals as usize).parse().unwrap_or(rounded)
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Mask;
    use crate::{array, path};

    #[test]
    fn test_tolerance_rounding() {
        let assignment = Assignment::new(path![0], 0.123456).with_tolerance(0.12, 0.127);
        let rounded = assignment.rounded().unwrap();
        assert_eq!(rounded.value, Assigned::Value(Value::Float(0.123)));
        assert!(rounded.tolerance.is_none());

        let coarse = Assignment::new(path![0], 1234.5).with_tolerance(1200.0, 1300.0);
        assert_eq!(coarse.rounded().unwrap().value, Assigned::Value(Value::Float(1230.0)));
    }

    #[test]
    fn test_tolerance_rounding_of_arrays() {
        let assignment = Assignment::new(path![], array![1.04, 2.96])
            .with_tolerance(array![1.0, 2.9], array![1.1, 3.0]);
        let rounded = assignment.rounded().unwrap();
        assert_eq!(rounded.value, Assigned::Value(Value::from(array![1.04, 2.96])));
    }

    #[test]
    fn test_simplify_single_element_mask() {
        let mask = Mask::new(vec![2, 2], vec![false, false, true, false]).unwrap();
        let assignment = Assignment::new(path![mask], array![7.0]);
        let target = Value::from(array![[1, 2], [3, 4]]);
        let simplified = assignment.simplified(&target);
        assert_eq!(simplified.path, path![(1, 0)]);
        assert_eq!(simplified.value, Assigned::Value(Value::Int(7)));
        assert!(matches!(simplified.value, Assigned::Value(Value::Int(_))));
    }

    #[test]
    fn test_simplify_keeps_float_targets() {
        let assignment = Assignment::new(path![0], 2.5);
        let simplified = assignment.simplified(&Value::from(array![1.0, 2.0]));
        assert_eq!(simplified.value, Assigned::Value(Value::Float(2.5)));
    }

    #[test]
    fn test_round_decimals() {
        assert_eq!(round_decimals(0.1 + 0.2, 2), 0.3);
        assert_eq!(round_decimals(1234.5, -2), 1200.0);
    }
}

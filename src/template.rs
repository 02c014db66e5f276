//! Templates restricting the values assigned into a node.

use crate::assignment::round_decimals;
use crate::value::{Scalar, Value};

/// Errors raised when a template cannot accept a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("assignment template cannot convert a value of type {0}")]
    InvalidType(&'static str),
    #[error("range template needs a positive step and start <= stop")]
    InvalidRange,
}

/// Coerces assigned values into an allowed set.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AssignmentTemplate {
    /// Clamps into `[min, max]`.
    Bound { min: f64, max: f64 },
    /// Snaps to the grid `start, start + step, ...` within `[start, stop]`.
    Range { start: f64, stop: f64, step: f64 },
}

impl AssignmentTemplate {
    pub fn bound(min: f64, max: f64) -> Self {
        Self::Bound { min, max }
    }

    pub fn range(start: f64, stop: f64, step: f64) -> Result<Self, TemplateError> {
        if step.is_nan() || step <= 0.0 || start > stop {
            return Err(TemplateError::InvalidRange);
        }
        Ok(Self::Range { start, stop, step })
    }

    /// Converts every number in a value.
    pub fn convert(&self, value: &Value) -> Result<Value, TemplateError> {
        match value {
            Value::Array(array) => Ok(Value::Array(array.map(|&x| self.convert_scalar(x)))),
            Value::List(items) => items
                .iter()
                .map(|item| self.convert(item))
                .collect::<Result<_, _>>()
                .map(Value::List),
            other => match other.scalar() {
                Some(x) => Ok(self.convert_scalar(x).into()),
                None => Err(TemplateError::InvalidType(other.type_name())),
            },
        }
    }

    fn convert_scalar(&self, x: Scalar) -> Scalar {
        let converted = match *self {
            Self::Bound { min, max } => x.as_f64().clamp(min, max),
            Self::Range { start, stop, step } => {
                let last = start + ((stop - start) / step).floor() * step;
                let snapped = start + ((x.as_f64() - start) / step).round() * step;
                round_decimals(snapped.clamp(start, last), decimals(&[start, step]))
            }
        };
        match x {
            Scalar::Float(_) => Scalar::Float(converted),
            _ if converted.fract() == 0.0 => Scalar::Int(converted as i64),
            _ => Scalar::Float(converted),
        }
    }
}

/// The number of decimals needed to write all the given numbers.
fn decimals(numbers: &[f64]) -> i32 {
    (0..=12)
        .find(|&d| {
            let scale = 10f64.powi(d);
            numbers.iter().all(|x| ((x * scale).round() - x * scale).abs() < 1e-6)
        })
        .unwrap_or(12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array;

    #[test]
    fn test_bound() {
        let template = AssignmentTemplate::bound(0.0, 10.0);
        assert_eq!(template.convert(&Value::Int(12)).unwrap(), Value::Int(10));
        assert_eq!(template.convert(&Value::Float(-0.5)).unwrap(), Value::Float(0.0));
        assert_eq!(
            template.convert(&Value::from(array![-1, 5, 11])).unwrap(),
            Value::from(array![0, 5, 10])
        );
    }

    #[test]
    fn test_range_snaps_to_grid() {
        let template = AssignmentTemplate::range(0.0, 1.0, 0.1).unwrap();
        assert_eq!(template.convert(&Value::Float(0.3449)).unwrap(), Value::Float(0.3));
        assert_eq!(template.convert(&Value::Float(0.36)).unwrap(), Value::Float(0.4));
        assert_eq!(template.convert(&Value::Float(7.0)).unwrap(), Value::Float(1.0));

        let steps = AssignmentTemplate::range(1.0, 10.0, 2.0).unwrap();
        assert_eq!(steps.convert(&Value::Int(6)).unwrap(), Value::Int(7));
        assert_eq!(steps.convert(&Value::Int(12)).unwrap(), Value::Int(9));
    }

    #[test]
    fn test_invalid() {
        let template = AssignmentTemplate::bound(0.0, 1.0);
        assert_eq!(
            template.convert(&Value::Str("x".into())),
            Err(TemplateError::InvalidType("str"))
        );
        assert_eq!(AssignmentTemplate::range(2.0, 1.0, 1.0), Err(TemplateError::InvalidRange));
    }
}

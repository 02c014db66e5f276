use crate::error::{Error, Result};
use crate::func::ArgRef;
use crate::value::{Scalar, Value};

use super::{Inversal, Inversion, Inverter};

/// Inverts type conversions (`to_int`, `to_str`, ...) by converting the
/// assigned value back to the type of the source.
#[derive(Debug, Default, Copy, Clone)]
pub struct CastingInverter;

/// Converts a value to the type of `like`.
fn cast_like(value: &Value, like: &Value) -> Result<Value> {
    let scalar = match value {
        Value::Str(text) => {
            let text = text.trim();
            match text {
                "true" | "True" => Scalar::Bool(true),
                "false" | "False" => Scalar::Bool(false),
                _ => match text.parse::<i64>() {
                    Ok(i) => Scalar::Int(i),
                    Err(_) => Scalar::Float(text.parse::<f64>().map_err(|_| {
                        Error::cannot_invert(format!("'{text}' is not a number"))
                    })?),
                },
            }
        }
        other => other.scalar().ok_or_else(|| {
            Error::cannot_invert(format!("cannot convert {} back", other.type_name()))
        })?,
    };
    Ok(match like {
        Value::Str(_) => Value::Str(Value::from(scalar).to_string()),
        like => match like.scalar() {
            Some(original) => Value::from(scalar.cast(original.kind())),
            None => return Err(Error::cannot_invert("source is not a scalar")),
        },
    })
}

impl Inverter for CastingInverter {
    fn invert(&self, inversion: &Inversion) -> Result<Vec<Inversal>> {
        if !inversion.path.is_root() {
            return Err(Error::cannot_invert("conversions can only be assigned as a whole"));
        }
        let call = inversion.call;
        let source = call
            .data_sources()
            .find(|&s| {
                let location = &call.sources[s].location;
                location.arg == ArgRef::Position(0) && location.path.is_root()
            })
            .ok_or_else(|| Error::cannot_invert("no data source to invert into"))?;
        let value = cast_like(inversion.value, &call.source_value(source)?)?;
        Ok(vec![Inversal { source, path: inversion.path.clone(), value }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_like() {
        assert_eq!(cast_like(&Value::Float(2.6), &Value::Int(0)).unwrap(), Value::Int(3));
        let four = Value::Str("4".into());
        assert_eq!(cast_like(&four, &Value::Float(0.5)).unwrap(), Value::Float(4.0));
        let text = Value::Str("x".into());
        assert_eq!(cast_like(&Value::Int(7), &text).unwrap(), Value::Str("7".into()));
        assert!(matches!(
            cast_like(&Value::Str("seven".into()), &Value::Int(0)),
            Err(Error::CannotInvert { .. })
        ));
    }
}

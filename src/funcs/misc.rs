//! Indexing, list operators, proxies and type conversions.

use crate::func::{Args, Func};
use crate::invert::{
    CastingInverter, GetItemInverter, ListConcatInverter, PackInverter, ProxyInverter,
    TranspositionalInverter,
};
use crate::path::Index;
use crate::registry::{DataSources, FuncDefinition};
use crate::translate::{Elementwise, GetItem, ListConcat, Pack, Proxy, Transpositional};
use crate::value::{Scalar, ScalarKind, Value, ValueError};

pub(super) fn definitions() -> Vec<(Func, FuncDefinition)> {
    vec![
        (super::input(), FuncDefinition::new(DataSources::Only(vec![]))),
        (
            Func::new("proxy", |args: &Args| args.required(0, "value").cloned()),
            FuncDefinition::positional([0]).translator(Proxy).inverter(ProxyInverter),
        ),
        (
            Func::new("getitem", |args: &Args| {
                let index = Index::from_value(args.positional.get(1).unwrap_or(&Value::None))?;
                args.required(0, "container")?.get_index(&index)
            }),
            FuncDefinition::positional([0])
                .translator(GetItem)
                .translator(Transpositional)
                .inverter(GetItemInverter)
                .inverter(TranspositionalInverter),
        ),
        (
            Func::new("list_concat", |args: &Args| {
                let mut joined = list(args.required(0, "a")?)?.to_vec();
                joined.extend_from_slice(list(args.required(1, "b")?)?);
                Ok(Value::List(joined))
            }),
            FuncDefinition::positional([0, 1]).translator(ListConcat).inverter(ListConcatInverter),
        ),
        (
            Func::new("pack", |args: &Args| Ok(Value::List(args.positional.clone()))),
            FuncDefinition::new(DataSources::All).translator(Pack).inverter(PackInverter),
        ),
        casting("to_int", |value| cast(value, ScalarKind::Int)),
        casting("to_float", |value| cast(value, ScalarKind::Float)),
        casting("to_bool", |value| cast(value, ScalarKind::Bool)),
        casting("to_str", |value| Ok(Value::Str(value.to_string()))),
    ]
}

fn list(value: &Value) -> Result<&[Value], ValueError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(ValueError::Type { expected: "list", found: other.type_name() }),
    }
}

fn casting(
    name: &'static str,
    f: fn(&Value) -> Result<Value, ValueError>,
) -> (Func, FuncDefinition) {
    let func = Func::new(name, move |args: &Args| {
        f(args.positional.first().unwrap_or(&Value::None))
    });
    let definition = FuncDefinition::positional([0])
        .translator(Elementwise)
        .inverter(CastingInverter);
    (func, definition)
}

/// Converts numbers, arrays and numeric strings to an element type.
fn cast(value: &Value, kind: ScalarKind) -> Result<Value, ValueError> {
    match value {
        Value::Array(array) => Ok(Value::Array(array.cast(kind))),
        Value::Str(text) => {
            let text = text.trim();
            let parsed = match text.parse::<i64>() {
                Ok(i) => Scalar::Int(i),
                Err(_) => Scalar::Float(text.parse::<f64>().map_err(|_| {
                    ValueError::Custom(format!("cannot convert '{text}' to a number"))
                })?),
            };
            let parsed = match kind {
                ScalarKind::Int => parsed.cast(ScalarKind::Float).as_i64(),
                _ => return Ok(parsed.cast(kind).into()),
            };
            Ok(Value::Int(parsed))
        }
        other => match other.scalar() {
            Some(x) if kind == ScalarKind::Int => Ok(Value::Int(x.as_i64())),
            Some(x) => Ok(x.cast(kind).into()),
            None => Err(ValueError::Type { expected: "number", found: other.type_name() }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::func::Args;
    use crate::value::{Value, ValueError};
    use crate::{array, funcs};

    fn run(name: &str, args: Args) -> Result<Value, ValueError> {
        funcs::lookup(name).unwrap().call(&args)
    }

    #[test]
    fn test_getitem() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Value::Int(1));
        let args = Args::<Value>::new().with(Value::Dict(map)).with("k");
        assert_eq!(run("getitem", args).unwrap(), Value::Int(1));
        let args = Args::<Value>::new().with(array![5, 6, 7]).with(-1);
        assert_eq!(run("getitem", args).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_casts_truncate_like_conversions() {
        assert_eq!(run("to_int", Args::<Value>::new().with(2.7)).unwrap(), Value::Int(2));
        assert_eq!(run("to_int", Args::<Value>::new().with("2.7")).unwrap(), Value::Int(2));
        assert_eq!(run("to_float", Args::<Value>::new().with("3")).unwrap(), Value::Float(3.0));
        assert_eq!(run("to_str", Args::<Value>::new().with(5)).unwrap(), Value::Str("5".into()));
        assert!(run("to_float", Args::<Value>::new().with("x")).is_err());
    }

    #[test]
    fn test_list_operators() {
        let a = Value::List(vec![1.into()]);
        let b = Value::List(vec![2.into(), 3.into()]);
        let joined = run("list_concat", Args::<Value>::new().with(a).with(b)).unwrap();
        assert_eq!(joined, Value::List(vec![1.into(), 2.into(), 3.into()]));
        let packed = run("pack", Args::<Value>::new().with(1).with("x")).unwrap();
        assert_eq!(packed, Value::List(vec![1.into(), "x".into()]));
    }
}

//! Functions that rearrange, reduce or measure arrays.

use crate::array::{Array, normalize};
use crate::func::{Args, Func};
use crate::invert::TranspositionalInverter;
use crate::registry::FuncDefinition;
use crate::translate::{AxisAccumulation, AxisReduction, ShapeOnly, Transpositional};
use crate::value::{Scalar, ScalarKind, Value, ValueError};

use super::{axis, integer, operand};

pub(super) fn definitions() -> Vec<(Func, FuncDefinition)> {
    let mut table = vec![
        transpositional(Func::new("array", |args: &Args| {
            operand(args, 0, "object").map(Value::from_array)
        })),
        transpositional(Func::new("concatenate", concatenate)),
        transpositional(Func::new("reshape", reshape)),
        transpositional(Func::new("transpose", |args: &Args| {
            Ok(Value::from_array(operand(args, 0, "a")?.transpose()))
        })),
        transpositional(Func::new("rot90", |args: &Args| {
            let a = operand(args, 0, "m")?;
            let k = args.arg(1, "k").map(integer).transpose()?.unwrap_or(1);
            Ok(Value::from_array(a.rot90(k)?))
        })),
        transpositional(Func::new("flip", |args: &Args| {
            let a = operand(args, 0, "m")?;
            let axis = axis(args, 1, a.ndim())?;
            Ok(Value::from_array(a.flip(axis)?))
        })),
        transpositional(Func::new("repeat", |args: &Args| {
            let a = operand(args, 0, "a")?;
            let repeats = integer(args.required(1, "repeats")?)?;
            let repeats = usize::try_from(repeats)
                .map_err(|_| ValueError::Custom("negative repeats".into()))?;
            let axis = axis(args, 2, a.ndim())?;
            Ok(Value::from_array(a.repeat(repeats, axis)?))
        })),
    ];

    let reductions: [(&str, Reduce); 4] =
        [("sum", sum), ("mean", mean), ("min", min), ("max", max)];
    for (name, reduce) in reductions {
        let func = Func::new(name, move |args: &Args| reduction(args, reduce));
        table.push((func, FuncDefinition::positional([0]).translator(AxisReduction)));
    }
    let accumulations: [(&str, Step); 2] = [("cumsum", add), ("cumprod", mul)];
    for (name, step) in accumulations {
        let func = Func::new(name, move |args: &Args| accumulation(args, step));
        table.push((func, FuncDefinition::positional([0]).translator(AxisAccumulation)));
    }

    table.push((Func::new("len", len), FuncDefinition::positional([0]).translator(ShapeOnly)));
    table.push((
        Func::new("shape", |args: &Args| {
            let shape = args.required(0, "a")?.shape()?;
            Ok(Value::List(shape.into_iter().map(Value::from).collect()))
        }),
        FuncDefinition::positional([0]).translator(ShapeOnly),
    ));
    table
}

fn transpositional(func: Func) -> (Func, FuncDefinition) {
    let definition = FuncDefinition::positional([0])
        .translator(Transpositional)
        .inverter(TranspositionalInverter);
    (func, definition)
}

fn concatenate(args: &Args) -> Result<Value, ValueError> {
    let arrays = match args.required(0, "arrays")? {
        Value::List(items) => items.iter().map(Value::to_array).collect::<Result<Vec<_>, _>>()?,
        other => return Err(ValueError::Type { expected: "list", found: other.type_name() }),
    };
    let ndim = arrays.first().map_or(1, Array::ndim);
    let axis = match args.arg(1, "axis") {
        None => 0,
        Some(value) => normalize(integer(value)?, ndim)?,
    };
    Array::concatenate(&arrays, axis).map(Value::Array)
}

fn reshape(args: &Args) -> Result<Value, ValueError> {
    let a = operand(args, 0, "a")?;
    let requested: Vec<i64> = match args.required(1, "shape")? {
        Value::List(items) => items.iter().map(integer).collect::<Result<_, _>>()?,
        other => vec![integer(other)?],
    };
    let known: i64 = requested.iter().filter(|&&n| n >= 0).product();
    let mut shape = Vec::with_capacity(requested.len());
    for n in requested {
        let n = if n < 0 && known > 0 { a.len() as i64 / known } else { n };
        let n = usize::try_from(n)
            .map_err(|_| ValueError::Shape(format!("invalid dimension {n}")))?;
        shape.push(n);
    }
    Ok(Value::from_array(a.reshape(shape)?))
}

type Reduce = fn(&[Scalar]) -> Result<Scalar, ValueError>;

/// Reduces along the `axis` argument, or over everything.
fn reduction(args: &Args, reduce: Reduce) -> Result<Value, ValueError> {
    let a = operand(args, 0, "a")?;
    let Some(axis) = axis(args, 1, a.ndim())? else {
        return reduce(a.data()).map(Value::from);
    };
    let lanes = a.fold_axis(axis, Vec::new(), |lane, &x| lane.push(x))?;
    Ok(Value::from_array(lanes.try_map(|lane| reduce(lane))?))
}

fn sum(xs: &[Scalar]) -> Result<Scalar, ValueError> {
    if xs.iter().all(|x| x.kind() <= ScalarKind::Int) {
        xs.iter()
            .try_fold(0i64, |acc, x| acc.checked_add(x.as_i64()))
            .map(Scalar::Int)
            .ok_or(ValueError::Overflow)
    } else {
        Ok(Scalar::Float(xs.iter().map(|x| x.as_f64()).sum()))
    }
}

fn mean(xs: &[Scalar]) -> Result<Scalar, ValueError> {
    let total: f64 = xs.iter().map(|x| x.as_f64()).sum();
    Ok(Scalar::Float(total / xs.len() as f64))
}

fn min(xs: &[Scalar]) -> Result<Scalar, ValueError> {
    extreme(xs, |a, b| b < a)
}

fn max(xs: &[Scalar]) -> Result<Scalar, ValueError> {
    extreme(xs, |a, b| b > a)
}

fn extreme(xs: &[Scalar], better: fn(Scalar, Scalar) -> bool) -> Result<Scalar, ValueError> {
    let (&first, rest) = xs
        .split_first()
        .ok_or_else(|| ValueError::Shape("reduction of an empty array".into()))?;
    Ok(rest.iter().fold(first, |best, &x| if better(best, x) { x } else { best }))
}

type Step = fn(&Scalar, &Scalar) -> Scalar;

/// Accumulates along the `axis` argument, or over the flattened array.
fn accumulation(args: &Args, step: Step) -> Result<Value, ValueError> {
    let a = operand(args, 0, "a")?;
    let (a, axis) = match axis(args, 1, a.ndim())? {
        Some(axis) => (a, axis),
        None => (a.flatten(), 0),
    };
    if a.ndim() == 0 {
        return Ok(Value::from_array(a));
    }
    Ok(Value::Array(a.scan_axis(axis, step)?))
}

fn add(a: &Scalar, b: &Scalar) -> Scalar {
    match (a, b) {
        (Scalar::Float(_), _) | (_, Scalar::Float(_)) => Scalar::Float(a.as_f64() + b.as_f64()),
        _ => Scalar::Int(a.as_i64().wrapping_add(b.as_i64())),
    }
}

fn mul(a: &Scalar, b: &Scalar) -> Scalar {
    match (a, b) {
        (Scalar::Float(_), _) | (_, Scalar::Float(_)) => Scalar::Float(a.as_f64() * b.as_f64()),
        _ => Scalar::Int(a.as_i64().wrapping_mul(b.as_i64())),
    }
}

fn len(args: &Args) -> Result<Value, ValueError> {
    let n = match args.required(0, "obj")? {
        Value::List(items) => items.len(),
        Value::Dict(map) => map.len(),
        Value::Str(text) => text.chars().count(),
        Value::Array(array) if array.ndim() > 0 => array.shape()[0],
        other => return Err(ValueError::Type { expected: "sized value", found: other.type_name() }),
    };
    Ok(Value::from(n))
}

#[cfg(test)]
mod tests {
    use crate::func::Args;
    use crate::value::{Value, ValueError};
    use crate::{array, funcs};

    fn run(name: &str, args: Args) -> Result<Value, ValueError> {
        funcs::lookup(name).unwrap().call(&args)
    }

    #[test]
    fn test_reductions() {
        let grid = Value::from(array![[1, 2, 3], [4, 5, 6]]);
        let by_column = Args::<Value>::new().with(grid.clone()).with_keyword("axis", 0);
        assert_eq!(run("sum", by_column).unwrap(), Value::from(array![5, 7, 9]));
        assert_eq!(run("max", Args::<Value>::new().with(grid.clone())).unwrap(), Value::Int(6));
        let by_row = Args::<Value>::new().with(grid).with(-1);
        assert_eq!(run("mean", by_row).unwrap(), Value::from(array![2.0, 5.0]));
    }

    #[test]
    fn test_accumulations() {
        let grid = Value::from(array![[1, 2], [3, 4]]);
        assert_eq!(
            run("cumsum", Args::<Value>::new().with(grid.clone())).unwrap(),
            Value::from(array![1, 3, 6, 10])
        );
        assert_eq!(
            run("cumprod", Args::<Value>::new().with(grid).with(0)).unwrap(),
            Value::from(array![[1, 2], [3, 8]])
        );
    }

    #[test]
    fn test_reshape_infers_dimension() {
        let args = Args::<Value>::new()
            .with(array![1, 2, 3, 4, 5, 6])
            .with(Value::List(vec![(-1).into(), 2.into()]));
        let reshaped = run("reshape", args).unwrap();
        assert_eq!(reshaped.shape().unwrap(), vec![3, 2]);
    }

    #[test]
    fn test_concatenate_and_len() {
        let args = Args::<Value>::new()
            .with(Value::List(vec![array![[1, 2, 3]].into(), array![[8, 12, 14]].into()]));
        let joined = run("concatenate", args).unwrap();
        assert_eq!(joined, Value::from(array![[1, 2, 3], [8, 12, 14]]));
        assert_eq!(run("len", Args::<Value>::new().with(joined)).unwrap(), Value::Int(2));
        assert!(run("len", Args::<Value>::new().with(3)).is_err());
    }
}

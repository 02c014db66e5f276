//! Elementwise arithmetic and its inverses.

use std::f64::consts::PI;

use crate::func::{Args, Func};
use crate::invert::ElementwiseInverter;
use crate::registry::FuncDefinition;
use crate::translate::Elementwise;
use crate::value::{Scalar, ScalarKind, Value, ValueError};

use super::operand;

pub(super) fn definitions() -> Vec<(Func, FuncDefinition)> {
    vec![
        unary("negative", |x| match x {
            Scalar::Float(x) => Ok(Scalar::Float(-x)),
            x => x.as_i64().checked_neg().map(Scalar::Int).ok_or(ValueError::Overflow),
        }, |y, _, _| -y),
        unary("abs", |x| match x {
            Scalar::Float(x) => Ok(Scalar::Float(x.abs())),
            x => x.as_i64().checked_abs().map(Scalar::Int).ok_or(ValueError::Overflow),
        }, inverse_abs),
        unary("square", |x| match x {
            Scalar::Float(x) => Ok(Scalar::Float(x * x)),
            x => x.as_i64().checked_mul(x.as_i64()).map(Scalar::Int).ok_or(ValueError::Overflow),
        }, inverse_square),
        float("sqrt", f64::sqrt, |y, _, _| if y < 0.0 { f64::NAN } else { y * y }),
        float("exp", f64::exp, |y, _, _| y.ln()),
        float("log", f64::ln, |y, _, _| y.exp()),
        float("log2", f64::log2, |y, _, _| y.exp2()),
        float("log10", f64::log10, |y, _, _| 10f64.powf(y)),
        float("sin", f64::sin, inverse_sin),
        float("cos", f64::cos, inverse_cos),
        float("tan", f64::tan, inverse_tan),
        float("arcsin", f64::asin, |y, _, _| y.sin()),
        float("arccos", f64::acos, |y, _, _| y.cos()),
        float("arctan", f64::atan, |y, _, _| y.tan()),
        binary(
            "add",
            i64::checked_add,
            |a, b| a + b,
            |new, other, _| new - other,
            |new, other, _| new - other,
        ),
        binary(
            "subtract",
            i64::checked_sub,
            |a, b| a - b,
            |new, other, _| new + other,
            |new, other, _| other - new,
        ),
        binary(
            "multiply",
            i64::checked_mul,
            |a, b| a * b,
            |new, other, _| new / other,
            |new, other, _| new / other,
        ),
        divide(),
        power(),
    ]
}

/// An elementwise one-argument function with an explicit inverse.
fn unary(
    name: &'static str,
    f: fn(Scalar) -> Result<Scalar, ValueError>,
    inverse: crate::invert::UnaryInverse,
) -> (Func, FuncDefinition) {
    let func = Func::new(name, move |args: &Args| {
        let x = operand(args, 0, "x")?;
        Ok(Value::from_array(x.try_map(|&x| f(x))?))
    });
    let definition = FuncDefinition::positional([0])
        .translator(Elementwise)
        .inverter(ElementwiseInverter::unary(inverse));
    (func, definition)
}

/// A unary function on floats.
fn float(
    name: &'static str,
    f: fn(f64) -> f64,
    inverse: crate::invert::UnaryInverse,
) -> (Func, FuncDefinition) {
    let func = Func::new(name, move |args: &Args| {
        let x = operand(args, 0, "x")?;
        Ok(Value::from_array(x.map(|&x| Scalar::Float(f(x.as_f64())))))
    });
    let definition = FuncDefinition::positional([0])
        .translator(Elementwise)
        .inverter(ElementwiseInverter::unary(inverse));
    (func, definition)
}

/// An elementwise two-argument function that stays integral on integers
/// unless the integer operation fails.
fn binary(
    name: &'static str,
    int: fn(i64, i64) -> Option<i64>,
    float: fn(f64, f64) -> f64,
    left: crate::invert::BinaryInverse,
    right: crate::invert::BinaryInverse,
) -> (Func, FuncDefinition) {
    let func = Func::new(name, move |args: &Args| {
        zip(args, |a, b| {
            if a.kind() <= ScalarKind::Int && b.kind() <= ScalarKind::Int {
                int(a.as_i64(), b.as_i64()).map(Scalar::Int).ok_or(ValueError::Overflow)
            } else {
                Ok(Scalar::Float(float(a.as_f64(), b.as_f64())))
            }
        })
    });
    (func, binary_definition(left, right))
}

fn divide() -> (Func, FuncDefinition) {
    let func = Func::new("divide", |args: &Args| {
        zip(args, |a, b| Ok(Scalar::Float(a.as_f64() / b.as_f64())))
    });
    (func, binary_definition(|new, other, _| new * other, |new, other, _| other / new))
}

fn power() -> (Func, FuncDefinition) {
    let func = Func::new("power", |args: &Args| {
        zip(args, |a, b| match (a.kind() <= ScalarKind::Int, b) {
            (true, Scalar::Int(e)) if e >= 0 => u32::try_from(e)
                .ok()
                .and_then(|e| a.as_i64().checked_pow(e))
                .map(Scalar::Int)
                .ok_or(ValueError::Overflow),
            _ => Ok(Scalar::Float(a.as_f64().powf(b.as_f64()))),
        })
    });
    (func, binary_definition(inverse_power_base, |new, base, _| new.ln() / base.ln()))
}

fn binary_definition(
    left: crate::invert::BinaryInverse,
    right: crate::invert::BinaryInverse,
) -> FuncDefinition {
    FuncDefinition::positional([0, 1])
        .translator(Elementwise)
        .inverter(ElementwiseInverter::binary(left, right))
}

/// Applies a function to the broadcast elements of the first two arguments.
fn zip(
    args: &Args,
    f: impl Fn(Scalar, Scalar) -> Result<Scalar, ValueError>,
) -> Result<Value, ValueError> {
    let a = operand(args, 0, "x1")?;
    let b = operand(args, 1, "x2")?;
    let results = a.zip_with(&b, |&x, &y| f(x, y))?;
    Ok(Value::from_array(results.try_map(|r| r.clone())?))
}

/// Restores the sign of the previous input when inverting input-aware.
fn signed(magnitude: f64, previous: f64, input_aware: bool) -> f64 {
    if input_aware && previous < 0.0 { -magnitude } else { magnitude }
}

fn inverse_abs(y: f64, previous: f64, input_aware: bool) -> f64 {
    if y < 0.0 { f64::NAN } else { signed(y, previous, input_aware) }
}

fn inverse_square(y: f64, previous: f64, input_aware: bool) -> f64 {
    signed(y.sqrt(), previous, input_aware)
}

/// The branch of `asin` nearest the previous input.
fn inverse_sin(y: f64, previous: f64, input_aware: bool) -> f64 {
    if !input_aware {
        return y.asin();
    }
    let n = (previous / PI + 0.5).floor();
    let sign = if n.rem_euclid(2.0) == 0.0 { 1.0 } else { -1.0 };
    sign * y.asin() + n * PI
}

/// The branch of `acos` nearest the previous input.
fn inverse_cos(y: f64, previous: f64, input_aware: bool) -> f64 {
    if !input_aware {
        return y.acos();
    }
    let n = (previous / PI).floor();
    let sign = if n.rem_euclid(2.0) == 0.0 { 1.0 } else { -1.0 };
    sign * (y.acos() - PI / 2.0) + n * PI + PI / 2.0
}

/// The branch of `atan` nearest the previous input.
fn inverse_tan(y: f64, previous: f64, input_aware: bool) -> f64 {
    if !input_aware {
        return y.atan();
    }
    y.atan() + (previous / PI + 0.5).floor() * PI
}

/// Inverts `base ** exponent` into the base, keeping the sign of the
/// previous base for even integer exponents.
fn inverse_power_base(new: f64, exponent: f64, previous: f64) -> f64 {
    let root = new.abs().powf(exponent.recip());
    let integral = exponent.fract() == 0.0;
    let odd = integral && exponent.rem_euclid(2.0) == 1.0;
    if new < 0.0 {
        if odd { -root } else { f64::NAN }
    } else if integral && !odd && previous < 0.0 {
        -root
    } else {
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array;

    fn run(name: &str, args: Args) -> Result<Value, ValueError> {
        crate::funcs::lookup(name).unwrap().call(&args)
    }

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        let args = Args::<Value>::new().with(array![1, 2]).with(3);
        let sum = run("add", args.clone()).unwrap();
        assert!(matches!(sum, Value::Array(a) if a.kind() == ScalarKind::Int));
        assert_eq!(run("divide", args).unwrap(), Value::from(array![1.0 / 3.0, 2.0 / 3.0]));
        let overflow = Args::<Value>::new().with(i64::MAX).with(1);
        assert_eq!(run("add", overflow), Err(ValueError::Overflow));
    }

    #[test]
    fn test_power() {
        assert_eq!(run("power", Args::<Value>::new().with(2).with(10)).unwrap(), Value::Int(1024));
        let root = Args::<Value>::new().with(4).with(0.5);
        assert_eq!(run("power", root).unwrap(), Value::Float(2.0));
        assert_eq!(inverse_power_base(9.0, 2.0, -1.0), -3.0);
        assert_eq!(inverse_power_base(-8.0, 3.0, 1.0), -2.0);
        assert!(inverse_power_base(-4.0, 2.0, 1.0).is_nan());
    }

    #[test]
    fn test_periodic_inverses_follow_previous_input() {
        let x = inverse_sin(0.5, 2.0 * PI + 0.1, true);
        assert!((x - (2.0 * PI + 0.5f64.asin())).abs() < 1e-12);
        let x = inverse_cos(1.0, 2.0 * PI + 0.2, true);
        assert!((x - 2.0 * PI).abs() < 1e-12);
        let x = inverse_tan(1.0, PI, true);
        assert!((x - (PI + PI / 4.0)).abs() < 1e-12);
        assert_eq!(inverse_sin(0.0, 3.0, false), 0.0);
    }

    #[test]
    fn test_square_keeps_sign() {
        assert_eq!(inverse_square(4.0, -1.0, true), -2.0);
        assert_eq!(inverse_square(4.0, -1.0, false), 2.0);
        assert!(inverse_abs(-1.0, 1.0, true).is_nan());
    }
}

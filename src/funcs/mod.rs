//! The standard function library.
//!
//! Every function here is registered with a [`FuncDefinition`] describing
//! its data arguments, translators and inverters when a [`Registry`] is
//! bootstrapped.

mod arrays;
mod math;
mod misc;

use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use crate::array::{Array, normalize};
use crate::func::{Args, Func};
use crate::registry::{FuncDefinition, Registry};
use crate::value::{Value, ValueError};

/// Every standard function with its definition.
fn table() -> Vec<(Func, FuncDefinition)> {
    let mut table = math::definitions();
    table.extend(arrays::definitions());
    table.extend(misc::definitions());
    table
}

static FUNCS: LazyLock<FxHashMap<String, Func>> = LazyLock::new(|| {
    table().into_iter().map(|(func, _)| (func.name().to_string(), func)).collect()
});

/// Registers the definitions of all standard functions.
pub fn register(registry: &Registry) {
    for (func, definition) in table() {
        registry.register(func.name(), definition);
    }
}

/// A standard function by name.
pub fn lookup(name: &str) -> Option<Func> {
    FUNCS.get(name).cloned()
}

/// The function of input nodes: returns the literal it holds.
pub(crate) fn input() -> Func {
    Func::new("input", |args: &Args| Ok(args.positional.first().cloned().unwrap_or_default()))
}

/// An optional axis argument, resolved against a number of dimensions.
fn axis(args: &Args, position: usize, ndim: usize) -> Result<Option<usize>, ValueError> {
    match args.arg(position, "axis") {
        None => Ok(None),
        Some(value) => {
            let axis = integer(value)?;
            normalize(axis, ndim).map(Some)
        }
    }
}

/// An integer argument.
fn integer(value: &Value) -> Result<i64, ValueError> {
    match value.scalar() {
        Some(x) if x.as_f64().fract() == 0.0 => Ok(x.as_i64()),
        _ => Err(ValueError::Type { expected: "integer", found: value.type_name() }),
    }
}

/// The numeric data argument at a position.
fn operand(args: &Args, position: usize, name: &str) -> Result<Array, ValueError> {
    args.required(position, name)?.to_array()
}

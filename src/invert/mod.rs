//! Inverting assignments across function calls.
//!
//! An inverter turns an assignment to a call's result into assignments to
//! the call's sources that, once recomputed, produce the assigned value.

mod casting;
mod elementwise;
mod getitem;
mod list;
mod transpositional;

pub use self::casting::CastingInverter;
pub use self::elementwise::{BinaryInverse, ElementwiseInverter, UnaryInverse};
pub use self::getitem::{GetItemInverter, ProxyInverter};
pub use self::list::{ListConcatInverter, PackInverter};
pub use self::transpositional::TranspositionalInverter;

use std::collections::BTreeMap;

use crate::array::{Array, Mask, path_mask};
use crate::error::{Error, Result};
use crate::func::FuncCall;
use crate::path::Path;
use crate::registry::FuncDefinition;
use crate::translate::Tagging;
use crate::value::{Scalar, Value};

/// An assignment to the result of a call, to be inverted.
#[derive(Debug, Clone, Copy)]
pub struct Inversion<'a> {
    /// The call, with sources resolved to their current values.
    pub call: &'a FuncCall,
    /// Where the result is assigned to.
    pub path: &'a Path,
    /// The assigned value.
    pub value: &'a Value,
    /// The result before the assignment.
    pub previous: &'a Value,
    /// Whether inverse functions may use the sources' previous values.
    pub input_aware: bool,
}

impl<'a> Inversion<'a> {
    /// The same inversion with a different assigned value.
    pub fn with_value(&self, value: &'a Value) -> Self {
        Self { value, ..*self }
    }
}

/// An assignment to one of a call's sources.
#[derive(Debug, Clone, PartialEq)]
pub struct Inversal {
    /// The source, as an index into [`FuncCall::sources`].
    pub source: usize,
    pub path: Path,
    pub value: Value,
}

/// Inverts assignments to the results of some class of functions.
pub trait Inverter: Send + Sync {
    /// Fails with [`Error::CannotInvert`] when the call or the assignment has
    /// a shape this inverter does not handle.
    fn invert(&self, inversion: &Inversion) -> Result<Vec<Inversal>>;
}

/// Inverts with the first inverter that succeeds and returns its position
/// in the definition together with the inversals.
pub fn invert(
    definition: &FuncDefinition,
    inversion: &Inversion,
) -> Result<(usize, Vec<Inversal>)> {
    let mut reason = format!("{} has no inverter", inversion.call.func.name());
    for (i, inverter) in definition.inverters.iter().enumerate() {
        match inverter.invert(inversion) {
            Ok(inversals) => return Ok((i, inversals)),
            Err(err) => {
                tracing::debug!(func = inversion.call.func.name(), %err, "inverter failed");
                reason = match err {
                    Error::CannotInvert { reason } => reason,
                    other => other.to_string(),
                };
            }
        }
    }
    Err(Error::CannotInvert { reason })
}

/// Inverts through source tags.
///
/// Every assigned element of the result that stems from an element of a
/// source gives that source element the value `element` computes from the
/// source index, the flat result position, the flat source position, and the
/// result with the assignment applied.
pub(crate) fn invert_by_codes(
    tagging: &impl Tagging,
    inversion: &Inversion,
    sources: impl IntoIterator<Item = usize>,
    mut element: impl FnMut(usize, usize, usize, &Array) -> Result<Scalar>,
) -> Result<Vec<Inversal>> {
    let previous = inversion.previous.to_array()?;
    let updated = Value::Array(previous.clone())
        .with(inversion.path, inversion.value.clone())?
        .to_array()?;
    let assigned = path_mask(previous.shape(), inversion.path)?;

    let mut out = vec![];
    for source in sources {
        let codes = tagging.codes(inversion.call, source)?;
        if codes.shape() != previous.shape() {
            return Err(Error::cannot_invert("result does not have the expected shape"));
        }
        let shape = inversion.call.source_value(source)?.shape()?;
        let mut values = BTreeMap::new();
        for (r, &code) in codes.iter().enumerate() {
            if code < 0 || !assigned.data()[r] {
                continue;
            }
            let x = element(source, r, code as usize, &updated)?;
            if !x.is_finite() {
                return Err(Error::cannot_invert(format!("inverse value {x} is not finite")));
            }
            values.insert(code as usize, x);
        }
        if values.is_empty() {
            continue;
        }

        let mut mask = Mask::none(&shape);
        for &c in values.keys() {
            mask.set_flat(c);
        }
        let values: Vec<Scalar> = values.into_values().collect();
        let (path, value) = if shape.is_empty() {
            (Path::root(), Value::from(values[0]))
        } else if mask.all() {
            (Path::root(), Value::Array(Array::new(shape, values)?))
        } else {
            (Path::root().child(mask), Value::Array(Array::from_vec(values)))
        };
        out.push(Inversal { source, path, value });
    }
    Ok(out)
}

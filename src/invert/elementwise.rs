use crate::array::Array;
use crate::error::{Error, Result};
use crate::func::{ArgRef, FuncCall};
use crate::translate::Elementwise;
use crate::value::Scalar;

use super::{Inversal, Inversion, Inverter, invert_by_codes};

/// The inverse of a one-argument function, computing the source element
/// from the new result element and the source's previous element.
///
/// With input-aware inversion, many-to-one functions pick the inverse
/// closest to the previous element. Otherwise they use the principal one.
pub type UnaryInverse = fn(new: f64, previous: f64, input_aware: bool) -> f64;

/// The inverse of a two-argument function with respect to one argument,
/// computing that argument's element from the new result element, the other
/// argument's element, and its own previous element.
pub type BinaryInverse = fn(new: f64, other: f64, previous: f64) -> f64;

#[derive(Debug, Copy, Clone)]
enum Inverse {
    Unary(UnaryInverse),
    Binary { left: BinaryInverse, right: BinaryInverse },
}

/// Inverts elementwise numeric functions through explicit inverse functions.
///
/// Two-argument functions are inverted into the first argument when it
/// references a data source, and into the second argument otherwise.
#[derive(Debug, Copy, Clone)]
pub struct ElementwiseInverter(Inverse);

impl ElementwiseInverter {
    pub fn unary(inverse: UnaryInverse) -> Self {
        Self(Inverse::Unary(inverse))
    }

    pub fn binary(left: BinaryInverse, right: BinaryInverse) -> Self {
        Self(Inverse::Binary { left, right })
    }
}

/// The data sources sitting directly in a positional argument.
fn sources_at(call: &FuncCall, position: usize) -> Vec<usize> {
    call.data_sources()
        .filter(|&s| {
            let location = &call.sources[s].location;
            location.arg == ArgRef::Position(position) && location.path.is_root()
        })
        .collect()
}

impl Inverter for ElementwiseInverter {
    fn invert(&self, inversion: &Inversion) -> Result<Vec<Inversal>> {
        let call = inversion.call;
        let (position, inverse) = match self.0 {
            Inverse::Unary(f) => (0, Inverse::Unary(f)),
            Inverse::Binary { left, right } => {
                if sources_at(call, 0).is_empty() {
                    (1, Inverse::Binary { left: right, right })
                } else {
                    (0, Inverse::Binary { left, right })
                }
            }
        };
        let sources = sources_at(call, position);
        if sources.is_empty() {
            return Err(Error::cannot_invert("no data source to invert into"));
        }

        let shape = Elementwise::result_shape(call)?;
        let other = match inverse {
            Inverse::Binary { .. } => {
                let other = call.args.positional.get(1 - position).ok_or_else(|| {
                    Error::cannot_invert("missing second operand")
                })?;
                Some(other.to_array()?.broadcast_to(&shape)?)
            }
            Inverse::Unary(_) => None,
        };
        let previous: Vec<Array> = sources
            .iter()
            .map(|&s| call.source_value(s).and_then(|v| v.to_array()))
            .collect::<Result<_, _>>()?;

        invert_by_codes(&Elementwise, inversion, sources.iter().copied(), |source, r, c, updated| {
            let slot = sources.iter().position(|&s| s == source).unwrap_or_default();
            let before = previous[slot].data()[c].as_f64();
            let new = updated.data()[r].as_f64();
            let x = match (inverse, &other) {
                (Inverse::Unary(f), _) => f(new, before, inversion.input_aware),
                (Inverse::Binary { left, .. }, Some(other)) => {
                    left(new, other.data()[r].as_f64(), before)
                }
                (Inverse::Binary { .. }, None) => f64::NAN,
            };
            Ok(Scalar::Float(x))
        })
    }
}

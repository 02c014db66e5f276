use crate::array::{Mask, normalize, path_mask};
use crate::error::{Error, Result};
use crate::func::{ArgRef, FuncCall};
use crate::path::Path;

use super::{BackwardsTranslator, ForwardsTranslator, mask_path};

/// The source shape and the reduced axis of a call whose first positional
/// argument is the data and whose `axis` comes second or by keyword.
fn operand(call: &FuncCall) -> Result<(usize, Vec<usize>, Option<usize>)> {
    let source = call
        .sources
        .iter()
        .position(|s| s.location.arg == ArgRef::Position(0) && s.location.path.is_root())
        .ok_or(Error::CannotTranslatePath)?;
    let shape = call.source_value(source)?.shape()?;
    let axis = match call.args.arg(1, "axis") {
        None => None,
        Some(value) => {
            let axis = value.scalar().ok_or(Error::CannotTranslatePath)?.as_i64();
            Some(normalize(axis, shape.len())?)
        }
    };
    Ok((source, shape, axis))
}

/// Translates through reductions along an axis (`sum`, `mean`, ...): a
/// result element depends on the whole axis it was reduced from.
#[derive(Debug, Default, Copy, Clone)]
pub struct AxisReduction;

impl BackwardsTranslator for AxisReduction {
    fn translate_backwards(&self, call: &FuncCall, path: &Path) -> Result<Vec<(usize, Path)>> {
        let (source, shape, axis) = operand(call)?;
        let Some(axis) = axis else {
            return Ok(vec![(source, Path::root())]);
        };
        let mut reduced = shape.clone();
        reduced.remove(axis);
        let requested = path_mask(&reduced, path)?;
        if !requested.any() {
            return Ok(vec![]);
        }
        let expanded = Mask::full(&shape, false).try_map_positions(|mut position| {
            position.remove(axis);
            requested.at(&position).copied()
        });
        Ok(vec![(source, mask_path(expanded))])
    }
}

impl ForwardsTranslator for AxisReduction {
    fn translate_forwards(&self, call: &FuncCall, source: usize, path: &Path) -> Result<Vec<Path>> {
        let (operand, shape, axis) = operand(call)?;
        if operand != source {
            return Err(Error::CannotTranslatePath);
        }
        let changed = path_mask(&shape, path)?;
        if !changed.any() {
            return Ok(vec![]);
        }
        let Some(axis) = axis else {
            return Ok(vec![Path::root()]);
        };
        let affected = changed.fold_axis(axis, false, |acc, &x| *acc |= x)?;
        Ok(vec![mask_path(affected)])
    }
}

/// Translates through running accumulations along an axis (`cumsum`, ...):
/// a result element depends on all earlier elements along its axis.
#[derive(Debug, Default, Copy, Clone)]
pub struct AxisAccumulation;

impl BackwardsTranslator for AxisAccumulation {
    fn translate_backwards(&self, call: &FuncCall, path: &Path) -> Result<Vec<(usize, Path)>> {
        let (source, shape, axis) = operand(call)?;
        let (flat_shape, axis) = accumulated(&shape, axis);
        let requested = path_mask(&flat_shape, path)?;
        if !requested.any() {
            return Ok(vec![]);
        }
        let needed = requested
            .flip(Some(axis))?
            .scan_axis(axis, |a, b| *a || *b)?
            .flip(Some(axis))?
            .reshape(shape)?;
        Ok(vec![(source, mask_path(needed))])
    }
}

impl ForwardsTranslator for AxisAccumulation {
    fn translate_forwards(&self, call: &FuncCall, source: usize, path: &Path) -> Result<Vec<Path>> {
        let (operand, shape, axis) = operand(call)?;
        if operand != source {
            return Err(Error::CannotTranslatePath);
        }
        let (flat_shape, axis) = accumulated(&shape, axis);
        let changed = path_mask(&shape, path)?.reshape(flat_shape)?;
        if !changed.any() {
            return Ok(vec![]);
        }
        let affected = changed.scan_axis(axis, |a, b| *a || *b)?;
        Ok(vec![mask_path(affected)])
    }
}

/// The shape and axis an accumulation runs over. Without an axis, the input
/// is flattened.
fn accumulated(shape: &[usize], axis: Option<usize>) -> (Vec<usize>, usize) {
    match axis {
        Some(axis) => (shape.to_vec(), axis),
        None => (vec![shape.iter().product()], 0),
    }
}

impl Mask {
    /// A mask of this shape whose elements are computed from their
    /// positions. Positions `f` yields nothing for are left unselected.
    fn try_map_positions(&self, mut f: impl FnMut(Vec<usize>) -> Option<bool>) -> Mask {
        let mut out = self.clone();
        let shape = self.shape().to_vec();
        for flat in 0..self.len() {
            if f(crate::array::unravel(flat, &shape)) == Some(true) {
                out.set_flat(flat);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::tests::{call, node};
    use crate::value::Value;
    use crate::{args, array, path};

    fn grid() -> [Value; 1] {
        [Value::from(array![[1, 2, 3], [4, 5, 6]])]
    }

    #[test]
    fn test_reduction_backwards_takes_whole_axis() {
        let call = call("sum", args![node(0); axis = 0], &grid());
        let paths = AxisReduction.translate_backwards(&call, &path![2]).unwrap();
        let mask = Mask::new(vec![2, 3], vec![false, false, true, false, false, true]).unwrap();
        assert_eq!(paths, vec![(0, path![mask])]);
    }

    #[test]
    fn test_reduction_forwards() {
        let call = call("sum", args![node(0), 1], &grid());
        let affected = AxisReduction.translate_forwards(&call, 0, &path![(1, 0)]).unwrap();
        assert_eq!(affected, vec![path![Mask::from_vec(vec![false, true])]]);

        let total = call_total();
        let affected = AxisReduction.translate_forwards(&total, 0, &path![0]).unwrap();
        assert_eq!(affected, vec![Path::root()]);
    }

    fn call_total() -> FuncCall {
        call("sum", args![node(0)], &grid())
    }

    #[test]
    fn test_accumulation() {
        let values = [Value::from(array![1, 2, 3, 4])];
        let call = call("cumsum", args![node(0)], &values);
        let needed = AxisAccumulation.translate_backwards(&call, &path![1]).unwrap();
        assert_eq!(needed, vec![(0, path![Mask::from_vec(vec![true, true, false, false])])]);
        let affected = AxisAccumulation.translate_forwards(&call, 0, &path![2]).unwrap();
        assert_eq!(affected, vec![path![Mask::from_vec(vec![false, false, true, true])]]);
    }
}

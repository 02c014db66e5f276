use crate::array::Codes;
use crate::error::{Error, Result};
use crate::func::{Args, FuncCall};
use crate::path::Path;
use crate::value::{Scalar, Value};

use super::{
    BackwardsTranslator, ForwardsTranslator, Tagging, backwards_by_codes, forwards_by_codes,
};

/// Translates through functions that move elements around without changing
/// them (reshaping, joining, repeating, indexing, array construction).
///
/// Works for any such function by running it on tag arrays: the source under
/// consideration is replaced by its flat positions, all other data by `-1`,
/// and the result tells where every element came from.
#[derive(Debug, Default, Copy, Clone)]
pub struct Transpositional;

impl Transpositional {
    /// The arguments with the given source tagged and all other data blanked.
    fn tagged_args(call: &FuncCall, source: usize) -> Result<Args> {
        let mut args = call.args.clone();
        for arg in &call.data_args {
            if let Some(value) = args.get_mut(arg) {
                *value = blank(value);
            }
        }
        let location = &call.sources[source].location;
        let shape = call.source_value(source)?.shape()?;
        let tags = Value::from_array(Codes::indices(&shape).map(|&i| Scalar::Int(i)));
        args.get_mut(&location.arg)
            .ok_or(Error::CannotTranslatePath)?
            .set(&location.path, tags)?;
        Ok(args)
    }
}

/// Replaces every number in a value by `-1`, keeping its structure.
fn blank(value: &Value) -> Value {
    match value {
        Value::Array(array) => Value::Array(array.map(|_| Scalar::Int(-1))),
        Value::List(items) => Value::List(items.iter().map(blank).collect()),
        other if other.is_scalar() => Value::Int(-1),
        other => other.clone(),
    }
}

impl Tagging for Transpositional {
    fn codes(&self, call: &FuncCall, source: usize) -> Result<Codes> {
        let args = Self::tagged_args(call, source)?;
        let result = call.call(&args)?;
        Ok(result.to_array()?.map(|x| x.as_i64()))
    }
}

impl BackwardsTranslator for Transpositional {
    fn translate_backwards(&self, call: &FuncCall, path: &Path) -> Result<Vec<(usize, Path)>> {
        backwards_by_codes(self, call, path)
    }
}

impl ForwardsTranslator for Transpositional {
    fn translate_forwards(&self, call: &FuncCall, source: usize, path: &Path) -> Result<Vec<Path>> {
        forwards_by_codes(self, call, source, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Mask;
    use crate::translate::tests::{call, node};
    use crate::{Argument, args, array, path};

    #[test]
    fn test_concatenate_backwards() {
        let values = [Value::from(array![[1, 2, 3]]), Value::from(array![[8, 12, 14]])];
        let nodes = vec![Argument::from(node(0)), node(1).into()];
        let call = call("concatenate", args![nodes], &values);
        let paths = Transpositional.translate_backwards(&call, &path![(1, 0)]).unwrap();
        let mask = Mask::new(vec![1, 3], vec![true, false, false]).unwrap();
        assert_eq!(paths, vec![(1, path![mask])]);
    }

    #[test]
    fn test_literal_data_is_not_tagged() {
        let values = [Value::from(array![1, 2])];
        let literal = Argument::from(array![0, 1]);
        let call = call("concatenate", args![vec![literal, node(0).into()]], &values);
        let paths = Transpositional.translate_backwards(&call, &path![1]).unwrap();
        assert!(paths.is_empty());
        let affected = Transpositional.translate_forwards(&call, 0, &path![0]).unwrap();
        assert_eq!(affected, vec![path![Mask::from_vec(vec![false, false, true, false])]]);
    }

    #[test]
    fn test_transpose_forwards() {
        let values = [Value::from(array![[1, 2], [3, 4]])];
        let call = call("transpose", args![node(0)], &values);
        let affected = Transpositional.translate_forwards(&call, 0, &path![(0, 1)]).unwrap();
        let mask = Mask::new(vec![2, 2], vec![false, false, true, false]).unwrap();
        assert_eq!(affected, vec![path![mask]]);
    }

    #[test]
    fn test_getitem_of_array() {
        let values = [Value::from(array![5, 6, 7, 8])];
        let call = call("getitem", args![node(0), crate::Slice::range(1, 3)], &values);
        let paths = Transpositional.translate_backwards(&call, &path![0]).unwrap();
        assert_eq!(paths, vec![(0, path![Mask::from_vec(vec![false, true, false, false])])]);
        assert!(Transpositional.translate_forwards(&call, 0, &path![3]).unwrap().is_empty());
    }
}

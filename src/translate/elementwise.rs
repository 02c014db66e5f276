use crate::array::{Codes, broadcast_shapes};
use crate::error::{Error, Result};
use crate::func::FuncCall;
use crate::path::Path;

use super::{
    BackwardsTranslator, ForwardsTranslator, Tagging, backwards_by_codes, forwards_by_codes,
};

/// Translates through functions applied element by element with
/// broadcasting: every result element stems from the source element it was
/// broadcast from.
#[derive(Debug, Default, Copy, Clone)]
pub struct Elementwise;

impl Elementwise {
    /// The shape all positional arguments broadcast to.
    pub(crate) fn result_shape(call: &FuncCall) -> Result<Vec<usize>> {
        let mut shape = vec![];
        for value in &call.args.positional {
            shape = broadcast_shapes(&shape, &value.shape()?)?;
        }
        Ok(shape)
    }
}

impl Tagging for Elementwise {
    fn codes(&self, call: &FuncCall, source: usize) -> Result<Codes> {
        if !call.sources[source].location.path.is_root() {
            return Err(Error::CannotTranslatePath);
        }
        let shape = call.source_value(source)?.shape()?;
        Ok(Codes::indices(&shape).broadcast_to(&Self::result_shape(call)?)?)
    }
}

impl BackwardsTranslator for Elementwise {
    fn translate_backwards(&self, call: &FuncCall, path: &Path) -> Result<Vec<(usize, Path)>> {
        backwards_by_codes(self, call, path)
    }
}

impl ForwardsTranslator for Elementwise {
    fn translate_forwards(&self, call: &FuncCall, source: usize, path: &Path) -> Result<Vec<Path>> {
        forwards_by_codes(self, call, source, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Mask;
    use crate::translate::tests::{call, node};
    use crate::value::Value;
    use crate::{args, array, path};

    #[test]
    fn test_broadcast_backwards() {
        let values = [Value::from(array![[1, 2, 3]]), Value::from(array![[10], [20]])];
        let call = call("add", args![node(0), node(1)], &values);
        let paths = Elementwise.translate_backwards(&call, &path![(1, 2)]).unwrap();
        assert_eq!(
            paths,
            vec![
                (0, path![Mask::new(vec![1, 3], vec![false, false, true]).unwrap()]),
                (1, path![Mask::new(vec![2, 1], vec![false, true]).unwrap()]),
            ]
        );
    }

    #[test]
    fn test_broadcast_forwards() {
        let values = [Value::from(array![1, 2, 3]), Value::Int(5)];
        let call = call("add", args![node(0), node(1)], &values);
        let affected = Elementwise.translate_forwards(&call, 0, &path![1]).unwrap();
        assert_eq!(affected, vec![path![Mask::from_vec(vec![false, true, false])]]);
        let everything = Elementwise.translate_forwards(&call, 1, &Path::root()).unwrap();
        assert_eq!(everything, vec![Path::root()]);
    }

    #[test]
    fn test_scalar_source_backwards() {
        let values = [Value::from(array![1, 2, 3]), Value::Int(5)];
        let call = call("add", args![node(0), node(1)], &values);
        let paths = Elementwise.translate_backwards(&call, &path![0]).unwrap();
        assert_eq!(paths[1], (1, Path::root()));
    }
}

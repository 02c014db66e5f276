use crate::error::{Error, Result};
use crate::func::FuncCall;
use crate::path::Path;
use crate::value::Value;

use super::{BackwardsTranslator, ForwardsTranslator};

/// Translates through functions that only look at the shape of their data
/// (`len`, `shape`). Element changes inside an array do not affect the
/// result. A write into a list or mapping may add an entry, so it affects
/// all of it.
#[derive(Debug, Default, Copy, Clone)]
pub struct ShapeOnly;

impl BackwardsTranslator for ShapeOnly {
    fn translate_backwards(&self, _: &FuncCall, _: &Path) -> Result<Vec<(usize, Path)>> {
        Ok(vec![])
    }
}

impl ForwardsTranslator for ShapeOnly {
    fn translate_forwards(&self, call: &FuncCall, source: usize, path: &Path) -> Result<Vec<Path>> {
        let keeps_shape = !path.is_root()
            && matches!(call.source_value(source), Ok(Value::Array(array)) if array.ndim() > 0);
        Ok(if keeps_shape { vec![] } else { vec![Path::root()] })
    }
}

/// Translates through the identity function of proxy nodes. Reads pass
/// through unchanged, but upstream changes never reach past the proxy.
#[derive(Debug, Default, Copy, Clone)]
pub struct Proxy;

impl BackwardsTranslator for Proxy {
    fn translate_backwards(&self, call: &FuncCall, path: &Path) -> Result<Vec<(usize, Path)>> {
        let source = call.data_sources().next().ok_or(Error::CannotTranslatePath)?;
        Ok(vec![(source, path.clone())])
    }
}

impl ForwardsTranslator for Proxy {
    fn translate_forwards(&self, _: &FuncCall, _: usize, _: &Path) -> Result<Vec<Path>> {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::translate::tests::{call, node};
    use crate::{args, array, path};

    #[test]
    fn test_shape_only() {
        let call = call("len", args![node(0)], &[Value::from(array![1, 2, 3])]);
        assert!(ShapeOnly.translate_backwards(&call, &Path::root()).unwrap().is_empty());
        assert!(ShapeOnly.translate_forwards(&call, 0, &path![1]).unwrap().is_empty());
        assert_eq!(
            ShapeOnly.translate_forwards(&call, 0, &Path::root()).unwrap(),
            vec![Path::root()]
        );
    }

    #[test]
    fn test_shape_only_mapping_entries() {
        let map = BTreeMap::from([
            ("k".to_string(), Value::Int(1)),
            ("z".to_string(), Value::Int(5)),
        ]);
        let dict = call("len", args![node(0)], &[Value::Dict(map)]);
        let affected = ShapeOnly.translate_forwards(&dict, 0, &path!["z"]).unwrap();
        assert_eq!(affected, vec![Path::root()]);

        let list = call("len", args![node(0)], &[Value::List(vec![Value::Int(1)])]);
        let affected = ShapeOnly.translate_forwards(&list, 0, &path![0]).unwrap();
        assert_eq!(affected, vec![Path::root()]);
    }

    #[test]
    fn test_proxy() {
        let call = call("proxy", args![node(0)], &[Value::from(array![1, 2, 3])]);
        assert_eq!(Proxy.translate_backwards(&call, &path![2]).unwrap(), vec![(0, path![2])]);
        assert!(Proxy.translate_forwards(&call, 0, &Path::root()).unwrap().is_empty());
    }
}

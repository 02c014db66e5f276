use crate::error::{Error, Result};
use crate::func::{ArgRef, FuncCall};
use crate::path::{Path, PathComponent};
use crate::translate::GetItem;
use crate::value::Value;

use super::{Inversal, Inversion, Inverter};

/// Whether `path` begins with `prefix`.
fn starts_with(path: &[PathComponent], prefix: &[PathComponent]) -> bool {
    path.len() >= prefix.len() && path.iter().zip(prefix).all(|(a, b)| a.index == b.index)
}

/// Distributes an assignment at `requested` inside a positional argument to
/// the sources nested in that argument.
pub(crate) fn assign_within(
    call: &FuncCall,
    arg: usize,
    requested: &Path,
    value: &Value,
) -> Result<Vec<Inversal>> {
    let mut out = vec![];
    for s in call.data_sources() {
        let location = &call.sources[s].location;
        if location.arg != ArgRef::Position(arg) {
            continue;
        }
        let nested = &location.path;
        if starts_with(requested, nested) {
            let path = requested[nested.len()..].iter().cloned().collect();
            out.push(Inversal { source: s, path, value: value.clone() });
        } else if starts_with(nested, requested) {
            let rest: Path = nested[requested.len()..].iter().cloned().collect();
            out.push(Inversal { source: s, path: Path::root(), value: value.get(&rest)? });
        } else if crate::translate::relate(nested, requested).is_some() {
            return Err(Error::cannot_invert("assignment overlaps a source in an unknown way"));
        }
    }
    if out.is_empty() {
        return Err(Error::cannot_invert("assignment does not reach any source"));
    }
    Ok(out)
}

/// Inverts indexing into lists and mappings: an assignment to the item is
/// an assignment to the container at the item's index.
#[derive(Debug, Default, Copy, Clone)]
pub struct GetItemInverter;

impl Inverter for GetItemInverter {
    fn invert(&self, inversion: &Inversion) -> Result<Vec<Inversal>> {
        let index = GetItem::index(inversion.call)
            .map_err(|_| Error::cannot_invert("not an index into a list or mapping"))?;
        let requested = Path::root().child(index).join(inversion.path);
        assign_within(inversion.call, 0, &requested, inversion.value)
    }
}

/// Inverts the identity function of proxy nodes by passing assignments
/// through unchanged.
#[derive(Debug, Default, Copy, Clone)]
pub struct ProxyInverter;

impl Inverter for ProxyInverter {
    fn invert(&self, inversion: &Inversion) -> Result<Vec<Inversal>> {
        assign_within(inversion.call, 0, inversion.path, inversion.value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::translate::tests::{call, node};
    use crate::{Argument, args, array, path};

    fn invert(call: &FuncCall, path: &Path, value: Value) -> Result<Vec<Inversal>> {
        let previous = call.call(&call.args)?;
        let inversion =
            Inversion { call, path, value: &value, previous: &previous, input_aware: true };
        GetItemInverter.invert(&inversion)
    }

    #[test]
    fn test_mapping_item() {
        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Value::List(vec![1.into(), 2.into()]));
        let call = call("getitem", args![node(0), "k"], &[Value::Dict(map)]);
        let inversals = invert(&call, &path![1], Value::Int(5)).unwrap();
        let expected = Inversal { source: 0, path: path!["k", 1], value: Value::Int(5) };
        assert_eq!(inversals, vec![expected]);
    }

    #[test]
    fn test_item_is_a_node() {
        let list = vec![Argument::from(1), node(0).into()];
        let call = call("getitem", args![list, 1], &[Value::from(array![1, 2])]);
        let inversals = invert(&call, &path![0], Value::Int(9)).unwrap();
        assert_eq!(inversals, vec![Inversal { source: 0, path: path![0], value: Value::Int(9) }]);
        assert!(invert(&call, &Path::root(), Value::Int(9)).is_ok());
        let list = vec![Argument::from(1), node(0).into()];
        let literal = crate::translate::tests::call("getitem", args![list, 0], &[Value::Int(0)]);
        assert!(invert(&literal, &Path::root(), Value::Int(9)).is_err());
    }

    #[test]
    fn test_proxy_passes_through() {
        let call = call("proxy", args![node(0)], &[Value::from(array![1, 2])]);
        let previous = call.call(&call.args).unwrap();
        let value = Value::Int(3);
        let path = path![1];
        let inversion = Inversion {
            call: &call,
            path: &path,
            value: &value,
            previous: &previous,
            input_aware: true,
        };
        let inversals = ProxyInverter.invert(&inversion).unwrap();
        assert_eq!(inversals, vec![Inversal { source: 0, path: path![1], value }]);
    }
}

use crate::array::normalize;
use crate::error::{Error, Result};
use crate::path::{Index, Path};
use crate::translate::locate;
use crate::value::Value;

use super::getitem::assign_within;
use super::{Inversal, Inversion, Inverter};

const PARTIAL: &str = "only single elements or the whole list can be assigned";

/// The elements of a list assigned as a whole.
fn items<'a>(value: &'a Value, len: usize) -> Result<&'a [Value]> {
    match value {
        Value::List(items) if items.len() == len => Ok(items),
        _ => Err(Error::cannot_invert(format!("expected a list of length {len}"))),
    }
}

/// Inverts joining lists: an element assignment goes to the list holding
/// the element, a whole assignment is split among all of them.
#[derive(Debug, Default, Copy, Clone)]
pub struct ListConcatInverter;

impl Inverter for ListConcatInverter {
    fn invert(&self, inversion: &Inversion) -> Result<Vec<Inversal>> {
        let call = inversion.call;
        let lengths = call
            .args
            .positional
            .iter()
            .map(|value| match value {
                Value::List(items) => Ok(items.len()),
                _ => Err(Error::cannot_invert("list_concat of a non-list")),
            })
            .collect::<Result<Vec<_>>>()?;

        match inversion.path.first().map(|c| &c.index) {
            Some(Index::Int(i)) => {
                let (arg, offset) = locate(&lengths, *i)?;
                let requested = Path::root().child(offset).join(&inversion.path[1..]);
                assign_within(call, arg, &requested, inversion.value)
            }
            None => {
                let items = items(inversion.value, lengths.iter().sum())?;
                let mut out = vec![];
                let mut start = 0;
                for (arg, len) in lengths.into_iter().enumerate() {
                    let part = Value::List(items[start..start + len].to_vec());
                    start += len;
                    match assign_within(call, arg, &Path::root(), &part) {
                        Ok(inversals) => out.extend(inversals),
                        Err(_) if call.args.positional[arg] == part => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(out)
            }
            Some(_) => Err(Error::cannot_invert(PARTIAL)),
        }
    }
}

/// Inverts packing arguments into a list: element `i` is argument `i`.
#[derive(Debug, Default, Copy, Clone)]
pub struct PackInverter;

impl Inverter for PackInverter {
    fn invert(&self, inversion: &Inversion) -> Result<Vec<Inversal>> {
        let call = inversion.call;
        let count = call.args.positional.len();
        match inversion.path.first().map(|c| &c.index) {
            Some(Index::Int(i)) => {
                let arg = normalize(*i, count)?;
                assign_within(call, arg, &inversion.path.tail(), inversion.value)
            }
            None => {
                let items = items(inversion.value, count)?;
                let mut out = vec![];
                for (arg, item) in items.iter().enumerate() {
                    match assign_within(call, arg, &Path::root(), item) {
                        Ok(inversals) => out.extend(inversals),
                        Err(_) if call.args.positional[arg] == *item => {}
                        Err(err) => return Err(err),
                    }
                }
                Ok(out)
            }
            Some(_) => Err(Error::cannot_invert(PARTIAL)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::tests::{call, node};
    use crate::{args, path};

    fn lists() -> [Value; 2] {
        [Value::List(vec![1.into(), 2.into()]), Value::List(vec![3.into()])]
    }

    fn run(
        inverter: &dyn Inverter,
        call: &crate::FuncCall,
        path: &Path,
        value: Value,
    ) -> Result<Vec<Inversal>> {
        let previous = call.call(&call.args)?;
        let inversion =
            Inversion { call, path, value: &value, previous: &previous, input_aware: true };
        inverter.invert(&inversion)
    }

    #[test]
    fn test_concat_element() {
        let call = call("list_concat", args![node(0), node(1)], &lists());
        let inversals = run(&ListConcatInverter, &call, &path![2], Value::Int(30)).unwrap();
        assert_eq!(inversals, vec![Inversal { source: 1, path: path![0], value: Value::Int(30) }]);
    }

    #[test]
    fn test_concat_whole_diverges() {
        let call = call("list_concat", args![node(0), node(1)], &lists());
        let whole = Value::List(vec![7.into(), 8.into(), 9.into()]);
        let inversals = run(&ListConcatInverter, &call, &Path::root(), whole).unwrap();
        assert_eq!(inversals.len(), 2);
        assert_eq!(inversals[1].value, Value::List(vec![9.into()]));
        let short = Value::List(vec![7.into()]);
        assert!(run(&ListConcatInverter, &call, &Path::root(), short).is_err());
    }

    #[test]
    fn test_pack() {
        let call = call("pack", args![5, node(0)], &[Value::Int(1)]);
        let inversals = run(&PackInverter, &call, &path![1], Value::Int(4)).unwrap();
        let expected = Inversal { source: 0, path: Path::root(), value: Value::Int(4) };
        assert_eq!(inversals, vec![expected]);
        assert!(run(&PackInverter, &call, &path![0], Value::Int(4)).is_err());
        let whole = Value::List(vec![5.into(), 6.into()]);
        assert_eq!(run(&PackInverter, &call, &Path::root(), whole).unwrap().len(), 1);
    }
}

use crate::error::Result;
use crate::translate::Transpositional;

use super::{Inversal, Inversion, Inverter, invert_by_codes};

/// Inverts functions that move elements around without changing them: each
/// assigned result element is written back to the source element it came
/// from. Assignments spanning several sources diverge into one inversal per
/// source.
#[derive(Debug, Default, Copy, Clone)]
pub struct TranspositionalInverter;

impl Inverter for TranspositionalInverter {
    fn invert(&self, inversion: &Inversion) -> Result<Vec<Inversal>> {
        let sources: Vec<usize> = inversion.call.data_sources().collect();
        invert_by_codes(&Transpositional, inversion, sources, |_, r, _, updated| {
            Ok(updated.data()[r])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use crate::translate::tests::{call, node};
    use crate::value::Value;
    use crate::{Argument, array, args, path};

    #[test]
    fn test_concatenate_writes_back_to_one_source() {
        let values = [Value::from(array![[1, 2, 3]]), Value::from(array![[8, 12, 14]])];
        let nodes = vec![Argument::from(node(0)), node(1).into()];
        let call = call("concatenate", args![nodes], &values);
        let previous = call.call(&call.args).unwrap();
        let value = Value::Int(20);
        let inversion = Inversion {
            call: &call,
            path: &path![(1, 0)],
            value: &value,
            previous: &previous,
            input_aware: true,
        };
        let inversals = TranspositionalInverter.invert(&inversion).unwrap();
        assert_eq!(inversals.len(), 1);
        assert_eq!(inversals[0].source, 1);

        let mut b = values[1].clone();
        b.set(&inversals[0].path, inversals[0].value.clone()).unwrap();
        assert_eq!(b, Value::from(array![[20, 12, 14]]));
    }

    #[test]
    fn test_whole_assignment_diverges() {
        let values = [Value::from(array![1, 2]), Value::from(array![3])];
        let nodes = vec![Argument::from(node(0)), node(1).into()];
        let call = call("concatenate", args![nodes], &values);
        let previous = call.call(&call.args).unwrap();
        let value = Value::from(array![7, 8, 9]);
        let inversion = Inversion {
            call: &call,
            path: &Path::root(),
            value: &value,
            previous: &previous,
            input_aware: true,
        };
        let inversals = TranspositionalInverter.invert(&inversion).unwrap();
        assert_eq!(inversals.len(), 2);
        assert_eq!(inversals[0].value, Value::from(array![7, 8]));
        let last = Inversal { source: 1, path: Path::root(), value: Value::from(array![9]) };
        assert_eq!(inversals[1], last);
    }
}

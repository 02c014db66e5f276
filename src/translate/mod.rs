//! Translating paths across function calls.
//!
//! Backward translation maps a path in a call's result to the paths of the
//! data sources needed to compute it. Forward translation maps a changed
//! path in a source to the parts of the result it affects.

mod axis;
mod elementwise;
mod getitem;
mod list;
mod shape;
mod transpositional;

pub use self::axis::{AxisAccumulation, AxisReduction};
pub use self::elementwise::Elementwise;
pub use self::getitem::GetItem;
pub use self::list::{ListConcat, Pack};
pub use self::shape::{Proxy, ShapeOnly};
pub use self::transpositional::Transpositional;

pub(crate) use self::getitem::relate;
pub(crate) use self::list::locate;

use crate::array::{Codes, Mask, path_mask};
use crate::error::{Error, Result};
use crate::func::FuncCall;
use crate::path::Path;
use crate::registry::FuncDefinition;

/// Maps a result path to the source paths it is computed from.
pub trait BackwardsTranslator: Send + Sync {
    /// Returns `(source, path)` pairs, with sources given as indices into
    /// [`FuncCall::sources`]. Data sources that are not needed are omitted.
    ///
    /// Fails with [`Error::CannotTranslatePath`] when the call has a shape
    /// this translator does not handle.
    fn translate_backwards(&self, call: &FuncCall, path: &Path) -> Result<Vec<(usize, Path)>>;
}

/// Maps a changed source path to the result paths it affects.
pub trait ForwardsTranslator: Send + Sync {
    /// Returns the affected result paths. An empty list means the result is
    /// not affected at all.
    fn translate_forwards(&self, call: &FuncCall, source: usize, path: &Path) -> Result<Vec<Path>>;
}

/// Translates backwards with the first translator that succeeds.
pub fn backwards(
    definition: &FuncDefinition,
    call: &FuncCall,
    path: &Path,
) -> Result<Vec<(usize, Path)>> {
    for translator in &definition.backwards {
        match translator.translate_backwards(call, path) {
            Ok(paths) => return Ok(paths),
            Err(err) => {
                tracing::trace!(func = call.func.name(), %err, "backward translator failed")
            }
        }
    }
    Err(Error::CannotTranslatePath)
}

/// Translates forwards with the first translator that succeeds.
pub fn forwards(
    definition: &FuncDefinition,
    call: &FuncCall,
    source: usize,
    path: &Path,
) -> Result<Vec<Path>> {
    for translator in &definition.forwards {
        match translator.translate_forwards(call, source, path) {
            Ok(paths) => return Ok(paths),
            Err(err) => tracing::trace!(func = call.func.name(), %err, "forward translator failed"),
        }
    }
    Err(Error::CannotTranslatePath)
}

/// Translates backwards, requiring every data source in full when no
/// translator succeeds.
pub fn backwards_or_full(
    definition: &FuncDefinition,
    call: &FuncCall,
    path: &Path,
) -> Vec<(usize, Path)> {
    backwards(definition, call, path)
        .unwrap_or_else(|_| call.data_sources().map(|source| (source, Path::root())).collect())
}

/// Translates forwards, affecting the whole result when no translator
/// succeeds.
pub fn forwards_or_full(
    definition: &FuncDefinition,
    call: &FuncCall,
    source: usize,
    path: &Path,
) -> Vec<Path> {
    forwards(definition, call, source, path).unwrap_or_else(|_| vec![Path::root()])
}

/// Tags every element of a call's result with the flat position in a source
/// it stems from. Elements that do not stem from the source get `-1`.
pub(crate) trait Tagging {
    fn codes(&self, call: &FuncCall, source: usize) -> Result<Codes>;
}

/// Backward translation through source tags.
pub(crate) fn backwards_by_codes(
    tagging: &impl Tagging,
    call: &FuncCall,
    path: &Path,
) -> Result<Vec<(usize, Path)>> {
    let mut out = vec![];
    for source in call.data_sources() {
        let codes = tagging.codes(call, source)?;
        let selected = codes.select_path(path)?;
        let shape = call.source_value(source)?.shape()?;
        let mut mask = Mask::none(&shape);
        for &code in selected.iter().filter(|&&code| code >= 0) {
            mask.set_flat(code as usize);
        }
        if !mask.any() {
            continue;
        }
        out.push((source, mask_path(mask)));
    }
    Ok(out)
}

/// Forward translation through source tags.
pub(crate) fn forwards_by_codes(
    tagging: &impl Tagging,
    call: &FuncCall,
    source: usize,
    path: &Path,
) -> Result<Vec<Path>> {
    let codes = tagging.codes(call, source)?;
    let shape = call.source_value(source)?.shape()?;
    let changed = path_mask(&shape, path)?;
    let affected = codes.map(|&code| code >= 0 && changed.data()[code as usize]);
    if !affected.any() {
        return Ok(vec![]);
    }
    Ok(vec![mask_path(affected)])
}

/// The path selecting the elements of a mask. Zero-dimensional masks and
/// masks selecting everything address the root.
pub(crate) fn mask_path(mask: Mask) -> Path {
    if mask.ndim() == 0 || mask.all() { Path::root() } else { Path::root().child(mask) }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::func::{Args, Func};
    use crate::path;
    use crate::registry::Registry;
    use crate::value::{Value, ValueError};
    use crate::{array, args};

    /// A call with every node resolved to the given values.
    pub(crate) fn call(
        name: &str,
        args: crate::Args<crate::Argument>,
        values: &[Value],
    ) -> FuncCall {
        let registry = Registry::standard();
        let definition = registry.definition(name);
        let func = crate::funcs::lookup(name)
            .unwrap_or_else(|| Func::new(name, |_: &Args| Ok(Value::None)));
        FuncCall::new(
            func,
            &args,
            |arg| definition.is_data(arg),
            |id, _, _| Ok::<_, ValueError>(values[id.index()].clone()),
        )
        .unwrap()
    }

    #[test]
    fn test_unregistered_falls_back_to_full() {
        let call = call("mystery", args![node(0)], &[Value::from(array![1, 2])]);
        let definition = Registry::standard().definition("mystery");
        assert_eq!(backwards_or_full(&definition, &call, &path![0]), vec![(0, Path::root())]);
        assert_eq!(forwards_or_full(&definition, &call, 0, &path![0]), vec![Path::root()]);
    }

    pub(crate) fn node(index: usize) -> crate::NodeId {
        crate::NodeId::new(index, 0)
    }
}

use crate::array::normalize;
use crate::error::{Error, Result};
use crate::func::{ArgRef, FuncCall};
use crate::path::{Index, Path};

use super::{BackwardsTranslator, ForwardsTranslator, relate};

/// The lengths of the list arguments of a call.
fn lengths(call: &FuncCall) -> Result<Vec<usize>> {
    call.args
        .positional
        .iter()
        .map(|value| match value {
            crate::Value::List(items) => Ok(items.len()),
            _ => Err(Error::CannotTranslatePath),
        })
        .collect()
}

/// Maps a position in the joined list to an argument and a position in it.
pub(crate) fn locate(lengths: &[usize], index: i64) -> Result<(usize, usize)> {
    let mut position = normalize(index, lengths.iter().sum())?;
    for (arg, &len) in lengths.iter().enumerate() {
        if position < len {
            return Ok((arg, position));
        }
        position -= len;
    }
    Err(Error::CannotTranslatePath)
}

/// The sources inside an argument touched by a request into it.
fn within(call: &FuncCall, arg: usize, requested: &Path) -> Vec<(usize, Path)> {
    call.data_sources()
        .filter(|&s| call.sources[s].location.arg == ArgRef::Position(arg))
        .filter_map(|s| relate(&call.sources[s].location.path, requested).map(|p| (s, p)))
        .collect()
}

/// Every data source in full.
fn everything(call: &FuncCall) -> Vec<(usize, Path)> {
    call.data_sources().map(|s| (s, Path::root())).collect()
}

fn position(call: &FuncCall, source: usize) -> Result<usize> {
    match call.sources[source].location.arg {
        ArgRef::Position(i) => Ok(i),
        ArgRef::Keyword(_) => Err(Error::CannotTranslatePath),
    }
}

/// Translates through joining lists end to end.
#[derive(Debug, Default, Copy, Clone)]
pub struct ListConcat;

impl BackwardsTranslator for ListConcat {
    fn translate_backwards(&self, call: &FuncCall, path: &Path) -> Result<Vec<(usize, Path)>> {
        let lengths = lengths(call)?;
        match path.first().map(|c| &c.index) {
            Some(Index::Int(i)) => {
                let (arg, offset) = locate(&lengths, *i)?;
                Ok(within(call, arg, &Path::root().child(offset).join(&path[1..])))
            }
            _ => Ok(everything(call)),
        }
    }
}

impl ForwardsTranslator for ListConcat {
    fn translate_forwards(&self, call: &FuncCall, source: usize, path: &Path) -> Result<Vec<Path>> {
        let lengths = lengths(call)?;
        let arg = position(call, source)?;
        let changed = call.sources[source].location.path.join(path);
        match changed.first().map(|c| &c.index) {
            Some(Index::Int(i)) => {
                let offset: usize = lengths[..arg].iter().sum();
                let at = offset + normalize(*i, lengths[arg])?;
                Ok(vec![Path::root().child(at).join(&changed[1..])])
            }
            _ => Ok(vec![Path::root()]),
        }
    }
}

/// Translates through packing arguments into a list, one element each.
#[derive(Debug, Default, Copy, Clone)]
pub struct Pack;

impl BackwardsTranslator for Pack {
    fn translate_backwards(&self, call: &FuncCall, path: &Path) -> Result<Vec<(usize, Path)>> {
        match path.first().map(|c| &c.index) {
            Some(Index::Int(i)) => {
                let arg = normalize(*i, call.args.positional.len())?;
                Ok(within(call, arg, &path.tail()))
            }
            _ => Ok(everything(call)),
        }
    }
}

impl ForwardsTranslator for Pack {
    fn translate_forwards(&self, call: &FuncCall, source: usize, path: &Path) -> Result<Vec<Path>> {
        let arg = position(call, source)?;
        let changed = call.sources[source].location.path.join(path);
        Ok(vec![Path::root().child(arg).join(&changed)])
    }
}

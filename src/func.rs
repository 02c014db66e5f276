//! Functions and their arguments.

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

use crate::array::Array;
use crate::graph::NodeId;
use crate::path::{Index, Path};
use crate::value::{Value, ValueError};

/// The signature of a function body.
pub type Body = dyn Fn(&Args) -> Result<Value, ValueError> + Send + Sync;

/// A named function a node computes its value with.
///
/// The name is what the [`Registry`](crate::Registry) looks the function's
/// definition up by.
#[derive(Clone)]
pub struct Func {
    name: Arc<str>,
    body: Arc<Body>,
}

impl Func {
    pub fn new(
        name: impl Into<Arc<str>>,
        body: impl Fn(&Args) -> Result<Value, ValueError> + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), body: Arc::new(body) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the function.
    pub fn call(&self, args: &Args) -> Result<Value, ValueError> {
        (self.body)(args)
    }
}

impl Debug for Func {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Func({})", self.name)
    }
}

/// Refers to a positional or keyword argument.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArgRef {
    Position(usize),
    Keyword(String),
}

impl Display for ArgRef {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Position(i) => write!(f, "argument {i}"),
            Self::Keyword(name) => write!(f, "argument `{name}`"),
        }
    }
}

impl From<usize> for ArgRef {
    fn from(position: usize) -> Self {
        Self::Position(position)
    }
}

impl From<&str> for ArgRef {
    fn from(name: &str) -> Self {
        Self::Keyword(name.into())
    }
}

/// An argument of a node's function: a plain value, a reference to another
/// node, or a list that may contain references.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    Node(NodeId),
    List(Vec<Argument>),
}

impl Argument {
    /// The node references inside this argument together with their paths
    /// within it.
    pub fn nodes(&self) -> Vec<(NodeId, Path)> {
        let mut out = vec![];
        self.collect_nodes(&Path::root(), &mut out);
        out
    }

    fn collect_nodes(&self, path: &Path, out: &mut Vec<(NodeId, Path)>) {
        match self {
            Self::Value(_) => {}
            Self::Node(id) => out.push((*id, path.clone())),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.collect_nodes(&path.child(i), out);
                }
            }
        }
    }

    /// Replaces node references by values.
    pub fn resolve<E>(
        &self,
        path: &Path,
        f: &mut impl FnMut(NodeId, &Path) -> Result<Value, E>,
    ) -> Result<Value, E> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Node(id) => f(*id, path),
            Self::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| item.resolve(&path.child(i), f))
                .collect::<Result<_, _>>()
                .map(Value::List),
        }
    }
}

macro_rules! argument_from {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Argument {
            fn from(value: $ty) -> Self {
                Self::Value(value.into())
            }
        }
    )*};
}

argument_from!(bool, i32, i64, usize, f64, &str, String, Array, Value, crate::path::Slice);

impl From<NodeId> for Argument {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<Vec<Argument>> for Argument {
    fn from(items: Vec<Argument>) -> Self {
        Self::List(items)
    }
}

impl From<Index> for Argument {
    fn from(index: Index) -> Self {
        Self::Value(index.to_value())
    }
}

/// Positional and keyword arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Args<T = Value> {
    pub positional: Vec<T>,
    pub keyword: BTreeMap<String, T>,
}

impl<T> Args<T> {
    pub fn new() -> Self {
        Self { positional: vec![], keyword: BTreeMap::new() }
    }

    /// Adds a positional argument.
    pub fn with(mut self, value: impl Into<T>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds a keyword argument.
    pub fn with_keyword(mut self, name: &str, value: impl Into<T>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, arg: &ArgRef) -> Option<&T> {
        match arg {
            ArgRef::Position(i) => self.positional.get(*i),
            ArgRef::Keyword(name) => self.keyword.get(name),
        }
    }

    pub fn get_mut(&mut self, arg: &ArgRef) -> Option<&mut T> {
        match arg {
            ArgRef::Position(i) => self.positional.get_mut(*i),
            ArgRef::Keyword(name) => self.keyword.get_mut(name),
        }
    }

    /// All arguments, positional ones first.
    pub fn iter(&self) -> impl Iterator<Item = (ArgRef, &T)> {
        let positional = self.positional.iter().enumerate().map(|(i, v)| (ArgRef::Position(i), v));
        let keyword = self.keyword.iter().map(|(k, v)| (ArgRef::Keyword(k.clone()), v));
        positional.chain(keyword)
    }
}

impl<T> Default for Args<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Args {
    /// An argument given either at a position or by name.
    pub fn arg(&self, position: usize, name: &str) -> Option<&Value> {
        self.positional
            .get(position)
            .or_else(|| self.keyword.get(name))
            .filter(|value| !value.is_none())
    }

    /// Like [`arg`](Self::arg), but fails when the argument is missing.
    pub fn required(&self, position: usize, name: &str) -> Result<&Value, ValueError> {
        self.arg(position, name).ok_or_else(|| ValueError::MissingArgument(name.into()))
    }
}

/// Build function arguments.
///
/// Positional arguments come first; keyword arguments follow a semicolon.
///
/// ```
/// # use quibs::args;
/// let args = args![1, "a"; axis = 0];
/// assert_eq!(args.positional.len(), 2);
/// assert!(args.keyword.contains_key("axis"));
/// ```
#[macro_export]
macro_rules! args {
    ($($pos:expr),* $(,)? $(; $($key:ident = $kw:expr),* $(,)?)?) => {{
        #[allow(unused_mut)]
        let mut args = $crate::Args::<$crate::Argument>::new();
        $(args.positional.push($crate::Argument::from($pos));)*
        $($(args.keyword.insert(stringify!($key).to_string(), $crate::Argument::from($kw));)*)?
        args
    }};
}

/// Where a node reference sits among the arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub arg: ArgRef,
    /// The path within the argument, for references nested in lists.
    pub path: Path,
}

/// A node referenced by a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub node: NodeId,
    pub location: Location,
    /// Whether the argument is a data argument rather than a parameter.
    pub is_data: bool,
}

/// A function call with node references resolved to values.
#[derive(Debug, Clone)]
pub struct FuncCall {
    pub func: Func,
    pub args: Args,
    /// The data arguments, whether or not they reference nodes.
    pub data_args: Vec<ArgRef>,
    /// Every node reference, in argument order. Translators and inverters
    /// identify sources by their position in this list.
    pub sources: Vec<Source>,
}

impl FuncCall {
    /// Resolves node references in `args` through `resolve`.
    pub fn new<E>(
        func: Func,
        args: &Args<Argument>,
        is_data: impl Fn(&ArgRef) -> bool,
        mut resolve: impl FnMut(NodeId, &Location, bool) -> Result<Value, E>,
    ) -> Result<Self, E> {
        let mut sources = vec![];
        let mut data_args = vec![];
        let mut values = Args::new();
        for (arg, argument) in args.iter() {
            let data = is_data(&arg);
            if data {
                data_args.push(arg.clone());
            }
            let value = argument.resolve::<E>(&Path::root(), &mut |node, path| {
                let location = Location { arg: arg.clone(), path: path.clone() };
                let value = resolve(node, &location, data)?;
                sources.push(Source { node, location, is_data: data });
                Ok(value)
            })?;
            match arg {
                ArgRef::Position(_) => values.positional.push(value),
                ArgRef::Keyword(name) => {
                    values.keyword.insert(name, value);
                }
            }
        }
        Ok(Self { func, args: values, data_args, sources })
    }

    /// The value a source currently has within the arguments.
    pub fn source_value(&self, source: usize) -> Result<Value, ValueError> {
        let location = &self.sources[source].location;
        self.args
            .get(&location.arg)
            .ok_or_else(|| ValueError::MissingArgument(location.arg.to_string()))?
            .get(&location.path)
    }

    /// The indices of sources in data arguments.
    pub fn data_sources(&self) -> impl Iterator<Item = usize> + '_ {
        self.sources.iter().enumerate().filter(|(_, s)| s.is_data).map(|(i, _)| i)
    }

    /// The arguments with every source replaced by the value `f` returns
    /// for it.
    pub fn substitute(
        &self,
        mut f: impl FnMut(usize, &Source) -> Result<Value, ValueError>,
    ) -> Result<Args, ValueError> {
        let mut args = self.args.clone();
        for (i, source) in self.sources.iter().enumerate() {
            let value = f(i, source)?;
            let slot = args
                .get_mut(&source.location.arg)
                .ok_or_else(|| ValueError::MissingArgument(source.location.arg.to_string()))?;
            slot.set(&source.location.path, value)?;
        }
        Ok(args)
    }

    /// Runs the function on the given arguments.
    pub fn call(&self, args: &Args) -> Result<Value, ValueError> {
        self.func.call(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: usize) -> NodeId {
        NodeId::new(index, 0)
    }

    #[test]
    fn test_args_macro() {
        let args = args![1, node(0), vec![Argument::from(2.5), node(1).into()]; axis = 0];
        assert_eq!(args.positional.len(), 3);
        assert_eq!(args.keyword["axis"], Argument::Value(Value::Int(0)));
        let nodes = args.positional[2].nodes();
        assert_eq!(nodes, vec![(node(1), crate::path![1])]);
    }

    #[test]
    fn test_call_records_sources() {
        let args = args![node(0), vec![Argument::from(node(1)), 3.into()]];
        let func = Func::new("first", |args: &Args| Ok(args.positional[0].clone()));
        let call = FuncCall::new(
            func,
            &args,
            |arg| *arg == ArgRef::Position(0),
            |id, _, _| Ok::<_, ValueError>(Value::Int(10 + id.index() as i64)),
        )
        .unwrap();

        assert_eq!(call.sources.len(), 2);
        assert!(call.sources[0].is_data);
        assert!(!call.sources[1].is_data);
        assert_eq!(call.sources[1].location.path, crate::path![0]);
        assert_eq!(call.source_value(1).unwrap(), Value::Int(11));
        assert_eq!(call.data_sources().collect::<Vec<_>>(), vec![0]);

        let replaced = call.substitute(|i, _| Ok(Value::Int(i as i64))).unwrap();
        assert_eq!(replaced.positional[1], Value::List(vec![1.into(), 3.into()]));
    }

    #[test]
    fn test_arg_lookup() {
        let args = Args::<Value>::new().with(1).with_keyword("axis", 2);
        assert_eq!(args.arg(0, "x"), Some(&Value::Int(1)));
        assert_eq!(args.arg(1, "axis"), Some(&Value::Int(2)));
        assert_eq!(args.required(2, "repeats"), Err(ValueError::MissingArgument("repeats".into())));
    }
}

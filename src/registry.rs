//! Function definitions and the registry they are looked up in.

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, LazyLock};

use parking_lot::{Once, RwLock};
use rustc_hash::FxHashMap;

use crate::func::ArgRef;
use crate::invert::Inverter;
use crate::translate::{BackwardsTranslator, ForwardsTranslator};

/// Which arguments of a function carry data, as opposed to parameters.
///
/// Changes to a data argument affect only the corresponding parts of the
/// result. Changes to a parameter affect all of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSources {
    /// Every argument is a data argument.
    All,
    /// Only the listed arguments are data arguments.
    Only(Vec<ArgRef>),
}

/// Everything the graph knows about a function.
#[derive(Clone)]
pub struct FuncDefinition {
    pub data_sources: DataSources,
    /// Inverters, tried in order.
    pub inverters: Vec<Arc<dyn Inverter>>,
    /// Backward path translators, tried in order.
    pub backwards: Vec<Arc<dyn BackwardsTranslator>>,
    /// Forward path translators, tried in order.
    pub forwards: Vec<Arc<dyn ForwardsTranslator>>,
    /// Whether the function draws random numbers.
    pub is_random: bool,
    /// Whether the function reads external files.
    pub is_file_loading: bool,
    /// Whether the function produces a graphical side effect and must be
    /// re-evaluated whenever an upstream value changes.
    pub is_graphics: bool,
}

impl FuncDefinition {
    /// A definition with the given data arguments and no translators or
    /// inverters.
    pub fn new(data_sources: DataSources) -> Self {
        Self {
            data_sources,
            inverters: vec![],
            backwards: vec![],
            forwards: vec![],
            is_random: false,
            is_file_loading: false,
            is_graphics: false,
        }
    }

    /// A definition whose listed positional arguments are data arguments.
    pub fn positional(positions: impl IntoIterator<Item = usize>) -> Self {
        Self::new(DataSources::Only(positions.into_iter().map(ArgRef::Position).collect()))
    }

    /// The definition of unregistered functions: every argument is data,
    /// but nothing translates and nothing inverts.
    pub fn fallback() -> Self {
        Self::new(DataSources::All)
    }

    /// Adds an inverter.
    pub fn inverter(mut self, inverter: impl Inverter + 'static) -> Self {
        self.inverters.push(Arc::new(inverter));
        self
    }

    /// Adds a translator for both directions.
    pub fn translator<T>(mut self, translator: T) -> Self
    where
        T: BackwardsTranslator + ForwardsTranslator + 'static,
    {
        let translator = Arc::new(translator);
        self.backwards.push(translator.clone());
        self.forwards.push(translator);
        self
    }

    pub fn random(mut self) -> Self {
        self.is_random = true;
        self
    }

    pub fn file_loading(mut self) -> Self {
        self.is_file_loading = true;
        self
    }

    pub fn graphics(mut self) -> Self {
        self.is_graphics = true;
        self
    }

    /// Whether an argument is a data argument.
    pub fn is_data(&self, arg: &ArgRef) -> bool {
        match &self.data_sources {
            DataSources::All => true,
            DataSources::Only(args) => args.contains(arg),
        }
    }

    /// Whether the result must be cached as a whole rather than per part.
    pub fn is_holistic(&self) -> bool {
        self.is_random || self.is_file_loading || self.is_graphics
    }
}

impl Debug for FuncDefinition {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("FuncDefinition")
            .field("data_sources", &self.data_sources)
            .field("inverters", &self.inverters.len())
            .field("backwards", &self.backwards.len())
            .field("forwards", &self.forwards.len())
            .field("is_random", &self.is_random)
            .field("is_file_loading", &self.is_file_loading)
            .field("is_graphics", &self.is_graphics)
            .finish()
    }
}

/// The definition handed out for unknown function names.
static FALLBACK: LazyLock<Arc<FuncDefinition>> =
    LazyLock::new(|| Arc::new(FuncDefinition::fallback()));

/// The shared registry holding the standard functions.
static STANDARD: LazyLock<Arc<Registry>> = LazyLock::new(|| {
    let registry = Registry::empty();
    registry.bootstrap();
    Arc::new(registry)
});

/// Maps function names to their definitions.
pub struct Registry {
    definitions: RwLock<FxHashMap<Arc<str>, Arc<FuncDefinition>>>,
    bootstrapped: Once,
}

impl Registry {
    /// A registry without any definitions.
    pub fn empty() -> Self {
        Self { definitions: RwLock::new(FxHashMap::default()), bootstrapped: Once::new() }
    }

    /// The shared registry of standard functions.
    pub fn standard() -> Arc<Self> {
        STANDARD.clone()
    }

    /// Registers the standard functions. Only the first call has an effect.
    pub fn bootstrap(&self) {
        self.bootstrapped.call_once(|| crate::funcs::register(self));
    }

    /// Registers or replaces a definition.
    pub fn register(&self, name: impl Into<Arc<str>>, definition: FuncDefinition) {
        let name = name.into();
        tracing::trace!(%name, "registering function");
        self.definitions.write().insert(name, Arc::new(definition));
    }

    /// The definition of a function, or the fallback for unknown names.
    pub fn definition(&self, name: &str) -> Arc<FuncDefinition> {
        self.definitions.read().get(name).cloned().unwrap_or_else(|| FALLBACK.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let definitions = self.definitions.read();
        let mut names: Vec<_> = definitions.keys().collect();
        names.sort();
        f.debug_struct("Registry").field("functions", &names).finish()
    }
}

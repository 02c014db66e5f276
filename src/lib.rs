//! Reactive dependency graphs with partial caching and inverse assignment.
//!
//! A [`Graph`] holds nodes that compute their value by applying a function
//! to arguments, some of which reference other nodes. Values are computed
//! lazily and cached per element, so after a change only the affected parts
//! are recomputed. Assignments to computed values run backwards through the
//! functions and land as overrides on the nodes they originate from.
//!
//! ```
//! use quibs::{Graph, Value, args, array, path};
//!
//! let mut graph = Graph::default();
//! let a = graph.input(array![1, 2, 3]);
//! let b = graph.apply("add", args![a, 10]).unwrap();
//! assert_eq!(graph.value(b).unwrap(), Value::from(array![11, 12, 13]));
//!
//! // The assignment to `b` is inverted into an override of `a`.
//! graph.assign(b, path![0], 20).unwrap();
//! assert_eq!(graph.value(a).unwrap(), Value::from(array![10, 2, 3]));
//! ```

mod array;
mod assign;
mod assignment;
mod cache;
mod choice;
mod config;
mod error;
mod eval;
mod func;
mod graph;
mod hash;
mod overrider;
mod path;
mod registry;
mod template;
mod value;

pub mod funcs;
pub mod invert;
pub mod translate;

#[cfg(feature = "testing")]
mod testing;

pub use crate::array::{Array, Codes, Mask, NdArray, Region};
pub use crate::assign::{OverrideChange, OverrideEvent};
pub use crate::assignment::{Assigned, Assignment, Tolerance};
pub use crate::cache::CacheStatus;
pub use crate::choice::{ChoiceHandler, ChoiceRequest, OverrideChoice};
pub use crate::config::{CacheMode, Config};
pub use crate::error::{Error, Result};
pub use crate::func::{ArgRef, Argument, Args, Func, FuncCall, Location, Source};
pub use crate::graph::{Aggregate, Graph, Listener, NodeId};
pub use crate::overrider::Overrider;
pub use crate::path::{ContainerKind, Index, Path, PathComponent, Slice};
pub use crate::registry::{DataSources, FuncDefinition, Registry};
pub use crate::template::{AssignmentTemplate, TemplateError};
pub use crate::value::{Scalar, ScalarKind, Value, ValueError};

/// These are implementation details. Do not rely on them!
#[doc(hidden)]
pub mod internal {
    pub use crate::cache::Cache;
    pub use crate::hash::fingerprint;
    #[cfg(feature = "testing")]
    pub use crate::testing::{call_count, evaluated_paths, reset};
}

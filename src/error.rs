use crate::graph::NodeId;
use crate::path::Path;
use crate::template::TemplateError;
use crate::value::ValueError;

/// A specialized [`Result`](std::result::Result) for graph operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while evaluating, translating, or assigning.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No registered translator could map a path across a call.
    #[error("no translator could map the path across the call")]
    CannotTranslatePath,
    /// No registered inverter could map an assignment onto the sources.
    #[error("cannot invert assignment: {reason}")]
    CannotInvert { reason: String },
    /// Neither the node nor any upstream node accepts the override.
    /// `reason` tells why inversion stopped short, if it did.
    #[error("overriding {node} at {path} is not allowed{}", because(.reason))]
    OverridingNotAllowed { node: NodeId, path: Path, reason: Option<String> },
    /// A holistic cache was addressed below its root.
    #[error("a holistic cache cannot be addressed below its root")]
    PathCannotHaveComponents,
    /// A node's function failed.
    #[error("{func} failed while evaluating {node}: {source}")]
    CallFailed {
        node: NodeId,
        func: String,
        #[source]
        source: ValueError,
    },
    /// A node id that refers to no live node.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// An assignment could not be applied to a node's value.
    #[error("invalid assignment to {node}: {source}")]
    InvalidAssignment {
        node: NodeId,
        #[source]
        source: ValueError,
    },
    /// The choice handler declined to pick an override option.
    #[error("override choice was cancelled")]
    AssignmentCancelled,
    /// An override choice is needed but nobody can make it.
    #[error("assigning to {node} requires a choice but no choice handler is set")]
    ChoiceUnavailable { node: NodeId },
    /// No override is stored at the given position.
    #[error("{node} has no override at index {index}")]
    NoOverrideIndex { node: NodeId, index: usize },
    /// A function name that is not part of the standard library.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Value(#[from] ValueError),
}

fn because(reason: &Option<String>) -> String {
    reason.as_ref().map(|reason| format!(" ({reason})")).unwrap_or_default()
}

impl Error {
    /// Shorthand for an inversion failure.
    pub(crate) fn cannot_invert(reason: impl Into<String>) -> Self {
        Self::CannotInvert { reason: reason.into() }
    }
}

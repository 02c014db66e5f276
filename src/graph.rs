//! The node arena and its lifecycle.

use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use slab::Slab;

use crate::array::Mask;
use crate::assign::{Journal, OverrideEvent};
use crate::assignment::Assignment;
use crate::cache::{Cache, CacheStatus};
use crate::choice::{ChoiceHandler, OverrideChoice};
use crate::config::{CacheMode, Config};
use crate::error::{Error, Result};
use crate::func::{Argument, Args, Func};
use crate::overrider::Overrider;
use crate::registry::{FuncDefinition, Registry};
use crate::template::AssignmentTemplate;
use crate::value::Value;

/// Identifies a node within its graph.
///
/// Ids of removed nodes are never handed out again: a new node in the same
/// slot gets a fresh generation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self { index: index as u32, generation }
    }

    /// The slot of the node in the arena.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Receives notifications from a graph.
///
/// This is how a rendering layer learns what to redraw and how an external
/// undo log or persistence layer learns about overrides.
pub trait Listener {
    /// A node's value may have changed.
    fn redraw(&mut self, node: NodeId) {
        let _ = node;
    }

    /// An override was added to or removed from a node.
    fn overrides_changed(&mut self, event: &OverrideEvent) {
        let _ = event;
    }
}

/// A vertex of the graph: a function applied to arguments that may
/// reference other nodes.
pub(crate) struct Node {
    pub generation: u32,
    pub func: Func,
    /// Resolved once, when the node is created.
    pub definition: Arc<FuncDefinition>,
    pub args: Args<Argument>,
    /// The referenced nodes, without duplicates.
    pub parents: Vec<NodeId>,
    /// The nodes referencing this one. Derived from the parents' lists.
    pub children: Vec<NodeId>,
    pub cache: Option<Cache>,
    pub cache_mode: CacheMode,
    pub overrider: Overrider,
    pub allow_overriding: bool,
    /// The nodes allowed to receive inverse assignments made to this one.
    pub assigned_nodes: Option<Vec<NodeId>>,
    pub template: Option<AssignmentTemplate>,
    /// Override choices made for assignments to this node, by context.
    pub choices: FxHashMap<u128, OverrideChoice>,
    pub name: Option<String>,
    /// External handles keeping the node alive.
    pub handles: usize,
}

impl Node {
    /// Whether the whole value must be cached and recomputed as one piece.
    pub fn is_holistic(&self) -> bool {
        self.definition.is_holistic()
    }
}

/// Redraws collected while a batch is open.
#[derive(Default)]
pub(crate) struct Batch {
    pub depth: usize,
    pub redraws: Vec<NodeId>,
    pub scheduled: FxHashSet<NodeId>,
}

/// A graph of lazily evaluated, cached, invertible computations.
pub struct Graph {
    pub(crate) nodes: Slab<Node>,
    generation: u32,
    pub(crate) registry: Arc<Registry>,
    pub(crate) config: Config,
    pub(crate) listeners: Vec<Box<dyn Listener>>,
    pub(crate) choice_handler: Option<Box<dyn ChoiceHandler>>,
    pub(crate) batch: Batch,
    pub(crate) journal: Journal,
}

impl Graph {
    /// An empty graph looking functions up in `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, Config::default())
    }

    pub fn with_config(registry: Arc<Registry>, config: Config) -> Self {
        Self {
            nodes: Slab::new(),
            generation: 0,
            registry,
            config,
            listeners: vec![],
            choice_handler: None,
            batch: Batch::default(),
            journal: Journal::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Creates a node holding a literal value.
    pub fn input(&mut self, value: impl Into<Value>) -> NodeId {
        let func = crate::funcs::input();
        let args = Args::new().with(Argument::Value(value.into()));
        let allow = self.config.inputs_allow_overriding;
        self.insert(func, args, vec![], allow)
    }

    /// Creates a node applying `func` to `args`.
    ///
    /// The function's definition is looked up in the registry by name.
    /// Fails when an argument references a node that does not exist.
    pub fn call(&mut self, func: Func, args: Args<Argument>) -> Result<NodeId> {
        let mut parents = vec![];
        for (_, argument) in args.iter() {
            for (parent, _) in argument.nodes() {
                self.node(parent)?;
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
        let allow = self.config.functions_allow_overriding;
        Ok(self.insert(func, args, parents, allow))
    }

    /// Creates a node applying a standard function by name.
    pub fn apply(&mut self, name: &str, args: Args<Argument>) -> Result<NodeId> {
        let func = crate::funcs::lookup(name).ok_or_else(|| Error::UnknownFunction(name.into()))?;
        self.call(func, args)
    }

    fn insert(
        &mut self,
        func: Func,
        args: Args<Argument>,
        parents: Vec<NodeId>,
        allow: bool,
    ) -> NodeId {
        let definition = self.registry.definition(func.name());
        let cache_mode =
            if definition.is_holistic() { CacheMode::On } else { self.config.cache_mode };
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let index = self.nodes.insert(Node {
            generation,
            func,
            definition,
            args,
            parents: parents.clone(),
            children: vec![],
            cache: None,
            cache_mode,
            overrider: Overrider::new(),
            allow_overriding: allow,
            assigned_nodes: None,
            template: None,
            choices: FxHashMap::default(),
            name: None,
            handles: 1,
        });
        let id = NodeId::new(index, generation);
        for parent in parents {
            if let Some(node) = self.get_mut(parent) {
                node.children.push(id);
            }
        }
        tracing::trace!(node = %id, func = self.nodes[index].func.name(), "created node");
        id
    }

    /// Adds an external handle to a node.
    pub fn retain(&mut self, id: NodeId) -> Result<()> {
        self.node_mut(id)?.handles += 1;
        Ok(())
    }

    /// Drops an external handle.
    ///
    /// A node without handles and without children is removed, and so are
    /// ancestors that only it kept alive. Removal does not invalidate
    /// anything.
    pub fn release(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        node.handles = node.handles.saturating_sub(1);
        self.collect(id);
        Ok(())
    }

    fn collect(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(node) = self.get(id) else { continue };
            if node.handles > 0 || !node.children.is_empty() {
                continue;
            }
            let node = self.nodes.remove(id.index());
            tracing::trace!(node = %id, "removed node");
            for parent in node.parents {
                if let Some(p) = self.get_mut(parent) {
                    p.children.retain(|&child| child != id);
                }
                pending.push(parent);
            }
        }
    }

    /// Whether a node is alive.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// The number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).filter(|node| node.generation == id.generation)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).filter(|node| node.generation == id.generation)
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(Error::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id).ok_or(Error::UnknownNode(id))
    }

    pub fn parents(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(id)?.parents)
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(&self.node(id)?.children)
    }

    pub fn func(&self, id: NodeId) -> Result<&Func> {
        Ok(&self.node(id)?.func)
    }

    pub fn definition(&self, id: NodeId) -> Result<&Arc<FuncDefinition>> {
        Ok(&self.node(id)?.definition)
    }

    pub fn name(&self, id: NodeId) -> Result<Option<&str>> {
        Ok(self.node(id)?.name.as_deref())
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<()> {
        self.node_mut(id)?.name = Some(name.into());
        Ok(())
    }

    pub fn allow_overriding(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.allow_overriding)
    }

    pub fn set_allow_overriding(&mut self, id: NodeId, allow: bool) -> Result<()> {
        self.node_mut(id)?.allow_overriding = allow;
        Ok(())
    }

    /// Restricts which ancestors receive inverse assignments made to a node.
    /// `None` lifts the restriction.
    pub fn set_assigned_nodes(&mut self, id: NodeId, nodes: Option<Vec<NodeId>>) -> Result<()> {
        let node = self.node_mut(id)?;
        node.assigned_nodes = nodes;
        node.choices.clear();
        Ok(())
    }

    pub fn set_assignment_template(
        &mut self,
        id: NodeId,
        template: Option<AssignmentTemplate>,
    ) -> Result<()> {
        self.node_mut(id)?.template = template;
        Ok(())
    }

    /// Sets whether a node keeps its computed value. Random, file loading
    /// and graphics nodes always do.
    pub fn set_cache_mode(&mut self, id: NodeId, mode: CacheMode) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.is_holistic() {
            return Ok(());
        }
        node.cache_mode = mode;
        if mode == CacheMode::Off {
            node.cache = None;
        }
        Ok(())
    }

    pub fn cache_mode(&self, id: NodeId) -> Result<CacheMode> {
        Ok(self.node(id)?.cache_mode)
    }

    /// How much of a node's cached value is valid. Nodes that have never
    /// been evaluated are all invalid.
    pub fn cache_status(&self, id: NodeId) -> Result<CacheStatus> {
        let node = self.node(id)?;
        Ok(node.cache.as_ref().map_or(CacheStatus::AllInvalid, Cache::status))
    }

    pub fn is_overridden(&self, id: NodeId) -> Result<bool> {
        Ok(!self.node(id)?.overrider.is_empty())
    }

    /// The overrides of a node, in the order they are applied.
    pub fn overrides(&self, id: NodeId) -> Result<&[Assignment]> {
        Ok(self.node(id)?.overrider.iter().as_slice())
    }

    /// Which elements of a node's array value are overridden.
    pub fn override_mask(&mut self, id: NodeId) -> Result<Mask> {
        let shape = self.value_valid_at(id, None)?.shape()?;
        Ok(self.node(id)?.overrider.override_mask(&shape))
    }

    /// Registers a listener for redraws and override changes.
    pub fn add_listener(&mut self, listener: Box<dyn Listener>) {
        self.listeners.push(listener);
    }

    /// Installs the handler asked to pick among several override options.
    pub fn set_choice_handler(&mut self, handler: Box<dyn ChoiceHandler>) {
        self.choice_handler = Some(handler);
    }

    /// Opens a batch that collects redraw notifications and undo entries
    /// until the returned guard and every enclosing one are dropped.
    pub fn aggregate(&mut self) -> Aggregate<'_> {
        self.batch.depth += 1;
        Aggregate { graph: self }
    }

    /// Runs `f` inside a batch.
    pub(crate) fn batched<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.batch.depth += 1;
        let output = f(self);
        self.end_batch();
        output
    }

    fn end_batch(&mut self) {
        self.batch.depth = self.batch.depth.saturating_sub(1);
        if self.batch.depth == 0 {
            self.flush();
        }
    }

    pub(crate) fn schedule_redraw(&mut self, id: NodeId) {
        if self.batch.scheduled.insert(id) {
            self.batch.redraws.push(id);
        }
    }

    /// Commits the pending undo group, re-evaluates invalidated graphics
    /// nodes and notifies listeners once per node.
    fn flush(&mut self) {
        self.journal.commit();
        let redraws = std::mem::take(&mut self.batch.redraws);
        self.batch.scheduled.clear();
        if redraws.is_empty() {
            return;
        }
        for &id in &redraws {
            let graphics = self.get(id).is_some_and(|node| node.definition.is_graphics);
            if graphics && let Err(err) = self.value(id) {
                tracing::warn!(node = %id, %err, "failed to re-evaluate graphics node");
            }
        }
        let alive: Vec<NodeId> = redraws.into_iter().filter(|&id| self.contains(id)).collect();
        for id in alive {
            for listener in &mut self.listeners {
                listener.redraw(id);
            }
        }
    }

    pub(crate) fn notify(&mut self, event: &OverrideEvent) {
        for listener in &mut self.listeners {
            listener.overrides_changed(event);
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(Registry::standard())
    }
}

impl Debug for Graph {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// A batch of changes whose redraw notifications are delivered together
/// once the guard drops.
pub struct Aggregate<'g> {
    graph: &'g mut Graph,
}

impl Deref for Aggregate<'_> {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        self.graph
    }
}

impl DerefMut for Aggregate<'_> {
    fn deref_mut(&mut self) -> &mut Graph {
        self.graph
    }
}

impl Drop for Aggregate<'_> {
    fn drop(&mut self) {
        self.graph.end_batch();
    }
}

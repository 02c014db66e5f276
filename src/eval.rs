//! Demand-driven evaluation and change propagation.
//!
//! A request for a node's value at a path computes only the invalid parts of
//! the node's cache within that path. Each such part is translated backwards
//! into the parts of the data sources it needs, which are requested in turn.
//! Changes travel the other way: a changed path in a node is translated
//! forwards into every child and invalidates only the affected parts there.

use crate::array::Region;
use crate::cache::{Cache, CacheStatus};
use crate::config::CacheMode;
use crate::error::{Error, Result};
use crate::func::FuncCall;
use crate::graph::{Graph, NodeId};
use crate::path::Path;
use crate::translate::{backwards_or_full, forwards_or_full, mask_path};
use crate::value::Value;

impl Graph {
    /// The value of a node, with its overrides applied.
    pub fn value(&mut self, id: NodeId) -> Result<Value> {
        self.value_valid_at(id, Some(&Path::root()))
    }

    /// The part of a node's value at a path.
    pub fn value_at(&mut self, id: NodeId, path: &Path) -> Result<Value> {
        Ok(self.value_valid_at(id, Some(path))?.get(path)?)
    }

    /// A node's whole value, guaranteed to be up to date at `path`.
    ///
    /// Parts outside of `path` may be stale. With `None`, only the type and
    /// shape of the value are guaranteed.
    pub fn value_valid_at(&mut self, id: NodeId, path: Option<&Path>) -> Result<Value> {
        let computed = match path {
            None => self.computed_valid_at(id, None)?,
            Some(path) => {
                let paths = self.not_overridden(id, path)?;
                if paths.is_empty() {
                    self.computed_valid_at(id, None)?
                } else {
                    let mut value = Value::None;
                    for path in &paths {
                        value = self.computed_valid_at(id, Some(path))?;
                    }
                    value
                }
            }
        };
        Ok(self.node(id)?.overrider.apply(&computed))
    }

    /// The parts of `path` that overrides do not fully determine.
    fn not_overridden(&self, id: NodeId, path: &Path) -> Result<Vec<Path>> {
        let node = self.node(id)?;
        let Some(cache) = &node.cache else {
            return Ok(vec![path.clone()]);
        };
        if node.overrider.is_empty() {
            return Ok(vec![path.clone()]);
        }
        let value = cache.value();
        if let Value::Array(array) = &value
            && let Ok(region) = Region::of_path(array.shape(), path)
        {
            let overridden = node.overrider.override_mask(array.shape());
            let wanted = region.to_mask(array.shape()).and(&overridden.not());
            return Ok(if !wanted.any() {
                vec![]
            } else if wanted.count() == region.flat.len() {
                vec![path.clone()]
            } else {
                vec![mask_path(wanted)]
            });
        }
        Ok(if node.overrider.covers(&value, path) { vec![] } else { vec![path.clone()] })
    }

    /// The computed value of a node, without overrides, valid at `path`.
    fn computed_valid_at(&mut self, id: NodeId, path: Option<&Path>) -> Result<Value> {
        let node = self.node(id)?;
        let uncached = match (&node.cache, path) {
            (None, _) => vec![Path::root()],
            (Some(cache), None) if cache.status() == CacheStatus::AllInvalid => vec![Path::root()],
            (Some(_), None) => vec![],
            (Some(cache), Some(path)) => cache.uncached(path),
        };

        let mut fallback = None;
        for path in &uncached {
            let result = self.run_on_path(id, path)?;
            if let Err(err) = self.store(id, path, &result) {
                tracing::trace!(node = %id, %path, %err, "result not cached");
                fallback = Some(result);
            }
        }

        let node = self.node_mut(id)?;
        let value = match (fallback, &node.cache) {
            (Some(result), _) => result,
            (None, Some(cache)) => cache.value(),
            (None, None) => Value::None,
        };
        if node.cache_mode == CacheMode::Off && !node.is_holistic() {
            node.cache = None;
        }
        Ok(value)
    }

    /// Writes a result computed to be valid at `path` into the cache,
    /// recreating the cache when the result no longer fits it.
    fn store(&mut self, id: NodeId, path: &Path, result: &Value) -> Result<()> {
        let node = self.node_mut(id)?;
        let holistic = node.is_holistic();
        let cache = node.cache.get_or_insert_with(|| Cache::create(result, holistic));
        if !cache.matches(result) {
            tracing::trace!(node = %id, "recreating cache");
            *cache = Cache::create(result, holistic);
        }
        cache.set_valid(path, result)
    }

    /// Runs a node's function so that the result is valid at `path`.
    fn run_on_path(&mut self, id: NodeId, path: &Path) -> Result<Value> {
        let node = self.node(id)?;
        let func = node.func.clone();
        let definition = node.definition.clone();
        let args = node.args.clone();
        tracing::trace!(node = %id, %path, func = func.name(), "evaluating");

        // Which parts of which data sources the path needs.
        let needed = if path.is_root() {
            None
        } else {
            let shaped = FuncCall::new(
                func.clone(),
                &args,
                |arg| definition.is_data(arg),
                |source, _, _| self.value_valid_at(source, None),
            )?;
            Some(backwards_or_full(&definition, &shaped, path))
        };

        let mut position = 0;
        let call = FuncCall::new(
            func,
            &args,
            |arg| definition.is_data(arg),
            |source, _, is_data| {
                let index = position;
                position += 1;
                let Some(needed) = needed.as_ref().filter(|_| is_data) else {
                    return self.value_valid_at(source, Some(&Path::root()));
                };
                let mut value = None;
                for (_, path) in needed.iter().filter(|(i, _)| *i == index) {
                    value = Some(self.value_valid_at(source, Some(path))?);
                }
                match value {
                    Some(value) => Ok(value),
                    None => self.value_valid_at(source, None),
                }
            },
        )?;

        #[cfg(feature = "testing")]
        crate::testing::register_call(id, path);

        call.call(&call.args).map_err(|source| Error::CallFailed {
            node: id,
            func: call.func.name().into(),
            source,
        })
    }

    /// Invalidates a node at a path and everything downstream of it.
    pub fn invalidate(&mut self, id: NodeId, path: &Path) -> Result<()> {
        self.node(id)?;
        self.batched(|graph| {
            if graph.invalidate_node(id, path) {
                graph.invalidate_children(id, path);
            }
        });
        Ok(())
    }

    /// Invalidates every node whose function draws random numbers, so that
    /// they are drawn anew.
    pub fn reset_random(&mut self) {
        self.reset_where(|node| node.definition.is_random);
    }

    /// Invalidates every node whose function reads external files.
    pub fn reset_file_loading(&mut self) {
        self.reset_where(|node| node.definition.is_file_loading);
    }

    fn reset_where(&mut self, filter: impl Fn(&crate::graph::Node) -> bool) {
        let ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| filter(node))
            .map(|(index, node)| NodeId::new(index, node.generation))
            .collect();
        self.batched(|graph| {
            for id in ids {
                graph.invalidate_node(id, &Path::root());
                graph.invalidate_children(id, &Path::root());
            }
        });
    }

    /// Propagates a change of `id` at `path` to its children.
    pub(crate) fn invalidate_children(&mut self, id: NodeId, path: &Path) {
        let Some(node) = self.get(id) else { return };
        for child in node.children.clone() {
            for child_path in self.invalidation_paths(child, id, path) {
                if self.invalidate_node(child, &child_path) {
                    self.invalidate_children(child, &child_path);
                }
            }
        }
    }

    /// Marks a node invalid at a path and schedules its redraw. Returns
    /// whether the change shows through the node's overrides.
    fn invalidate_node(&mut self, id: NodeId, path: &Path) -> bool {
        let Some(node) = self.get_mut(id) else { return false };
        tracing::trace!(node = %id, %path, "invalidating");
        let mut covered = false;
        if let Some(cache) = &mut node.cache {
            cache.set_invalid(path);
            covered = !path.is_root() && node.overrider.covers(&cache.value(), path);
        }
        self.schedule_redraw(id);
        !covered
    }

    /// The paths of `child` affected by a change of `parent` at `path`.
    fn invalidation_paths(&self, child: NodeId, parent: NodeId, path: &Path) -> Vec<Path> {
        let Some(node) = self.get(child) else { return vec![] };
        if node.cache.is_none() {
            return vec![Path::root()];
        }

        let definition = &node.definition;
        let call = FuncCall::new(
            node.func.clone(),
            &node.args,
            |arg| definition.is_data(arg),
            |source, _, _| self.peek(source),
        );
        let Ok(call) = call else {
            return vec![Path::root()];
        };

        let mut paths = vec![];
        for (i, source) in call.sources.iter().enumerate() {
            if source.node != parent {
                continue;
            }
            if !source.is_data {
                return vec![Path::root()];
            }
            paths.extend(forwards_or_full(definition, &call, i, path));
        }
        if node.is_holistic() && !paths.is_empty() {
            return vec![Path::root()];
        }
        paths
    }

    /// The last known value of a node, without evaluating anything.
    fn peek(&self, id: NodeId) -> Result<Value> {
        let node = self.node(id)?;
        let cache = node.cache.as_ref().ok_or(Error::CannotTranslatePath)?;
        Ok(node.overrider.apply(&cache.value()))
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::CacheStatus;
    use crate::graph::Graph;
    use crate::path::Path;
    use crate::value::Value;
    use crate::{args, array, path};

    #[test]
    fn test_lazy_evaluation() {
        let mut graph = Graph::default();
        let a = graph.input(array![1, 2, 3]);
        let b = graph.apply("add", args![a, 10]).unwrap();
        assert_eq!(graph.cache_status(b).unwrap(), CacheStatus::AllInvalid);
        assert_eq!(graph.value(b).unwrap(), Value::from(array![11, 12, 13]));
        assert_eq!(graph.cache_status(b).unwrap(), CacheStatus::AllValid);
        assert_eq!(graph.value_at(b, &path![1]).unwrap(), Value::Int(12));
    }

    #[test]
    fn test_partial_invalidation() {
        let mut graph = Graph::default();
        let a = graph.input(array![1, 2, 3]);
        let b = graph.apply("negative", args![a]).unwrap();
        let c = graph.apply("sum", args![b]).unwrap();
        graph.value(c).unwrap();

        graph.invalidate(a, &path![1]).unwrap();
        assert_eq!(graph.cache_status(b).unwrap(), CacheStatus::Partial);
        assert_eq!(graph.cache_status(c).unwrap(), CacheStatus::AllInvalid);
        assert_eq!(graph.value(c).unwrap(), Value::Int(-6));
    }

    #[test]
    fn test_parameters_invalidate_everything() {
        let mut graph = Graph::default();
        let a = graph.input(array![[1, 2], [3, 4]]);
        let axis = graph.input(0);
        let s = graph.apply("sum", args![a, axis]).unwrap();
        assert_eq!(graph.value(s).unwrap(), Value::from(array![4, 6]));
        graph.invalidate(axis, &Path::root()).unwrap();
        assert_eq!(graph.cache_status(s).unwrap(), CacheStatus::AllInvalid);
    }

    #[test]
    fn test_call_failure_names_the_node() {
        let mut graph = Graph::default();
        let a = graph.input("text");
        let b = graph.apply("sqrt", args![a]).unwrap();
        match graph.value(b) {
            Err(crate::Error::CallFailed { node, func, .. }) => {
                assert_eq!(node, b);
                assert_eq!(func, "sqrt");
            }
            other => panic!("expected a call failure, got {other:?}"),
        }
    }
}

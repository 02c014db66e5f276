//! Choosing where an assignment lands.
//!
//! An assignment to a node that does not accept overrides is inverted up
//! the graph until it reaches nodes that do. Every overridable node passed
//! on the way is an option. When an inversion splits into several
//! assignments, each branch is resolved on its own and all of them must
//! succeed for splitting to be an option.

use crate::assign::Change;
use crate::assignment::{Assigned, Assignment, Tolerance};
use crate::error::{Error, Result};
use crate::func::FuncCall;
use crate::graph::{Graph, NodeId};
use crate::hash::fingerprint;
use crate::invert::{Inversal, Inversion, invert};
use crate::path::Path;

/// What to do with an assignment that has several possible targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OverrideChoice {
    /// Override the option at this position.
    Override(usize),
    /// Continue into all branches of the split.
    Diverge,
}

/// A question to the choice handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRequest {
    /// The node that was assigned to.
    pub target: NodeId,
    /// The nodes that could be overridden, nearest first.
    pub options: Vec<NodeId>,
    /// Whether the assignment can be split among several ancestors instead.
    pub can_diverge: bool,
}

/// Picks among override options, for example by asking the user.
///
/// Returning `None` cancels the assignment.
pub trait ChoiceHandler {
    fn choose(&mut self, request: &ChoiceRequest) -> Option<OverrideChoice>;
}

impl<F> ChoiceHandler for F
where
    F: FnMut(&ChoiceRequest) -> Option<OverrideChoice>,
{
    fn choose(&mut self, request: &ChoiceRequest) -> Option<OverrideChoice> {
        self(request)
    }
}

/// An overridable node reached by inversion, with the overrides that must
/// be lifted on the way there for the new one to show.
#[derive(Debug)]
struct OverrideOption {
    change: Change,
    removals: Vec<Change>,
}

/// The override options for one assignment. Subtrees are the branches of
/// the split the chain of inversions ends in, if it does. `blocked` holds
/// why the chain ended in an assignment that could not be inverted.
#[derive(Debug)]
struct OptionsTree {
    target: NodeId,
    options: Vec<OverrideOption>,
    branches: Vec<OptionsTree>,
    removals: Vec<Change>,
    blocked: Option<String>,
}

impl OptionsTree {
    fn can_diverge(&self) -> bool {
        !self.branches.is_empty()
    }

    fn is_viable(&self) -> bool {
        !self.options.is_empty() || self.can_diverge()
    }
}

/// A choice made while resolving, keyed like the node's remembered choices.
pub(crate) type MadeChoice = (NodeId, u128, OverrideChoice);

/// The overrides realizing an assignment and the choices made for them.
/// The choices are remembered only once the overrides are in place.
#[derive(Debug)]
pub(crate) struct Resolution {
    pub group: Vec<Change>,
    pub choices: Vec<MadeChoice>,
}

impl Graph {
    /// The overrides that realize an assignment, choosing among options
    /// where necessary.
    pub(crate) fn resolve(&mut self, change: Change) -> Result<Resolution> {
        let node = change.node;
        let path = change.assignment.path.clone();
        let tree = self.options_tree(change, None)?;
        if !tree.is_viable() {
            return Err(Error::OverridingNotAllowed { node, path, reason: tree.blocked });
        }
        let mut choices = vec![];
        let group = self.choose(&tree, &mut choices)?;
        Ok(Resolution { group, choices })
    }

    /// Stores choices so that later assignments in the same context reuse
    /// them without asking.
    pub(crate) fn remember_choices(&mut self, choices: Vec<MadeChoice>) {
        for (target, context, choice) in choices {
            if let Some(node) = self.get_mut(target) {
                node.choices.insert(context, choice);
            }
        }
    }

    fn options_tree(
        &mut self,
        change: Change,
        targets: Option<Vec<NodeId>>,
    ) -> Result<OptionsTree> {
        let target = change.node;
        let mut targets = targets;
        let mut options = vec![];
        let mut removals = vec![];
        let mut blocked = None;
        let mut inversions = vec![change];

        while inversions.len() == 1 {
            let Some(inversion) = inversions.pop() else { break };
            let node = self.node(inversion.node)?;
            if targets.is_none() {
                targets = node.assigned_nodes.clone();
            }
            let allowed = targets.as_ref().is_none_or(|targets| targets.contains(&inversion.node));
            if node.allow_overriding && allowed {
                let change = inversion.clone();
                options.push(OverrideOption { change, removals: removals.clone() });
            }
            removals.push(Change {
                node: inversion.node,
                assignment: Assignment::default_at(inversion.assignment.path.clone()),
            });
            inversions = match self.inversions(&inversion) {
                Err(Error::CannotInvert { reason }) => {
                    tracing::debug!(node = %inversion.node, %reason, "assignment does not invert");
                    blocked = Some(reason);
                    vec![]
                }
                result => result?,
            };
        }

        let mut branches = vec![];
        for inversion in inversions {
            let branch = self.options_tree(inversion, targets.clone())?;
            if !branch.is_viable() {
                tracing::debug!(node = %target, "split has a branch without options");
                blocked = branch.blocked;
                branches.clear();
                break;
            }
            branches.push(branch);
        }

        Ok(OptionsTree { target, options, branches, removals, blocked })
    }

    /// Inverts a change one step up the graph. Functions without inverters
    /// have no inversions. Fails with [`Error::CannotInvert`] when the
    /// function's inverters reject the assignment.
    pub(crate) fn inversions(&mut self, change: &Change) -> Result<Vec<Change>> {
        let Assigned::Value(value) = &change.assignment.value else {
            return Ok(vec![]);
        };
        let node = self.node(change.node)?;
        let definition = node.definition.clone();
        if definition.inverters.is_empty() {
            return Ok(vec![]);
        }
        let func = node.func.clone();
        let args = node.args.clone();

        let call = FuncCall::new(
            func,
            &args,
            |arg| definition.is_data(arg),
            |source, _, _| self.value_valid_at(source, Some(&Path::root())),
        )?;
        let previous = self.value_valid_at(change.node, Some(&Path::root()))?;
        let inversion = Inversion {
            call: &call,
            path: &change.assignment.path,
            value,
            previous: &previous,
            input_aware: self.config.input_aware_inversion,
        };

        let (index, inversals) = match invert(&definition, &inversion) {
            Ok(inverted) => inverted,
            Err(err @ Error::CannotInvert { .. }) => return Err(err),
            Err(err) => return Err(Error::cannot_invert(err.to_string())),
        };

        // Bounds go through the inverter that handled the value.
        let bounds = change.assignment.tolerance.as_ref().and_then(|tolerance| {
            let inverter = &definition.inverters[index];
            let lower = inverter.invert(&inversion.with_value(&tolerance.lower)).ok()?;
            let upper = inverter.invert(&inversion.with_value(&tolerance.upper)).ok()?;
            let matching = lower.len() == inversals.len() && upper.len() == inversals.len();
            matching.then_some((lower, upper))
        });

        let changes = inversals
            .into_iter()
            .enumerate()
            .map(|(i, Inversal { source, path, value })| {
                let tolerance = bounds.as_ref().map(|(lower, upper)| Tolerance {
                    lower: lower[i].value.clone(),
                    upper: upper[i].value.clone(),
                });
                let assignment = Assignment { path, value: Assigned::Value(value), tolerance };
                Change { node: call.sources[source].node, assignment }
            })
            .collect::<Vec<_>>();
        tracing::debug!(node = %change.node, inversions = changes.len(), "inverted assignment");
        Ok(changes)
    }

    fn choose(&mut self, tree: &OptionsTree, made: &mut Vec<MadeChoice>) -> Result<Vec<Change>> {
        if !tree.options.is_empty()
            && let OverrideChoice::Override(i) = self.override_choice(tree, made)?
        {
            let option = &tree.options[i];
            let mut group = vec![option.change.clone()];
            group.extend(option.removals.iter().cloned());
            return Ok(group);
        }

        let mut group = vec![];
        for branch in &tree.branches {
            group.extend(self.choose(branch, made)?);
        }
        group.extend(tree.removals.iter().cloned());
        Ok(group)
    }

    /// Picks an option automatically when there is only one, from earlier
    /// choices for the same context, or through the choice handler.
    fn override_choice(
        &mut self,
        tree: &OptionsTree,
        made: &mut Vec<MadeChoice>,
    ) -> Result<OverrideChoice> {
        let can_diverge = tree.can_diverge();
        if tree.options.len() == 1 && !can_diverge {
            return Ok(OverrideChoice::Override(0));
        }

        let request = ChoiceRequest {
            target: tree.target,
            options: tree.options.iter().map(|option| option.change.node).collect(),
            can_diverge,
        };
        let context = fingerprint(&(&request.options, can_diverge));
        let pending = made
            .iter()
            .find(|(target, key, _)| *target == tree.target && *key == context)
            .map(|&(_, _, choice)| choice);
        if let Some(choice) = pending.or(self.node(tree.target)?.choices.get(&context).copied()) {
            return Ok(choice);
        }

        let handler = self
            .choice_handler
            .as_mut()
            .ok_or(Error::ChoiceUnavailable { node: tree.target })?;
        let choice = handler.choose(&request).ok_or(Error::AssignmentCancelled)?;
        let valid = match choice {
            OverrideChoice::Override(i) => i < request.options.len(),
            OverrideChoice::Diverge => can_diverge,
        };
        if !valid {
            return Err(Error::AssignmentCancelled);
        }
        tracing::debug!(node = %tree.target, ?choice, "override choice made");
        made.push((tree.target, context, choice));
        Ok(choice)
    }
}

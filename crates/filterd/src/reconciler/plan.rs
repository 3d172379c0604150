//! Name-level diff between the active set and a validated candidate.

use crate::registry::BindingSet;

/// Whether a plan should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanDecision {
    /// Every entry validated; the plan will be committed.
    Commit,
    /// At least one entry failed; nothing will change.
    Reject,
}

/// Partition of binding names produced by comparing two sets.
///
/// Every name of the union of both sets lands in exactly one of `to_add`,
/// `to_remove`, `to_replace` or `unchanged`. Each list is in lexical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    to_add: Vec<String>,
    to_remove: Vec<String>,
    to_replace: Vec<String>,
    unchanged: Vec<String>,
    decision: PlanDecision,
}

impl ReconciliationPlan {
    /// Computes the plan that turns `current` into `target`.
    ///
    /// A name present in both sets is `unchanged` only when its binding is
    /// identical, including the captured configuration document.
    pub fn diff(current: &BindingSet, target: &BindingSet) -> Self {
        let mut plan = Self::empty(PlanDecision::Commit);
        for binding in target.iter() {
            match current.get(binding.name()) {
                None => plan.to_add.push(binding.name().to_owned()),
                Some(active) if active == binding => {
                    plan.unchanged.push(binding.name().to_owned());
                }
                Some(_) => plan.to_replace.push(binding.name().to_owned()),
            }
        }
        plan.to_remove = current
            .iter()
            .filter(|binding| !target.contains(binding.name()))
            .map(|binding| binding.name().to_owned())
            .collect();
        plan
    }

    /// A plan recording that the candidate was refused.
    pub fn rejected() -> Self {
        Self::empty(PlanDecision::Reject)
    }

    const fn empty(decision: PlanDecision) -> Self {
        Self {
            to_add: Vec::new(),
            to_remove: Vec::new(),
            to_replace: Vec::new(),
            unchanged: Vec::new(),
            decision,
        }
    }

    /// Names bound only in the target.
    pub fn to_add(&self) -> &[String] {
        &self.to_add
    }

    /// Names bound only in the current set.
    pub fn to_remove(&self) -> &[String] {
        &self.to_remove
    }

    /// Names bound in both sets with differing definitions.
    pub fn to_replace(&self) -> &[String] {
        &self.to_replace
    }

    /// Names bound identically in both sets.
    pub fn unchanged(&self) -> &[String] {
        &self.unchanged
    }

    /// Commit or reject.
    pub const fn decision(&self) -> PlanDecision {
        self.decision
    }

    /// True when committing the plan would touch no downstream filter.
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.to_replace.is_empty()
    }
}

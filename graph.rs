//! Call-graph construction (§4.1) and attribute classification (§4.2).
//!
//! Nodes and edges live in `BTreeMap`/`BTreeSet` adjacency, the same
//! convention the host's own CFG type uses for successor/predecessor sets,
//! rather than a pointer-linked node graph — it keeps iteration order
//! deterministic, which matters for a planner whose decisions are meant to
//! be reproducible across runs of the same module.

use crate::collab::{AttributeOracle, CallSiteEnumerator, FunctionId, SizeProbe};
use crate::scaled::ScaledNumber;
use std::collections::BTreeMap as Map;

/// The six terminal-or-pending dispositions a function can carry (§1, §4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    BestEffortInline,
    ForceInline,
    Trimmed,
    StackCall,
    KernelEntry,
    AddressTaken,
}

impl Attribute {
    pub fn is_inlinable(self) -> bool {
        matches!(self, Attribute::BestEffortInline | Attribute::ForceInline)
    }

    pub fn is_unit_root(self) -> bool {
        matches!(self, Attribute::StackCall | Attribute::KernelEntry | Attribute::AddressTaken)
    }

    /// §4.2's transition table. `ForceInline -> ForceInline` is the one
    /// legal no-op, covering the implicit-arg analyser re-asserting an
    /// already-forced function; every other identity transition is a no-op
    /// the driver should simply avoid calling, not one the table permits.
    fn can_transition_to(self, to: Attribute) -> bool {
        use Attribute::*;
        if self == to {
            return matches!(self, ForceInline);
        }
        matches!(
            (self, to),
            (BestEffortInline, ForceInline)
                | (BestEffortInline, Trimmed)
                | (BestEffortInline, StackCall)
                | (Trimmed, StackCall)
                | (StackCall, ForceInline)
        )
    }
}

#[derive(Clone, Debug)]
pub struct FunctionNode {
    pub function_ref: FunctionId,
    pub initial_size: u32,
    pub unit_size: u32,
    pub expanded_size: u32,
    pub tmp_size: u32,
    pub attribute: Attribute,
    pub static_freq: ScaledNumber,
    pub has_implicit_arg: bool,
    pub in_multiple_unit: bool,
    pub callees: Map<FunctionId, u32>,
    pub callers: Map<FunctionId, u32>,
}

impl FunctionNode {
    pub(crate) fn new(function_ref: FunctionId, initial_size: u32, attribute: Attribute) -> Self {
        FunctionNode {
            function_ref,
            initial_size,
            unit_size: initial_size,
            expanded_size: initial_size,
            tmp_size: initial_size,
            attribute,
            static_freq: ScaledNumber::ZERO,
            has_implicit_arg: false,
            in_multiple_unit: false,
            callees: Map::new(),
            callers: Map::new(),
        }
    }

    /// The only place attribute mutation happens outside construction.
    /// Asserting the transition here, rather than trusting callers, keeps
    /// §4.2's table a single source of truth instead of something every call
    /// site has to re-derive.
    pub fn set_attribute(&mut self, to: Attribute) {
        assert!(
            self.attribute.can_transition_to(to),
            "illegal attribute transition on {}: {:?} -> {:?}",
            self.function_ref,
            self.attribute,
            to
        );
        log::trace!("{}: {:?} -> {:?}", self.function_ref, self.attribute, to);
        self.attribute = to;
    }
}

fn classify(function: FunctionId, attrs: &dyn AttributeOracle) -> Attribute {
    if attrs.is_entry(function) {
        Attribute::KernelEntry
    } else if attrs.has_force_stackcall(function) {
        Attribute::StackCall
    } else if attrs.has_no_inline(function) {
        Attribute::Trimmed
    } else if attrs.has_always_inline(function) {
        Attribute::ForceInline
    } else {
        Attribute::BestEffortInline
    }
}

/// Builds the whole-module call multigraph (§4.1): one node per defined
/// function, edges weighted by call-site multiplicity, and the
/// address-taken upgrade for any function nobody calls directly.
pub fn build_call_graph(
    functions: &[FunctionId],
    size_probe: &dyn SizeProbe,
    attrs: &dyn AttributeOracle,
    enumerator: &dyn CallSiteEnumerator,
) -> Map<FunctionId, FunctionNode> {
    let mut nodes: Map<FunctionId, FunctionNode> = Map::new();

    for &f in functions {
        let attribute = classify(f, attrs);
        nodes.insert(f, FunctionNode::new(f, size_probe.size(f), attribute));
    }

    for &caller in functions {
        for site in enumerator.call_sites(caller) {
            debug_assert_eq!(site.caller, caller, "enumerator returned a call site under the wrong caller");
            if !nodes.contains_key(&site.callee) {
                log::debug!("{} calls {}, which has no body in this module; skipping edge", caller, site.callee);
                continue;
            }
            *nodes.get_mut(&caller).unwrap().callees.entry(site.callee).or_insert(0) += 1;
            *nodes.get_mut(&site.callee).unwrap().callers.entry(caller).or_insert(0) += 1;
        }
    }

    let address_taken: Vec<FunctionId> = nodes
        .iter()
        .filter(|(_, n)| n.callers.is_empty() && n.attribute != Attribute::KernelEntry)
        .map(|(&id, _)| id)
        .collect();
    for id in address_taken {
        log::debug!("{id}: no call-site users, upgrading to AddressTaken");
        nodes.get_mut(&id).unwrap().attribute = Attribute::AddressTaken;
    }

    nodes
}

/// Invariant 1 (§5): every edge is recorded identically from both ends.
/// Exercised by tests and available to the driver as a cheap
/// `debug_assert!` after construction.
pub fn edges_are_symmetric(nodes: &Map<FunctionId, FunctionNode>) -> bool {
    nodes.iter().all(|(&caller, node)| {
        node.callees.iter().all(|(&callee, &mult)| nodes[&callee].callers.get(&caller) == Some(&mult))
    })
}

//! Execution-frequency estimation (§4.4): seeding each function's
//! `static_freq` from attribute-based heuristics, then propagating caller
//! contributions through the call graph to a bounded fixed point.

use crate::collab::{AttributeOracle, BlockFrequencyProvider, CallSiteEnumerator, FunctionId};
use crate::graph::{Attribute, FunctionNode};
use crate::scaled::ScaledNumber;
use std::collections::{BTreeMap as Map, VecDeque};

/// §4.6's sample population for the threshold selector: per function by
/// default, or per basic block when `BlockFrequencySampling` is enabled. A
/// block's sample is its frequency relative to its function's entry,
/// scaled by that function's own `static_freq` — the same rescaling the
/// call-edge propagation in [`propagate`] uses, just applied to every block
/// instead of only the ones that happen to hold a call site.
pub fn sample_population(
    nodes: &Map<FunctionId, FunctionNode>,
    freq: &dyn BlockFrequencyProvider,
    by_block: bool,
) -> Vec<ScaledNumber> {
    if !by_block {
        return nodes.values().map(|n| n.static_freq).collect();
    }

    let mut samples = Vec::new();
    for (&id, node) in nodes {
        let entry_freq = freq.entry_freq(id);
        if entry_freq.is_zero() {
            continue;
        }
        for block in freq.blocks(id) {
            let relative = freq.block_freq(id, block).div(entry_freq);
            samples.push(relative.mul(node.static_freq));
        }
    }
    samples
}

/// Caps the number of extra propagation rounds spent on functions that
/// never drain out of the worklist because they sit in a call-graph cycle
/// (§4.4.1). Bounds total propagation work to `O(edges * budget)` instead of
/// iterating an unbounded, possibly non-converging fixed point.
const SCC_PROPAGATION_BUDGET: u32 = 8;

/// §4.4 step 1: seeds every node's `static_freq` from its own attributes,
/// independent of the call graph shape.
pub fn seed(nodes: &mut Map<FunctionId, FunctionNode>, attrs: &dyn AttributeOracle) {
    for (&id, node) in nodes.iter_mut() {
        let value = if attrs.has_always_inline(id) || attrs.has_inline_hint(id) {
            15
        } else if attrs.has_local_linkage(id) && node.attribute != Attribute::AddressTaken {
            0
        } else if attrs.has_cold(id) || attrs.has_no_inline(id) {
            5
        } else {
            10
        };
        node.static_freq = ScaledNumber::from_u64(value);
    }
}

/// §4.4 step 2: propagates `count(caller) * freq(block) / entry_freq(caller)`
/// along every call edge. Functions with zero in-degree in the acyclic part
/// of the graph are processed exactly once each, in topological order;
/// residual nodes that never reach zero in-degree are the call graph's
/// cycles, and get `SCC_PROPAGATION_BUDGET` extra rounds among themselves to
/// approximate convergence instead of iterating forever (§4.4.1).
pub fn propagate(
    nodes: &mut Map<FunctionId, FunctionNode>,
    enumerator: &dyn CallSiteEnumerator,
    freq: &dyn BlockFrequencyProvider,
) {
    let mut remaining: Map<FunctionId, u32> =
        nodes.iter().map(|(&id, n)| (id, n.callers.len() as u32)).collect();
    let mut queue: VecDeque<FunctionId> =
        remaining.iter().filter(|&(_, &d)| d == 0).map(|(&id, _)| id).collect();

    while let Some(caller) = queue.pop_front() {
        propagate_from(nodes, caller, enumerator, freq, &mut remaining, &mut queue);
    }

    let mut cyclic: Vec<FunctionId> = remaining.iter().filter(|&(_, &d)| d > 0).map(|(&id, _)| id).collect();
    if !cyclic.is_empty() {
        cyclic.sort();
        log::debug!("frequency propagation: {} function(s) left in call-graph cycles", cyclic.len());
        let mut scratch_queue = VecDeque::new();
        for _ in 0..SCC_PROPAGATION_BUDGET {
            for &caller in &cyclic {
                propagate_from(nodes, caller, enumerator, freq, &mut remaining, &mut scratch_queue);
            }
        }
    }
}

fn propagate_from(
    nodes: &mut Map<FunctionId, FunctionNode>,
    caller: FunctionId,
    enumerator: &dyn CallSiteEnumerator,
    freq: &dyn BlockFrequencyProvider,
    remaining: &mut Map<FunctionId, u32>,
    queue: &mut VecDeque<FunctionId>,
) {
    let sites = enumerator.call_sites(caller);
    if sites.is_empty() {
        return;
    }
    let caller_freq = nodes[&caller].static_freq;
    let entry_freq = freq.entry_freq(caller);
    assert!(!entry_freq.is_zero(), "{caller} has call sites but a zero entry frequency");

    for site in sites {
        if !nodes.contains_key(&site.callee) {
            continue;
        }
        let block_freq = freq.block_freq(caller, site.block);
        let contribution = caller_freq.mul(block_freq).div(entry_freq);
        let callee = nodes.get_mut(&site.callee).unwrap();
        callee.static_freq = callee.static_freq.add(contribution);

        if let Some(d) = remaining.get_mut(&site.callee) {
            if *d > 0 {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(site.callee);
                }
            }
        }
    }
}

//! Partitioning (§4.7): when a root's exact unit size still exceeds budget
//! after expansion, promote oversized or cold interior functions to
//! stack-call boundaries so the root's unit shrinks to fit.
//!
//! The bottom-up walk here mirrors the unit-size engine's shape (delimit,
//! seed a `pending` count, drain a worklist), but it accumulates raw,
//! multiplicity-free sizes — the same conservative "summed from below"
//! quantity the engine computes for `UnitSize` — and only promotes a node
//! once that conservative figure clears the threshold *and* the exact,
//! freshly recomputed `update_unit_size` for that node confirms it. The
//! conservative figure over-counts a function reachable through more than
//! one path (the same diamond the unit-size engine's own doc comment
//! flags), so a second, exact check guards against promoting something that
//! only looked oversized because of double-counting.

use crate::collab::FunctionId;
use crate::graph::{Attribute, FunctionNode};
use crate::scaled::ScaledNumber;
use crate::unit_size::{delimit_unit, update_unit_size};
use std::collections::{BTreeMap as Map, VecDeque};

/// Runs partitioning over every unit root whose exact unit size exceeds
/// `unit_threshold`. `stack_call_funcs` accumulates newly promoted roots as
/// partitioning runs; the initial snapshot of roots taken at the top is
/// intentional (§4.9's driver note): a root promoted mid-pass becomes a unit
/// of its own but is not itself re-partitioned in the same call.
pub fn partition(
    nodes: &mut Map<FunctionId, FunctionNode>,
    kernel_entries: &[FunctionId],
    stack_call_funcs: &mut Vec<FunctionId>,
    address_taken_funcs: &[FunctionId],
    unit_threshold: u32,
    cold_threshold: ScaledNumber,
) {
    let roots: Vec<FunctionId> = kernel_entries
        .iter()
        .chain(stack_call_funcs.iter())
        .chain(address_taken_funcs.iter())
        .copied()
        .collect();

    for root in roots {
        if update_unit_size(nodes, root) <= unit_threshold {
            continue;
        }
        log::info!("{root}: unit size exceeds threshold, partitioning");
        partition_unit(nodes, root, stack_call_funcs, unit_threshold, cold_threshold);
    }
}

fn partition_unit(
    nodes: &mut Map<FunctionId, FunctionNode>,
    root: FunctionId,
    stack_call_funcs: &mut Vec<FunctionId>,
    unit_threshold: u32,
    cold_threshold: ScaledNumber,
) {
    let unit = delimit_unit(nodes, root, false);

    let mut pending: Map<FunctionId, u32> = Map::new();
    for &id in &unit {
        nodes.get_mut(&id).unwrap().tmp_size = nodes[&id].initial_size;
        let count = nodes[&id].callees.keys().filter(|c| unit.contains(c)).count() as u32;
        pending.insert(id, count);
    }

    let mut queue: VecDeque<FunctionId> = pending.iter().filter(|&(_, &c)| c == 0).map(|(&id, _)| id).collect();

    while let Some(n) = queue.pop_front() {
        let subtotal = nodes[&n].tmp_size;
        let mut promoted = false;
        let mut exact_computed = false;

        if n != root
            && matches!(nodes[&n].attribute, Attribute::BestEffortInline | Attribute::Trimmed)
            && subtotal > unit_threshold
        {
            // `update_unit_size` already writes its exact result into
            // `nodes[n].unit_size` as a side effect. When `n` clears this
            // eligibility/size check but is rejected by the cold-frequency
            // check below, that exact value is left in place rather than
            // reset to the conservative `subtotal`, matching the reference
            // `bottomUpHeuristic`'s short-circuited `&&` chain.
            let exact = update_unit_size(nodes, n);
            exact_computed = true;
            if exact > unit_threshold && nodes[&n].static_freq < cold_threshold {
                log::info!("{n}: promoted to a stack-call boundary (unit_size={exact})");
                nodes.get_mut(&n).unwrap().set_attribute(Attribute::StackCall);
                nodes.get_mut(&n).unwrap().unit_size = subtotal;
                stack_call_funcs.push(n);
                promoted = true;
            }
        }

        if !promoted && !exact_computed {
            nodes.get_mut(&n).unwrap().unit_size = subtotal;
        }

        let callers: Vec<FunctionId> = nodes[&n].callers.keys().copied().collect();
        for caller in callers {
            if !unit.contains(&caller) {
                continue;
            }
            let p = pending.get_mut(&caller).unwrap();
            *p -= 1;
            if !promoted {
                nodes.get_mut(&caller).unwrap().tmp_size =
                    nodes[&caller].tmp_size.saturating_add(subtotal);
            }
            if *p == 0 {
                queue.push_back(caller);
            }
        }
    }
}

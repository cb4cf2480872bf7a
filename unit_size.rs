//! The compilation-unit size engine (§4.5): delimits the set of functions
//! reachable from a unit root without crossing a stack-call boundary, then
//! walks it bottom-up twice — once weighting inlined callees by call-site
//! multiplicity (`ExpandedSize`), once counting every reachable body
//! exactly once (`UnitSize`, via [`update_unit_size`]).
//!
//! Both walks use the same worklist shape as the host's own dataflow
//! framework: seed a `pending` count per node from its in-unit callees,
//! queue the nodes that start at zero, and requeue a caller every time one
//! of its callees finishes. A node whose `pending` count never reaches zero
//! is a cycle — recursion is flagged by returning `true`, never by erring.

use crate::collab::FunctionId;
use crate::graph::{Attribute, FunctionNode};
use crate::implicit_arg;
use std::collections::{BTreeMap as Map, BTreeSet as Set, VecDeque};

/// §4.5 step 1, also reused by the partitioner and trimmer: every function
/// reachable from `root` through call edges, stopping at an existing
/// stack-call boundary unless `ignore_stackcall_boundary` is set (the root
/// itself is never treated as a boundary for its own unit).
pub fn delimit_unit(
    nodes: &Map<FunctionId, FunctionNode>,
    root: FunctionId,
    ignore_stackcall_boundary: bool,
) -> Set<FunctionId> {
    let mut unit = Set::new();
    unit.insert(root);
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        for &callee in nodes[&id].callees.keys() {
            if unit.contains(&callee) {
                continue;
            }
            let is_boundary = nodes[&callee].attribute == Attribute::StackCall && callee != root;
            if is_boundary && !ignore_stackcall_boundary {
                continue;
            }
            unit.insert(callee);
            stack.push(callee);
        }
    }

    unit
}

/// The exact, multiplicity-free size of the unit rooted at `root`: every
/// reachable body counted exactly once. Also writes the result into
/// `root.unit_size`, since every caller needs both the value and the
/// side effect.
pub fn update_unit_size(nodes: &mut Map<FunctionId, FunctionNode>, root: FunctionId) -> u32 {
    let mut seen = Set::new();
    seen.insert(root);
    let mut queue = VecDeque::from([root]);
    let mut total: u32 = 0;

    while let Some(id) = queue.pop_front() {
        total = total.saturating_add(nodes[&id].initial_size);
        for &callee in nodes[&id].callees.keys() {
            if seen.contains(&callee) {
                continue;
            }
            if nodes[&callee].attribute == Attribute::StackCall && callee != root {
                continue;
            }
            seen.insert(callee);
            queue.push_back(callee);
        }
    }

    nodes.get_mut(&root).unwrap().unit_size = total;
    total
}

/// §4.5 steps 1-4: notional inline expansion of `root`'s unit. Returns
/// `true` if the bottom-up walk found at least one function whose `pending`
/// count never reached zero, i.e. the unit contains recursion through
/// inlinable functions.
pub fn expand(
    nodes: &mut Map<FunctionId, FunctionNode>,
    root: FunctionId,
    ignore_stackcall_boundary: bool,
    force_inline_implicit_args: bool,
    force_inline_stackcall_with_impl_arg: bool,
) -> bool {
    let unit = delimit_unit(nodes, root, ignore_stackcall_boundary);

    let mut pending: Map<FunctionId, u32> = Map::new();
    for &id in &unit {
        nodes.get_mut(&id).unwrap().tmp_size = nodes[&id].initial_size;
        let count = nodes[&id].callees.keys().filter(|c| unit.contains(c)).count() as u32;
        pending.insert(id, count);
    }

    let mut queue: VecDeque<FunctionId> = pending.iter().filter(|&(_, &c)| c == 0).map(|(&id, _)| id).collect();
    let mut total: u32 = 0;

    while let Some(n) = queue.pop_front() {
        let expanded = nodes[&n].tmp_size;
        let is_inlinable = nodes[&n].attribute.is_inlinable();
        let n_has_implicit_arg = nodes[&n].has_implicit_arg;
        nodes.get_mut(&n).unwrap().expanded_size = expanded;

        if !is_inlinable {
            total = total.saturating_add(expanded);
        }

        let callers: Vec<(FunctionId, u32)> = nodes[&n].callers.iter().map(|(&c, &m)| (c, m)).collect();
        for (caller, mult) in callers {
            if !unit.contains(&caller) {
                nodes.get_mut(&n).unwrap().in_multiple_unit = true;
                continue;
            }

            let reached_zero = {
                let p = pending.get_mut(&caller).unwrap();
                *p -= 1;
                *p == 0
            };

            if is_inlinable {
                let add = expanded.saturating_mul(mult);
                nodes.get_mut(&caller).unwrap().tmp_size =
                    nodes[&caller].tmp_size.saturating_add(add);
                if n_has_implicit_arg {
                    implicit_arg::mark(
                        nodes,
                        caller,
                        force_inline_implicit_args,
                        force_inline_stackcall_with_impl_arg,
                    );
                }
            }

            if reached_zero {
                queue.push_back(caller);
            }
        }
    }

    nodes.get_mut(&root).unwrap().expanded_size = total;
    log::trace!("{root}: expanded_size = {total}");

    pending.values().any(|&p| p != 0)
}

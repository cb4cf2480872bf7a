//! Trimming (§4.8): the last-resort reduction policy. When a unit root's
//! expanded size still exceeds its budget after partitioning, flip the
//! cheapest-looking best-effort-inline candidates to `Trimmed` one at a
//! time, re-running the unit-size engine's expansion after each flip, until
//! the root fits or there is nothing left worth trimming.
//!
//! This is the one phase the driver is allowed to leave unsatisfied: a unit
//! that is still over threshold after every eligible candidate has been
//! trimmed is reported through the query interface (§6), never as an error
//! (§7 class 3).

use crate::collab::FunctionId;
use crate::graph::{Attribute, FunctionNode};
use crate::scaled::ScaledNumber;
use crate::unit_size::{self, delimit_unit};
use std::collections::BTreeMap as Map;

/// Trims every root in `roots` down to `threshold` where possible. Returns
/// `true` if at least one root remains over threshold once trimming has
/// exhausted its candidates.
#[allow(clippy::too_many_arguments)]
pub fn trim(
    nodes: &mut Map<FunctionId, FunctionNode>,
    roots: &[FunctionId],
    threshold: u32,
    cold_threshold: ScaledNumber,
    tiny_threshold: u32,
    force_inline_external_functions: bool,
    ignore_stackcall_boundary: bool,
    force_inline_implicit_args: bool,
    force_inline_stackcall_with_impl_arg: bool,
) -> bool {
    let mut any_over_threshold = false;

    let mut ordered: Vec<FunctionId> = roots.to_vec();
    ordered.sort_by_key(|&r| std::cmp::Reverse(nodes[&r].expanded_size));

    for root in ordered {
        unit_size::expand(
            nodes,
            root,
            ignore_stackcall_boundary,
            force_inline_implicit_args,
            force_inline_stackcall_with_impl_arg,
        );
        if nodes[&root].expanded_size <= threshold {
            continue;
        }

        let unit = delimit_unit(nodes, root, ignore_stackcall_boundary);
        let mut candidates: Vec<FunctionId> = unit
            .iter()
            .copied()
            .filter(|&n| n != root)
            .filter(|&n| {
                is_good_to_trim(nodes, n, cold_threshold, tiny_threshold, force_inline_external_functions)
            })
            .collect();
        candidates.sort_by_key(|&n| nodes[&n].initial_size);

        while nodes[&root].expanded_size > threshold {
            let Some(candidate) = candidates.pop() else { break };
            log::info!("{root}: trimming {candidate} (initial_size={})", nodes[&candidate].initial_size);
            nodes.get_mut(&candidate).unwrap().set_attribute(Attribute::Trimmed);
            unit_size::expand(
                nodes,
                root,
                ignore_stackcall_boundary,
                force_inline_implicit_args,
                force_inline_stackcall_with_impl_arg,
            );
        }

        if nodes[&root].expanded_size > threshold {
            log::warn!("{root}: still over threshold after exhausting every trim candidate");
            any_over_threshold = true;
        }
    }

    any_over_threshold
}

/// §4.8's trim-candidate predicate: only a still-undecided best-effort
/// inline function is eligible, never something the host or an earlier
/// phase already committed to a different disposition. `force_inline_external_functions`
/// additionally protects anything reachable from more than one unit, since
/// trimming it would force a real, non-inlined copy in every one of them.
fn is_good_to_trim(
    nodes: &Map<FunctionId, FunctionNode>,
    n: FunctionId,
    cold_threshold: ScaledNumber,
    tiny_threshold: u32,
    force_inline_external_functions: bool,
) -> bool {
    let node = &nodes[&n];
    if node.attribute != Attribute::BestEffortInline {
        return false;
    }
    if force_inline_external_functions && node.in_multiple_unit {
        return false;
    }
    node.initial_size > tiny_threshold || node.static_freq < cold_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(sizes: &[u32]) -> Map<FunctionId, FunctionNode> {
        let mut nodes = Map::new();
        for (i, &size) in sizes.iter().enumerate() {
            nodes.insert(FunctionId(i as u32), FunctionNode::new(FunctionId(i as u32), size, Attribute::BestEffortInline));
        }
        for i in 0..sizes.len() - 1 {
            let (a, b) = (FunctionId(i as u32), FunctionId(i as u32 + 1));
            nodes.get_mut(&a).unwrap().callees.insert(b, 1);
            nodes.get_mut(&b).unwrap().callers.insert(a, 1);
        }
        nodes.get_mut(&FunctionId(0)).unwrap().attribute = Attribute::KernelEntry;
        nodes
    }

    #[test]
    fn trims_until_root_fits() {
        // `callee` is called twice from `root`: inlining duplicates its body
        // at both call sites (20 * 2 = 40), but trimming counts it once
        // (20), which is the only way this particular unit can shrink.
        let root = FunctionId(0);
        let callee = FunctionId(1);
        let mut nodes = Map::new();
        nodes.insert(root, FunctionNode::new(root, 5, Attribute::KernelEntry));
        nodes.insert(callee, FunctionNode::new(callee, 20, Attribute::BestEffortInline));
        nodes.get_mut(&root).unwrap().callees.insert(callee, 2);
        nodes.get_mut(&callee).unwrap().callers.insert(root, 2);

        let over = trim(&mut nodes, &[root], 40, ScaledNumber::MAX, 0, false, false, false, false);
        assert!(!over);
        assert_eq!(nodes[&root].expanded_size, 25);
        assert_eq!(nodes[&callee].attribute, Attribute::Trimmed);
    }

    #[test]
    fn trims_largest_candidate_first() {
        // root calls `big` (size 10, x3) and `small` (size 5, x3). Trimming
        // `big` alone already brings the unit under threshold, so a
        // largest-first order (§4.8 step 4) must stop after one trim and
        // leave `small` inlined; a smallest-first order would wrongly trim
        // both.
        let root = FunctionId(0);
        let big = FunctionId(1);
        let small = FunctionId(2);
        let mut nodes = Map::new();
        nodes.insert(root, FunctionNode::new(root, 5, Attribute::KernelEntry));
        nodes.insert(big, FunctionNode::new(big, 10, Attribute::BestEffortInline));
        nodes.insert(small, FunctionNode::new(small, 5, Attribute::BestEffortInline));
        nodes.get_mut(&root).unwrap().callees.insert(big, 3);
        nodes.get_mut(&big).unwrap().callers.insert(root, 3);
        nodes.get_mut(&root).unwrap().callees.insert(small, 3);
        nodes.get_mut(&small).unwrap().callers.insert(root, 3);

        let over = trim(&mut nodes, &[root], 35, ScaledNumber::MAX, 0, false, false, false, false);
        assert!(!over);
        assert_eq!(nodes[&big].attribute, Attribute::Trimmed);
        assert_eq!(nodes[&small].attribute, Attribute::BestEffortInline);
        assert_eq!(nodes[&root].expanded_size, 5 + 10 + 5 * 3);
    }

    #[test]
    fn reports_when_nothing_left_to_trim() {
        // Every callee is tiny and hot, so nothing is eligible, and the root
        // stays over threshold; that must be reported, not panicked on.
        let mut nodes = linear(&[5, 1, 1, 1]);
        for n in nodes.values_mut() {
            n.static_freq = ScaledNumber::from_u64(1_000_000);
        }
        let root = FunctionId(0);
        let over = trim(&mut nodes, &[root], 1, ScaledNumber::from_u64(1), 1000, false, false, false, false);
        assert!(over);
    }

    #[test]
    fn already_within_budget_trims_nothing() {
        let mut nodes = linear(&[5, 5, 5]);
        let root = FunctionId(0);
        let over = trim(&mut nodes, &[root], 100, ScaledNumber::MAX, 0, false, false, false, false);
        assert!(!over);
        assert_eq!(nodes.values().filter(|n| n.attribute == Attribute::Trimmed).count(), 0);
    }
}

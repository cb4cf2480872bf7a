//! Implicit-argument propagation (§4.3).
//!
//! A function that reads one of the fixed intrinsic queries (local id,
//! group id, subgroup id, ...) needs a physical parameter the caller must
//! supply once it stops being a separate call. Marking `has_implicit_arg`
//! and, depending on configuration, force-inlining the carrier is the only
//! way the planner keeps that constraint visible to later phases.

use crate::collab::{AttributeOracle, FunctionId};
use crate::graph::{Attribute, FunctionNode};
use std::collections::BTreeMap as Map;

/// Initial scan (§4.3 step 1): every function the host reports as
/// referencing an implicit argument gets marked and, where configuration
/// allows, promoted.
pub fn scan(
    nodes: &mut Map<FunctionId, FunctionNode>,
    attrs: &dyn AttributeOracle,
    force_inline_implicit_args: bool,
    force_inline_stackcall_with_impl_arg: bool,
) {
    let carriers: Vec<FunctionId> =
        nodes.keys().copied().filter(|&f| attrs.references_implicit_arg(f)).collect();
    for f in carriers {
        mark(nodes, f, force_inline_implicit_args, force_inline_stackcall_with_impl_arg);
    }
}

/// Marks `function` as carrying an implicit argument and applies the
/// promotion rules. Also used from the unit-size engine (§4.5 step 2) when
/// a function with an implicit argument gets notionally inlined into a
/// caller, which must inherit the same marking.
///
/// `KernelEntry` and `AddressTaken` functions are never promoted: a kernel
/// entry already receives its implicit arguments from the launch
/// configuration, and an address-taken function's signature cannot change
/// without breaking every indirect caller. `Trimmed` functions are left
/// alone too — force-inlining a function the host explicitly marked
/// no-inline would both contradict that attribute and violate §4.2's
/// transition table, which has no `Trimmed -> ForceInline` edge.
pub fn mark(
    nodes: &mut Map<FunctionId, FunctionNode>,
    function: FunctionId,
    force_inline_implicit_args: bool,
    force_inline_stackcall_with_impl_arg: bool,
) {
    let node = nodes.get_mut(&function).unwrap();
    if node.has_implicit_arg {
        return;
    }
    node.has_implicit_arg = true;
    log::debug!("{function}: carries an implicit argument");

    match node.attribute {
        Attribute::KernelEntry | Attribute::AddressTaken | Attribute::Trimmed => {}
        Attribute::StackCall => {
            if force_inline_stackcall_with_impl_arg {
                node.set_attribute(Attribute::ForceInline);
            }
        }
        Attribute::BestEffortInline | Attribute::ForceInline => {
            if force_inline_implicit_args {
                node.set_attribute(Attribute::ForceInline);
            }
        }
    }
}

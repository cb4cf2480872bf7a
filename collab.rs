//! Abstract interfaces to collaborators the planner consumes but does not
//! own: the IR, the kernel/function attribute store, the block-frequency
//! provider and the call-site enumerator all live in the host compiler.
//! This module defines the narrow views the planner needs from each of
//! them; see §6 and §3.1 for the rationale behind keeping the IR itself out
//! of this crate entirely.

use std::fmt;

/// Opaque handle to a function defined in the compute module. Cheap to copy
/// and totally ordered so it can key a `BTreeMap` directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub u32);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

/// Identifies a basic block within a function, scoped to that function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb#{}", self.0)
    }
}

/// Returns an abstract instruction-count size for a function's body (§2).
pub trait SizeProbe {
    fn size(&self, function: FunctionId) -> u32;
}

/// Per-function boolean attributes drawn straight from the IR / kernel
/// metadata, consumed once by the attribute classifier (§4.2) and the
/// implicit-argument analyser (§4.3). The planner never inspects an
/// instruction to derive these itself.
pub trait AttributeOracle {
    fn is_entry(&self, function: FunctionId) -> bool;
    fn has_always_inline(&self, function: FunctionId) -> bool;
    fn has_no_inline(&self, function: FunctionId) -> bool;
    fn has_cold(&self, function: FunctionId) -> bool;
    fn has_inline_hint(&self, function: FunctionId) -> bool;
    fn has_local_linkage(&self, function: FunctionId) -> bool;
    fn has_force_stackcall(&self, function: FunctionId) -> bool;

    /// True if `function`'s body references one of the fixed intrinsic
    /// queries listed in §4.3 (local id, group id, subgroup id, ...). The
    /// planner does not know the IR's instruction set; the host answers.
    fn references_implicit_arg(&self, function: FunctionId) -> bool;
}

/// Relative execution-frequency information feeding frequency seeding and
/// propagation (§4.4).
pub trait BlockFrequencyProvider {
    /// Frequency of `function`'s entry block, used as the propagation base.
    /// Must be non-zero for any function that has at least one call site;
    /// the planner asserts on this (§4.4, §7 class 1).
    fn entry_freq(&self, function: FunctionId) -> crate::scaled::ScaledNumber;

    /// Frequency of a specific basic block, relative to the same scale as
    /// `entry_freq` for that function.
    fn block_freq(&self, function: FunctionId, block: BlockId) -> crate::scaled::ScaledNumber;

    /// Every basic block belonging to `function`, in no particular order.
    /// Consulted only when the threshold selector (§4.6) is configured to
    /// sample the cold-function population at basic-block granularity
    /// rather than per function; the planner never enumerates blocks for
    /// any other purpose, so a host that never enables that mode can
    /// return an empty `Vec` unconditionally.
    fn blocks(&self, function: FunctionId) -> Vec<BlockId>;
}

/// One direct call site: `caller` calls `callee` from `block`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CallSite {
    pub caller: FunctionId,
    pub callee: FunctionId,
    pub block: BlockId,
}

/// Enumerates the call sites that make up the whole-module call graph
/// (§4.1). Declarations (no body) are simply absent from
/// `defined_functions`; the planner never sees them as nodes.
pub trait CallSiteEnumerator {
    /// Every function with a defined body in this compute module.
    fn defined_functions(&self) -> Vec<FunctionId>;

    /// Every direct call site whose caller is `function`.
    fn call_sites(&self, function: FunctionId) -> Vec<CallSite>;
}

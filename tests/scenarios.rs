//! Crate-level integration tests exercising the literal end-to-end scenarios
//! from the planner's testable-properties section, built as small
//! hand-written call graphs rather than through any textual IR (no parser
//! is in scope for this crate).

use kernel_unit_planner::{
    AttributeOracle, Attribute, BlockFrequencyProvider, BlockId, CallSite, CallSiteEnumerator, FunctionId, Planner,
    ScaledNumber, SizeProbe, StaticConfig,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

/// A hand-built module: `.func(id, size)` registers a defined function,
/// `.entry(id)` marks it a kernel entry, `.calls(caller, callee, mult)` adds
/// `mult` call sites from `caller` to `callee` each in its own basic block.
#[derive(Default)]
struct TestModule {
    sizes: BTreeMap<FunctionId, u32>,
    entries: Vec<FunctionId>,
    cold: Vec<FunctionId>,
    sites: Vec<CallSite>,
    next_block: u32,
}

impl TestModule {
    fn func(mut self, id: FunctionId, size: u32) -> Self {
        self.sizes.insert(id, size);
        self
    }

    fn entry(mut self, id: FunctionId) -> Self {
        self.entries.push(id);
        self
    }

    fn cold(mut self, id: FunctionId) -> Self {
        self.cold.push(id);
        self
    }

    fn calls(mut self, caller: FunctionId, callee: FunctionId, mult: u32) -> Self {
        for _ in 0..mult {
            let block = BlockId(self.next_block);
            self.next_block += 1;
            self.sites.push(CallSite { caller, callee, block });
        }
        self
    }

    fn functions(&self) -> Vec<FunctionId> {
        self.sizes.keys().copied().collect()
    }
}

impl SizeProbe for TestModule {
    fn size(&self, function: FunctionId) -> u32 {
        self.sizes[&function]
    }
}

impl AttributeOracle for TestModule {
    fn is_entry(&self, function: FunctionId) -> bool {
        self.entries.contains(&function)
    }
    fn has_always_inline(&self, _: FunctionId) -> bool {
        false
    }
    fn has_no_inline(&self, _: FunctionId) -> bool {
        false
    }
    fn has_cold(&self, function: FunctionId) -> bool {
        self.cold.contains(&function)
    }
    fn has_inline_hint(&self, _: FunctionId) -> bool {
        false
    }
    fn has_local_linkage(&self, _: FunctionId) -> bool {
        false
    }
    fn has_force_stackcall(&self, _: FunctionId) -> bool {
        false
    }
    fn references_implicit_arg(&self, _: FunctionId) -> bool {
        false
    }
}

impl CallSiteEnumerator for TestModule {
    fn defined_functions(&self) -> Vec<FunctionId> {
        self.functions()
    }
    fn call_sites(&self, function: FunctionId) -> Vec<CallSite> {
        self.sites.iter().copied().filter(|s| s.caller == function).collect()
    }
}

impl BlockFrequencyProvider for TestModule {
    fn entry_freq(&self, _function: FunctionId) -> ScaledNumber {
        ScaledNumber::from_u64(1)
    }
    fn block_freq(&self, _function: FunctionId, _block: BlockId) -> ScaledNumber {
        ScaledNumber::from_u64(1)
    }
    fn blocks(&self, function: FunctionId) -> Vec<BlockId> {
        self.sites.iter().filter(|s| s.caller == function).map(|s| s.block).collect()
    }
}

fn f(n: u32) -> FunctionId {
    FunctionId(n)
}

/// Scenario 1: linear chain, all best-effort. A->B->C->D with sizes
/// {10,20,30,40}, multiplicities 1. Notional inlining absorbs every callee
/// into A, so A.expanded_size = 10+20+30+40 = 100, and there is no
/// recursion.
#[test]
fn linear_chain_all_best_effort() {
    let (a, b, c, d) = (f(0), f(1), f(2), f(3));
    let module = TestModule::default()
        .func(a, 10)
        .func(b, 20)
        .func(c, 30)
        .func(d, 40)
        .entry(a)
        .calls(a, b, 1)
        .calls(b, c, 1)
        .calls(c, d, 1);

    let planner = Planner::run(&module.functions(), &module, &module, &module, &module, StaticConfig::default()).unwrap();

    assert_eq!(planner.expanded_size_of(a), Some(100));
    assert!(!planner.has_recursion());
    assert!(!planner.subroutine_enabled());
}

/// Scenario 2: diamond. A->{B,C}; B->D, C->D; sizes {10,20,30,40}, all
/// multiplicities 1. Expanded size double-counts the shared leaf (it is
/// inlined at both call sites); the exact unit size counts it once.
#[test]
fn diamond_shared_callee() {
    let (a, b, c, d) = (f(0), f(1), f(2), f(3));
    let module = TestModule::default()
        .func(a, 10)
        .func(b, 20)
        .func(c, 30)
        .func(d, 40)
        .entry(a)
        .calls(a, b, 1)
        .calls(a, c, 1)
        .calls(b, d, 1)
        .calls(c, d, 1);

    let config = StaticConfig { subroutine_threshold: 0, ..StaticConfig::default() };
    let planner = Planner::run(&module.functions(), &module, &module, &module, &module, config).unwrap();

    assert_eq!(planner.expanded_size_of(a), Some(10 + 20 + 30 + 2 * 40));
    assert_eq!(planner.max_unit_size(), 100);
}

/// Scenario 3: recursion. A->B->A, multiplicity 1 each. The unit-size
/// engine cannot drain its worklist to completion, so recursion is flagged
/// rather than erring, and subroutine emission stays enabled no matter how
/// small the sizes are.
#[test]
fn recursive_pair_keeps_subroutines_enabled() {
    let (a, b) = (f(0), f(1));
    let module = TestModule::default().func(a, 4).func(b, 4).entry(a).calls(a, b, 1).calls(b, a, 1);

    let config = StaticConfig { subroutine_threshold: u32::MAX, ..StaticConfig::default() };
    let planner = Planner::run(&module.functions(), &module, &module, &module, &module, config).unwrap();

    assert!(planner.has_recursion());
    assert!(planner.subroutine_enabled());
}

/// Scenario 4: shared callee across units. Two kernel entries both call a
/// shared subroutine F. With `ForceInlineExternalFunctions` enabled, F is
/// excluded from trim candidacy in both units because it is reachable from
/// more than one of them, so the common subroutine survives as
/// best-effort-inline even though its unit is over budget.
#[test]
fn shared_callee_excluded_from_trim_when_external_functions_protected() {
    let (k1, k2, shared) = (f(0), f(1), f(2));
    let module = TestModule::default().func(k1, 5).func(k2, 5).func(shared, 50).entry(k1).entry(k2).calls(k1, shared, 1).calls(k2, shared, 1);

    let config = StaticConfig {
        subroutine_threshold: 0,
        control_unit_size: true,
        expanded_unit_size_threshold: 10,
        force_inline_external_functions: true,
        ..StaticConfig::default()
    };
    let planner = Planner::run(&module.functions(), &module, &module, &module, &module, config).unwrap();

    assert_eq!(planner.disposition(shared), Ok(Attribute::BestEffortInline));
}

/// Scenario 5: partition then trim. Unit A has a large callee B; with
/// partitioning enabled, a tight unit-size threshold, and no frequency
/// profiling (so the cold threshold stays at its inert "everything is
/// cold" default), B is promoted to a stack-call boundary, shrinking A's
/// unit to exclude B's body.
#[test]
fn partition_promotes_large_callee() {
    let (a, b) = (f(0), f(1));
    let module = TestModule::default().func(a, 10).func(b, 5_000).entry(a).calls(a, b, 1);

    let config = StaticConfig {
        subroutine_threshold: 0,
        partition_unit: true,
        control_unit_size: true,
        unit_size_threshold: 4_000,
        expanded_unit_size_threshold: u32::MAX,
        ..StaticConfig::default()
    };
    let planner = Planner::run(&module.functions(), &module, &module, &module, &module, config).unwrap();

    assert!(planner.is_stack_call_assigned(b));
    assert_eq!(planner.expanded_size_of(a), Some(10));
}

/// Scenario 6: threshold from long-tail. Sorted samples
/// [1,1,1,1,2,2,4,4,8,8,16,16,32,32,64,128,256,512,1024,2048], C=20 picks
/// position floor(20*20/100)=4, i.e. the threshold is the 5th smallest
/// sample (value 2) — verified directly against the threshold-selection
/// module rather than end-to-end, since this is a pure function of the
/// sample population.
#[test]
fn long_tail_threshold_matches_reference_position() {
    use kernel_unit_planner::threshold::{select_threshold, ReductionMetric};

    let raw = [1u64, 1, 1, 1, 2, 2, 4, 4, 8, 8, 16, 16, 32, 32, 64, 128, 256, 512, 1024, 2048];
    let samples: Vec<ScaledNumber> = raw.iter().map(|&v| ScaledNumber::from_u64(v)).collect();

    let threshold = select_threshold(&samples, Some(ReductionMetric::LongTail), 20);
    assert_eq!(threshold, ScaledNumber::from_u64(2));
}

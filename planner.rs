//! The planner driver (§4.9): the state machine that runs Build,
//! ImplicitArg, InitialExpand, DecideNeed and Reduce in sequence, and the
//! query interface (§6) the rest of the compiler reads the result through.

use crate::collab::{AttributeOracle, BlockFrequencyProvider, CallSiteEnumerator, FunctionId, SizeProbe};
use crate::commons::PlannerError;
use crate::config::ConfigRegistry;
use crate::graph::{self, Attribute, FunctionNode};
use crate::scaled::ScaledNumber;
use crate::{frequency, implicit_arg, partition, threshold, trim, unit_size};
use std::collections::BTreeMap as Map;

pub struct Planner<C> {
    nodes: Map<FunctionId, FunctionNode>,
    kernel_entries: Vec<FunctionId>,
    stack_call_funcs: Vec<FunctionId>,
    address_taken_funcs: Vec<FunctionId>,
    cold_threshold: ScaledNumber,
    has_recursion: bool,
    subroutine_enabled: bool,
    config: C,
}

impl<C: ConfigRegistry> Planner<C> {
    /// Runs the full driver (§4.9) over `functions` and returns the planner
    /// holding the resulting dispositions, ready to answer §6 queries.
    pub fn run(
        functions: &[FunctionId],
        size_probe: &dyn SizeProbe,
        attrs: &dyn AttributeOracle,
        enumerator: &dyn CallSiteEnumerator,
        freq: &dyn BlockFrequencyProvider,
        config: C,
    ) -> Result<Self, PlannerError> {
        config.validate()?;
        if functions.is_empty() {
            return Err(PlannerError::EmptyModule);
        }

        // --- 1. Build ---
        log::info!("planner: Build over {} function(s)", functions.len());
        let nodes = graph::build_call_graph(functions, size_probe, attrs, enumerator);
        debug_assert!(graph::edges_are_symmetric(&nodes), "call graph built with asymmetric edges");

        let mut kernel_entries = Vec::new();
        let mut stack_call_funcs = Vec::new();
        let mut address_taken_funcs = Vec::new();
        for (&id, node) in &nodes {
            match node.attribute {
                Attribute::KernelEntry => kernel_entries.push(id),
                Attribute::StackCall => stack_call_funcs.push(id),
                Attribute::AddressTaken => address_taken_funcs.push(id),
                _ => {}
            }
        }
        log::info!(
            "planner: Build done: {} kernel entr(ies), {} stack-call root(s), {} address-taken root(s)",
            kernel_entries.len(),
            stack_call_funcs.len(),
            address_taken_funcs.len()
        );

        let mut planner = Planner {
            nodes,
            kernel_entries,
            stack_call_funcs,
            address_taken_funcs,
            cold_threshold: ScaledNumber::MAX,
            has_recursion: false,
            subroutine_enabled: true,
            config,
        };

        // --- 2. ImplicitArg ---
        if planner.config.control_inline_implicit_args() || planner.config.force_inline_stackcall_with_impl_arg() {
            log::info!("planner: ImplicitArg scan");
            implicit_arg::scan(
                &mut planner.nodes,
                attrs,
                planner.config.control_inline_implicit_args(),
                planner.config.force_inline_stackcall_with_impl_arg(),
            );
        }

        // --- 3. InitialExpand ---
        log::info!("planner: InitialExpand over {} kernel entr(ies)", planner.kernel_entries.len());
        let mut max_expanded: u32 = 0;
        for &entry in &planner.kernel_entries.clone() {
            let recursive = unit_size::expand(
                &mut planner.nodes,
                entry,
                true,
                planner.config.control_inline_implicit_args(),
                planner.config.force_inline_stackcall_with_impl_arg(),
            );
            planner.has_recursion |= recursive;
            max_expanded = max_expanded.max(planner.nodes[&entry].expanded_size);
        }
        let mut max_unit_size: u32 = 0;
        let roots_for_unit_size: Vec<FunctionId> = planner
            .kernel_entries
            .iter()
            .chain(planner.stack_call_funcs.iter())
            .chain(planner.address_taken_funcs.iter())
            .copied()
            .collect();
        for root in roots_for_unit_size {
            let size = unit_size::update_unit_size(&mut planner.nodes, root);
            max_unit_size = max_unit_size.max(size);
        }
        log::info!("planner: InitialExpand done: max_expanded={max_expanded}, max_unit_size={max_unit_size}");

        // --- 4. DecideNeed ---
        if max_expanded <= planner.config.subroutine_threshold() && !planner.has_recursion {
            log::info!("planner: DecideNeed: within subroutine threshold, no recursion, disabling subroutine emission");
            planner.subroutine_enabled = false;
            return Ok(planner);
        }

        // --- 5. Reduce ---
        // `DisableAddingAlwaysAttribute` gates the whole policy the same way
        // the reference driver's `AL == AL_Module && !DisableAddingAlwaysAttribute`
        // check does; this crate never re-invokes the planner at a second
        // level, so the `AL == AL_Module` half of that condition always holds.
        if planner.config.reduction_enabled() && !planner.config.disable_adding_always_attribute() {
            log::info!("planner: Reduce");
            if planner.config.frequency_based_metrics_enabled() {
                frequency::seed(&mut planner.nodes, attrs);
                frequency::propagate(&mut planner.nodes, enumerator, freq);
                let samples =
                    frequency::sample_population(&planner.nodes, freq, planner.config.block_frequency_sampling());
                planner.cold_threshold = threshold::select_threshold(
                    &samples,
                    planner.config.metric_for_kernel_size_reduction().resolve(),
                    planner.config.parameter_for_cold_func_threshold(),
                );
            }

            if planner.config.partition_unit() && max_unit_size > planner.config.unit_size_threshold() {
                partition::partition(
                    &mut planner.nodes,
                    &planner.kernel_entries,
                    &mut planner.stack_call_funcs,
                    &planner.address_taken_funcs,
                    planner.config.unit_size_threshold(),
                    planner.cold_threshold,
                );
            }

            if planner.config.control_kernel_total_size() {
                let roots: Vec<FunctionId> = planner
                    .kernel_entries
                    .iter()
                    .chain(planner.address_taken_funcs.iter())
                    .copied()
                    .collect();
                trim::trim(
                    &mut planner.nodes,
                    &roots,
                    planner.config.kernel_total_size_threshold(),
                    planner.cold_threshold,
                    planner.config.control_inline_tiny_size(),
                    planner.config.force_inline_external_functions(),
                    true,
                    planner.config.control_inline_implicit_args(),
                    planner.config.force_inline_stackcall_with_impl_arg(),
                );
            } else if planner.config.control_unit_size() {
                let roots: Vec<FunctionId> = planner
                    .kernel_entries
                    .iter()
                    .chain(planner.stack_call_funcs.iter())
                    .chain(planner.address_taken_funcs.iter())
                    .copied()
                    .collect();
                trim::trim(
                    &mut planner.nodes,
                    &roots,
                    planner.config.expanded_unit_size_threshold(),
                    planner.cold_threshold,
                    planner.config.control_inline_tiny_size(),
                    planner.config.force_inline_external_functions(),
                    false,
                    planner.config.control_inline_implicit_args(),
                    planner.config.force_inline_stackcall_with_impl_arg(),
                );
            }
        }

        // --- 6. Postcondition ---
        if planner.has_recursion {
            planner.subroutine_enabled = true;
        }

        Ok(planner)
    }

    // --- §6 query interface ---

    pub fn max_expanded_size(&self) -> u32 {
        self.kernel_entries.iter().map(|id| self.nodes[id].expanded_size).max().unwrap_or(0)
    }

    pub fn expanded_size_of(&self, function: FunctionId) -> Option<u32> {
        self.nodes.get(&function).map(|n| n.expanded_size)
    }

    /// §6, resolving the open question noted in §9: a function is
    /// "only called once" either because it has exactly one non-recursive
    /// caller with multiplicity one, or — the OpenCL-style case where a
    /// function is a shared subroutine called once apiece from several
    /// kernels — because every one of its callers is itself a kernel entry
    /// calling it with multiplicity one. An address-taken function with no
    /// callers at all vacuously satisfies the second form, which mirrors
    /// the reference behaviour rather than being special-cased away.
    pub fn only_called_once(&self, function: FunctionId) -> bool {
        let Some(node) = self.nodes.get(&function) else {
            return false;
        };
        let self_recursive = node.callers.contains_key(&function);
        if !self_recursive && node.callers.len() == 1 && node.callers.values().all(|&m| m == 1) {
            return true;
        }
        node.callers.iter().all(|(&caller, &mult)| {
            mult == 1 && self.nodes.get(&caller).map(|c| c.attribute == Attribute::KernelEntry).unwrap_or(false)
        })
    }

    pub fn is_trimmed(&self, function: FunctionId) -> bool {
        self.nodes.get(&function).map(|n| n.attribute == Attribute::Trimmed).unwrap_or(false)
    }

    pub fn is_stack_call_assigned(&self, function: FunctionId) -> bool {
        self.nodes.get(&function).map(|n| n.attribute == Attribute::StackCall).unwrap_or(false)
    }

    /// The fallible sibling of the boolean/`Option` queries above: useful
    /// when a caller wants to distinguish "not in this module" from every
    /// other disposition, rather than folding it into `false`/`None`
    /// (§7.1's `UnknownFunction` case).
    pub fn disposition(&self, function: FunctionId) -> Result<Attribute, PlannerError> {
        self.nodes.get(&function).map(|n| n.attribute).ok_or(PlannerError::UnknownFunction(function))
    }

    pub fn max_unit_size(&self) -> u32 {
        self.kernel_entries
            .iter()
            .chain(self.stack_call_funcs.iter())
            .chain(self.address_taken_funcs.iter())
            .map(|id| self.nodes[id].unit_size)
            .max()
            .unwrap_or(0)
    }

    pub fn subroutine_enabled(&self) -> bool {
        self.subroutine_enabled
    }

    pub fn has_recursion(&self) -> bool {
        self.has_recursion
    }
}

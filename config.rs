//! The configuration registry (§6, §4.10): tunables the planner reads but
//! does not own. The host compiler almost certainly backs this with its own
//! pass-options plumbing; `StaticConfig` is a plain in-memory implementation
//! good enough for embedding the planner directly or for tests.

use crate::commons::PlannerError;
use crate::threshold::MetricFlags;

pub trait ConfigRegistry {
    fn control_inline_tiny_size(&self) -> u32;
    fn subroutine_threshold(&self) -> u32;
    fn unit_size_threshold(&self) -> u32;
    fn kernel_total_size_threshold(&self) -> u32;
    fn expanded_unit_size_threshold(&self) -> u32;
    fn metric_for_kernel_size_reduction(&self) -> MetricFlags;
    fn parameter_for_cold_func_threshold(&self) -> u32;
    fn block_frequency_sampling(&self) -> bool;
    fn static_profiling_for_partitioning(&self) -> bool;
    fn static_profiling_for_inlining_trimming(&self) -> bool;
    fn control_inline_implicit_args(&self) -> bool;
    fn force_inline_stackcall_with_impl_arg(&self) -> bool;
    fn control_kernel_total_size(&self) -> bool;
    fn control_unit_size(&self) -> bool;
    fn partition_unit(&self) -> bool;
    fn force_inline_external_functions(&self) -> bool;
    fn disable_adding_always_attribute(&self) -> bool;

    /// True if either size-control policy (§4.9 step 4) is active.
    fn reduction_enabled(&self) -> bool {
        self.partition_unit() || self.control_kernel_total_size() || self.control_unit_size()
    }

    /// True if static-profiling-derived frequencies feed any decision.
    fn frequency_based_metrics_enabled(&self) -> bool {
        self.static_profiling_for_partitioning() || self.static_profiling_for_inlining_trimming()
    }

    /// Rejects configurations whose thresholds and metric parameter can
    /// never produce a sensible plan (§4.10). Called once before Build.
    fn validate(&self) -> Result<(), PlannerError> {
        let c = self.parameter_for_cold_func_threshold();
        match self.metric_for_kernel_size_reduction().resolve() {
            Some(crate::threshold::ReductionMetric::Normal) if c > 30 => {
                return Err(PlannerError::InvalidConfig(format!(
                    "ParameterForColdFuncThreshold = {c} is out of range [0, 30] for the normal metric"
                )));
            }
            Some(
                crate::threshold::ReductionMetric::LongTail | crate::threshold::ReductionMetric::AveragePercent,
            ) if !(1..=100).contains(&c) => {
                return Err(PlannerError::InvalidConfig(format!(
                    "ParameterForColdFuncThreshold = {c} is out of range (0, 100] for this metric"
                )));
            }
            _ => {}
        }

        if self.control_unit_size() && self.unit_size_threshold() == 0 {
            return Err(PlannerError::InvalidConfig(
                "UnitSizeThreshold must be non-zero when ControlUnitSize is enabled".to_owned(),
            ));
        }
        if self.control_kernel_total_size() && self.kernel_total_size_threshold() == 0 {
            return Err(PlannerError::InvalidConfig(
                "KernelTotalSizeThreshold must be non-zero when ControlKernelTotalSize is enabled".to_owned(),
            ));
        }

        Ok(())
    }
}

/// A plain, inert-by-default `ConfigRegistry`. `StaticConfig::default()`
/// disables every reduction policy and sets every threshold to `u32::MAX`,
/// so building a planner from it runs Build, ImplicitArg and InitialExpand
/// only, then takes §4.9 step 4's early exit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticConfig {
    pub control_inline_tiny_size: u32,
    pub subroutine_threshold: u32,
    pub unit_size_threshold: u32,
    pub kernel_total_size_threshold: u32,
    pub expanded_unit_size_threshold: u32,
    pub metric_for_kernel_size_reduction: MetricFlags,
    pub parameter_for_cold_func_threshold: u32,
    pub block_frequency_sampling: bool,
    pub static_profiling_for_partitioning: bool,
    pub static_profiling_for_inlining_trimming: bool,
    pub control_inline_implicit_args: bool,
    pub force_inline_stackcall_with_impl_arg: bool,
    pub control_kernel_total_size: bool,
    pub control_unit_size: bool,
    pub partition_unit: bool,
    pub force_inline_external_functions: bool,
    pub disable_adding_always_attribute: bool,
}

impl Default for StaticConfig {
    fn default() -> Self {
        StaticConfig {
            control_inline_tiny_size: 0,
            subroutine_threshold: u32::MAX,
            unit_size_threshold: u32::MAX,
            kernel_total_size_threshold: u32::MAX,
            expanded_unit_size_threshold: u32::MAX,
            metric_for_kernel_size_reduction: MetricFlags::default(),
            parameter_for_cold_func_threshold: 0,
            block_frequency_sampling: false,
            static_profiling_for_partitioning: false,
            static_profiling_for_inlining_trimming: false,
            control_inline_implicit_args: false,
            force_inline_stackcall_with_impl_arg: false,
            control_kernel_total_size: false,
            control_unit_size: false,
            partition_unit: false,
            force_inline_external_functions: false,
            disable_adding_always_attribute: false,
        }
    }
}

impl ConfigRegistry for StaticConfig {
    fn control_inline_tiny_size(&self) -> u32 {
        self.control_inline_tiny_size
    }
    fn subroutine_threshold(&self) -> u32 {
        self.subroutine_threshold
    }
    fn unit_size_threshold(&self) -> u32 {
        self.unit_size_threshold
    }
    fn kernel_total_size_threshold(&self) -> u32 {
        self.kernel_total_size_threshold
    }
    fn expanded_unit_size_threshold(&self) -> u32 {
        self.expanded_unit_size_threshold
    }
    fn metric_for_kernel_size_reduction(&self) -> MetricFlags {
        self.metric_for_kernel_size_reduction
    }
    fn parameter_for_cold_func_threshold(&self) -> u32 {
        self.parameter_for_cold_func_threshold
    }
    fn block_frequency_sampling(&self) -> bool {
        self.block_frequency_sampling
    }
    fn static_profiling_for_partitioning(&self) -> bool {
        self.static_profiling_for_partitioning
    }
    fn static_profiling_for_inlining_trimming(&self) -> bool {
        self.static_profiling_for_inlining_trimming
    }
    fn control_inline_implicit_args(&self) -> bool {
        self.control_inline_implicit_args
    }
    fn force_inline_stackcall_with_impl_arg(&self) -> bool {
        self.force_inline_stackcall_with_impl_arg
    }
    fn control_kernel_total_size(&self) -> bool {
        self.control_kernel_total_size
    }
    fn control_unit_size(&self) -> bool {
        self.control_unit_size
    }
    fn partition_unit(&self) -> bool {
        self.partition_unit
    }
    fn force_inline_external_functions(&self) -> bool {
        self.force_inline_external_functions
    }
    fn disable_adding_always_attribute(&self) -> bool {
        self.disable_adding_always_attribute
    }
}

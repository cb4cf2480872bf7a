//! Function-size estimation and inlining/partitioning planner.
//!
//! Given a whole-module call graph, [`planner::Planner`] decides, for every
//! defined function, one of six dispositions (`BestEffortInline`,
//! `ForceInline`, `Trimmed`, `StackCall`, `KernelEntry`, `AddressTaken`) so
//! that each compilation unit rooted at a kernel entry or a surviving
//! stack-call/address-taken function fits under configurable size budgets
//! once a later pass actually carries out the inlining. See each module's
//! doc comment for the phase of the pipeline it implements.

pub mod collab;
pub mod commons;
pub mod config;
pub mod frequency;
pub mod graph;
pub mod implicit_arg;
pub mod logging;
pub mod partition;
pub mod planner;
pub mod scaled;
pub mod threshold;
pub mod trim;
pub mod unit_size;

pub use collab::{AttributeOracle, BlockFrequencyProvider, BlockId, CallSite, CallSiteEnumerator, FunctionId, SizeProbe};
pub use commons::PlannerError;
pub use config::{ConfigRegistry, StaticConfig};
pub use graph::Attribute;
pub use planner::Planner;
pub use scaled::ScaledNumber;

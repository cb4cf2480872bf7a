//! Shared error type for the planner crate.
//!
//! Everything in here is the *recoverable* error class from §7: bad
//! configuration or a request naming a function the module never defined.
//! Broken invariants inside the algorithm itself are programmer errors and
//! are reported with `assert!`/`debug_assert!` at the point of violation,
//! not through this type.

use crate::collab::FunctionId;
use derive_more::Display;

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum PlannerError {
    #[display(fmt = "module has no defined functions")]
    EmptyModule,
    #[display(fmt = "invalid configuration: {_0}")]
    InvalidConfig(String),
    #[display(fmt = "{_0} is not a defined function in this module")]
    UnknownFunction(FunctionId),
}

impl std::error::Error for PlannerError {}

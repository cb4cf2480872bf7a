//! Planner-wide logging setup.
//!
//! Uses the standard `log` facade so the planner can be embedded in a host
//! compiler that already owns its own logger; `init()` installs a plain
//! `env_logger` backend for standalone use (tests run with `RUST_LOG` set).
//! Level discipline, loosely:
//!
//! - `error!` — never expected to fire; would indicate a collaborator
//!   contract violation the assertions didn't already catch.
//! - `warn!`  — a best-effort phase (trimming) is giving up on a unit.
//! - `info!`  — phase boundaries and the decisions with the widest blast
//!   radius (a promotion to `StackCall`, a unit being partitioned).
//! - `debug!` — per-function decisions: attribute classification,
//!   implicit-argument marking, trim candidates.
//! - `trace!` — per-edge or per-iteration detail in the hot inner loops
//!   (attribute transitions, expanded-size updates).

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs an `env_logger` backend once per process. Safe to call
/// multiple times; only the first call takes effect.
pub fn init() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    });
}

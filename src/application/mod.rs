//! Application layer containing the transaction orchestration.
//!
//! `Orchestrator` composes the connection queue, the worker channel and the
//! action state machine. `actor::spawn` wraps it in a `tokio` task fed by a
//! command channel so results, external events and user actions arriving from
//! different sources are applied one at a time.

pub mod actor;
pub mod orchestrator;
pub mod outcome;

//! Domain layer: transaction types, the action state machine and its
//! resumption registry, the connection queue, and the ports the host and
//! worker are reached through.

pub mod action;
pub mod context;
pub mod machine;
pub mod ports;
pub mod queue;
pub mod registry;
pub mod request;
pub mod result;
pub mod snapshot;

//! Inbound adapters that translate invocation events into domain service
//! calls.

pub mod events;

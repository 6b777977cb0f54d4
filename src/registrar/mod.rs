//! Registrar Module
//!
//! The central membership and ring-assembly authority. One registrar serves
//! the whole deployment; nodes discover each other exclusively through it.
//!
//! ## Core Mechanisms
//! - **Membership**: nodes register a unique positive UID plus the address of
//!   their endpoint. Duplicate UIDs are refused; registrations are paused for
//!   the duration of an election.
//! - **Ring assembly**: on every topology change the registrar probes the
//!   registered nodes, sorts the live UIDs ascending, and assigns each node
//!   the next-larger live UID as successor, wrapping from the largest back to
//!   the smallest. The pass runs under a ring mutex so no node observes a
//!   partially updated topology from the registrar's side.
//! - **Recovery coordination**: a compare-and-set guard ensures that among
//!   all failure detectors reporting the same dead leader, exactly one node
//!   initiates the recovery election.

pub mod client;
pub mod handlers;
pub mod protocol;
pub mod service;
pub mod types;

//! Node Module
//!
//! A participating process in the election ring. Implements the Chang–Roberts
//! message rules, the leader announcement lap, and the heartbeat-based
//! failure detector that triggers recovery elections.
//!
//! ## Core Mechanisms
//! - **Election circulation**: an election message `(candidate, origin)`
//!   travels the ring; each node forwards the larger of the candidate and its
//!   own UID, so the token that survives a full lap carries the maximum. A
//!   token returning to its originator completes the circuit and that node
//!   becomes leader.
//! - **Announcement lap**: the winner circulates a leader announcement once;
//!   every node accepts it exactly once per election and absorbs duplicates.
//! - **Asynchronous forwarding**: message classification happens under the
//!   election lock, delivery on detached tasks with a simulated link delay
//!   and a bounded retry budget, so a slow successor never stalls inbound
//!   handling.
//! - **Failure detection**: non-leader nodes probe the leader periodically;
//!   on failure exactly one detector (decided by the registrar's guard)
//!   rebuilds the ring and starts the recovery election.

pub mod detector;
pub mod handlers;
pub mod protocol;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

//! Ring Leader Election Cluster Library
//!
//! This library crate defines the core modules of a distributed leader election
//! system over a unidirectional logical ring, following the Chang–Roberts (LCR)
//! algorithm with a central membership authority.
//! It serves as the foundation for the two binary executables (`registrar` and `node`).
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`registrar`**: The central membership authority. Admits node registrations,
//!   gates them while an election is running, and atomically rebuilds the ring
//!   topology (successor assignments over the live nodes, sorted by UID).
//! - **`node`**: A participating process. Owns the election state machine,
//!   reacts to election and leader-announcement messages, forwards along the
//!   ring, and runs the heartbeat-based failure detector against the leader.
//! - **`console`**: The line-oriented operator console bound to a local node
//!   (`start`, `kill`, `recover`, `status`, ...).
//! - **`config`**: Environment-derived runtime configuration shared by both
//!   binaries (registry address, timeouts, retry budgets).

pub mod config;
pub mod console;
pub mod error;
pub mod node;
pub mod registrar;

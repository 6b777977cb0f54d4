use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Unique identifier of a node in the ring.
/// A positive integer assigned by the operator at process start; fixed for the
/// node's lifetime. `0` is reserved (it means "no leader" in status payloads).
pub type Uid = u32;

/// Non-owning handle to a node: its UID plus the HTTP address it serves on.
///
/// The ring is a cycle, so successors are never owned references; each node
/// keeps one of these and resolves everything else through the registrar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    pub uid: Uid,
    pub addr: SocketAddr,
}

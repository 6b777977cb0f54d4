//! Registrar Network Protocol
//!
//! Defines the API endpoints and Data Transfer Objects (DTOs) the registrar
//! exposes to nodes (registration, election gating, ring rebuild, recovery
//! coordination, name lookup).
//!
//! These structures are serialized via JSON and sent over HTTP.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use super::types::Uid;

// --- API Endpoints ---

/// Endpoint for admitting a new node into the membership list.
pub const ENDPOINT_REGISTER: &str = "/register";
/// Endpoint for removing a node on explicit shutdown.
pub const ENDPOINT_DEREGISTER: &str = "/deregister";
/// Endpoint signalling the start of an election (pauses registrations).
pub const ENDPOINT_BEGIN_ELECTION: &str = "/election/begin";
/// Endpoint signalling election completion (resumes registrations).
pub const ENDPOINT_END_ELECTION: &str = "/election/end";
/// Snapshot of the registered UIDs in insertion order.
pub const ENDPOINT_MEMBERS: &str = "/members";
/// Endpoint triggering an atomic rebuild of the ring topology.
pub const ENDPOINT_REBUILD_RING: &str = "/ring/rebuild";
/// Compare-and-set claim on the cluster-wide recovery coordinator role.
pub const ENDPOINT_CLAIM_RECOVERY: &str = "/recovery/claim";
/// Releases the recovery claim after a failed recovery initiation.
pub const ENDPOINT_RELEASE_RECOVERY: &str = "/recovery/release";
/// Name-registry lookup: `GET /lookup/:uid` resolves a UID to its address.
pub const ENDPOINT_LOOKUP: &str = "/lookup";

// --- Data Transfer Objects ---

/// Registration request sent by a node right after it starts serving.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// The UID the node wants to register under. Must be unique and positive.
    pub uid: Uid,
    /// The HTTP address the node's endpoint is bound to.
    pub addr: SocketAddr,
}

/// Registration outcome.
///
/// `error` carries the stable error kind (`DUPLICATE_UID` or `ELECTION_ACTIVE`)
/// when registration is refused, so the caller can decide whether to retry.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub registered: bool,
    pub error: Option<String>,
}

/// Removal request sent during a node's clean shutdown.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeregisterRequest {
    pub uid: Uid,
}

/// Marks the start of an election.
#[derive(Debug, Serialize, Deserialize)]
pub struct BeginElectionRequest {
    /// True when this election was triggered by leader-failure recovery.
    #[serde(default)]
    pub recovery: bool,
}

/// Generic acknowledgment for idempotent control operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}

/// Snapshot of the membership list, in registration order.
#[derive(Debug, Serialize, Deserialize)]
pub struct MembersResponse {
    pub members: Vec<Uid>,
}

/// Result of a ring rebuild.
#[derive(Debug, Serialize, Deserialize)]
pub struct RebuildRingResponse {
    /// False when fewer than two live members were found and the topology
    /// was left unchanged.
    pub rebuilt: bool,
    /// The live UIDs in ring order (ascending), empty when not rebuilt.
    pub ring: Vec<Uid>,
}

/// Outcome of a recovery-coordinator claim attempt.
///
/// Among all detectors observing the same leader failure, exactly one
/// receives `claimed: true`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRecoveryResponse {
    pub claimed: bool,
}

/// Successful name lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub uid: Uid,
    pub addr: SocketAddr,
}

//! Node Network Protocol
//!
//! Defines the API endpoints and Data Transfer Objects (DTOs) of a node's
//! endpoint: the two ring messages (election, leader announcement), successor
//! assignment from the registrar, and the control/status surface used by the
//! operator console, the registrar's probes and the failure detectors.

use serde::{Deserialize, Serialize};

use crate::registrar::types::{Peer, Uid};

use super::types::ElectionState;

// --- API Endpoints ---

/// Election message hop (ring traffic).
pub const ENDPOINT_ELECTION: &str = "/election/message";
/// Leader announcement hop (ring traffic).
pub const ENDPOINT_LEADER: &str = "/election/leader";
/// Starts an election from this node.
pub const ENDPOINT_INITIATE: &str = "/election/initiate";
/// Election progress/completion flags.
pub const ENDPOINT_ELECTION_STATE: &str = "/election/state";
/// Successor assignment, called only by the registrar during ring rebuilds.
pub const ENDPOINT_SUCCESSOR: &str = "/ring/successor";
/// This node's UID.
pub const ENDPOINT_ID: &str = "/id";
/// Human-oriented status snapshot.
pub const ENDPOINT_STATUS: &str = "/status";
/// Liveness: `GET` probes, `POST` simulates crash/recovery of the process.
pub const ENDPOINT_ALIVE: &str = "/alive";
/// Clears simulated failure and rejoins the ring.
pub const ENDPOINT_RECOVER: &str = "/recover";

// --- Data Transfer Objects ---

/// One hop of the election circulation.
///
/// `candidate_uid` is the largest UID seen on this token's path so far;
/// `origin_uid` identifies the node whose initiation this token belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ElectionMessage {
    pub candidate_uid: Uid,
    pub origin_uid: Uid,
}

/// One hop of the leader announcement lap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeaderMessage {
    pub leader_uid: Uid,
    pub origin_uid: Uid,
}

/// Successor assignment issued by the registrar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SetSuccessorRequest {
    pub successor: Peer,
}

/// Explicit election start. `recovery` marks a detector-triggered election,
/// which bypasses the "valid leader exists" rejection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InitiateElectionRequest {
    #[serde(default)]
    pub recovery: bool,
}

/// Generic acknowledgment. `error` carries a stable error kind when the
/// operation was refused.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub accepted: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdResponse {
    pub uid: Uid,
}

/// Full status snapshot of a node.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub uid: Uid,
    pub alive: bool,
    pub state: ElectionState,
    /// The last accepted leader, absent before any election completed.
    pub leader_uid: Option<Uid>,
    pub is_leader: bool,
    /// Current successor along the ring, absent until the first rebuild.
    pub successor_uid: Option<Uid>,
    /// Election attempts made by this node so far.
    pub round: u32,
}

/// Liveness flag. A node that simulates a crash still answers this with
/// `alive: false`; an actually dead process answers nothing, and probers
/// treat both the same way.
#[derive(Debug, Serialize, Deserialize)]
pub struct AliveResponse {
    pub alive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetAliveRequest {
    pub alive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ElectionStateResponse {
    pub in_progress: bool,
    pub completed: bool,
}

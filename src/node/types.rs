use serde::{Deserialize, Serialize};

use crate::registrar::types::Uid;

/// Local phase of the election state machine.
///
/// A node cycles `Idle -> InProgress -> LeaderAnnounced -> Idle`; death is
/// tracked separately by the `alive` flag, since a dead node keeps its last
/// election phase for when it recovers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ElectionState {
    /// No election activity observed since the last reset.
    Idle,
    /// An election message has passed through (or originated) here and no
    /// leader has been announced yet.
    InProgress,
    /// A leader announcement has been accepted for the current round.
    /// Further election or announcement traffic is absorbed.
    LeaderAnnounced,
}

impl ElectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionState::Idle => "IDLE",
            ElectionState::InProgress => "IN_PROGRESS",
            ElectionState::LeaderAnnounced => "LEADER_ANNOUNCED",
        }
    }
}

/// Outcome of classifying an incoming election message against the local UID
/// and election phase. Computed under the election lock; acted on after it is
/// released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionAction {
    /// Pass a message along to the successor.
    /// The candidate is either the incoming one (larger than us) or our own
    /// UID superseding a smaller incoming candidate.
    Forward { candidate: Uid, origin: Uid },
    /// Our own token returned with ourselves as originator: the circuit is
    /// complete and this node is the leader.
    BecomeLeader,
    /// The candidate equals our UID but someone else originated it: re-enter
    /// the race as our own originator, suppressing the prior token.
    Usurp,
    /// A smaller candidate arrived while we already joined the race; it has
    /// been superseded locally and goes nowhere.
    Discard,
}

/// The Chang–Roberts forwarding rule.
///
/// Callers drop the message before ever calling this when the node is dead or
/// has already accepted a leader; `state` is therefore `Idle` or `InProgress`.
pub fn classify_election(
    uid: Uid,
    state: ElectionState,
    candidate: Uid,
    origin: Uid,
) -> ElectionAction {
    if candidate > uid {
        ElectionAction::Forward { candidate, origin }
    } else if candidate == uid {
        if origin == uid {
            ElectionAction::BecomeLeader
        } else {
            ElectionAction::Usurp
        }
    } else if state == ElectionState::Idle {
        ElectionAction::Forward {
            candidate: uid,
            origin,
        }
    } else {
        ElectionAction::Discard
    }
}

//! Error taxonomy for the election protocol.
//!
//! Protocol-level decisions (drop, forward, usurp) are design outcomes and are
//! never surfaced as errors; everything here is an operator- or caller-visible
//! failure. Each kind carries a stable wire name so remote callers can branch
//! on it without parsing display strings.

use axum::http::StatusCode;
use thiserror::Error;

use crate::registrar::types::Uid;

#[derive(Debug, Error)]
pub enum ElectionError {
    /// Registration rejected because the UID is already a member.
    #[error("node {0} is already registered")]
    DuplicateUid(Uid),

    /// Registration rejected while an election is running.
    #[error("election in progress; registration refused")]
    ElectionActive,

    /// The operation requires ring membership but no successor is assigned.
    #[error("no successor assigned; node is not part of a ring")]
    NoSuccessor,

    /// A remote call failed after exhausting its retry budget.
    #[error("remote call failed: {0}")]
    Transport(String),

    /// The local election round expired before a leader was announced.
    #[error("election round timed out")]
    ElectionTimeout,

    /// The round budget is exhausted; no automatic retry follows.
    #[error("election failed after {0} rounds")]
    ElectionFailed(u32),

    /// Election message for a completed or superseded round.
    #[error("stale election message discarded")]
    StaleMessage,
}

impl ElectionError {
    /// Stable wire identifier of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ElectionError::DuplicateUid(_) => "DUPLICATE_UID",
            ElectionError::ElectionActive => "ELECTION_ACTIVE",
            ElectionError::NoSuccessor => "NO_SUCCESSOR",
            ElectionError::Transport(_) => "TRANSPORT_FAILURE",
            ElectionError::ElectionTimeout => "ELECTION_TIMEOUT",
            ElectionError::ElectionFailed(_) => "ELECTION_FAILED",
            ElectionError::StaleMessage => "STALE_MESSAGE",
        }
    }

    /// HTTP status the handlers answer with for this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            ElectionError::DuplicateUid(_) => StatusCode::CONFLICT,
            ElectionError::ElectionActive => StatusCode::SERVICE_UNAVAILABLE,
            ElectionError::NoSuccessor => StatusCode::UNPROCESSABLE_ENTITY,
            ElectionError::Transport(_) => StatusCode::BAD_GATEWAY,
            ElectionError::ElectionTimeout => StatusCode::GATEWAY_TIMEOUT,
            ElectionError::ElectionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ElectionError::StaleMessage => StatusCode::OK,
        }
    }

    /// Maps a wire identifier back to the error kind, for typed clients.
    pub fn from_kind(kind: &str, uid: Uid) -> Option<Self> {
        match kind {
            "DUPLICATE_UID" => Some(ElectionError::DuplicateUid(uid)),
            "ELECTION_ACTIVE" => Some(ElectionError::ElectionActive),
            "NO_SUCCESSOR" => Some(ElectionError::NoSuccessor),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ElectionError::DuplicateUid(5).kind(), "DUPLICATE_UID");
        assert_eq!(ElectionError::ElectionActive.kind(), "ELECTION_ACTIVE");
        assert_eq!(ElectionError::NoSuccessor.kind(), "NO_SUCCESSOR");
        assert_eq!(
            ElectionError::Transport("boom".into()).kind(),
            "TRANSPORT_FAILURE"
        );
        assert_eq!(ElectionError::ElectionFailed(5).kind(), "ELECTION_FAILED");
    }

    #[test]
    fn registration_errors_round_trip_through_kind() {
        let err = ElectionError::from_kind("DUPLICATE_UID", 7).unwrap();
        assert!(matches!(err, ElectionError::DuplicateUid(7)));

        let err = ElectionError::from_kind("ELECTION_ACTIVE", 7).unwrap();
        assert!(matches!(err, ElectionError::ElectionActive));

        assert!(ElectionError::from_kind("SOMETHING_ELSE", 7).is_none());
    }
}

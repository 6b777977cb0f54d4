//! Node API Handlers
//!
//! HTTP endpoints that expose a node to the ring: the two message hops,
//! successor assignment, and the control/status surface. Handlers translate
//! requests into [`NodeService`] calls; protocol-level drops still answer
//! `200 OK`, since dropping is a designed outcome, not a failure.

use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use super::protocol::{
    AckResponse, AliveResponse, ElectionMessage, ElectionStateResponse, IdResponse,
    InitiateElectionRequest, LeaderMessage, SetAliveRequest, SetSuccessorRequest, StatusResponse,
    ENDPOINT_ALIVE, ENDPOINT_ELECTION, ENDPOINT_ELECTION_STATE, ENDPOINT_ID, ENDPOINT_INITIATE,
    ENDPOINT_LEADER, ENDPOINT_RECOVER, ENDPOINT_STATUS, ENDPOINT_SUCCESSOR,
};
use super::service::NodeService;

/// Builds the node's HTTP router over a shared service instance.
pub fn router(node: Arc<NodeService>) -> Router {
    Router::new()
        .route(ENDPOINT_ELECTION, post(handle_receive_election))
        .route(ENDPOINT_LEADER, post(handle_receive_leader))
        .route(ENDPOINT_INITIATE, post(handle_initiate_election))
        .route(ENDPOINT_ELECTION_STATE, get(handle_election_state))
        .route(ENDPOINT_SUCCESSOR, post(handle_set_successor))
        .route(ENDPOINT_ID, get(handle_id))
        .route(ENDPOINT_STATUS, get(handle_status))
        .route(ENDPOINT_ALIVE, get(handle_is_alive).post(handle_set_alive))
        .route(ENDPOINT_RECOVER, post(handle_recover))
        .layer(Extension(node))
}

async fn handle_receive_election(
    Extension(node): Extension<Arc<NodeService>>,
    Json(msg): Json<ElectionMessage>,
) -> (StatusCode, Json<AckResponse>) {
    node.receive_election(msg.candidate_uid, msg.origin_uid).await;
    (
        StatusCode::OK,
        Json(AckResponse {
            accepted: true,
            error: None,
        }),
    )
}

async fn handle_receive_leader(
    Extension(node): Extension<Arc<NodeService>>,
    Json(msg): Json<LeaderMessage>,
) -> (StatusCode, Json<AckResponse>) {
    node.receive_leader(msg.leader_uid, msg.origin_uid).await;
    (
        StatusCode::OK,
        Json(AckResponse {
            accepted: true,
            error: None,
        }),
    )
}

async fn handle_initiate_election(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<InitiateElectionRequest>,
) -> (StatusCode, Json<AckResponse>) {
    match node.initiate_election(req.recovery).await {
        Ok(()) => (
            StatusCode::OK,
            Json(AckResponse {
                accepted: true,
                error: None,
            }),
        ),
        Err(e) => (
            e.status(),
            Json(AckResponse {
                accepted: false,
                error: Some(e.kind().to_string()),
            }),
        ),
    }
}

async fn handle_election_state(
    Extension(node): Extension<Arc<NodeService>>,
) -> Json<ElectionStateResponse> {
    Json(ElectionStateResponse {
        in_progress: node.is_election_in_progress().await,
        completed: node.is_election_completed().await,
    })
}

async fn handle_set_successor(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<SetSuccessorRequest>,
) -> (StatusCode, Json<AckResponse>) {
    node.set_successor(req.successor).await;
    (
        StatusCode::OK,
        Json(AckResponse {
            accepted: true,
            error: None,
        }),
    )
}

async fn handle_id(Extension(node): Extension<Arc<NodeService>>) -> Json<IdResponse> {
    Json(IdResponse { uid: node.uid })
}

async fn handle_status(Extension(node): Extension<Arc<NodeService>>) -> Json<StatusResponse> {
    Json(node.status().await)
}

async fn handle_is_alive(Extension(node): Extension<Arc<NodeService>>) -> Json<AliveResponse> {
    Json(AliveResponse {
        alive: node.is_alive(),
    })
}

async fn handle_set_alive(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<SetAliveRequest>,
) -> (StatusCode, Json<AckResponse>) {
    node.set_alive(req.alive);
    (
        StatusCode::OK,
        Json(AckResponse {
            accepted: true,
            error: None,
        }),
    )
}

async fn handle_recover(
    Extension(node): Extension<Arc<NodeService>>,
) -> (StatusCode, Json<AckResponse>) {
    match node.recover().await {
        Ok(()) => (
            StatusCode::OK,
            Json(AckResponse {
                accepted: true,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("Node {}: recovery failed: {}", node.uid, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AckResponse {
                    accepted: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

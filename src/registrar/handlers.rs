//! Registrar API Handlers
//!
//! HTTP endpoints that expose the [`RegistrarService`] to nodes.
//! These handlers translate HTTP requests into service calls and map the
//! typed errors onto status codes plus stable error kinds in the body.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use super::protocol::{
    AckResponse, BeginElectionRequest, ClaimRecoveryResponse, DeregisterRequest, LookupResponse,
    MembersResponse, RebuildRingResponse, RegisterRequest, RegisterResponse, ENDPOINT_BEGIN_ELECTION,
    ENDPOINT_CLAIM_RECOVERY, ENDPOINT_DEREGISTER, ENDPOINT_END_ELECTION, ENDPOINT_LOOKUP,
    ENDPOINT_MEMBERS, ENDPOINT_REBUILD_RING, ENDPOINT_REGISTER, ENDPOINT_RELEASE_RECOVERY,
};
use super::service::RegistrarService;
use super::types::Uid;

/// Builds the registrar's HTTP router over a shared service instance.
pub fn router(service: Arc<RegistrarService>) -> Router {
    Router::new()
        .route(ENDPOINT_REGISTER, post(handle_register))
        .route(ENDPOINT_DEREGISTER, post(handle_deregister))
        .route(ENDPOINT_BEGIN_ELECTION, post(handle_begin_election))
        .route(ENDPOINT_END_ELECTION, post(handle_end_election))
        .route(ENDPOINT_MEMBERS, get(handle_members))
        .route(ENDPOINT_REBUILD_RING, post(handle_rebuild_ring))
        .route(ENDPOINT_CLAIM_RECOVERY, post(handle_claim_recovery))
        .route(ENDPOINT_RELEASE_RECOVERY, post(handle_release_recovery))
        .route(&format!("{}/:uid", ENDPOINT_LOOKUP), get(handle_lookup))
        .layer(Extension(service))
}

async fn handle_register(
    Extension(registrar): Extension<Arc<RegistrarService>>,
    Json(req): Json<RegisterRequest>,
) -> (StatusCode, Json<RegisterResponse>) {
    match registrar.register(req.uid, req.addr).await {
        Ok(()) => (
            StatusCode::OK,
            Json(RegisterResponse {
                registered: true,
                error: None,
            }),
        ),
        Err(e) => (
            e.status(),
            Json(RegisterResponse {
                registered: false,
                error: Some(e.kind().to_string()),
            }),
        ),
    }
}

async fn handle_deregister(
    Extension(registrar): Extension<Arc<RegistrarService>>,
    Json(req): Json<DeregisterRequest>,
) -> (StatusCode, Json<AckResponse>) {
    registrar.deregister(req.uid).await;
    (StatusCode::OK, Json(AckResponse { ok: true }))
}

async fn handle_begin_election(
    Extension(registrar): Extension<Arc<RegistrarService>>,
    Json(req): Json<BeginElectionRequest>,
) -> (StatusCode, Json<AckResponse>) {
    registrar.begin_election(req.recovery);
    (StatusCode::OK, Json(AckResponse { ok: true }))
}

async fn handle_end_election(
    Extension(registrar): Extension<Arc<RegistrarService>>,
) -> (StatusCode, Json<AckResponse>) {
    registrar.end_election();
    (StatusCode::OK, Json(AckResponse { ok: true }))
}

async fn handle_members(
    Extension(registrar): Extension<Arc<RegistrarService>>,
) -> (StatusCode, Json<MembersResponse>) {
    let members = registrar.members().await;
    (StatusCode::OK, Json(MembersResponse { members }))
}

async fn handle_rebuild_ring(
    Extension(registrar): Extension<Arc<RegistrarService>>,
) -> (StatusCode, Json<RebuildRingResponse>) {
    match registrar.rebuild_ring().await {
        Ok(ring) => (
            StatusCode::OK,
            Json(RebuildRingResponse {
                rebuilt: !ring.is_empty(),
                ring,
            }),
        ),
        Err(e) => {
            tracing::error!("Ring rebuild failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RebuildRingResponse {
                    rebuilt: false,
                    ring: Vec::new(),
                }),
            )
        }
    }
}

async fn handle_claim_recovery(
    Extension(registrar): Extension<Arc<RegistrarService>>,
) -> (StatusCode, Json<ClaimRecoveryResponse>) {
    let claimed = registrar.try_claim_recovery();
    (StatusCode::OK, Json(ClaimRecoveryResponse { claimed }))
}

async fn handle_release_recovery(
    Extension(registrar): Extension<Arc<RegistrarService>>,
) -> (StatusCode, Json<AckResponse>) {
    registrar.release_recovery();
    (StatusCode::OK, Json(AckResponse { ok: true }))
}

async fn handle_lookup(
    Extension(registrar): Extension<Arc<RegistrarService>>,
    Path(uid): Path<Uid>,
) -> Result<Json<LookupResponse>, StatusCode> {
    match registrar.lookup(uid) {
        Some(addr) => Ok(Json(LookupResponse { uid, addr })),
        None => Err(StatusCode::NOT_FOUND),
    }
}

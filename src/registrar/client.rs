//! Typed client for the registrar endpoint, used by every node.

use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ElectionError;

use super::protocol::{
    BeginElectionRequest, ClaimRecoveryResponse, DeregisterRequest, LookupResponse,
    MembersResponse, RebuildRingResponse, RegisterRequest, RegisterResponse,
    ENDPOINT_BEGIN_ELECTION, ENDPOINT_CLAIM_RECOVERY, ENDPOINT_DEREGISTER, ENDPOINT_END_ELECTION,
    ENDPOINT_LOOKUP, ENDPOINT_MEMBERS, ENDPOINT_REBUILD_RING, ENDPOINT_REGISTER,
    ENDPOINT_RELEASE_RECOVERY,
};
use super::types::Uid;

/// How long a registrar control call may take. Ring rebuilds probe every
/// member, so this is deliberately generous.
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RegistrarClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl RegistrarClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Registers this node. Maps a refusal back onto the typed error so the
    /// caller can distinguish a duplicate UID from an election gate.
    pub async fn register(&self, uid: Uid, addr: SocketAddr) -> Result<(), ElectionError> {
        let url = format!("{}{}", self.base_url, ENDPOINT_REGISTER);
        let response = self
            .http_client
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .json(&RegisterRequest { uid, addr })
            .send()
            .await
            .map_err(|e| ElectionError::Transport(e.to_string()))?;

        let body: RegisterResponse = response
            .json()
            .await
            .map_err(|e| ElectionError::Transport(e.to_string()))?;

        if body.registered {
            return Ok(());
        }
        match body.error.as_deref().and_then(|kind| ElectionError::from_kind(kind, uid)) {
            Some(err) => Err(err),
            None => Err(ElectionError::Transport(
                "registration refused without an error kind".to_string(),
            )),
        }
    }

    pub async fn deregister(&self, uid: Uid) -> Result<()> {
        let url = format!("{}{}", self.base_url, ENDPOINT_DEREGISTER);
        self.http_client
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .json(&DeregisterRequest { uid })
            .send()
            .await
            .context("deregister call failed")?
            .error_for_status()?;
        Ok(())
    }

    pub async fn begin_election(&self, recovery: bool) -> Result<()> {
        let url = format!("{}{}", self.base_url, ENDPOINT_BEGIN_ELECTION);
        self.http_client
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .json(&BeginElectionRequest { recovery })
            .send()
            .await
            .context("begin-election call failed")?
            .error_for_status()?;
        Ok(())
    }

    pub async fn end_election(&self) -> Result<()> {
        let url = format!("{}{}", self.base_url, ENDPOINT_END_ELECTION);
        self.http_client
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .context("end-election call failed")?
            .error_for_status()?;
        Ok(())
    }

    pub async fn members(&self) -> Result<Vec<Uid>> {
        let url = format!("{}{}", self.base_url, ENDPOINT_MEMBERS);
        let body: MembersResponse = self
            .http_client
            .get(&url)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .context("members call failed")?
            .json()
            .await?;
        Ok(body.members)
    }

    /// Requests an atomic ring rebuild. Returns the new ring order, empty
    /// when the registrar found insufficient live members.
    pub async fn rebuild_ring(&self) -> Result<Vec<Uid>> {
        let url = format!("{}{}", self.base_url, ENDPOINT_REBUILD_RING);
        let body: RebuildRingResponse = self
            .http_client
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .context("rebuild-ring call failed")?
            .json()
            .await?;
        Ok(body.ring)
    }

    /// Attempts the cluster-wide compare-and-set on the recovery coordinator
    /// role. `Ok(true)` means this caller is the single winner.
    pub async fn try_claim_recovery(&self) -> Result<bool> {
        let url = format!("{}{}", self.base_url, ENDPOINT_CLAIM_RECOVERY);
        let body: ClaimRecoveryResponse = self
            .http_client
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .context("claim-recovery call failed")?
            .json()
            .await?;
        Ok(body.claimed)
    }

    pub async fn release_recovery(&self) -> Result<()> {
        let url = format!("{}{}", self.base_url, ENDPOINT_RELEASE_RECOVERY);
        self.http_client
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .context("release-recovery call failed")?
            .error_for_status()?;
        Ok(())
    }

    /// Name-registry lookup of a node's endpoint address.
    pub async fn lookup(&self, uid: Uid) -> Result<SocketAddr> {
        let url = format!("{}{}/{}", self.base_url, ENDPOINT_LOOKUP, uid);
        let response = self
            .http_client
            .get(&url)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .context("lookup call failed")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(anyhow!("node {} is not registered", uid));
        }
        let body: LookupResponse = response.error_for_status()?.json().await?;
        Ok(body.addr)
    }
}

use anyhow::Result;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::ElectionError;
use crate::node::protocol::{
    AliveResponse, SetSuccessorRequest, ENDPOINT_ALIVE, ENDPOINT_SUCCESSOR,
};

use super::types::{Peer, Uid};

/// How long a liveness probe may take before the member is skipped.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
/// How long a successor assignment may take before it is logged and skipped.
const ASSIGN_TIMEOUT: Duration = Duration::from_secs(5);

/// The central membership authority.
///
/// Tracks registered nodes, gates registration while an election runs, owns
/// the cluster-wide recovery-coordinator guard, and (re)builds the ring by
/// assigning each live node its successor. A single instance serves the whole
/// deployment for its lifetime.
pub struct RegistrarService {
    /// Registered UIDs in insertion order (bookkeeping view).
    members: Mutex<Vec<Uid>>,
    /// UID -> HTTP address of the node's endpoint (the name registry).
    addrs: DashMap<Uid, SocketAddr>,
    /// True while an election is running; registrations are refused.
    election_in_progress: AtomicBool,
    /// True when the current election was triggered by leader failure.
    recovery_mode: AtomicBool,
    /// Single-writer guard for the recovery coordinator role.
    recovery_initiated: AtomicBool,
    /// Serializes ring mutations. Held for the whole probe/sort/assign pass.
    ring_lock: Mutex<()>,
    http_client: reqwest::Client,
}

impl RegistrarService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            members: Mutex::new(Vec::new()),
            addrs: DashMap::new(),
            election_in_progress: AtomicBool::new(false),
            recovery_mode: AtomicBool::new(false),
            recovery_initiated: AtomicBool::new(false),
            ring_lock: Mutex::new(()),
            http_client: reqwest::Client::new(),
        })
    }

    /// Admits a new node.
    ///
    /// Refused with `ELECTION_ACTIVE` while an election is running and with
    /// `DUPLICATE_UID` when the UID is already a member. On success the node
    /// is appended to the membership list and, once at least two members
    /// exist, the ring is rebuilt to include it.
    pub async fn register(&self, uid: Uid, addr: SocketAddr) -> Result<(), ElectionError> {
        info!("Registration attempt for node {} at {}", uid, addr);

        if self.election_in_progress.load(Ordering::SeqCst) {
            warn!("Refusing registration of node {}: election in progress", uid);
            return Err(ElectionError::ElectionActive);
        }

        let member_count = {
            let mut members = self.members.lock().await;
            if members.contains(&uid) {
                warn!("Refusing registration of node {}: duplicate UID", uid);
                return Err(ElectionError::DuplicateUid(uid));
            }
            members.push(uid);
            self.addrs.insert(uid, addr);
            members.len()
        };

        info!("Node {} registered ({} members)", uid, member_count);

        if member_count >= 2 {
            if let Err(e) = self.rebuild_ring().await {
                warn!("Ring rebuild after registration failed: {}", e);
            }
        }

        Ok(())
    }

    /// Removes a node on explicit shutdown and reconciles the ring over the
    /// remaining members.
    pub async fn deregister(&self, uid: Uid) {
        {
            let mut members = self.members.lock().await;
            members.retain(|member| *member != uid);
            self.addrs.remove(&uid);
        }
        info!("Node {} deregistered", uid);

        if let Err(e) = self.rebuild_ring().await {
            warn!("Ring rebuild after deregistration failed: {}", e);
        }
    }

    /// Marks an election as started, pausing registrations.
    ///
    /// A duplicate start while one is already running is a no-op. The
    /// recovery flag is recorded only when this call actually starts the
    /// election, so a racing second starter cannot relabel it.
    pub fn begin_election(&self, recovery: bool) {
        if self.election_in_progress.swap(true, Ordering::SeqCst) {
            warn!("Duplicate election start ignored (election already in progress)");
            return;
        }
        self.recovery_mode.store(recovery, Ordering::SeqCst);
        info!(
            "Election started{}; registrations paused",
            if recovery { " (recovery)" } else { "" }
        );
    }

    /// Marks the election as finished, resuming registrations and releasing
    /// the recovery guard. Idempotent.
    pub fn end_election(&self) {
        self.election_in_progress.store(false, Ordering::SeqCst);
        self.recovery_mode.store(false, Ordering::SeqCst);
        self.recovery_initiated.store(false, Ordering::SeqCst);
        info!("Election ended; registrations resumed");
    }

    pub fn is_election_in_progress(&self) -> bool {
        self.election_in_progress.load(Ordering::SeqCst)
    }

    pub fn is_recovery_mode(&self) -> bool {
        self.recovery_mode.load(Ordering::SeqCst)
    }

    /// Attempts to claim the recovery coordinator role.
    ///
    /// Compare-and-set false -> true: among all detectors reporting the same
    /// leader failure, exactly one gets `true`. The guard clears on
    /// `end_election` or an explicit `release_recovery`.
    pub fn try_claim_recovery(&self) -> bool {
        let claimed = self
            .recovery_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if claimed {
            info!("Recovery coordinator role claimed");
        } else {
            debug!("Recovery coordinator role already claimed");
        }
        claimed
    }

    /// Releases the recovery guard so another detector may retry after a
    /// failed recovery initiation.
    pub fn release_recovery(&self) {
        self.recovery_initiated.store(false, Ordering::SeqCst);
        debug!("Recovery coordinator role released");
    }

    /// Snapshot of the membership list in registration order.
    pub async fn members(&self) -> Vec<Uid> {
        self.members.lock().await.clone()
    }

    /// Resolves a UID to the address its endpoint is bound to.
    pub fn lookup(&self, uid: Uid) -> Option<SocketAddr> {
        self.addrs.get(&uid).map(|entry| *entry.value())
    }

    /// Atomically rebuilds the ring topology.
    ///
    /// Under the ring lock: probes every member's liveness, sorts the live
    /// UIDs ascending, and assigns each node the next-larger live UID as its
    /// successor (wrapping from the largest to the smallest). Unreachable or
    /// down nodes are skipped; a failed successor assignment is logged and
    /// the pass continues, leaving the next rebuild to reconcile. Returns the
    /// resulting ring order, or an empty vector when fewer than two live
    /// members exist and the topology was left unchanged.
    pub async fn rebuild_ring(&self) -> Result<Vec<Uid>> {
        let _guard = self.ring_lock.lock().await;

        let members = self.members.lock().await.clone();

        let mut live: Vec<Peer> = Vec::with_capacity(members.len());
        for uid in members {
            let Some(addr) = self.lookup(uid) else {
                continue;
            };
            if self.probe_alive(addr).await {
                live.push(Peer { uid, addr });
            } else {
                debug!("Skipping node {} during rebuild (down or unreachable)", uid);
            }
        }

        live.sort_by_key(|peer| peer.uid);

        if live.len() < 2 {
            info!(
                "Ring rebuild skipped: insufficient members ({} live)",
                live.len()
            );
            return Ok(Vec::new());
        }

        for (i, peer) in live.iter().enumerate() {
            let successor = live[(i + 1) % live.len()];
            if let Err(e) = self.assign_successor(*peer, successor).await {
                warn!(
                    "Failed to assign successor {} to node {}: {}",
                    successor.uid, peer.uid, e
                );
            }
        }

        let ring: Vec<Uid> = live.iter().map(|peer| peer.uid).collect();
        info!("Ring rebuilt: {:?}", ring);
        Ok(ring)
    }

    /// One liveness probe against a node's `/alive` endpoint.
    /// Transport failure or an explicit `alive == false` both count as down.
    async fn probe_alive(&self, addr: SocketAddr) -> bool {
        let url = format!("http://{}{}", addr, ENDPOINT_ALIVE);
        let response = self
            .http_client
            .get(&url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(response) => match response.json::<AliveResponse>().await {
                Ok(body) => body.alive,
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    async fn assign_successor(&self, target: Peer, successor: Peer) -> Result<()> {
        let url = format!("http://{}{}", target.addr, ENDPOINT_SUCCESSOR);
        self.http_client
            .post(&url)
            .timeout(ASSIGN_TIMEOUT)
            .json(&SetSuccessorRequest { successor })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

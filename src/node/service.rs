use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ElectionError;
use crate::registrar::client::RegistrarClient;
use crate::registrar::types::{Peer, Uid};

use super::protocol::{
    ElectionMessage, LeaderMessage, StatusResponse, ENDPOINT_ELECTION, ENDPOINT_LEADER,
};
use super::types::{classify_election, ElectionAction, ElectionState};

/// How long a single hop to the successor may take before it counts as one
/// failed attempt against the retry budget.
const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// A participating process in the election ring.
///
/// Owns the UID, the successor handle, the election state machine and the
/// counters behind it. Incoming messages are classified under the election
/// lock and forwarded on detached tasks, so a slow successor never blocks the
/// handler that received the message.
pub struct NodeService {
    pub uid: Uid,
    http_addr: SocketAddr,
    config: Config,
    registrar: RegistrarClient,
    /// Next node along the ring; set only by the registrar.
    successor: RwLock<Option<Peer>>,
    /// False simulates a crash: messages are dropped, probes report down.
    alive: AtomicBool,
    /// Last accepted leader UID; 0 means none.
    leader: AtomicU32,
    /// Election phase. The lock is held only for classification and
    /// multi-field transitions, never across a network call.
    state: Mutex<ElectionState>,
    /// Monotonic count of election attempts started by this node.
    round: AtomicU32,
    /// Set while this node holds the recovery coordinator role.
    recovery_coordinated: AtomicBool,
    /// Cleared on shutdown so schedulers and timers exit promptly.
    running: AtomicBool,
    http_client: reqwest::Client,
}

impl NodeService {
    pub fn new(
        uid: Uid,
        http_addr: SocketAddr,
        registrar: RegistrarClient,
        config: Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            uid,
            http_addr,
            config,
            registrar,
            successor: RwLock::new(None),
            alive: AtomicBool::new(true),
            leader: AtomicU32::new(0),
            state: Mutex::new(ElectionState::Idle),
            round: AtomicU32::new(0),
            recovery_coordinated: AtomicBool::new(false),
            running: AtomicBool::new(true),
            http_client: reqwest::Client::new(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registrar(&self) -> &RegistrarClient {
        &self.registrar
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signals shutdown to the heartbeat scheduler and pending timers.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn leader_uid(&self) -> Option<Uid> {
        match self.leader.load(Ordering::SeqCst) {
            0 => None,
            uid => Some(uid),
        }
    }

    pub fn is_leader(&self) -> bool {
        self.leader_uid() == Some(self.uid)
    }

    pub fn round(&self) -> u32 {
        self.round.load(Ordering::SeqCst)
    }

    pub async fn successor(&self) -> Option<Peer> {
        *self.successor.read().await
    }

    /// Installs the successor handle. Called by the registrar during rebuilds.
    pub async fn set_successor(&self, peer: Peer) {
        let mut successor = self.successor.write().await;
        debug!("Node {}: successor set to {}", self.uid, peer.uid);
        *successor = Some(peer);
    }

    pub async fn current_state(&self) -> ElectionState {
        *self.state.lock().await
    }

    pub async fn is_election_in_progress(&self) -> bool {
        self.current_state().await == ElectionState::InProgress
    }

    pub async fn is_election_completed(&self) -> bool {
        self.current_state().await == ElectionState::LeaderAnnounced && self.leader_uid().is_some()
    }

    pub async fn status(&self) -> StatusResponse {
        StatusResponse {
            uid: self.uid,
            alive: self.is_alive(),
            state: self.current_state().await,
            leader_uid: self.leader_uid(),
            is_leader: self.is_leader(),
            successor_uid: self.successor().await.map(|peer| peer.uid),
            round: self.round(),
        }
    }

    /// Simulates a crash (`false`) or revives the process (`true`).
    /// A revived node stays out of the ring until the next rebuild.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
        if alive {
            info!("Node {}: back up", self.uid);
        } else {
            info!(
                "Node {}: simulating failure (messages dropped, probes fail)",
                self.uid
            );
        }
    }

    /// Clears election state back to idle: no leader, round counter zeroed.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = ElectionState::Idle;
        self.leader.store(0, Ordering::SeqCst);
        self.round.store(0, Ordering::SeqCst);
        self.recovery_coordinated.store(false, Ordering::SeqCst);
        debug!("Node {}: election state reset", self.uid);
    }

    /// Clears leader state only while `failed` is still the accepted leader.
    ///
    /// Failure detection races against election traffic: a probe of the old
    /// leader may complete after a recovery election already announced a new
    /// one, and that stale observation must not clobber the newer outcome.
    /// Returns whether the state was actually cleared.
    pub async fn clear_failed_leader(&self, failed: Uid) -> bool {
        let mut state = self.state.lock().await;
        if self.leader.load(Ordering::SeqCst) != failed {
            debug!(
                "Node {}: leader changed since the failed probe of {}, keeping state",
                self.uid, failed
            );
            return false;
        }
        *state = ElectionState::Idle;
        self.leader.store(0, Ordering::SeqCst);
        self.round.store(0, Ordering::SeqCst);
        true
    }

    /// Revives the node and rejoins the ring via a registrar rebuild.
    pub async fn recover(&self) -> anyhow::Result<()> {
        self.set_alive(true);
        self.reset().await;
        self.registrar.rebuild_ring().await?;
        info!("Node {}: recovered and rejoined the ring", self.uid);
        Ok(())
    }

    /// Handles one hop of the election circulation.
    ///
    /// The election lock is held only to classify the message and apply the
    /// state transition; the resulting forward (if any) runs on its own task.
    pub async fn receive_election(self: Arc<Self>, candidate: Uid, origin: Uid) {
        if !self.is_alive() {
            debug!(
                "Node {}: down, dropping election message ({}, {})",
                self.uid, candidate, origin
            );
            return;
        }

        let action = {
            let mut state = self.state.lock().await;
            if *state == ElectionState::LeaderAnnounced {
                debug!(
                    "Node {}: {} ({}, {})",
                    self.uid,
                    ElectionError::StaleMessage,
                    candidate,
                    origin
                );
                None
            } else {
                let action = classify_election(self.uid, *state, candidate, origin);
                if matches!(action, ElectionAction::Forward { .. } | ElectionAction::Usurp) {
                    *state = ElectionState::InProgress;
                }
                Some(action)
            }
        };

        match action {
            None => {}
            Some(ElectionAction::Discard) => {
                debug!(
                    "Node {}: discarding superseded candidate {} (origin {})",
                    self.uid, candidate, origin
                );
            }
            Some(ElectionAction::Forward { candidate, origin }) => {
                debug!(
                    "Node {}: forwarding election message ({}, {})",
                    self.uid, candidate, origin
                );
                self.spawn_election_hop(candidate, origin);
            }
            Some(ElectionAction::Usurp) => {
                info!(
                    "Node {}: usurping token from origin {}, re-entering as own originator",
                    self.uid, origin
                );
                let uid = self.uid;
                self.spawn_election_hop(uid, uid);
            }
            Some(ElectionAction::BecomeLeader) => {
                self.announce_leader().await;
            }
        }
    }

    /// Invoked when this node's own token completed the circuit: adopt
    /// ourselves as leader, close the election at the registrar, and start
    /// the announcement lap.
    async fn announce_leader(self: Arc<Self>) {
        {
            let mut state = self.state.lock().await;
            self.leader.store(self.uid, Ordering::SeqCst);
            *state = ElectionState::LeaderAnnounced;
        }
        info!("Node {}: circuit complete, elected leader", self.uid);

        if let Err(e) = self.registrar.end_election().await {
            warn!(
                "Node {}: failed to close election at registrar: {}",
                self.uid, e
            );
        }
        self.recovery_coordinated.store(false, Ordering::SeqCst);

        let uid = self.uid;
        self.spawn_leader_hop(uid, uid);
    }

    /// Handles one hop of the leader announcement lap.
    ///
    /// The first receipt per election is accepted; every later one carries
    /// the same winner and is absorbed, which is what terminates the lap
    /// after a single traversal. An announcement naming a *different* leader
    /// can only come from a newer election (the previous winner is gone) and
    /// is adopted even by a node that missed the recovery reset, so no node
    /// is left pinned to a dead leader.
    pub async fn receive_leader(self: Arc<Self>, leader: Uid, origin: Uid) {
        if !self.is_alive() {
            debug!(
                "Node {}: down, dropping leader announcement {}",
                self.uid, leader
            );
            return;
        }

        let adopted = {
            let mut state = self.state.lock().await;
            let already_announced = *state == ElectionState::LeaderAnnounced
                && self.leader.load(Ordering::SeqCst) == leader;
            if already_announced {
                false
            } else {
                self.leader.store(leader, Ordering::SeqCst);
                *state = ElectionState::LeaderAnnounced;
                true
            }
        };

        if !adopted {
            debug!(
                "Node {}: duplicate leader announcement {} absorbed",
                self.uid, leader
            );
            return;
        }

        info!("Node {}: new leader is {}", self.uid, leader);

        // The announcement stops once it reaches the leader again.
        if leader == self.uid {
            debug!(
                "Node {}: own announcement returned, stopping propagation",
                self.uid
            );
            return;
        }
        self.spawn_leader_hop(leader, origin);
    }

    /// Starts an election from this node.
    ///
    /// `recovery` marks a detector-triggered election, which skips the
    /// "valid leader exists" rejection because the caller has just cleared
    /// that state. The registrar's `begin_election` completes before the
    /// first message is emitted, and a ring rebuild stabilizes the topology
    /// the token will travel.
    pub async fn initiate_election(self: Arc<Self>, recovery: bool) -> Result<(), ElectionError> {
        if !self.is_alive() {
            warn!("Node {}: down; recover before starting an election", self.uid);
            return Ok(());
        }
        if self.successor().await.is_none() {
            return Err(ElectionError::NoSuccessor);
        }
        if self.is_election_in_progress().await {
            info!(
                "Node {}: election already in progress, not starting another",
                self.uid
            );
            return Ok(());
        }
        if !recovery {
            if let Some(leader) = self.leader_uid() {
                info!(
                    "Node {}: valid leader {} exists, election not required",
                    self.uid, leader
                );
                return Ok(());
            }
        }

        self.registrar
            .begin_election(recovery)
            .await
            .map_err(|e| ElectionError::Transport(e.to_string()))?;

        // Pre-election stabilization; the ring the token travels is the one
        // this rebuild produces.
        if let Err(e) = self.registrar.rebuild_ring().await {
            warn!("Node {}: pre-election ring rebuild failed: {}", self.uid, e);
        }

        if self.successor().await.is_none() {
            // Nothing to circulate on; release the gate we just took.
            if let Err(e) = self.registrar.end_election().await {
                warn!("Node {}: failed to release election gate: {}", self.uid, e);
            }
            return Err(ElectionError::NoSuccessor);
        }

        let round = self.round.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock().await;
            *state = ElectionState::InProgress;
        }
        info!(
            "Node {}: initiating election{} (round {})",
            self.uid,
            if recovery { " [recovery]" } else { "" },
            round
        );

        let uid = self.uid;
        self.clone().spawn_election_hop(uid, uid);
        self.arm_election_timeout(round, recovery);
        Ok(())
    }

    /// Arms the per-round election timeout. The round tag keeps a stale timer
    /// from resetting a newer attempt.
    fn arm_election_timeout(self: Arc<Self>, round: u32, recovery: bool) {
        tokio::spawn(async move {
            tokio::time::sleep(self.config.election_timeout).await;
            self.on_election_timeout(round, recovery).await;
        });
    }

    async fn on_election_timeout(self: Arc<Self>, round: u32, recovery: bool) {
        if !self.is_running() || !self.is_alive() {
            return;
        }
        {
            let mut state = self.state.lock().await;
            if *state != ElectionState::InProgress || self.round.load(Ordering::SeqCst) != round {
                // Completed, reset, or superseded by a newer attempt.
                return;
            }
            *state = ElectionState::Idle;
        }
        warn!(
            "Node {}: round {}: {} (after {:?})",
            self.uid,
            round,
            ElectionError::ElectionTimeout,
            self.config.election_timeout
        );

        if round < self.config.max_rounds {
            info!(
                "Node {}: retrying election ({} of {} rounds used)",
                self.uid, round, self.config.max_rounds
            );
            if let Err(e) = self.clone().initiate_election(recovery).await {
                warn!("Node {}: election retry failed: {}", self.uid, e);
            }
        } else {
            tracing::error!("Node {}: {}", self.uid, ElectionError::ElectionFailed(round));
            // The round budget is spent; release the gate so the cluster is
            // not left refusing registrations.
            if let Err(e) = self.registrar.end_election().await {
                warn!("Node {}: failed to release election gate: {}", self.uid, e);
            }
        }
    }

    pub fn set_recovery_coordinated(&self, coordinated: bool) {
        self.recovery_coordinated.store(coordinated, Ordering::SeqCst);
    }

    pub fn is_recovery_coordinated(&self) -> bool {
        self.recovery_coordinated.load(Ordering::SeqCst)
    }

    fn spawn_election_hop(self: Arc<Self>, candidate: Uid, origin: Uid) {
        tokio::spawn(async move {
            self.forward_with_retries(
                ENDPOINT_ELECTION,
                ElectionMessage {
                    candidate_uid: candidate,
                    origin_uid: origin,
                },
                "election message",
            )
            .await;
        });
    }

    fn spawn_leader_hop(self: Arc<Self>, leader: Uid, origin: Uid) {
        tokio::spawn(async move {
            self.forward_with_retries(
                ENDPOINT_LEADER,
                LeaderMessage {
                    leader_uid: leader,
                    origin_uid: origin,
                },
                "leader announcement",
            )
            .await;
        });
    }

    /// Delivers one outbound ring message to the current successor.
    ///
    /// The delay preamble simulates link latency and serializes hop ordering.
    /// The successor handle is re-read on every attempt so a ring rebuild
    /// finishing mid-retry takes effect. On an exhausted budget the message
    /// is not retransmitted; a ring rebuild is requested and the election
    /// timeout re-drives progress.
    async fn forward_with_retries<T: serde::Serialize>(
        &self,
        endpoint: &'static str,
        message: T,
        what: &'static str,
    ) {
        tokio::time::sleep(self.config.network_delay).await;

        let retries = self.config.forward_retries.max(1);
        for attempt in 1..=retries {
            let Some(successor) = self.successor().await else {
                warn!("Node {}: no successor to forward {} to", self.uid, what);
                return;
            };

            let url = format!("http://{}{}", successor.addr, endpoint);
            match self
                .http_client
                .post(&url)
                .timeout(FORWARD_TIMEOUT)
                .json(&message)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!(
                        "Node {}: {} delivered to successor {}",
                        self.uid, what, successor.uid
                    );
                    return;
                }
                Ok(response) => {
                    warn!(
                        "Node {}: successor {} answered {} for {}, attempt {}/{}",
                        self.uid,
                        successor.uid,
                        response.status(),
                        what,
                        attempt,
                        retries
                    );
                }
                Err(e) => {
                    warn!(
                        "Node {}: failed to forward {} to successor {}, attempt {}/{}: {}",
                        self.uid, what, successor.uid, attempt, retries, e
                    );
                }
            }

            if attempt < retries {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        warn!(
            "Node {}: forwarding {} exhausted {} retries; requesting ring rebuild",
            self.uid, what, retries
        );
        if let Err(e) = self.registrar.rebuild_ring().await {
            warn!("Node {}: ring rebuild request failed: {}", self.uid, e);
        }
    }
}

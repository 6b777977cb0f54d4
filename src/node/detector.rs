//! Leader Failure Detector
//!
//! Every non-leader node runs a periodic probe against the current leader.
//! A failed probe starts the recovery path: all observers clear their local
//! leader state, and the single winner of the registrar's compare-and-set
//! guard rebuilds the ring and initiates the recovery election. The losers
//! wait for that election's traffic to reach them.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::service::NodeService;
use crate::registrar::types::Uid;

/// Probe timeout. A probe either answers within this window or the leader
/// counts as down; the next heartbeat cycle is the only retry.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Spawns the heartbeat scheduler for this node. The loop exits when the
/// node's running flag clears.
pub fn start(node: Arc<NodeService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { run(node).await })
}

async fn run(node: Arc<NodeService>) {
    let period = node.config().heartbeat_interval;

    // Stagger the first probe so detectors across the cluster do not all
    // observe a failure in the same instant.
    let jitter = rand::thread_rng().gen_range(0..period.as_millis().max(2) as u64);
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    let http_client = reqwest::Client::new();
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;
        if !node.is_running() {
            debug!("Node {}: heartbeat scheduler stopping", node.uid);
            return;
        }

        // Probes run only from live, non-leader nodes that have accepted a
        // leader announcement.
        if !node.is_alive() || node.is_leader() {
            continue;
        }
        let Some(leader) = node.leader_uid() else {
            continue;
        };
        if !node.is_election_completed().await {
            continue;
        }

        if probe_leader(&node, &http_client, leader).await {
            debug!("Node {}: leader {} is healthy", node.uid, leader);
            continue;
        }

        warn!("Node {}: leader {} failed its probe", node.uid, leader);
        handle_leader_failure(&node, leader).await;
    }
}

/// One probe cycle: resolve the leader through the registrar, then hit its
/// `/alive` endpoint. Any failure along the way is definitive.
async fn probe_leader(node: &Arc<NodeService>, http_client: &reqwest::Client, leader: Uid) -> bool {
    let addr = match node.registrar().lookup(leader).await {
        Ok(addr) => addr,
        Err(e) => {
            debug!("Node {}: leader {} lookup failed: {}", node.uid, leader, e);
            return false;
        }
    };

    let url = format!("http://{}{}", addr, super::protocol::ENDPOINT_ALIVE);
    match http_client.get(&url).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) => match response.json::<super::protocol::AliveResponse>().await {
            Ok(body) => body.alive,
            Err(_) => false,
        },
        Err(_) => false,
    }
}

async fn handle_leader_failure(node: &Arc<NodeService>, failed: Uid) {
    let claimed = match node.registrar().try_claim_recovery().await {
        Ok(claimed) => claimed,
        Err(e) => {
            warn!("Node {}: recovery claim failed: {}", node.uid, e);
            false
        }
    };

    // Winner and losers alike clear local leader state; a node still in
    // LeaderAnnounced would drop the recovery election's messages. The clear
    // is conditional on the failed leader still being the accepted one, so a
    // stale probe cannot wipe a newer election's outcome.
    let cleared = node.clear_failed_leader(failed).await;
    if !cleared {
        if claimed {
            if let Err(e) = node.registrar().release_recovery().await {
                warn!("Node {}: recovery claim release failed: {}", node.uid, e);
            }
        }
        return;
    }

    if !claimed {
        info!(
            "Node {}: another node is coordinating recovery, waiting for election traffic",
            node.uid
        );
        return;
    }

    node.set_recovery_coordinated(true);
    info!("Node {}: coordinating recovery election", node.uid);

    if let Err(e) = node.registrar().rebuild_ring().await {
        warn!("Node {}: recovery ring rebuild failed: {}", node.uid, e);
    }

    if let Err(e) = Arc::clone(node).initiate_election(true).await {
        warn!(
            "Node {}: recovery election initiation failed: {}; releasing claim",
            node.uid, e
        );
        node.set_recovery_coordinated(false);
        if let Err(e) = node.registrar().release_recovery().await {
            warn!("Node {}: recovery claim release failed: {}", node.uid, e);
        }
    }
}

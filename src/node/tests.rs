//! Node Module Tests
//!
//! Validates the Chang–Roberts decision table, the election state machine,
//! and the full election scenarios over in-process clusters (registrar plus
//! node endpoints on ephemeral ports, millisecond-scale timings).
//!
//! ## Test Scopes
//! - **Decision table**: every forwarding rule as a pure function.
//! - **State machine**: drops while down, announcement idempotency, resets.
//! - **Elections end to end**: clean election, initiator-is-maximum lap,
//!   concurrent initiators, timeout retry exhaustion, leader failure and
//!   recovery re-election.

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::error::ElectionError;
    use crate::node::detector;
    use crate::node::handlers;
    use crate::node::service::NodeService;
    use crate::node::types::{classify_election, ElectionAction, ElectionState};
    use crate::registrar::client::RegistrarClient;
    use crate::registrar::handlers as registrar_handlers;
    use crate::registrar::service::RegistrarService;
    use crate::registrar::types::{Peer, Uid};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn test_config() -> Config {
        Config {
            election_timeout: Duration::from_millis(3_000),
            heartbeat_interval: Duration::from_millis(150),
            max_rounds: 3,
            network_delay: Duration::from_millis(20),
            forward_retries: 2,
            retry_delay: Duration::from_millis(30),
            ..Config::default()
        }
    }

    async fn spawn_registrar() -> (Arc<RegistrarService>, String) {
        let service = RegistrarService::new();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = registrar_handlers::router(service.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (service, format!("http://{}", addr))
    }

    async fn spawn_node(uid: Uid, registry_url: &str, config: Config) -> Arc<NodeService> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let node = NodeService::new(uid, addr, RegistrarClient::new(registry_url), config);
        let app = handlers::router(node.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        node
    }

    /// Spawns and registers a cluster; returns the nodes in argument order.
    async fn spawn_cluster(uids: &[Uid], registry_url: &str, config: &Config) -> Vec<Arc<NodeService>> {
        let mut nodes = Vec::with_capacity(uids.len());
        for &uid in uids {
            let node = spawn_node(uid, registry_url, config.clone()).await;
            node.registrar().register(uid, node.addr()).await.unwrap();
            nodes.push(node);
        }
        nodes
    }

    /// Polls until every node has accepted `leader` and completed the
    /// election, or the deadline passes.
    async fn wait_for_leader(nodes: &[&Arc<NodeService>], leader: Uid, deadline: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            let mut converged = true;
            for node in nodes {
                if node.leader_uid() != Some(leader) || !node.is_election_completed().await {
                    converged = false;
                    break;
                }
            }
            if converged {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    // ============================================================
    // DECISION TABLE TESTS
    // ============================================================

    #[test]
    fn test_larger_candidate_is_forwarded_unchanged() {
        let action = classify_election(5, ElectionState::Idle, 11, 2);
        assert_eq!(
            action,
            ElectionAction::Forward {
                candidate: 11,
                origin: 2
            }
        );

        // Same when already in the race.
        let action = classify_election(5, ElectionState::InProgress, 11, 2);
        assert_eq!(
            action,
            ElectionAction::Forward {
                candidate: 11,
                origin: 2
            }
        );
    }

    #[test]
    fn test_own_token_back_at_originator_completes_circuit() {
        let action = classify_election(11, ElectionState::InProgress, 11, 11);
        assert_eq!(action, ElectionAction::BecomeLeader);
    }

    #[test]
    fn test_own_uid_with_foreign_origin_usurps() {
        let action = classify_election(11, ElectionState::Idle, 11, 5);
        assert_eq!(action, ElectionAction::Usurp);
    }

    #[test]
    fn test_smaller_candidate_replaced_when_idle() {
        let action = classify_election(7, ElectionState::Idle, 5, 5);
        assert_eq!(
            action,
            ElectionAction::Forward {
                candidate: 7,
                origin: 5
            }
        );
    }

    #[test]
    fn test_smaller_candidate_discarded_when_in_progress() {
        let action = classify_election(7, ElectionState::InProgress, 5, 5);
        assert_eq!(action, ElectionAction::Discard);
    }

    // ============================================================
    // STATE MACHINE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_down_node_drops_election_messages() {
        let node = NodeService::new(
            5,
            "127.0.0.1:9".parse().unwrap(),
            RegistrarClient::new("http://127.0.0.1:9"),
            test_config(),
        );
        node.set_alive(false);

        node.clone().receive_election(11, 2).await;

        assert_eq!(node.current_state().await, ElectionState::Idle);
    }

    #[tokio::test]
    async fn test_leader_announcement_is_accepted_exactly_once() {
        let node = NodeService::new(
            5,
            "127.0.0.1:9".parse().unwrap(),
            RegistrarClient::new("http://127.0.0.1:9"),
            test_config(),
        );

        node.clone().receive_leader(11, 7).await;
        assert_eq!(node.leader_uid(), Some(11));
        assert_eq!(node.current_state().await, ElectionState::LeaderAnnounced);

        // A second traversal carries the same winner and is absorbed.
        node.clone().receive_leader(11, 2).await;
        assert_eq!(node.leader_uid(), Some(11));
        assert_eq!(node.current_state().await, ElectionState::LeaderAnnounced);
    }

    #[tokio::test]
    async fn test_newer_election_outcome_replaces_stale_leader() {
        let node = NodeService::new(
            5,
            "127.0.0.1:9".parse().unwrap(),
            RegistrarClient::new("http://127.0.0.1:9"),
            test_config(),
        );

        node.clone().receive_leader(11, 7).await;

        // A different winner can only come from a newer election; even a
        // node that missed the recovery reset must adopt it.
        node.clone().receive_leader(7, 2).await;
        assert_eq!(node.leader_uid(), Some(7));
        assert_eq!(node.current_state().await, ElectionState::LeaderAnnounced);
    }

    #[tokio::test]
    async fn test_announced_node_drops_election_traffic() {
        let node = NodeService::new(
            5,
            "127.0.0.1:9".parse().unwrap(),
            RegistrarClient::new("http://127.0.0.1:9"),
            test_config(),
        );

        node.clone().receive_leader(11, 7).await;
        node.clone().receive_election(4, 4).await;

        // Still announced; the stale election message went nowhere.
        assert_eq!(node.current_state().await, ElectionState::LeaderAnnounced);
        assert_eq!(node.leader_uid(), Some(11));
    }

    #[tokio::test]
    async fn test_reset_returns_node_to_idle() {
        let node = NodeService::new(
            5,
            "127.0.0.1:9".parse().unwrap(),
            RegistrarClient::new("http://127.0.0.1:9"),
            test_config(),
        );

        node.clone().receive_leader(11, 7).await;
        node.reset().await;

        assert_eq!(node.current_state().await, ElectionState::Idle);
        assert_eq!(node.leader_uid(), None);
        assert_eq!(node.round(), 0);
    }

    #[tokio::test]
    async fn test_initiate_without_successor_is_refused() {
        let node = NodeService::new(
            5,
            "127.0.0.1:9".parse().unwrap(),
            RegistrarClient::new("http://127.0.0.1:9"),
            test_config(),
        );

        let err = node.clone().initiate_election(false).await.unwrap_err();
        assert!(matches!(err, ElectionError::NoSuccessor));
    }

    #[tokio::test]
    async fn test_single_registered_node_has_no_ring() {
        let (_registrar, url) = spawn_registrar().await;
        let nodes = spawn_cluster(&[4], &url, &test_config()).await;

        let err = nodes[0].clone().initiate_election(false).await.unwrap_err();
        assert!(matches!(err, ElectionError::NoSuccessor));
    }

    // ============================================================
    // END-TO-END ELECTION TESTS
    // ============================================================

    #[tokio::test]
    async fn test_four_node_clean_election() {
        let (_registrar, url) = spawn_registrar().await;
        let config = test_config();
        let nodes = spawn_cluster(&[2, 5, 7, 11], &url, &config).await;

        // Ring well-formedness first: 2 -> 5 -> 7 -> 11 -> 2.
        assert_eq!(nodes[0].successor().await.map(|p| p.uid), Some(5));
        assert_eq!(nodes[1].successor().await.map(|p| p.uid), Some(7));
        assert_eq!(nodes[2].successor().await.map(|p| p.uid), Some(11));
        assert_eq!(nodes[3].successor().await.map(|p| p.uid), Some(2));

        nodes[1].clone().initiate_election(false).await.unwrap();

        let all: Vec<&Arc<NodeService>> = nodes.iter().collect();
        assert!(
            wait_for_leader(&all, 11, Duration::from_secs(10)).await,
            "cluster did not converge on leader 11"
        );

        // Exactly one node considers itself leader.
        let leaders = nodes.iter().filter(|node| node.is_leader()).count();
        assert_eq!(leaders, 1);
        assert!(nodes[3].is_leader());
    }

    #[tokio::test]
    async fn test_maximum_uid_initiator_wins_in_one_lap() {
        let (_registrar, url) = spawn_registrar().await;
        let nodes = spawn_cluster(&[2, 5, 7, 11], &url, &test_config()).await;

        nodes[3].clone().initiate_election(false).await.unwrap();

        let all: Vec<&Arc<NodeService>> = nodes.iter().collect();
        assert!(
            wait_for_leader(&all, 11, Duration::from_secs(10)).await,
            "cluster did not converge on leader 11"
        );
    }

    #[tokio::test]
    async fn test_concurrent_initiators_elect_single_leader() {
        let (_registrar, url) = spawn_registrar().await;
        let nodes = spawn_cluster(&[3, 8], &url, &test_config()).await;

        // Both fire at once; the usurp rule must suppress the smaller token.
        let (a, b) = tokio::join!(
            nodes[0].clone().initiate_election(false),
            nodes[1].clone().initiate_election(false)
        );
        a.unwrap();
        b.unwrap();

        let all: Vec<&Arc<NodeService>> = nodes.iter().collect();
        assert!(
            wait_for_leader(&all, 8, Duration::from_secs(10)).await,
            "cluster did not converge on leader 8"
        );

        let leaders = nodes.iter().filter(|node| node.is_leader()).count();
        assert_eq!(leaders, 1);
    }

    #[tokio::test]
    async fn test_election_times_out_and_exhausts_rounds() {
        let (_registrar, url) = spawn_registrar().await;
        let config = Config {
            election_timeout: Duration::from_millis(200),
            max_rounds: 2,
            network_delay: Duration::from_millis(10),
            forward_retries: 2,
            retry_delay: Duration::from_millis(20),
            ..test_config()
        };

        let nodes = spawn_cluster(&[6], &url, &config).await;
        let node = &nodes[0];

        // Point the ring at an address nothing listens on.
        let dead = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = dead.local_addr().unwrap();
        drop(dead);
        node.set_successor(Peer {
            uid: 99,
            addr: dead_addr,
        })
        .await;

        node.clone().initiate_election(false).await.unwrap();

        // Round 1 times out, round 2 retries and exhausts the budget.
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(3) {
            if node.round() == 2 && node.current_state().await == ElectionState::Idle {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert_eq!(node.round(), 2);
        assert_eq!(node.current_state().await, ElectionState::Idle);
        assert_eq!(node.leader_uid(), None);
    }

    #[tokio::test]
    async fn test_leader_failure_triggers_recovery_election() {
        let (_registrar, url) = spawn_registrar().await;
        let config = test_config();
        let nodes = spawn_cluster(&[2, 5, 7, 11], &url, &config).await;

        nodes[1].clone().initiate_election(false).await.unwrap();
        let all: Vec<&Arc<NodeService>> = nodes.iter().collect();
        assert!(
            wait_for_leader(&all, 11, Duration::from_secs(10)).await,
            "initial election did not converge"
        );

        // Every node now watches the leader.
        let mut detectors = Vec::new();
        for node in &nodes {
            detectors.push(detector::start(node.clone()));
        }

        // Kill the leader; the survivors must re-elect the next maximum.
        nodes[3].set_alive(false);

        let survivors: Vec<&Arc<NodeService>> = nodes[..3].iter().collect();
        assert!(
            wait_for_leader(&survivors, 7, Duration::from_secs(20)).await,
            "survivors did not converge on leader 7"
        );

        // Ring was rebuilt without the dead node: 2 -> 5 -> 7 -> 2.
        assert_eq!(nodes[0].successor().await.map(|p| p.uid), Some(5));
        assert_eq!(nodes[1].successor().await.map(|p| p.uid), Some(7));
        assert_eq!(nodes[2].successor().await.map(|p| p.uid), Some(2));
        assert!(!nodes[3].is_alive());

        for node in &nodes {
            node.stop();
        }
        for detector in detectors {
            detector.abort();
        }
    }

    #[tokio::test]
    async fn test_recovered_node_rejoins_on_rebuild() {
        let (registrar, url) = spawn_registrar().await;
        let config = test_config();
        let nodes = spawn_cluster(&[2, 5, 9], &url, &config).await;

        nodes[2].set_alive(false);
        registrar.rebuild_ring().await.unwrap();
        assert_eq!(nodes[0].successor().await.map(|p| p.uid), Some(5));
        assert_eq!(nodes[1].successor().await.map(|p| p.uid), Some(2));

        nodes[2].recover().await.unwrap();

        assert!(nodes[2].is_alive());
        assert_eq!(nodes[2].current_state().await, ElectionState::Idle);
        assert_eq!(nodes[0].successor().await.map(|p| p.uid), Some(5));
        assert_eq!(nodes[1].successor().await.map(|p| p.uid), Some(9));
        assert_eq!(nodes[2].successor().await.map(|p| p.uid), Some(2));
    }

    // ============================================================
    // WIRE PROTOCOL TESTS
    // ============================================================

    #[test]
    fn test_election_message_serialization() {
        use crate::node::protocol::ElectionMessage;

        let msg = ElectionMessage {
            candidate_uid: 11,
            origin_uid: 5,
        };

        let json = serde_json::to_string(&msg).expect("Serialization failed");
        let decoded: ElectionMessage = serde_json::from_str(&json).expect("Deserialization failed");

        assert_eq!(decoded.candidate_uid, 11);
        assert_eq!(decoded.origin_uid, 5);
    }

    #[test]
    fn test_initiate_request_defaults_to_normal_election() {
        use crate::node::protocol::InitiateElectionRequest;

        let decoded: InitiateElectionRequest = serde_json::from_str("{}").unwrap();
        assert!(!decoded.recovery);
    }
}

//! Operator Console
//!
//! Line-oriented command loop bound to the local node. Each command maps
//! directly to one node operation; parsing is a pure function so the mapping
//! is testable without stdin.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::node::protocol::StatusResponse;
use crate::node::service::NodeService;

/// One operator command. Parsed case-insensitively from a trimmed input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Initiate an election from this node.
    Start,
    /// Print the current leader.
    Leader,
    /// Simulate a crash of this node.
    Kill,
    /// Revive this node and rejoin the ring.
    Recover,
    /// Print a one-line status summary.
    Status,
    /// Print the full internal state.
    Debug,
    /// Reset election state back to idle.
    Reset,
    /// Print the command list.
    Help,
    /// Deregister and exit cleanly.
    Exit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        match line.trim().to_lowercase().as_str() {
            "start" => Some(Command::Start),
            "leader" => Some(Command::Leader),
            "kill" => Some(Command::Kill),
            "recover" => Some(Command::Recover),
            "status" => Some(Command::Status),
            "debug" => Some(Command::Debug),
            "reset" => Some(Command::Reset),
            "help" => Some(Command::Help),
            "exit" => Some(Command::Exit),
            _ => None,
        }
    }
}

const HELP: &str = "commands: start | leader | kill | recover | status | debug | reset | help | exit";

fn format_status(status: &StatusResponse) -> String {
    format!(
        "node {} [{}] leader={} successor={} alive={}",
        status.uid,
        status.state.as_str(),
        status
            .leader_uid
            .map(|uid| uid.to_string())
            .unwrap_or_else(|| "none".to_string()),
        status
            .successor_uid
            .map(|uid| uid.to_string())
            .unwrap_or_else(|| "none".to_string()),
        status.alive,
    )
}

/// Runs the console loop until `exit` or stdin closes.
pub async fn run(node: Arc<NodeService>) -> Result<()> {
    println!("{}", HELP);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = Command::parse(&line) else {
            println!("unknown command; {}", HELP);
            continue;
        };

        match command {
            Command::Start => {
                if let Err(e) = node.clone().initiate_election(false).await {
                    println!("cannot start election: {}", e);
                }
            }
            Command::Leader => match node.leader_uid() {
                Some(leader) if leader == node.uid => println!("this node ({}) is the leader", leader),
                Some(leader) => println!("current leader is {}", leader),
                None => println!("no leader elected yet"),
            },
            Command::Kill => {
                node.set_alive(false);
                println!("node {} is now down", node.uid);
            }
            Command::Recover => match node.recover().await {
                Ok(()) => println!("node {} recovered", node.uid),
                Err(e) => println!("recovery failed: {}", e),
            },
            Command::Status => {
                println!("{}", format_status(&node.status().await));
            }
            Command::Debug => {
                let status = node.status().await;
                println!("{}", format_status(&status));
                println!(
                    "  round={} is_leader={} recovery_coordinated={} registrar={}",
                    status.round,
                    status.is_leader,
                    node.is_recovery_coordinated(),
                    node.registrar().base_url(),
                );
            }
            Command::Reset => {
                node.reset().await;
                println!("election state reset");
            }
            Command::Help => println!("{}", HELP),
            Command::Exit => {
                println!("exiting...");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::types::ElectionState;

    #[test]
    fn parse_accepts_every_command() {
        assert_eq!(Command::parse("start"), Some(Command::Start));
        assert_eq!(Command::parse("leader"), Some(Command::Leader));
        assert_eq!(Command::parse("kill"), Some(Command::Kill));
        assert_eq!(Command::parse("recover"), Some(Command::Recover));
        assert_eq!(Command::parse("status"), Some(Command::Status));
        assert_eq!(Command::parse("debug"), Some(Command::Debug));
        assert_eq!(Command::parse("reset"), Some(Command::Reset));
        assert_eq!(Command::parse("help"), Some(Command::Help));
        assert_eq!(Command::parse("exit"), Some(Command::Exit));
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(Command::parse("  START  "), Some(Command::Start));
        assert_eq!(Command::parse("Exit"), Some(Command::Exit));
    }

    #[test]
    fn parse_rejects_unknown_input() {
        assert_eq!(Command::parse("begin"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("start now"), None);
    }

    #[test]
    fn status_line_shows_leader_and_successor() {
        let status = StatusResponse {
            uid: 5,
            alive: true,
            state: ElectionState::LeaderAnnounced,
            leader_uid: Some(11),
            is_leader: false,
            successor_uid: Some(7),
            round: 1,
        };

        let line = format_status(&status);
        assert!(line.contains("node 5"));
        assert!(line.contains("LEADER_ANNOUNCED"));
        assert!(line.contains("leader=11"));
        assert!(line.contains("successor=7"));
    }

    #[test]
    fn status_line_handles_unset_fields() {
        let status = StatusResponse {
            uid: 2,
            alive: false,
            state: ElectionState::Idle,
            leader_uid: None,
            is_leader: false,
            successor_uid: None,
            round: 0,
        };

        let line = format_status(&status);
        assert!(line.contains("leader=none"));
        assert!(line.contains("successor=none"));
        assert!(line.contains("alive=false"));
    }
}

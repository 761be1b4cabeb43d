use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use stagegate_fleet::{Coordinator, Peer, StaticFleet};
use stagegate_state::FileStore;

use crate::config::CliConfig;

/// Fully resolved inputs for a check/evaluate run.
#[derive(Debug)]
pub struct Target {
    pub node_file: PathBuf,
    pub peers_file: PathBuf,
    pub store_root: PathBuf,
    pub state_name: String,
}

/// Merge flags over config defaults; every input must come from one
/// of the two.
pub fn resolve(
    config: &CliConfig,
    node: Option<String>,
    peers: Option<String>,
    store: Option<String>,
    state: Option<String>,
) -> anyhow::Result<Target> {
    let pick = |flag: Option<String>, default: &Option<String>, what: &str| {
        flag.or_else(|| default.clone())
            .with_context(|| format!("missing {what}: pass the flag or set it in stagegate.toml"))
    };

    Ok(Target {
        node_file: pick(node, &config.node_file, "--node")?.into(),
        peers_file: pick(peers, &config.peers_file, "--peers")?.into(),
        store_root: pick(store, &config.store_root, "--store")?.into(),
        state_name: pick(state, &config.state_name, "--state")?,
    })
}

pub fn check(target: &Target) -> anyhow::Result<()> {
    let chosen = coordinator(target)?.check()?;
    println!("{}", serde_json::to_string_pretty(&chosen)?);
    Ok(())
}

pub fn evaluate(target: &Target, operator: &str) -> anyhow::Result<()> {
    let evaluation = coordinator(target)?.evaluate(operator)?;
    let report = serde_json::json!({
        "verdict": evaluation.verdict,
        "detail": evaluation.detail,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn coordinator(target: &Target) -> anyhow::Result<Coordinator> {
    let node = load_node(&target.node_file)?;
    let peers = load_peers(&target.peers_file)?;
    let store = Arc::new(FileStore::new(&target.store_root));
    let fleet = Arc::new(StaticFleet::new(peers));
    Ok(Coordinator::new(node, &target.state_name, store, fleet))
}

fn load_node(path: &Path) -> anyhow::Result<Peer> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading node fixture {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing node fixture {}", path.display()))
}

fn load_peers(path: &Path) -> anyhow::Result<Vec<Peer>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading peers fixture {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing peers fixture {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_fixtures(dir: &Path) -> Target {
        let node = json!({
            "name": "test-node1",
            "attributes": {
                "fqdn": "test-node1.example.com",
                "stagegate": {
                    "state": { "test-application": { "desired": "2", "current": "1" } }
                }
            }
        });
        let peers = json!([node]);
        std::fs::write(dir.join("node.json"), node.to_string()).unwrap();
        std::fs::write(dir.join("peers.json"), peers.to_string()).unwrap();

        let bag = dir.join("state_test-application");
        std::fs::create_dir_all(&bag).unwrap();
        for id in ["1", "2"] {
            let doc = json!({
                "id": id,
                "data": { "repo_name": format!("test-application-{id}") },
                "retry_count": 0,
                "random_wait": 0,
                "conditions": {
                    "by fqdn": { "query": "fqdn:*", "attribute": ["fqdn"] }
                }
            });
            std::fs::write(bag.join(format!("{id}.json")), doc.to_string()).unwrap();
        }

        Target {
            node_file: dir.join("node.json"),
            peers_file: dir.join("peers.json"),
            store_root: dir.to_path_buf(),
            state_name: "test-application".to_string(),
        }
    }

    #[test]
    fn check_runs_against_file_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_fixtures(dir.path());
        check(&target).unwrap();
    }

    #[test]
    fn evaluate_reports_the_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_fixtures(dir.path());
        // Single node is the first (and only) deploy group.
        let evaluation = coordinator(&target).unwrap().evaluate("or").unwrap();
        assert!(evaluation.verdict);
        assert_eq!(evaluation.detail["by fqdn"], true);
    }

    #[test]
    fn resolve_requires_every_input() {
        let err = resolve(&CliConfig::default(), None, None, None, None).unwrap_err();
        assert!(err.to_string().contains("--node"));
    }

    #[test]
    fn resolve_prefers_flags_over_config() {
        let config = CliConfig {
            state_name: Some("from-config".to_string()),
            store_root: Some("./state".to_string()),
            node_file: Some("node.json".to_string()),
            peers_file: Some("peers.json".to_string()),
        };
        let target = resolve(
            &config,
            None,
            None,
            None,
            Some("from-flag".to_string()),
        )
        .unwrap();
        assert_eq!(target.state_name, "from-flag");
        assert_eq!(target.node_file, PathBuf::from("node.json"));
    }
}

//! Per-node startup configuration.
//!
//! Per spec, a node's configuration is entirely startup-time: a `node_id`,
//! a reachable `host`/`port`, and a cluster-wide `replication_factor`.
//! There are no environment variables and nothing is persisted across
//! restarts — the whole of a node's state is rebuilt from this file (or
//! the CLI flags that override it) and the join protocol.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorExt};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	/// Unique identifier for this node within the cluster.
	pub node_id: String,

	/// Hostname or IP this node listens on and advertises to peers.
	pub host: String,

	/// Port this node listens on.
	pub port: u16,

	/// Number of replicas maintained for each key. Must be the same value
	/// on every node in the cluster by convention; the ring only ever
	/// assigns `min(replication_factor, |ring|)` replicas regardless.
	pub replication_factor: usize,

	/// Address of an existing cluster member to join at startup, if any.
	/// A node with no `seed` boots as the sole member of a fresh cluster.
	#[serde(default)]
	pub seed: Option<String>,

	/// Timeout applied to outbound peer RPCs issued by the coordinator and
	/// the membership protocol, in milliseconds. Not part of the wire
	/// protocol — purely an operational knob, per spec's guidance that an
	/// unreachable peer should degrade to a replica failure rather than
	/// block the coordinator indefinitely.
	#[serde(default = "default_peer_rpc_timeout_ms")]
	pub peer_rpc_timeout_ms: u64,
}

fn default_peer_rpc_timeout_ms() -> u64 {
	3000
}

impl Config {
	/// Base URL peers should use to reach this node.
	pub fn address(&self) -> String {
		format!("http://{}:{}", self.host, self.port)
	}
}

/// Reads and parses a node's TOML configuration file.
pub fn read_config(path: impl AsRef<Path>) -> Result<Config, Error> {
	let path = path.as_ref();
	let data = std::fs::read_to_string(path)
		.err_context(format!("Unable to read config file {}", path.display()))?;
	let config: Config = toml::from_str(&data)
		.err_context(format!("Unable to parse config file {}", path.display()))?;
	if config.replication_factor == 0 {
		return Err(Error::Message(
			"replication_factor must be at least 1".into(),
		));
	}
	if config.node_id.is_empty() {
		return Err(Error::Message("node_id must not be empty".into()));
	}
	Ok(config)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_minimal_config() {
		let toml = r#"
			node_id = "node1"
			host = "127.0.0.1"
			port = 8000
			replication_factor = 3
		"#;
		let config: Config = toml::from_str(toml).unwrap();
		assert_eq!(config.node_id, "node1");
		assert_eq!(config.peer_rpc_timeout_ms, 3000);
		assert_eq!(config.address(), "http://127.0.0.1:8000");
	}
}

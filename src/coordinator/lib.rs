//! The coordinator: executes client reads, writes, and deletes on behalf
//! of the caller by fanning out to the replica set and evaluating the
//! chosen consistency level (spec §4.4).
//!
//! Fan-out to the target replica list is parallel (`join_all`), not the
//! sequential loop of the original reference — spec §9 explicitly allows
//! this, since the contract is expressed in terms of outcomes, not
//! ordering or latency. This bounds the cost of `quorum`/`all` by the
//! slowest required replica rather than the sum of all of them.

#[macro_use]
extern crate tracing;

use std::time::Duration;

use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request, Response, StatusCode};
use std::sync::Arc;

use ringstore_membership::Membership;
use ringstore_store::Store;
use ringstore_util::data::NodeId;
use ringstore_util::error::Error;

/// `ConsistencyLevel`, modeled as a sum type with explicit handling for
/// each arm rather than string comparisons scattered at every use site
/// (spec §9's polymorphism note). `Unknown` preserves the caller's
/// original string for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyLevel {
	One,
	Quorum,
	All,
	Unknown(String),
}

impl ConsistencyLevel {
	pub fn parse(s: &str) -> Self {
		match s {
			"one" => ConsistencyLevel::One,
			"quorum" => ConsistencyLevel::Quorum,
			"all" => ConsistencyLevel::All,
			other => ConsistencyLevel::Unknown(other.to_string()),
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			ConsistencyLevel::One => "one",
			ConsistencyLevel::Quorum => "quorum",
			ConsistencyLevel::All => "all",
			ConsistencyLevel::Unknown(s) => s.as_str(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct WriteOutcome {
	pub success: bool,
	pub successful_replicas: usize,
	pub attempted_replicas: usize,
	pub total_possible_replicas: usize,
	pub consistency_level: String,
	pub coordinated_by: NodeId,
	pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum ReadOutcome {
	/// `sources` has one element for `one`/`quorum` primary attribution
	/// semantics; for `quorum` it is every replica that contributed a
	/// value toward the returned one.
	Found { value: String, sources: Vec<NodeId> },
	NotFound,
	/// Only produced by `all` reads: at least two distinct values were
	/// seen across the replicas that answered.
	Conflict { values: Vec<(NodeId, String)> },
}

pub struct Coordinator {
	pub store: Arc<Store>,
	pub membership: Arc<Membership>,
	pub replication_factor: usize,
	client: Client<HttpConnector>,
	rpc_timeout: Duration,
}

impl Coordinator {
	pub fn new(store: Arc<Store>, membership: Arc<Membership>, replication_factor: usize, rpc_timeout_ms: u64) -> Self {
		Coordinator {
			store,
			membership,
			replication_factor,
			client: Client::new(),
			rpc_timeout: Duration::from_millis(rpc_timeout_ms),
		}
	}

	/// `R = get_nodes(key, RF)`, spec §4.4.
	pub fn replica_nodes(&self, key: &str) -> Vec<NodeId> {
		self.membership
			.snapshot()
			.ring
			.get_nodes(key, self.replication_factor)
	}

	// ---- writes ----

	pub async fn put(&self, key: &str, value: String, consistency: ConsistencyLevel) -> WriteOutcome {
		self.replicate("PUT", key, Some(value), consistency).await
	}

	pub async fn delete(&self, key: &str, consistency: ConsistencyLevel) -> WriteOutcome {
		self.replicate("DELETE", key, None, consistency).await
	}

	async fn replicate(
		&self,
		op: &str,
		key: &str,
		value: Option<String>,
		consistency: ConsistencyLevel,
	) -> WriteOutcome {
		let replicas = self.replica_nodes(key);
		let total_possible_replicas = replicas.len();
		let targets = Self::target_list(&replicas, &consistency);

		debug!(
			"Replicating {} {} to {}/{} nodes: {:?} (consistency: {})",
			op,
			key,
			targets.len(),
			replicas.len(),
			targets,
			consistency.as_str()
		);

		let applies = targets
			.iter()
			.map(|node| self.apply_write(node, op, key, value.clone()));
		let results = futures::future::join_all(applies).await;

		let mut successful = 0usize;
		let mut errors = Vec::new();
		for (node, result) in targets.iter().zip(results) {
			match result {
				Ok(()) => successful += 1,
				Err(e) => errors.push(format!("{}: {}", node, e)),
			}
		}

		let attempted_replicas = targets.len();
		let success = Self::write_succeeded(&consistency, successful, attempted_replicas);

		WriteOutcome {
			success,
			successful_replicas: successful,
			attempted_replicas,
			total_possible_replicas,
			consistency_level: consistency.as_str().to_string(),
			coordinated_by: self.membership.node_id.clone(),
			errors,
		}
	}

	/// Target selection, spec §4.4.1. `Unknown` is pruned the same way
	/// `Quorum` is — it is always reported as a failure regardless of how
	/// many of those targets succeed (`write_succeeded` below).
	fn target_list(replicas: &[NodeId], consistency: &ConsistencyLevel) -> Vec<NodeId> {
		let n = replicas.len();
		match consistency {
			ConsistencyLevel::All => replicas.to_vec(),
			ConsistencyLevel::One => replicas.iter().take(1).cloned().collect(),
			ConsistencyLevel::Quorum | ConsistencyLevel::Unknown(_) => {
				let required = n / 2 + 1;
				replicas.iter().take(required).cloned().collect()
			}
		}
	}

	fn write_succeeded(consistency: &ConsistencyLevel, successful: usize, attempted: usize) -> bool {
		match consistency {
			ConsistencyLevel::All | ConsistencyLevel::Quorum => successful == attempted,
			ConsistencyLevel::One => successful >= 1,
			ConsistencyLevel::Unknown(_) => false,
		}
	}

	async fn apply_write(
		&self,
		node: &NodeId,
		op: &str,
		key: &str,
		value: Option<String>,
	) -> Result<(), String> {
		if *node == self.membership.node_id {
			match op {
				"PUT" => self.store.put(key, value.expect("PUT always carries a value")),
				"DELETE" => {
					self.store.delete(key);
				}
				_ => unreachable!(),
			}
			return Ok(());
		}

		let addr = match self.membership.peer_address(node) {
			Some(addr) => addr,
			None => return Err("Node not in peer list".to_string()),
		};

		let result = match op {
			"PUT" => self.put_remote(&addr, key, value.expect("PUT always carries a value")).await,
			"DELETE" => self.delete_remote(&addr, key).await,
			_ => unreachable!(),
		};
		result.map_err(|e| e.to_string())
	}

	// ---- reads ----

	pub async fn get(&self, key: &str, consistency: &ConsistencyLevel) -> ReadOutcome {
		match consistency {
			ConsistencyLevel::All => self.get_all(key).await,
			ConsistencyLevel::Quorum => self.get_quorum(key).await,
			// The reference treats any consistency string besides `all`/
			// `quorum` as `one` for reads (there is no failure mode for
			// reads the way `Unknown` forces one for writes).
			ConsistencyLevel::One | ConsistencyLevel::Unknown(_) => self.get_one(key).await,
		}
	}

	async fn get_one(&self, key: &str) -> ReadOutcome {
		let replicas = self.replica_nodes(key);

		if replicas.iter().any(|n| *n == self.membership.node_id) {
			if let Some(v) = self.store.get(key) {
				return ReadOutcome::Found {
					value: v,
					sources: vec![self.membership.node_id.clone()],
				};
			}
		}

		for node in replicas.iter().filter(|n| **n != self.membership.node_id) {
			if let Some(v) = self.get_from(node, key).await {
				return ReadOutcome::Found {
					value: v,
					sources: vec![node.clone()],
				};
			}
		}

		ReadOutcome::NotFound
	}

	async fn get_quorum(&self, key: &str) -> ReadOutcome {
		let replicas = self.replica_nodes(key);
		let required = replicas.len() / 2 + 1;

		let gathered = self.gather(key, &replicas).await;
		let mut values = Vec::new();
		let mut sources = Vec::new();
		for (node, value) in gathered {
			if values.len() >= required {
				break;
			}
			if let Some(v) = value {
				values.push(v);
				sources.push(node);
			}
		}

		if values.is_empty() {
			return ReadOutcome::NotFound;
		}

		ReadOutcome::Found {
			value: most_frequent(&values),
			sources,
		}
	}

	async fn get_all(&self, key: &str) -> ReadOutcome {
		let replicas = self.replica_nodes(key);
		let gathered = self.gather(key, &replicas).await;

		let mut values = Vec::new();
		let mut sources = Vec::new();
		for (node, value) in gathered {
			if let Some(v) = value {
				values.push(v);
				sources.push(node);
			}
		}

		if values.is_empty() {
			return ReadOutcome::NotFound;
		}

		let mut distinct: Vec<&String> = Vec::new();
		for v in &values {
			if !distinct.contains(&v) {
				distinct.push(v);
			}
		}

		if distinct.len() == 1 {
			ReadOutcome::Found {
				value: values[0].clone(),
				sources,
			}
		} else {
			ReadOutcome::Conflict {
				values: sources.into_iter().zip(values).collect(),
			}
		}
	}

	/// Queries every replica in `replicas` in parallel, in ring order.
	async fn gather(&self, key: &str, replicas: &[NodeId]) -> Vec<(NodeId, Option<String>)> {
		let futures = replicas.iter().map(|node| self.get_from(node, key));
		let values = futures::future::join_all(futures).await;
		replicas.iter().cloned().zip(values).collect()
	}

	async fn get_from(&self, node: &NodeId, key: &str) -> Option<String> {
		if *node == self.membership.node_id {
			return self.store.get(key);
		}
		let addr = self.membership.peer_address(node)?;
		match self.get_remote(&addr, key).await {
			Ok(v) => v,
			Err(e) => {
				warn!("Error reading {} from {}: {}", key, node, e);
				None
			}
		}
	}

	// ---- peer HTTP transport ----

	async fn put_remote(&self, addr: &str, key: &str, value: String) -> Result<(), Error> {
		let body = serde_json::to_vec(&serde_json::json!({ "value": value }))?;
		let req = Request::builder()
			.method(Method::PUT)
			.uri(format!("{}/internal/store/{}", addr, key))
			.header("content-type", "application/json")
			.body(Body::from(body))
			.map_err(|e| Error::Message(e.to_string()))?;
		let resp = self.send(req).await?;
		expect_ok(resp.status())
	}

	async fn delete_remote(&self, addr: &str, key: &str) -> Result<(), Error> {
		let req = Request::builder()
			.method(Method::DELETE)
			.uri(format!("{}/internal/delete/{}", addr, key))
			.body(Body::empty())
			.map_err(|e| Error::Message(e.to_string()))?;
		let resp = self.send(req).await?;
		expect_ok(resp.status())
	}

	async fn get_remote(&self, addr: &str, key: &str) -> Result<Option<String>, Error> {
		let req = Request::builder()
			.method(Method::GET)
			.uri(format!("{}/internal/store/{}", addr, key))
			.body(Body::empty())
			.map_err(|e| Error::Message(e.to_string()))?;
		let resp = self.send(req).await?;
		if resp.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		let status = resp.status();
		expect_ok(status)?;
		let bytes = hyper::body::to_bytes(resp.into_body()).await?;
		let body: serde_json::Value = serde_json::from_slice(&bytes)?;
		Ok(body.get("value").and_then(|v| v.as_str()).map(str::to_string))
	}

	async fn send(&self, req: Request<Body>) -> Result<Response<Body>, Error> {
		match tokio::time::timeout(self.rpc_timeout, self.client.request(req)).await {
			Ok(result) => Ok(result?),
			Err(_) => Err(Error::Message("peer RPC timed out".to_string())),
		}
	}
}

fn expect_ok(status: StatusCode) -> Result<(), Error> {
	if status == StatusCode::OK {
		Ok(())
	} else {
		Err(Error::Message(format!("peer returned HTTP {}", status)))
	}
}

/// Most frequent value, ties broken by first-seen order (spec §4.4.2).
fn most_frequent(values: &[String]) -> String {
	let mut counts: Vec<(&String, usize)> = Vec::new();
	for v in values {
		if let Some(entry) = counts.iter_mut().find(|(val, _)| *val == v) {
			entry.1 += 1;
		} else {
			counts.push((v, 1));
		}
	}

	let mut best = counts[0];
	for candidate in &counts[1..] {
		if candidate.1 > best.1 {
			best = *candidate;
		}
	}
	best.0.clone()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn single_node(rf: usize) -> Coordinator {
		let membership = Arc::new(Membership::new(
			"node1".to_string(),
			"http://localhost:9000".to_string(),
			1000,
		));
		Coordinator::new(Arc::new(Store::new()), membership, rf, 1000)
	}

	#[test]
	fn most_frequent_breaks_ties_by_first_seen() {
		let values = vec!["b".to_string(), "a".to_string(), "b".to_string(), "a".to_string()];
		assert_eq!(most_frequent(&values), "b");
	}

	#[test]
	fn quorum_math_matches_spec() {
		assert_eq!(5 / 2 + 1, 3);
		assert_eq!(4 / 2 + 1, 3);
		assert_eq!(1 / 2 + 1, 1);
	}

	#[test]
	fn target_list_for_one_is_single_primary() {
		let replicas = vec!["a".to_string(), "b".to_string(), "c".to_string()];
		assert_eq!(
			Coordinator::target_list(&replicas, &ConsistencyLevel::One),
			vec!["a".to_string()]
		);
	}

	#[test]
	fn target_list_for_quorum_prunes_to_quorum_size() {
		let replicas = vec!["a".to_string(), "b".to_string(), "c".to_string()];
		assert_eq!(
			Coordinator::target_list(&replicas, &ConsistencyLevel::Quorum),
			vec!["a".to_string(), "b".to_string()]
		);
	}

	#[test]
	fn target_list_for_all_is_every_replica() {
		let replicas = vec!["a".to_string(), "b".to_string(), "c".to_string()];
		assert_eq!(Coordinator::target_list(&replicas, &ConsistencyLevel::All), replicas);
	}

	#[test]
	fn unknown_consistency_always_fails() {
		assert!(!Coordinator::write_succeeded(
			&ConsistencyLevel::Unknown("bogus".into()),
			3,
			3
		));
	}

	#[tokio::test]
	async fn single_node_write_then_read_at_one() {
		let c = single_node(1);
		let outcome = c.put("x", "1".to_string(), ConsistencyLevel::One).await;
		assert!(outcome.success);
		assert_eq!(outcome.successful_replicas, 1);
		assert_eq!(outcome.attempted_replicas, 1);

		match c.get("x", &ConsistencyLevel::One).await {
			ReadOutcome::Found { value, sources } => {
				assert_eq!(value, "1");
				assert_eq!(sources, vec!["node1".to_string()]);
			}
			other => panic!("expected Found, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn delete_then_get_all_is_not_found() {
		let c = single_node(1);
		c.put("x", "1".to_string(), ConsistencyLevel::All).await;
		let del = c.delete("x", ConsistencyLevel::All).await;
		assert!(del.success);
		match c.get("x", &ConsistencyLevel::All).await {
			ReadOutcome::NotFound => {}
			other => panic!("expected NotFound, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn get_on_empty_single_node_cluster_is_not_found() {
		let c = single_node(1);
		match c.get("missing", &ConsistencyLevel::One).await {
			ReadOutcome::NotFound => {}
			other => panic!("expected NotFound, got {:?}", other),
		}
	}
}

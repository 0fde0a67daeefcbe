//! Peer table and the join/gossip protocol that keeps it eventually
//! consistent across the cluster (spec §4.3).
//!
//! The peer table and the hash ring are kept in one [`ClusterView`]
//! snapshot, swapped atomically under a short-lived lock on every
//! mutation (join, notify-join). Every request path reads a consistent
//! `Arc<ClusterView>` without ever blocking on that lock, following the
//! copy-on-write discipline spec §5 recommends.

#[macro_use]
extern crate tracing;

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use arc_swap::ArcSwap;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Method, Request};
use serde::{Deserialize, Serialize};

use ringstore_ring::Ring;
use ringstore_util::data::NodeId;
use ringstore_util::error::{Error, ErrorExt};

/// A consistent snapshot of what this node currently believes about
/// cluster membership: the peer table and the ring built from it.
#[derive(Clone)]
pub struct ClusterView {
	pub peers: HashMap<NodeId, String>,
	pub ring: Ring,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
	pub node_id: NodeId,
	pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
	pub message: String,
	pub peers: HashMap<NodeId, String>,
}

pub type NotifyJoinRequest = JoinRequest;

pub struct Membership {
	pub node_id: NodeId,
	pub address: String,

	view: ArcSwap<ClusterView>,
	update_lock: Mutex<()>,

	client: Client<HttpConnector>,
	rpc_timeout: Duration,
}

impl Membership {
	/// Boots with only `node_id` in its own peer table and ring, as
	/// spec §4.3 requires.
	pub fn new(node_id: NodeId, address: String, rpc_timeout_ms: u64) -> Self {
		let mut ring = Ring::new();
		ring.add_node(&node_id)
			.expect("a freshly created ring cannot have a collision");
		let mut peers = HashMap::new();
		peers.insert(node_id.clone(), address.clone());

		Membership {
			node_id,
			address,
			view: ArcSwap::from_pointee(ClusterView { peers, ring }),
			update_lock: Mutex::new(()),
			client: Client::new(),
			rpc_timeout: Duration::from_millis(rpc_timeout_ms),
		}
	}

	/// A consistent read of the current peer table and ring. Lock-free.
	pub fn snapshot(&self) -> arc_swap::Guard<std::sync::Arc<ClusterView>> {
		self.view.load()
	}

	pub fn peer_address(&self, node_id: &str) -> Option<String> {
		self.snapshot().peers.get(node_id).cloned()
	}

	/// Applies `f` to a clone of the current view and atomically
	/// publishes the result. Mutations are serialized by `update_lock`;
	/// readers never wait on it.
	fn mutate(&self, f: impl FnOnce(&mut ClusterView)) {
		let _guard = self.update_lock.lock().unwrap();
		let mut next = (**self.view.load()).clone();
		f(&mut next);
		self.view.store(std::sync::Arc::new(next));
	}

	fn learn_peer(&self, peer_id: &NodeId, peer_address: &str) -> bool {
		if self.snapshot().peers.contains_key(peer_id) {
			return false;
		}
		self.mutate(|v| {
			v.peers.insert(peer_id.clone(), peer_address.to_string());
			if let Err(e) = v.ring.add_node(peer_id) {
				error!("Refusing to place peer {} on the ring: {}", peer_id, e);
				v.peers.remove(peer_id);
			}
		});
		self.snapshot().peers.contains_key(peer_id)
	}

	/// Handles an incoming `POST /admin/join`: records the joining peer,
	/// best-effort-and-sequentially notifies every other known peer, and
	/// returns the peer table to hand back to the joiner. A failure to
	/// notify one peer is logged and does not abort the join of others.
	pub async fn handle_join(&self, peer_id: NodeId, peer_address: String) -> ClusterView {
		info!("Node {} requesting to join cluster at {}", peer_id, peer_address);
		self.learn_peer(&peer_id, &peer_address);

		let others: Vec<(NodeId, String)> = self
			.snapshot()
			.peers
			.iter()
			.filter(|(id, _)| **id != peer_id && **id != self.node_id)
			.map(|(id, addr)| (id.clone(), addr.clone()))
			.collect();

		for (existing_id, existing_addr) in others {
			if let Err(e) = self
				.notify_peer(&existing_addr, &peer_id, &peer_address)
				.await
			{
				warn!("Failed to notify {} about new node {}: {}", existing_id, peer_id, e);
			}
		}

		info!("Node {} successfully joined cluster", peer_id);
		(*self.snapshot()).clone()
	}

	/// Handles an incoming `POST /admin/notify_join`. Idempotent: a peer
	/// already known is left untouched.
	pub fn handle_notify_join(&self, peer_id: NodeId, peer_address: String) {
		if self.learn_peer(&peer_id, &peer_address) {
			info!("Learned about new node {} at {}", peer_id, peer_address);
		}
	}

	/// Contacts `seed_address`, sends our own join request, and merges
	/// the peer table it returns into ours (spec §4.3 steps 1 and 5).
	pub async fn join_cluster(&self, seed_address: &str) -> Result<(), Error> {
		let resp: JoinResponse = self
			.post_json(
				&format!("{}/admin/join", seed_address),
				&JoinRequest {
					node_id: self.node_id.clone(),
					address: self.address.clone(),
				},
			)
			.await
			.err_context(format!("Unable to join cluster via {}", seed_address))?;

		for (peer_id, peer_addr) in resp.peers {
			if peer_id != self.node_id {
				self.learn_peer(&peer_id, &peer_addr);
			}
		}
		info!("Successfully joined cluster via {}", seed_address);
		Ok(())
	}

	async fn notify_peer(
		&self,
		peer_address: &str,
		new_node_id: &str,
		new_node_address: &str,
	) -> Result<(), Error> {
		let _resp: serde_json::Value = self
			.post_json(
				&format!("{}/admin/notify_join", peer_address),
				&NotifyJoinRequest {
					node_id: new_node_id.to_string(),
					address: new_node_address.to_string(),
				},
			)
			.await?;
		Ok(())
	}

	async fn post_json<Req: Serialize, Resp: serde::de::DeserializeOwned>(
		&self,
		url: &str,
		body: &Req,
	) -> Result<Resp, Error> {
		let req = Request::builder()
			.method(Method::POST)
			.uri(url)
			.header("content-type", "application/json")
			.body(Body::from(serde_json::to_vec(body)?))
			.err_context("Unable to build request")?;

		let resp = tokio::time::timeout(self.rpc_timeout, self.client.request(req))
			.await
			.map_err(|_| Error::Message(format!("Timed out contacting {}", url)))??;

		if !resp.status().is_success() {
			return Err(Error::Message(format!(
				"{} returned HTTP {}",
				url,
				resp.status()
			)));
		}

		let body_bytes = hyper::body::to_bytes(resp.into_body()).await?;
		Ok(serde_json::from_slice(&body_bytes)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn boots_with_only_self() {
		let m = Membership::new("node1".to_string(), "http://localhost:8000".to_string(), 1000);
		let view = m.snapshot();
		assert_eq!(view.peers.len(), 1);
		assert_eq!(view.ring.len(), 1);
		assert!(view.peers.contains_key("node1"));
	}

	#[tokio::test]
	async fn notify_join_is_idempotent() {
		let m = Membership::new("node1".to_string(), "http://localhost:8000".to_string(), 1000);
		m.handle_notify_join("node2".to_string(), "http://localhost:8001".to_string());
		let view1 = (*m.snapshot()).clone();
		m.handle_notify_join("node2".to_string(), "http://localhost:8001".to_string());
		let view2 = m.snapshot();
		assert_eq!(view1.peers.len(), view2.peers.len());
		assert_eq!(view1.ring.len(), view2.ring.len());
	}

	#[tokio::test]
	async fn learn_peer_adds_to_both_peer_table_and_ring() {
		let m = Membership::new("node1".to_string(), "http://localhost:8000".to_string(), 1000);
		m.handle_notify_join("node2".to_string(), "http://localhost:8001".to_string());
		let view = m.snapshot();
		assert_eq!(view.peers.get("node2").unwrap(), "http://localhost:8001");
		assert!(view.ring.get_all_nodes().contains(&"node2".to_string()));
	}
}

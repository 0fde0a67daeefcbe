//! The consistent hash ring: deterministic placement from a key to its
//! ordered replica list.
//!
//! A [`Ring`] is a plain value type — no locking, no I/O. The membership
//! crate is responsible for holding it behind a snapshot that can be read
//! without blocking writers and swapped atomically on join.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use ringstore_util::data::{hash128, NodeId};
use ringstore_util::error::Error;

/// An ordered mapping from ring position to the node that owns it.
///
/// Invariants (see spec §3): positions are unique per `node_id`; there is
/// no notion of virtual nodes, so each `node_id` owns at most one position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ring {
	positions: BTreeMap<u128, NodeId>,
	node_positions: std::collections::HashMap<NodeId, u128>,
}

impl Ring {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts `node_id` at `hash(node_id)`. A no-op if the node already
	/// holds a position. Two distinct node ids hashing to the same
	/// position are a configuration error and are rejected rather than
	/// silently resolved (e.g. by the usual "first writer wins").
	pub fn add_node(&mut self, node_id: &NodeId) -> Result<(), Error> {
		if self.node_positions.contains_key(node_id) {
			return Ok(());
		}
		let pos = hash128(node_id);
		if let Some(existing) = self.positions.get(&pos) {
			if existing != node_id {
				return Err(Error::Message(format!(
					"hash collision placing node '{}': position {:#x} is already held by '{}'",
					node_id, pos, existing
				)));
			}
			return Ok(());
		}
		self.positions.insert(pos, node_id.clone());
		self.node_positions.insert(node_id.clone(), pos);
		Ok(())
	}

	/// Removes the node's position. No-op if the node is absent.
	pub fn remove_node(&mut self, node_id: &NodeId) {
		if let Some(pos) = self.node_positions.remove(node_id) {
			self.positions.remove(&pos);
		}
	}

	/// Returns up to `count` distinct node ids responsible for `key`, in
	/// ring order starting from the first position at or after
	/// `hash(key)` and wrapping around. The first entry is the primary
	/// replica; later entries are secondaries.
	pub fn get_nodes(&self, key: &str, count: usize) -> Vec<NodeId> {
		if self.positions.is_empty() || count == 0 {
			return Vec::new();
		}

		let entries: Vec<(&u128, &NodeId)> = self.positions.iter().collect();
		let len = entries.len();
		let h = hash128(key);

		// Smallest position >= h; wrap to the first position if none exists.
		let start_idx = entries.partition_point(|(p, _)| **p < h) % len;

		let mut result = Vec::with_capacity(count.min(len));
		let mut seen = HashSet::with_capacity(count.min(len));
		for i in 0..len {
			let (_, node_id) = entries[(start_idx + i) % len];
			if seen.insert(node_id) {
				result.push(node_id.clone());
				if result.len() >= count {
					break;
				}
			}
		}
		result
	}

	/// All known node ids, for observability (`/admin/status`).
	pub fn get_all_nodes(&self) -> Vec<NodeId> {
		self.positions.values().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.positions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ring_of(nodes: &[&str]) -> Ring {
		let mut r = Ring::new();
		for n in nodes {
			r.add_node(&n.to_string()).unwrap();
		}
		r
	}

	#[test]
	fn empty_ring_returns_nothing() {
		let r = Ring::new();
		assert_eq!(r.get_nodes("x", 3), Vec::<NodeId>::new());
	}

	#[test]
	fn replica_set_size_is_min_rf_and_ring_size() {
		let r = ring_of(&["a", "b"]);
		assert_eq!(r.get_nodes("hello", 3).len(), 2);
		assert_eq!(r.get_nodes("hello", 1).len(), 1);
	}

	#[test]
	fn replica_set_elements_are_distinct() {
		let r = ring_of(&["a", "b", "c", "d", "e"]);
		let replicas = r.get_nodes("some-key", 3);
		let unique: HashSet<_> = replicas.iter().collect();
		assert_eq!(unique.len(), replicas.len());
	}

	#[test]
	fn placement_is_deterministic_given_identical_membership() {
		let r1 = ring_of(&["node1", "node2", "node3"]);
		let r2 = ring_of(&["node3", "node1", "node2"]);
		for key in ["alice", "bob", "x", "user42"] {
			assert_eq!(r1.get_nodes(key, 3), r2.get_nodes(key, 3));
		}
	}

	#[test]
	fn add_node_is_idempotent() {
		let mut r = Ring::new();
		r.add_node(&"node1".to_string()).unwrap();
		r.add_node(&"node1".to_string()).unwrap();
		assert_eq!(r.get_all_nodes(), vec!["node1".to_string()]);
	}

	#[test]
	fn remove_node_is_noop_if_absent() {
		let mut r = ring_of(&["a"]);
		r.remove_node(&"absent".to_string());
		assert_eq!(r.len(), 1);
		r.remove_node(&"a".to_string());
		assert!(r.is_empty());
	}

	#[test]
	fn single_node_ring_always_returns_that_node() {
		let r = ring_of(&["solo"]);
		for key in ["a", "b", "c", "zzzz"] {
			assert_eq!(r.get_nodes(key, 3), vec!["solo".to_string()]);
		}
	}
}

//! The hash function the ring is built on, and the node identifier type
//! shared by every crate that talks about cluster membership.

use md5::{Digest, Md5};

/// Identifies a node, unique within the cluster. Plain `String` rather than
/// a newtype: node ids are caller-chosen at startup (config file / CLI flag)
/// and flow straight through JSON wire messages, so a newtype would just
/// mean `Deserialize`/`Display` boilerplate with no extra safety.
pub type NodeId = String;

/// `hash(s) = int(md5(utf8(s)).hex, 16)`, interpreted as a big-endian
/// unsigned 128-bit integer. Must match bit-for-bit across every node in
/// the cluster: this is the placement function the hash ring is built on,
/// and two nodes that disagree on it will compute different replica sets
/// for the same key.
pub fn hash128(s: &str) -> u128 {
	let mut hasher = Md5::new();
	hasher.update(s.as_bytes());
	let digest = hasher.finalize();
	u128::from_be_bytes(digest.into())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_is_stable() {
		let h1 = hash128("server1");
		let h2 = hash128("server1");
		assert_eq!(h1, h2);
		assert_ne!(hash128("server1"), hash128("server2"));
	}

	#[test]
	fn hash_matches_known_md5() {
		// md5("") = d41d8cd98f00b204e9800998ecf8427e
		assert_eq!(hash128(""), 0xd41d8cd98f00b204e9800998ecf8427eu128);
		// md5("a") = 0cc175b9c0f1b6a831c399e269772661
		assert_eq!(hash128("a"), 0x0cc175b9c0f1b6a831c399e269772661u128);
	}
}

//! The local store: a plain in-memory key-value map, serving this node's
//! share of local reads and writes. No persistence, no schema.
//!
//! Per spec §5, local store operations must complete without yielding —
//! this is a `std::sync::RwLock`, never a `tokio::sync` lock, since it is
//! never held across an await point.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct Store {
	data: RwLock<HashMap<String, String>>,
}

impl Store {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<String> {
		self.data.read().unwrap().get(key).cloned()
	}

	pub fn put(&self, key: &str, value: String) {
		self.data.write().unwrap().insert(key.to_string(), value);
	}

	/// Returns whether the key existed prior to the delete.
	pub fn delete(&self, key: &str) -> bool {
		self.data.write().unwrap().remove(key).is_some()
	}

	pub fn size(&self) -> usize {
		self.data.read().unwrap().len()
	}

	/// Unordered snapshot of all keys currently held locally.
	pub fn keys(&self) -> Vec<String> {
		self.data.read().unwrap().keys().cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn put_then_get_roundtrips() {
		let s = Store::new();
		s.put("k", "v".to_string());
		assert_eq!(s.get("k"), Some("v".to_string()));
	}

	#[test]
	fn get_absent_key_is_none() {
		let s = Store::new();
		assert_eq!(s.get("missing"), None);
	}

	#[test]
	fn put_overwrites() {
		let s = Store::new();
		s.put("k", "v1".to_string());
		s.put("k", "v2".to_string());
		assert_eq!(s.get("k"), Some("v2".to_string()));
	}

	#[test]
	fn delete_reports_existence() {
		let s = Store::new();
		assert!(!s.delete("k"));
		s.put("k", "v".to_string());
		assert!(s.delete("k"));
		assert_eq!(s.get("k"), None);
	}

	#[test]
	fn size_and_keys_track_contents() {
		let s = Store::new();
		s.put("a", "1".to_string());
		s.put("b", "2".to_string());
		assert_eq!(s.size(), 2);
		let mut keys = s.keys();
		keys.sort();
		assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
	}

	#[test]
	fn concurrent_access_is_safe() {
		use std::sync::Arc;
		use std::thread;

		let s = Arc::new(Store::new());
		let mut handles = vec![];
		for i in 0..8 {
			let s = s.clone();
			handles.push(thread::spawn(move || {
				for j in 0..100 {
					s.put(&format!("k{}-{}", i, j), "v".to_string());
				}
			}));
		}
		for h in handles {
			h.join().unwrap();
		}
		assert_eq!(s.size(), 800);
	}
}

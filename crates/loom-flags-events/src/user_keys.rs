// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded record of recently seen user keys, used to decide when an index
//! record is needed.

use std::num::NonZeroUsize;

use lru::LruCache;

/// Fixed-capacity set of user keys with least-recently-used eviction.
///
/// Owned by the event processor task; not synchronized.
#[derive(Debug)]
pub struct UserKeyCache {
	/// `None` when the configured capacity is zero.
	keys: Option<LruCache<String, ()>>,
}

impl UserKeyCache {
	pub fn new(capacity: usize) -> Self {
		Self {
			keys: NonZeroUsize::new(capacity).map(LruCache::new),
		}
	}

	/// Records `key` and reports whether it was already present.
	///
	/// A present key becomes most recently used. A new key evicts the least
	/// recently used one when the cache is full. With zero capacity every key
	/// is reported as new.
	pub fn notice(&mut self, key: &str) -> bool {
		let Some(keys) = self.keys.as_mut() else {
			return false;
		};

		if keys.get(key).is_some() {
			return true;
		}

		keys.put(key.to_string(), ());
		false
	}

	pub fn clear(&mut self) {
		if let Some(keys) = self.keys.as_mut() {
			keys.clear();
		}
	}

	pub fn len(&self) -> usize {
		self.keys.as_ref().map_or(0, LruCache::len)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.keys.as_ref().map_or(0, |keys| keys.cap().get())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_new_key_is_not_seen_then_seen() {
		let mut cache = UserKeyCache::new(10);
		assert!(!cache.notice("a"));
		assert!(cache.notice("a"));
		assert_eq!(cache.len(), 1);
	}

	#[test]
	fn test_least_recently_used_is_evicted() {
		let mut cache = UserKeyCache::new(2);
		assert!(!cache.notice("a"));
		assert!(!cache.notice("b"));
		assert!(!cache.notice("c"));

		assert!(!cache.notice("a"), "a should have been evicted");
		assert!(cache.notice("c"), "c is most recent and must be retained");
	}

	#[test]
	fn test_notice_refreshes_recency() {
		let mut cache = UserKeyCache::new(2);
		cache.notice("a");
		cache.notice("b");
		assert!(cache.notice("a"));
		cache.notice("c");

		assert!(cache.notice("a"));
		assert!(!cache.notice("b"));
	}

	#[test]
	fn test_zero_capacity_never_remembers() {
		let mut cache = UserKeyCache::new(0);
		assert!(!cache.notice("a"));
		assert!(!cache.notice("a"));
		assert!(cache.is_empty());
		assert_eq!(cache.capacity(), 0);
	}

	#[test]
	fn test_clear_forgets_everything() {
		let mut cache = UserKeyCache::new(5);
		cache.notice("a");
		cache.notice("b");
		cache.clear();
		assert!(cache.is_empty());
		assert!(!cache.notice("a"));
	}

	proptest! {
		#[test]
		fn test_never_exceeds_capacity(
			capacity in 0usize..20,
			keys in prop::collection::vec("[a-z]{1,3}", 0..200),
		) {
			let mut cache = UserKeyCache::new(capacity);
			for key in &keys {
				cache.notice(key);
				prop_assert!(cache.len() <= capacity);
			}
		}

		#[test]
		fn test_most_recent_key_is_always_seen(
			capacity in 1usize..20,
			keys in prop::collection::vec("[a-z]{1,3}", 1..100),
		) {
			let mut cache = UserKeyCache::new(capacity);
			for key in &keys {
				cache.notice(key);
			}
			let last = keys.last().unwrap();
			prop_assert!(cache.notice(last));
		}
	}
}

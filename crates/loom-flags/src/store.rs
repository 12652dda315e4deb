// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory flag store fed by the update processors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use loom_flags_core::FeatureFlag;
use parking_lot::RwLock;
use tracing::{debug, info};

/// Thread-safe map of flag key to flag configuration.
///
/// Deleted flags are kept as tombstones so a late update carrying an older
/// version cannot resurrect them. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct FlagStore {
	flags: Arc<RwLock<HashMap<String, FeatureFlag>>>,
	initialized: Arc<AtomicBool>,
}

impl FlagStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the whole flag set and marks the store initialized.
	pub fn init(&self, flags: impl IntoIterator<Item = FeatureFlag>) {
		let flags: HashMap<_, _> = flags.into_iter().map(|f| (f.key.clone(), f)).collect();
		let count = flags.len();
		*self.flags.write() = flags;
		self.initialized.store(true, Ordering::Release);
		info!(count, "Flag store initialized");
	}

	/// Inserts or replaces a flag unless the store already holds the same or a
	/// newer version. Returns true when the store changed.
	pub fn upsert(&self, flag: FeatureFlag) -> bool {
		let mut flags = self.flags.write();
		if let Some(existing) = flags.get(&flag.key) {
			if existing.version >= flag.version {
				debug!(
					key = %flag.key,
					current = existing.version,
					incoming = flag.version,
					"Ignoring stale flag update"
				);
				return false;
			}
		}
		flags.insert(flag.key.clone(), flag);
		true
	}

	/// Marks a flag deleted at the given version.
	pub fn delete(&self, key: &str, version: u64) -> bool {
		self.upsert(FeatureFlag::tombstone(key, version))
	}

	/// Returns the flag, or `None` if it is unknown or deleted.
	pub fn get(&self, key: &str) -> Option<FeatureFlag> {
		self.flags.read().get(key).filter(|f| !f.deleted).cloned()
	}

	/// Returns every flag that is not deleted.
	pub fn all(&self) -> HashMap<String, FeatureFlag> {
		self
			.flags
			.read()
			.iter()
			.filter(|(_, f)| !f.deleted)
			.map(|(k, f)| (k.clone(), f.clone()))
			.collect()
	}

	pub fn is_initialized(&self) -> bool {
		self.initialized.load(Ordering::Acquire)
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the event processor.

use std::collections::HashSet;
use std::time::Duration;

/// Default maximum number of output records held between flushes.
pub const DEFAULT_CAPACITY: usize = 10_000;
/// Default interval between automatic flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
/// Default number of user keys remembered for index-event deduplication.
pub const DEFAULT_USER_KEYS_CAPACITY: usize = 1_000;
/// Default interval at which remembered user keys are forgotten.
pub const DEFAULT_USER_KEYS_FLUSH_INTERVAL: Duration = Duration::from_secs(300);
/// Default size of the inbound event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 500;

/// Settings consumed by the event processor.
#[derive(Debug, Clone)]
pub struct EventsConfig {
	/// Maximum number of output records queued between flushes. Summary
	/// records are exempt.
	pub capacity: usize,
	/// Interval between automatic flushes.
	pub flush_interval: Duration,
	/// Number of user keys remembered; 0 disables deduplication so every
	/// event produces an index record.
	pub user_keys_capacity: usize,
	/// Interval at which remembered user keys are cleared.
	pub user_keys_flush_interval: Duration,
	/// Size of the inbound channel between callers and the processor task.
	pub channel_capacity: usize,
	/// Emit one in N individual records. 0 and 1 both mean every record.
	pub sampling_interval: u32,
	/// Put the full user in every feature and custom record instead of a
	/// key reference backed by index records.
	pub inline_users_in_events: bool,
	/// Redact every user attribute except `key`.
	pub all_attributes_private: bool,
	/// Attribute names redacted for every user.
	pub private_attribute_names: HashSet<String>,
}

impl Default for EventsConfig {
	fn default() -> Self {
		Self {
			capacity: DEFAULT_CAPACITY,
			flush_interval: DEFAULT_FLUSH_INTERVAL,
			user_keys_capacity: DEFAULT_USER_KEYS_CAPACITY,
			user_keys_flush_interval: DEFAULT_USER_KEYS_FLUSH_INTERVAL,
			channel_capacity: DEFAULT_CHANNEL_CAPACITY,
			sampling_interval: 0,
			inline_users_in_events: false,
			all_attributes_private: false,
			private_attribute_names: HashSet::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_events_config_defaults() {
		let config = EventsConfig::default();
		assert_eq!(config.capacity, 10_000);
		assert_eq!(config.flush_interval, Duration::from_secs(5));
		assert_eq!(config.user_keys_capacity, 1_000);
		assert_eq!(config.user_keys_flush_interval, Duration::from_secs(300));
		assert_eq!(config.channel_capacity, 500);
		assert_eq!(config.sampling_interval, 0);
		assert!(!config.inline_users_in_events);
		assert!(!config.all_attributes_private);
		assert!(config.private_attribute_names.is_empty());
	}
}

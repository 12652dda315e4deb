// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-flag evaluation counters for one flush window.
//!
//! Evaluations of untracked flags are not sent individually; they are counted
//! here by `(flag key, variation, version)` and reported as a single summary
//! record at flush time. The summarizer also owns the user-key cache that
//! decides when index records are needed.

use std::collections::HashMap;

use loom_flags_core::{FlagValue, User};

use crate::event::Event;
use crate::user_keys::UserKeyCache;

/// Identifies one distinct evaluation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
	pub key: String,
	pub variation: Option<usize>,
	pub version: Option<u64>,
}

/// Number of evaluations for a [`CounterKey`], with one representative value.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterValue {
	pub count: u64,
	pub flag_value: FlagValue,
	pub default: FlagValue,
}

/// Counters and time span of one summarization window.
///
/// `start_date` and `end_date` are zero until the first event is counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryState {
	pub counters: HashMap<CounterKey, CounterValue>,
	pub start_date: u64,
	pub end_date: u64,
}

impl SummaryState {
	pub fn is_empty(&self) -> bool {
		self.counters.is_empty()
	}
}

#[derive(Debug)]
pub struct EventSummarizer {
	state: SummaryState,
	user_keys: UserKeyCache,
}

impl EventSummarizer {
	pub fn new(user_keys_capacity: usize) -> Self {
		Self {
			state: SummaryState::default(),
			user_keys: UserKeyCache::new(user_keys_capacity),
		}
	}

	/// Counts a feature event whose flag is not individually tracked.
	///
	/// Returns false, leaving the state untouched, for custom and identify
	/// events and for tracked flags; the caller must queue those itself.
	pub fn summarize_event(&mut self, event: &Event) -> bool {
		let Event::FeatureRequest(fe) = event else {
			return false;
		};
		if fe.track_events {
			return false;
		}

		let key = CounterKey {
			key: fe.key.clone(),
			variation: fe.variation,
			version: fe.version,
		};
		self
			.state
			.counters
			.entry(key)
			.and_modify(|counter| counter.count += 1)
			.or_insert_with(|| CounterValue {
				count: 1,
				flag_value: fe.value.clone(),
				default: fe.default.clone(),
			});

		let timestamp = fe.base.creation_date;
		if self.state.start_date == 0 || timestamp < self.state.start_date {
			self.state.start_date = timestamp;
		}
		if timestamp > self.state.end_date {
			self.state.end_date = timestamp;
		}

		true
	}

	/// Returns the current window and starts an empty one.
	pub fn snapshot(&mut self) -> SummaryState {
		std::mem::take(&mut self.state)
	}

	/// Records the user and reports whether it was already seen in the current
	/// user-key window. Users without a key count as seen, so they never
	/// produce index records.
	pub fn notice_user(&mut self, user: &User) -> bool {
		match user.key() {
			Some(key) => self.user_keys.notice(key),
			None => true,
		}
	}

	/// Forgets every remembered user key.
	pub fn reset_users(&mut self) {
		self.user_keys.clear();
	}

	pub fn counter_count(&self) -> usize {
		self.state.counters.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::{CustomEvent, FeatureRequestEvent, IdentifyEvent};
	use loom_flags_core::FeatureFlag;
	use proptest::prelude::*;
	use serde_json::json;

	fn user() -> User {
		User::with_key("u1").build()
	}

	fn feature(flag: &FeatureFlag, variation: usize, value: FlagValue, at: u64) -> Event {
		let mut event = FeatureRequestEvent::new(
			user(),
			flag.key.clone(),
			Some(flag),
			Some(variation),
			value,
			json!("default"),
			None,
		);
		event.base.creation_date = at;
		event.into()
	}

	#[test]
	fn test_counts_by_flag_variation_and_version() {
		let flag = FeatureFlag::new("flagkey1", 11);
		let mut summarizer = EventSummarizer::new(10);

		assert!(summarizer.summarize_event(&feature(&flag, 0, json!("value1"), 2000)));
		assert!(summarizer.summarize_event(&feature(&flag, 1, json!("value2"), 1000)));
		assert!(summarizer.summarize_event(&feature(&flag, 0, json!("value1"), 3000)));

		let state = summarizer.snapshot();
		assert_eq!(state.start_date, 1000);
		assert_eq!(state.end_date, 3000);

		let value1 = &state.counters[&CounterKey {
			key: "flagkey1".to_string(),
			variation: Some(0),
			version: Some(11),
		}];
		assert_eq!(value1.count, 2);
		assert_eq!(value1.flag_value, json!("value1"));
		assert_eq!(value1.default, json!("default"));

		let value2 = &state.counters[&CounterKey {
			key: "flagkey1".to_string(),
			variation: Some(1),
			version: Some(11),
		}];
		assert_eq!(value2.count, 1);
	}

	#[test]
	fn test_tracked_flags_are_not_summarized() {
		let flag = FeatureFlag::new("tracked", 1).with_track_events(true);
		let mut summarizer = EventSummarizer::new(10);

		assert!(!summarizer.summarize_event(&feature(&flag, 0, json!(true), 1)));
		assert!(summarizer.snapshot().is_empty());
	}

	#[test]
	fn test_non_feature_events_are_not_summarized() {
		let mut summarizer = EventSummarizer::new(10);
		assert!(!summarizer.summarize_event(&CustomEvent::new(user(), "click", None).into()));
		assert!(!summarizer.summarize_event(&IdentifyEvent::new(user()).into()));
		assert_eq!(summarizer.counter_count(), 0);
	}

	#[test]
	fn test_unknown_flag_counts_with_no_version() {
		let mut summarizer = EventSummarizer::new(10);
		let event = FeatureRequestEvent::unknown_flag(user(), "missing", json!(false));
		assert!(summarizer.summarize_event(&event.into()));

		let state = summarizer.snapshot();
		let key = CounterKey {
			key: "missing".to_string(),
			variation: None,
			version: None,
		};
		assert_eq!(state.counters[&key].count, 1);
	}

	#[test]
	fn test_snapshot_resets_state() {
		let flag = FeatureFlag::new("flag", 1);
		let mut summarizer = EventSummarizer::new(10);
		summarizer.summarize_event(&feature(&flag, 0, json!(1), 5));

		let first = summarizer.snapshot();
		assert_eq!(first.counters.len(), 1);

		let second = summarizer.snapshot();
		assert!(second.is_empty());
		assert_eq!(second.start_date, 0);
		assert_eq!(second.end_date, 0);
	}

	#[test]
	fn test_notice_user_deduplicates_and_resets() {
		let mut summarizer = EventSummarizer::new(10);
		assert!(!summarizer.notice_user(&user()));
		assert!(summarizer.notice_user(&user()));

		summarizer.reset_users();
		assert!(!summarizer.notice_user(&user()));
	}

	#[test]
	fn test_user_without_key_counts_as_seen() {
		let mut summarizer = EventSummarizer::new(10);
		assert!(summarizer.notice_user(&User::default()));
	}

	proptest! {
		#[test]
		fn test_counts_sum_to_events_and_window_bounds_timestamps(
			events in prop::collection::vec((0usize..3, 1u64..1_000_000), 1..50),
		) {
			let flag = FeatureFlag::new("flag", 2);
			let mut summarizer = EventSummarizer::new(10);
			for (variation, at) in &events {
				summarizer.summarize_event(&feature(&flag, *variation, json!(variation), *at));
			}

			let state = summarizer.snapshot();
			let total: u64 = state.counters.values().map(|c| c.count).sum();
			prop_assert_eq!(total, events.len() as u64);
			for (_, at) in &events {
				prop_assert!(state.start_date <= *at && *at <= state.end_date);
			}
		}
	}
}

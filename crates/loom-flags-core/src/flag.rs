// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};

use crate::FlagValue;

/// A flag that must serve a particular variation before the dependent flag is
/// evaluated normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
	pub key: String,
	pub variation: usize,
}

/// Locally cached flag configuration, as delivered by the streaming or polling
/// update processors.
///
/// Variations are addressed by index. `track_events` asks the SDK to send a
/// full event for every evaluation instead of only counting it in the summary,
/// and `debug_events_until_date` (epoch millis) temporarily enables debug
/// events carrying the full user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlag {
	pub key: String,
	pub version: u64,
	#[serde(default)]
	pub on: bool,
	#[serde(default)]
	pub variations: Vec<FlagValue>,
	#[serde(default)]
	pub off_variation: Option<usize>,
	#[serde(default)]
	pub fallthrough_variation: Option<usize>,
	#[serde(default)]
	pub prerequisites: Vec<Prerequisite>,
	#[serde(default)]
	pub track_events: bool,
	#[serde(default)]
	pub debug_events_until_date: Option<u64>,
	#[serde(default)]
	pub deleted: bool,
}

impl FeatureFlag {
	/// Creates an enabled flag with no variations.
	pub fn new(key: impl Into<String>, version: u64) -> Self {
		Self {
			key: key.into(),
			version,
			on: true,
			variations: Vec::new(),
			off_variation: None,
			fallthrough_variation: None,
			prerequisites: Vec::new(),
			track_events: false,
			debug_events_until_date: None,
			deleted: false,
		}
	}

	/// Creates a deletion placeholder used to shadow older versions in a store.
	pub fn tombstone(key: impl Into<String>, version: u64) -> Self {
		Self {
			on: false,
			deleted: true,
			..Self::new(key, version)
		}
	}

	pub fn with_on(mut self, on: bool) -> Self {
		self.on = on;
		self
	}

	pub fn with_variations(mut self, variations: Vec<FlagValue>) -> Self {
		self.variations = variations;
		self
	}

	pub fn with_off_variation(mut self, index: usize) -> Self {
		self.off_variation = Some(index);
		self
	}

	pub fn with_fallthrough_variation(mut self, index: usize) -> Self {
		self.fallthrough_variation = Some(index);
		self
	}

	pub fn with_prerequisite(mut self, key: impl Into<String>, variation: usize) -> Self {
		self.prerequisites.push(Prerequisite {
			key: key.into(),
			variation,
		});
		self
	}

	pub fn with_track_events(mut self, track_events: bool) -> Self {
		self.track_events = track_events;
		self
	}

	pub fn with_debug_events_until_date(mut self, until_millis: u64) -> Self {
		self.debug_events_until_date = Some(until_millis);
		self
	}

	/// Returns the value of the variation at `index`.
	pub fn variation(&self, index: usize) -> Option<&FlagValue> {
		self.variations.get(index)
	}

	/// Validates the flag key format.
	///
	/// Valid keys:
	/// - Start with a lowercase letter
	/// - Contain lowercase alphanumerics, underscores and dots
	/// - 3-100 characters
	pub fn validate_key(key: &str) -> bool {
		if key.len() < 3 || key.len() > 100 {
			return false;
		}

		let mut chars = key.chars();

		match chars.next() {
			Some(c) if c.is_ascii_lowercase() => {}
			_ => return false,
		}

		chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.')
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_validate_key_valid() {
		assert!(FeatureFlag::validate_key("checkout.new_flow"));
		assert!(FeatureFlag::validate_key("abc"));
		assert!(FeatureFlag::validate_key("feature_1"));
	}

	#[test]
	fn test_validate_key_invalid() {
		assert!(!FeatureFlag::validate_key("ab"));
		assert!(!FeatureFlag::validate_key("1abc"));
		assert!(!FeatureFlag::validate_key("Feature"));
		assert!(!FeatureFlag::validate_key("new-flow"));
		assert!(!FeatureFlag::validate_key(&"a".repeat(101)));
	}

	#[test]
	fn test_variation_lookup() {
		let flag = FeatureFlag::new("flag", 1).with_variations(vec![json!("a"), json!("b")]);
		assert_eq!(flag.variation(0), Some(&json!("a")));
		assert_eq!(flag.variation(2), None);
	}

	#[test]
	fn test_deserialize_with_defaults() {
		let flag: FeatureFlag = serde_json::from_value(json!({
			"key": "flag",
			"version": 7,
			"on": true,
			"variations": [true, false],
			"fallthroughVariation": 0,
			"trackEvents": true
		}))
		.unwrap();

		assert_eq!(flag.version, 7);
		assert_eq!(flag.fallthrough_variation, Some(0));
		assert_eq!(flag.off_variation, None);
		assert!(flag.track_events);
		assert!(flag.prerequisites.is_empty());
		assert!(!flag.deleted);
	}

	#[test]
	fn test_tombstone_is_deleted_and_off() {
		let flag = FeatureFlag::tombstone("flag", 4);
		assert!(flag.deleted);
		assert!(!flag.on);
		assert_eq!(flag.version, 4);
	}
}

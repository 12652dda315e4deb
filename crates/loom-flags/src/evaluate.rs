// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag evaluation.
//!
//! Supports the on/off switch, prerequisites and the fallthrough variation.
//! Targeting rules and percentage rollouts are evaluated server-side and are
//! not modelled here.

use loom_flags_core::{FeatureFlag, FlagValue, User};
use loom_flags_events::FeatureRequestEvent;
use tracing::warn;

use crate::store::FlagStore;

/// Outcome of evaluating one flag for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
	/// Served value; `None` means the caller's default applies.
	pub value: Option<FlagValue>,
	pub variation: Option<usize>,
}

impl Evaluation {
	fn of(flag: &FeatureFlag, index: Option<usize>) -> Self {
		match index.and_then(|i| flag.variation(i).map(|v| (i, v))) {
			Some((i, value)) => Self {
				value: Some(value.clone()),
				variation: Some(i),
			},
			None => Self {
				value: None,
				variation: None,
			},
		}
	}
}

/// Evaluates `flag` for `user`.
///
/// Every prerequisite evaluated along the way yields a feature event with
/// `prereq_of` set, appended to `prereq_events` in evaluation order.
pub fn evaluate(
	flag: &FeatureFlag,
	user: &User,
	store: &FlagStore,
	prereq_events: &mut Vec<FeatureRequestEvent>,
) -> Evaluation {
	let mut visiting = vec![flag.key.clone()];
	evaluate_inner(flag, user, store, prereq_events, &mut visiting)
}

fn evaluate_inner(
	flag: &FeatureFlag,
	user: &User,
	store: &FlagStore,
	prereq_events: &mut Vec<FeatureRequestEvent>,
	visiting: &mut Vec<String>,
) -> Evaluation {
	if !flag.on {
		return Evaluation::of(flag, flag.off_variation);
	}

	for prereq in &flag.prerequisites {
		if visiting.contains(&prereq.key) {
			warn!(flag = %flag.key, prerequisite = %prereq.key, "Prerequisite cycle detected");
			return Evaluation::of(flag, flag.off_variation);
		}

		let Some(prereq_flag) = store.get(&prereq.key) else {
			warn!(flag = %flag.key, prerequisite = %prereq.key, "Prerequisite flag not found");
			return Evaluation::of(flag, flag.off_variation);
		};

		visiting.push(prereq.key.clone());
		let result = evaluate_inner(&prereq_flag, user, store, prereq_events, visiting);
		visiting.pop();

		prereq_events.push(FeatureRequestEvent::new(
			user.clone(),
			prereq_flag.key.clone(),
			Some(&prereq_flag),
			result.variation,
			result.value.unwrap_or(FlagValue::Null),
			FlagValue::Null,
			Some(flag.key.clone()),
		));

		if !prereq_flag.on || result.variation != Some(prereq.variation) {
			return Evaluation::of(flag, flag.off_variation);
		}
	}

	Evaluation::of(flag, flag.fallthrough_variation)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn bool_flag(key: &str) -> FeatureFlag {
		FeatureFlag::new(key, 1)
			.with_variations(vec![json!(false), json!(true)])
			.with_off_variation(0)
			.with_fallthrough_variation(1)
	}

	fn user() -> User {
		User::with_key("u1").build()
	}

	#[test]
	fn test_on_flag_serves_fallthrough() {
		let mut events = Vec::new();
		let result = evaluate(&bool_flag("a"), &user(), &FlagStore::new(), &mut events);
		assert_eq!(result.value, Some(json!(true)));
		assert_eq!(result.variation, Some(1));
		assert!(events.is_empty());
	}

	#[test]
	fn test_off_flag_serves_off_variation() {
		let mut events = Vec::new();
		let flag = bool_flag("a").with_on(false);
		let result = evaluate(&flag, &user(), &FlagStore::new(), &mut events);
		assert_eq!(result.value, Some(json!(false)));
		assert_eq!(result.variation, Some(0));
	}

	#[test]
	fn test_missing_off_variation_serves_default() {
		let mut events = Vec::new();
		let flag = FeatureFlag::new("a", 1).with_on(false);
		let result = evaluate(&flag, &user(), &FlagStore::new(), &mut events);
		assert_eq!(result.value, None);
		assert_eq!(result.variation, None);
	}

	#[test]
	fn test_out_of_range_variation_serves_default() {
		let mut events = Vec::new();
		let flag = FeatureFlag::new("a", 1)
			.with_variations(vec![json!("x")])
			.with_fallthrough_variation(4);
		let result = evaluate(&flag, &user(), &FlagStore::new(), &mut events);
		assert_eq!(result.value, None);
	}

	#[test]
	fn test_satisfied_prerequisite_emits_event_and_falls_through() {
		let store = FlagStore::new();
		store.upsert(bool_flag("parent.prereq"));
		let flag = bool_flag("child").with_prerequisite("parent.prereq", 1);

		let mut events = Vec::new();
		let result = evaluate(&flag, &user(), &store, &mut events);

		assert_eq!(result.value, Some(json!(true)));
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].key, "parent.prereq");
		assert_eq!(events[0].prereq_of.as_deref(), Some("child"));
		assert_eq!(events[0].variation, Some(1));
		assert_eq!(events[0].version, Some(1));
	}

	#[test]
	fn test_failed_prerequisite_serves_off_variation() {
		let store = FlagStore::new();
		store.upsert(bool_flag("parent.prereq").with_on(false));
		let flag = bool_flag("child").with_prerequisite("parent.prereq", 1);

		let mut events = Vec::new();
		let result = evaluate(&flag, &user(), &store, &mut events);

		assert_eq!(result.value, Some(json!(false)));
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].variation, Some(0));
	}

	#[test]
	fn test_missing_prerequisite_serves_off_variation() {
		let flag = bool_flag("child").with_prerequisite("nope", 1);
		let mut events = Vec::new();
		let result = evaluate(&flag, &user(), &FlagStore::new(), &mut events);
		assert_eq!(result.variation, Some(0));
		assert!(events.is_empty());
	}

	#[test]
	fn test_nested_prerequisites_emit_events_innermost_first() {
		let store = FlagStore::new();
		store.upsert(bool_flag("grandparent"));
		store.upsert(bool_flag("parent").with_prerequisite("grandparent", 1));
		let flag = bool_flag("child").with_prerequisite("parent", 1);

		let mut events = Vec::new();
		evaluate(&flag, &user(), &store, &mut events);

		let keys: Vec<_> = events.iter().map(|e| e.key.as_str()).collect();
		assert_eq!(keys, vec!["grandparent", "parent"]);
		assert_eq!(events[0].prereq_of.as_deref(), Some("parent"));
		assert_eq!(events[1].prereq_of.as_deref(), Some("child"));
	}

	#[test]
	fn test_prerequisite_cycle_serves_off_variation() {
		let store = FlagStore::new();
		store.upsert(bool_flag("a").with_prerequisite("b", 1));
		store.upsert(bool_flag("b").with_prerequisite("a", 1));

		let flag = store.get("a").unwrap();
		let mut events = Vec::new();
		let result = evaluate(&flag, &user(), &store, &mut events);
		assert_eq!(result.variation, Some(0));
	}
}

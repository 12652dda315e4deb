// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire records posted to the events service.
//!
//! One flush produces a JSON array of [`OutputEvent`]s, each tagged by
//! `kind`:
//!
//! | Kind | Produced for |
//! |------|--------------|
//! | `feature` | evaluations of tracked flags |
//! | `debug` | evaluations while a flag's debug window is open |
//! | `identify` | explicit identify calls |
//! | `custom` | explicit track calls |
//! | `index` | the first event seen for a user in key-reference mode |
//! | `summary` | counters for everything that was not sent individually |

use std::collections::{BTreeMap, HashSet};

use loom_flags_core::{FlagValue, User};
use serde::Serialize;

use crate::config::EventsConfig;
use crate::event::{BaseEvent, CustomEvent, Event, FeatureRequestEvent, IdentifyEvent};
use crate::privacy::{scrub_user, EventUser};
use crate::summarizer::SummaryState;

/// How a record refers to its user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UserRef {
	#[serde(rename = "user")]
	Inline(EventUser),
	#[serde(rename = "userKey")]
	Key(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureOutput {
	pub creation_date: u64,
	pub key: String,
	#[serde(flatten)]
	pub user: UserRef,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub variation: Option<usize>,
	pub value: FlagValue,
	#[serde(skip_serializing_if = "FlagValue::is_null")]
	pub default: FlagValue,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub prereq_of: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyOutput {
	pub creation_date: u64,
	pub key: String,
	pub user: EventUser,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomOutput {
	pub creation_date: u64,
	pub key: String,
	#[serde(flatten)]
	pub user: UserRef,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<FlagValue>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metric_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOutput {
	pub creation_date: u64,
	pub user: EventUser,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterOutput {
	pub value: FlagValue,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub variation: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub version: Option<u64>,
	pub count: u64,
	/// Present and true when the flag was not known at evaluation time.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub unknown: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagSummaryOutput {
	#[serde(skip_serializing_if = "FlagValue::is_null")]
	pub default: FlagValue,
	pub counters: Vec<CounterOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutput {
	pub start_date: u64,
	pub end_date: u64,
	pub features: BTreeMap<String, FlagSummaryOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OutputEvent {
	Feature(FeatureOutput),
	Debug(FeatureOutput),
	Identify(IdentifyOutput),
	Custom(CustomOutput),
	Index(IndexOutput),
	Summary(SummaryOutput),
}

impl OutputEvent {
	pub fn kind(&self) -> &'static str {
		match self {
			OutputEvent::Feature(_) => "feature",
			OutputEvent::Debug(_) => "debug",
			OutputEvent::Identify(_) => "identify",
			OutputEvent::Custom(_) => "custom",
			OutputEvent::Index(_) => "index",
			OutputEvent::Summary(_) => "summary",
		}
	}
}

/// Shapes raw events into [`OutputEvent`]s, applying the privacy settings.
#[derive(Debug, Clone)]
pub struct EventOutputFormatter {
	inline_users: bool,
	all_attributes_private: bool,
	private_attribute_names: HashSet<String>,
}

impl EventOutputFormatter {
	pub fn new(config: &EventsConfig) -> Self {
		Self {
			inline_users: config.inline_users_in_events,
			all_attributes_private: config.all_attributes_private,
			private_attribute_names: config.private_attribute_names.clone(),
		}
	}

	pub fn scrub(&self, user: &User) -> EventUser {
		scrub_user(user, self.all_attributes_private, &self.private_attribute_names)
	}

	/// Key reference unless users are inlined. A user without a key is always
	/// inlined since there is nothing to reference.
	fn user_ref(&self, user: &User) -> UserRef {
		match user.key() {
			Some(key) if !self.inline_users => UserRef::Key(key.to_string()),
			_ => UserRef::Inline(self.scrub(user)),
		}
	}

	/// Shapes the individual record for an event.
	pub fn make_output_event(&self, event: &Event) -> OutputEvent {
		match event {
			Event::FeatureRequest(fe) => {
				OutputEvent::Feature(self.feature_output(fe, self.user_ref(&fe.base.user)))
			}
			Event::Custom(ce) => OutputEvent::Custom(self.custom_output(ce)),
			Event::Identify(ie) => OutputEvent::Identify(self.identify_output(ie)),
		}
	}

	/// Shapes a debug copy of an evaluation. Debug records always carry the
	/// full user.
	pub fn make_debug_event(&self, event: &FeatureRequestEvent) -> OutputEvent {
		let user = UserRef::Inline(self.scrub(&event.base.user));
		OutputEvent::Debug(self.feature_output(event, user))
	}

	pub fn make_index_event(&self, base: &BaseEvent) -> OutputEvent {
		OutputEvent::Index(IndexOutput {
			creation_date: base.creation_date,
			user: self.scrub(&base.user),
		})
	}

	/// Shapes a summary record, or `None` when nothing was counted.
	///
	/// Counters are grouped by flag key and ordered by variation then version
	/// so output is deterministic.
	pub fn make_summary_event(&self, summary: SummaryState) -> Option<OutputEvent> {
		if summary.is_empty() {
			return None;
		}

		let mut counters: Vec<_> = summary.counters.into_iter().collect();
		counters.sort_by(|(a, _), (b, _)| {
			(&a.key, a.variation, a.version).cmp(&(&b.key, b.variation, b.version))
		});

		let mut features: BTreeMap<String, FlagSummaryOutput> = BTreeMap::new();
		for (key, value) in counters {
			let flag = features.entry(key.key).or_insert_with(|| FlagSummaryOutput {
				default: value.default.clone(),
				counters: Vec::new(),
			});
			flag.counters.push(CounterOutput {
				value: value.flag_value,
				variation: key.variation,
				version: key.version,
				count: value.count,
				unknown: key.version.is_none().then_some(true),
			});
		}

		Some(OutputEvent::Summary(SummaryOutput {
			start_date: summary.start_date,
			end_date: summary.end_date,
			features,
		}))
	}

	fn feature_output(&self, event: &FeatureRequestEvent, user: UserRef) -> FeatureOutput {
		FeatureOutput {
			creation_date: event.base.creation_date,
			key: event.key.clone(),
			user,
			variation: event.variation,
			value: event.value.clone(),
			default: event.default.clone(),
			version: event.version,
			prereq_of: event.prereq_of.clone(),
		}
	}

	fn custom_output(&self, event: &CustomEvent) -> CustomOutput {
		CustomOutput {
			creation_date: event.base.creation_date,
			key: event.key.clone(),
			user: self.user_ref(&event.base.user),
			data: event.data.clone(),
			metric_value: event.metric_value,
		}
	}

	fn identify_output(&self, event: &IdentifyEvent) -> IdentifyOutput {
		IdentifyOutput {
			creation_date: event.base.creation_date,
			key: event.base.user.key().unwrap_or_default().to_string(),
			user: self.scrub(&event.base.user),
		}
	}
}

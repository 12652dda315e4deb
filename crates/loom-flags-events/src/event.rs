// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Raw analytics events, as produced by flag evaluations and explicit
//! identify/track calls.
//!
//! Events are immutable once built and are consumed exactly once by the event
//! processor, which either counts them in the summary or turns them into
//! output records (see [`crate::output`]).

use loom_flags_core::{now_millis, FeatureFlag, FlagValue, User};

/// Fields shared by every event.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseEvent {
	/// Epoch milliseconds at which the event was created.
	pub creation_date: u64,
	pub user: User,
}

impl BaseEvent {
	pub fn new(user: User) -> Self {
		Self {
			creation_date: now_millis(),
			user,
		}
	}
}

/// One flag evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequestEvent {
	pub base: BaseEvent,
	pub key: String,
	/// Index of the served variation; `None` when the default was served.
	pub variation: Option<usize>,
	pub value: FlagValue,
	pub default: FlagValue,
	/// `None` when the flag was unknown.
	pub version: Option<u64>,
	/// Set when this evaluation was a prerequisite of another flag.
	pub prereq_of: Option<String>,
	pub track_events: bool,
	pub debug_events_until_date: Option<u64>,
}

impl FeatureRequestEvent {
	/// Builds an evaluation event, taking version and tracking settings from
	/// the flag when it is known.
	pub fn new(
		user: User,
		key: impl Into<String>,
		flag: Option<&FeatureFlag>,
		variation: Option<usize>,
		value: FlagValue,
		default: FlagValue,
		prereq_of: Option<String>,
	) -> Self {
		Self {
			base: BaseEvent::new(user),
			key: key.into(),
			variation,
			value,
			default,
			version: flag.map(|f| f.version),
			prereq_of,
			track_events: flag.is_some_and(|f| f.track_events),
			debug_events_until_date: flag.and_then(|f| f.debug_events_until_date),
		}
	}

	/// Builds the event for evaluating a flag that is not in the store.
	pub fn unknown_flag(user: User, key: impl Into<String>, default: FlagValue) -> Self {
		Self::new(user, key, None, None, default.clone(), default, None)
	}
}

/// A custom event recorded through `track`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEvent {
	pub base: BaseEvent,
	pub key: String,
	pub data: Option<FlagValue>,
	pub metric_value: Option<f64>,
}

impl CustomEvent {
	pub fn new(user: User, key: impl Into<String>, data: Option<FlagValue>) -> Self {
		Self {
			base: BaseEvent::new(user),
			key: key.into(),
			data,
			metric_value: None,
		}
	}

	pub fn with_metric_value(mut self, metric_value: f64) -> Self {
		self.metric_value = Some(metric_value);
		self
	}
}

/// Reports a user's full attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifyEvent {
	pub base: BaseEvent,
}

impl IdentifyEvent {
	pub fn new(user: User) -> Self {
		Self {
			base: BaseEvent::new(user),
		}
	}
}

/// Every event accepted by the processor.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
	FeatureRequest(FeatureRequestEvent),
	Custom(CustomEvent),
	Identify(IdentifyEvent),
}

impl Event {
	pub fn base(&self) -> &BaseEvent {
		match self {
			Event::FeatureRequest(e) => &e.base,
			Event::Custom(e) => &e.base,
			Event::Identify(e) => &e.base,
		}
	}

	pub fn base_mut(&mut self) -> &mut BaseEvent {
		match self {
			Event::FeatureRequest(e) => &mut e.base,
			Event::Custom(e) => &mut e.base,
			Event::Identify(e) => &mut e.base,
		}
	}

	pub fn user(&self) -> &User {
		&self.base().user
	}

	/// Short name used in log fields.
	pub fn kind(&self) -> &'static str {
		match self {
			Event::FeatureRequest(_) => "feature",
			Event::Custom(_) => "custom",
			Event::Identify(_) => "identify",
		}
	}
}

impl From<FeatureRequestEvent> for Event {
	fn from(event: FeatureRequestEvent) -> Self {
		Event::FeatureRequest(event)
	}
}

impl From<CustomEvent> for Event {
	fn from(event: CustomEvent) -> Self {
		Event::Custom(event)
	}
}

impl From<IdentifyEvent> for Event {
	fn from(event: IdentifyEvent) -> Self {
		Event::Identify(event)
	}
}

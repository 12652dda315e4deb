// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature flags client.

use std::sync::Arc;

use loom_flags_core::{FlagValue, User};
use loom_flags_events::{
	CustomEvent, DefaultEventProcessor, EventProcessor, EventSender, FeatureRequestEvent,
	HttpEventSender, IdentifyEvent, NullEventProcessor,
};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::evaluate::{evaluate, Evaluation};
use crate::store::FlagStore;

/// Evaluates flags from the local store and reports analytics events.
///
/// Cheap to clone; clones share the store and the event processor. Variation
/// methods never fail: an unknown flag or a value of the wrong type yields the
/// caller's default.
#[derive(Clone)]
pub struct FlagsClient {
	inner: Arc<FlagsClientInner>,
}

struct FlagsClientInner {
	store: FlagStore,
	events: Arc<dyn EventProcessor>,
}

impl FlagsClient {
	/// Creates a client that posts events over HTTP.
	///
	/// Must be called from within a Tokio runtime when event sending is
	/// enabled.
	pub fn new(config: Config) -> Result<Self> {
		if !config.send_events() {
			info!("Event sending disabled");
			return Ok(Self::with_processor(Arc::new(NullEventProcessor)));
		}

		let builder = match config.user_agent() {
			Some(user_agent) => loom_common_http::builder_with_user_agent(user_agent),
			None => loom_common_http::builder(),
		};
		let http = builder.timeout(config.request_timeout()).build()?;
		let sender = HttpEventSender::new(http, config.events_uri(), config.sdk_key())?;
		info!(url = %sender.url(), "Starting flags client");

		Ok(Self::with_event_sender(&config, Arc::new(sender)))
	}

	/// Creates a client that hands event batches to `sender`.
	pub fn with_event_sender(config: &Config, sender: Arc<dyn EventSender>) -> Self {
		if !config.send_events() {
			return Self::with_processor(Arc::new(NullEventProcessor));
		}
		let processor = DefaultEventProcessor::start(config.events().clone(), sender);
		Self::with_processor(Arc::new(processor))
	}

	/// Creates a client around an existing event processor.
	pub fn with_processor(events: Arc<dyn EventProcessor>) -> Self {
		Self {
			inner: Arc::new(FlagsClientInner {
				store: FlagStore::new(),
				events,
			}),
		}
	}

	/// The flag store. Update processors write here.
	pub fn store(&self) -> &FlagStore {
		&self.inner.store
	}

	pub fn is_initialized(&self) -> bool {
		self.inner.store.is_initialized()
	}

	pub fn bool_variation(&self, key: &str, user: &User, default: bool) -> bool {
		self
			.variation(key, user, FlagValue::Bool(default), FlagValue::is_boolean)
			.as_bool()
			.unwrap_or(default)
	}

	pub fn str_variation(&self, key: &str, user: &User, default: &str) -> String {
		match self.variation(key, user, FlagValue::from(default), FlagValue::is_string) {
			FlagValue::String(s) => s,
			_ => default.to_string(),
		}
	}

	pub fn int_variation(&self, key: &str, user: &User, default: i64) -> i64 {
		self
			.variation(key, user, FlagValue::from(default), FlagValue::is_i64)
			.as_i64()
			.unwrap_or(default)
	}

	pub fn float_variation(&self, key: &str, user: &User, default: f64) -> f64 {
		self
			.variation(key, user, FlagValue::from(default), FlagValue::is_number)
			.as_f64()
			.unwrap_or(default)
	}

	/// Serves any JSON value; only an unknown flag or a missing variation falls
	/// back to the default.
	pub fn json_variation(&self, key: &str, user: &User, default: FlagValue) -> FlagValue {
		self.variation(key, user, default, |_| true)
	}

	/// Evaluates without type checks or events.
	pub fn evaluate(&self, key: &str, user: &User) -> Option<Evaluation> {
		let flag = self.inner.store.get(key)?;
		Some(evaluate(&flag, user, &self.inner.store, &mut Vec::new()))
	}

	fn variation(
		&self,
		key: &str,
		user: &User,
		default: FlagValue,
		type_matches: fn(&FlagValue) -> bool,
	) -> FlagValue {
		let Some(flag) = self.inner.store.get(key) else {
			debug!(key, "Unknown flag, serving default");
			self.send(FeatureRequestEvent::unknown_flag(user.clone(), key, default.clone()));
			return default;
		};

		let mut prereq_events = Vec::new();
		let result = evaluate(&flag, user, &self.inner.store, &mut prereq_events);
		for event in prereq_events {
			self.send(event);
		}

		let (value, variation) = match result.value {
			Some(value) if type_matches(&value) => (value, result.variation),
			Some(_) => {
				warn!(key, "Flag value has the wrong type, serving default");
				(default.clone(), None)
			}
			None => (default.clone(), None),
		};

		self.send(FeatureRequestEvent::new(
			user.clone(),
			key,
			Some(&flag),
			variation,
			value.clone(),
			default,
			None,
		));
		value
	}

	/// Reports the user's attributes.
	pub fn identify(&self, user: &User) {
		self.send(IdentifyEvent::new(user.clone()));
	}

	/// Records a custom event.
	pub fn track(&self, user: &User, key: &str, data: Option<FlagValue>) {
		self.send(CustomEvent::new(user.clone(), key, data));
	}

	/// Records a custom event carrying a numeric metric.
	pub fn track_with_metric(&self, user: &User, key: &str, data: Option<FlagValue>, metric_value: f64) {
		self.send(CustomEvent::new(user.clone(), key, data).with_metric_value(metric_value));
	}

	/// Asks the event processor to deliver pending events soon.
	pub fn flush(&self) {
		self.inner.events.flush();
	}

	/// Delivers pending events and waits for the result.
	pub async fn flush_and_wait(&self) -> Result<()> {
		Ok(self.inner.events.flush_and_wait().await?)
	}

	/// Delivers pending events and stops the event processor.
	pub async fn close(&self) -> Result<()> {
		info!("Closing flags client");
		Ok(self.inner.events.close().await?)
	}

	fn send(&self, event: impl Into<loom_flags_events::Event>) {
		self.inner.events.send_event(event.into());
	}
}

impl std::fmt::Debug for FlagsClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FlagsClient")
			.field("initialized", &self.is_initialized())
			.finish_non_exhaustive()
	}
}

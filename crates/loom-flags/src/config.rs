// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SDK configuration.

use std::fmt;
use std::time::Duration;

use loom_flags_events::EventsConfig;
use url::Url;

use crate::error::{FlagsError, Result};

/// Events service used when no URI is configured.
pub const DEFAULT_EVENTS_URI: &str = "https://events.loom.dev";

/// Default timeout for event delivery requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated SDK configuration. Built with [`Config::builder`].
#[derive(Clone)]
pub struct Config {
	sdk_key: String,
	events_uri: String,
	send_events: bool,
	events: EventsConfig,
	request_timeout: Duration,
	user_agent: Option<String>,
}

impl Config {
	/// Starts a builder for the given SDK key.
	pub fn builder(sdk_key: impl Into<String>) -> ConfigBuilder {
		ConfigBuilder::new(sdk_key)
	}

	pub fn sdk_key(&self) -> &str {
		&self.sdk_key
	}

	pub fn events_uri(&self) -> &str {
		&self.events_uri
	}

	pub fn send_events(&self) -> bool {
		self.send_events
	}

	pub fn events(&self) -> &EventsConfig {
		&self.events
	}

	pub fn request_timeout(&self) -> Duration {
		self.request_timeout
	}

	/// User-Agent override; `None` means the SDK default.
	pub fn user_agent(&self) -> Option<&str> {
		self.user_agent.as_deref()
	}
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("sdk_key", &"[REDACTED]")
			.field("events_uri", &self.events_uri)
			.field("send_events", &self.send_events)
			.field("events", &self.events)
			.field("request_timeout", &self.request_timeout)
			.field("user_agent", &self.user_agent)
			.finish()
	}
}

/// Builder for [`Config`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use loom_flags::Config;
///
/// let config = Config::builder("sdk-key")
///     .events_uri("https://events.loom.example.com")
///     .flush_interval(Duration::from_secs(2))
///     .private_attribute_names(["email"])
///     .build()
///     .unwrap();
///
/// assert_eq!(config.events().flush_interval, Duration::from_secs(2));
/// ```
#[derive(Clone)]
pub struct ConfigBuilder {
	sdk_key: String,
	events_uri: String,
	send_events: bool,
	events: EventsConfig,
	request_timeout: Duration,
	user_agent: Option<String>,
}

impl ConfigBuilder {
	pub fn new(sdk_key: impl Into<String>) -> Self {
		Self {
			sdk_key: sdk_key.into(),
			events_uri: DEFAULT_EVENTS_URI.to_string(),
			send_events: true,
			events: EventsConfig::default(),
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			user_agent: None,
		}
	}

	/// Base URI of the events service. Batches go to `<uri>/bulk`.
	pub fn events_uri(mut self, uri: impl Into<String>) -> Self {
		self.events_uri = uri.into();
		self
	}

	/// Turns analytics events off entirely when false.
	pub fn send_events(mut self, send_events: bool) -> Self {
		self.send_events = send_events;
		self
	}

	/// Replaces every event setting at once.
	pub fn events_config(mut self, events: EventsConfig) -> Self {
		self.events = events;
		self
	}

	pub fn capacity(mut self, capacity: usize) -> Self {
		self.events.capacity = capacity;
		self
	}

	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.events.flush_interval = interval;
		self
	}

	pub fn user_keys_capacity(mut self, capacity: usize) -> Self {
		self.events.user_keys_capacity = capacity;
		self
	}

	pub fn user_keys_flush_interval(mut self, interval: Duration) -> Self {
		self.events.user_keys_flush_interval = interval;
		self
	}

	/// Sends one in `interval` individual records. 0 or 1 sends all of them.
	pub fn sampling_interval(mut self, interval: u32) -> Self {
		self.events.sampling_interval = interval;
		self
	}

	pub fn inline_users_in_events(mut self, inline: bool) -> Self {
		self.events.inline_users_in_events = inline;
		self
	}

	pub fn all_attributes_private(mut self, all_private: bool) -> Self {
		self.events.all_attributes_private = all_private;
		self
	}

	/// Attribute names redacted from every user in events.
	pub fn private_attribute_names<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.events.private_attribute_names = names.into_iter().map(Into::into).collect();
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;
		self
	}

	/// Overrides the User-Agent sent to the events service.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());
		self
	}

	pub fn build(self) -> Result<Config> {
		let sdk_key = self.sdk_key.trim().to_string();
		if sdk_key.is_empty() {
			return Err(FlagsError::InvalidSdkKey);
		}

		let events_uri = self.events_uri.trim_end_matches('/').to_string();
		match Url::parse(&events_uri) {
			Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
			_ => return Err(FlagsError::InvalidEventsUri(self.events_uri)),
		}

		Ok(Config {
			sdk_key,
			events_uri,
			send_events: self.send_events,
			events: self.events,
			request_timeout: self.request_timeout,
			user_agent: self.user_agent,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = Config::builder("key").build().unwrap();
		assert_eq!(config.sdk_key(), "key");
		assert_eq!(config.events_uri(), DEFAULT_EVENTS_URI);
		assert!(config.send_events());
		assert_eq!(config.events().capacity, 10_000);
		assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
		assert_eq!(config.user_agent(), None);
	}

	#[test]
	fn test_blank_sdk_key_is_rejected() {
		assert!(matches!(
			Config::builder("  ").build(),
			Err(FlagsError::InvalidSdkKey)
		));
	}

	#[test]
	fn test_events_uri_is_validated_and_normalized() {
		let config = Config::builder("key")
			.events_uri("http://localhost:8080/")
			.build()
			.unwrap();
		assert_eq!(config.events_uri(), "http://localhost:8080");

		for bad in ["not a uri", "ftp://example.com", ""] {
			assert!(matches!(
				Config::builder("key").events_uri(bad).build(),
				Err(FlagsError::InvalidEventsUri(_))
			));
		}
	}

	#[test]
	fn test_event_settings_flow_into_events_config() {
		let config = Config::builder("key")
			.capacity(5)
			.flush_interval(Duration::from_millis(100))
			.user_keys_capacity(7)
			.user_keys_flush_interval(Duration::from_secs(1))
			.sampling_interval(3)
			.inline_users_in_events(true)
			.all_attributes_private(true)
			.private_attribute_names(["email", "plan"])
			.build()
			.unwrap();

		let events = config.events();
		assert_eq!(events.capacity, 5);
		assert_eq!(events.flush_interval, Duration::from_millis(100));
		assert_eq!(events.user_keys_capacity, 7);
		assert_eq!(events.user_keys_flush_interval, Duration::from_secs(1));
		assert_eq!(events.sampling_interval, 3);
		assert!(events.inline_users_in_events);
		assert!(events.all_attributes_private);
		assert!(events.private_attribute_names.contains("email"));
		assert!(events.private_attribute_names.contains("plan"));
	}

	#[test]
	fn test_debug_redacts_sdk_key() {
		let config = Config::builder("super-secret-key").build().unwrap();
		let rendered = format!("{config:?}");
		assert!(!rendered.contains("super-secret-key"));
		assert!(rendered.contains("[REDACTED]"));
	}
}

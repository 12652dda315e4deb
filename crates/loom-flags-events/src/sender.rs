// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of serialized event batches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::{EventsError, Result};

/// Header announcing the payload format version.
pub const EVENT_SCHEMA_HEADER: &str = "X-Loom-Event-Schema";
/// Current payload format version.
pub const EVENT_SCHEMA_VERSION: &str = "3";

/// Delivers one batch of events to the events service.
#[async_trait]
pub trait EventSender: Send + Sync {
	/// Sends a JSON array of `event_count` output records.
	///
	/// On success returns the server's clock (epoch millis) when the response
	/// reported one. An `Unauthorized` error means delivery must stop for
	/// good.
	async fn send_event_data(&self, payload: Vec<u8>, event_count: usize) -> Result<Option<u64>>;
}

/// Returns the bulk endpoint under the events base URI.
pub fn bulk_events_url(events_uri: &str) -> Result<Url> {
	let base = events_uri.trim_end_matches('/');
	Ok(Url::parse(&format!("{base}/bulk"))?)
}

/// Posts batches to `<events_uri>/bulk`.
#[derive(Debug, Clone)]
pub struct HttpEventSender {
	client: Client,
	url: Url,
	sdk_key: String,
}

impl HttpEventSender {
	/// Creates a sender. The client is expected to carry the SDK User-Agent
	/// (see [`loom_common_http::builder`]).
	pub fn new(client: Client, events_uri: &str, sdk_key: impl Into<String>) -> Result<Self> {
		Ok(Self {
			client,
			url: bulk_events_url(events_uri)?,
			sdk_key: sdk_key.into(),
		})
	}

	pub fn url(&self) -> &Url {
		&self.url
	}
}

#[async_trait]
impl EventSender for HttpEventSender {
	async fn send_event_data(&self, payload: Vec<u8>, event_count: usize) -> Result<Option<u64>> {
		debug!(url = %self.url, event_count, bytes = payload.len(), "Posting events");

		let response = self
			.client
			.post(self.url.clone())
			.header(AUTHORIZATION, &self.sdk_key)
			.header(CONTENT_TYPE, "application/json")
			.header(EVENT_SCHEMA_HEADER, EVENT_SCHEMA_VERSION)
			.body(payload)
			.send()
			.await?;

		let status = response.status();
		let server_time = loom_common_http::server_time_millis(response.headers());

		if status.is_success() {
			loom_common_http::drain(response).await;
			return Ok(server_time);
		}

		if status == StatusCode::UNAUTHORIZED {
			loom_common_http::drain(response).await;
			return Err(EventsError::Unauthorized);
		}

		Err(EventsError::ServerError {
			status: status.as_u16(),
			message: response.text().await.unwrap_or_default(),
		})
	}
}

#[derive(Debug)]
struct InMemoryState {
	payloads: Vec<Vec<serde_json::Value>>,
	status: u16,
	server_time: Option<u64>,
	delay: Option<Duration>,
}

/// Records every batch in memory instead of sending it.
///
/// Responds like a server would for the configured status (2xx succeeds, 401
/// is unauthorized, anything else is a server error). Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryEventSender {
	state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryEventSender {
	pub fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(InMemoryState {
				payloads: Vec::new(),
				status: 202,
				server_time: None,
				delay: None,
			})),
		}
	}

	/// Status code reported for subsequent batches.
	pub fn set_status(&self, status: u16) {
		self.state.lock().status = status;
	}

	/// Server clock reported for subsequent successful batches.
	pub fn set_server_time(&self, server_time: Option<u64>) {
		self.state.lock().server_time = server_time;
	}

	/// Simulated network latency for subsequent batches.
	pub fn set_delay(&self, delay: Option<Duration>) {
		self.state.lock().delay = delay;
	}

	/// Every batch received so far, decoded.
	pub fn payloads(&self) -> Vec<Vec<serde_json::Value>> {
		self.state.lock().payloads.clone()
	}

	/// Every record received so far, across batches.
	pub fn events(&self) -> Vec<serde_json::Value> {
		self.state.lock().payloads.iter().flatten().cloned().collect()
	}

	pub fn request_count(&self) -> usize {
		self.state.lock().payloads.len()
	}
}

impl Default for InMemoryEventSender {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl EventSender for InMemoryEventSender {
	async fn send_event_data(&self, payload: Vec<u8>, _event_count: usize) -> Result<Option<u64>> {
		let delay = self.state.lock().delay;
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		let events: Vec<serde_json::Value> = serde_json::from_slice(&payload)?;
		let mut state = self.state.lock();
		state.payloads.push(events);

		match state.status {
			200..=299 => Ok(state.server_time),
			401 => Err(EventsError::Unauthorized),
			status => Err(EventsError::ServerError {
				status,
				message: String::new(),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_bulk_url_appends_path() {
		assert_eq!(
			bulk_events_url("https://events.example.com").unwrap().as_str(),
			"https://events.example.com/bulk"
		);
		assert_eq!(
			bulk_events_url("https://example.com/events/").unwrap().as_str(),
			"https://example.com/events/bulk"
		);
	}

	#[test]
	fn test_bulk_url_rejects_garbage() {
		assert!(matches!(
			bulk_events_url("not a url"),
			Err(EventsError::InvalidEventsUri(_))
		));
	}

	#[tokio::test]
	async fn test_in_memory_sender_records_payloads() {
		let sender = InMemoryEventSender::new();
		sender.set_server_time(Some(1234));

		let result = sender
			.send_event_data(br#"[{"kind":"index"}]"#.to_vec(), 1)
			.await
			.unwrap();

		assert_eq!(result, Some(1234));
		assert_eq!(sender.request_count(), 1);
		assert_eq!(sender.events()[0]["kind"], "index");
	}

	#[tokio::test]
	async fn test_in_memory_sender_reports_status() {
		let sender = InMemoryEventSender::new();

		sender.set_status(401);
		let err = sender.send_event_data(b"[]".to_vec(), 0).await.unwrap_err();
		assert!(err.is_fatal());

		sender.set_status(503);
		let err = sender.send_event_data(b"[]".to_vec(), 0).await.unwrap_err();
		assert!(matches!(err, EventsError::ServerError { status: 503, .. }));

		assert_eq!(sender.request_count(), 2);
	}
}

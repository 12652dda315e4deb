// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the event pipeline.

use thiserror::Error;

/// Event pipeline errors.
#[derive(Debug, Error)]
pub enum EventsError {
	/// The outbound queue is full and the record was dropped.
	#[error("event queue capacity exceeded")]
	CapacityExceeded,

	/// The batch could not be encoded.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// HTTP request failed before a response was received.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// The events service returned a non-success status.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// The events service rejected the SDK key. Delivery is permanently
	/// disabled for this processor.
	#[error("SDK key rejected by the events service")]
	Unauthorized,

	/// The events URI could not be parsed.
	#[error("invalid events URI: {0}")]
	InvalidEventsUri(#[from] url::ParseError),

	/// The processor has been shut down.
	#[error("event processor has been shut down")]
	ClientShutdown,
}

impl EventsError {
	/// Returns true for errors after which no further delivery will be
	/// attempted.
	pub fn is_fatal(&self) -> bool {
		matches!(self, EventsError::Unauthorized)
	}
}

/// Result type alias for event pipeline operations.
pub type Result<T> = std::result::Result<T, EventsError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unauthorized_is_fatal() {
		assert!(EventsError::Unauthorized.is_fatal());
	}

	#[test]
	fn test_server_errors_are_not_fatal() {
		for status in [400, 403, 404, 429, 500, 503] {
			let err = EventsError::ServerError {
				status,
				message: "test".to_string(),
			};
			assert!(!err.is_fatal(), "status {status} should not be fatal");
		}
	}

	#[test]
	fn test_capacity_and_shutdown_are_not_fatal() {
		assert!(!EventsError::CapacityExceeded.is_fatal());
		assert!(!EventsError::ClientShutdown.is_fatal());
	}

	#[test]
	fn test_display_includes_status() {
		let err = EventsError::ServerError {
			status: 503,
			message: "unavailable".to_string(),
		};
		assert_eq!(err.to_string(), "server error (503): unavailable");
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the flags SDK.

use loom_flags_events::EventsError;
use thiserror::Error;

/// Result type alias for flags SDK operations.
pub type Result<T> = std::result::Result<T, FlagsError>;

/// Errors that can occur in the flags SDK.
#[derive(Debug, Error)]
pub enum FlagsError {
	/// The SDK key is missing or blank.
	#[error("invalid SDK key")]
	InvalidSdkKey,

	/// The events URI is not an absolute http(s) URL.
	#[error("invalid events URI: {0}")]
	InvalidEventsUri(String),

	/// The HTTP client could not be constructed.
	#[error("failed to build HTTP client: {0}")]
	HttpClient(#[from] reqwest::Error),

	/// Error reported by the event pipeline.
	#[error(transparent)]
	Events(#[from] EventsError),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_events_errors_are_transparent() {
		let err = FlagsError::from(EventsError::Unauthorized);
		assert_eq!(err.to_string(), EventsError::Unauthorized.to_string());
	}

	#[test]
	fn test_invalid_uri_names_the_input() {
		let err = FlagsError::InvalidEventsUri("ftp://nope".to_string());
		assert!(err.to_string().contains("ftp://nope"));
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Helpers for consuming HTTP responses.

use std::time::UNIX_EPOCH;

use reqwest::header::{HeaderMap, DATE};
use reqwest::Response;
use tracing::debug;

/// Parses the `Date` response header into epoch milliseconds.
///
/// Returns `None` when the header is missing or not a valid HTTP date.
pub fn server_time_millis(headers: &HeaderMap) -> Option<u64> {
	let value = headers.get(DATE)?.to_str().ok()?;
	let time = httpdate::parse_http_date(value).ok()?;
	let millis = time.duration_since(UNIX_EPOCH).ok()?.as_millis();
	u64::try_from(millis).ok()
}

/// Reads and discards the remainder of a response body so the underlying
/// connection can go back to the pool.
pub async fn drain(response: Response) {
	if let Err(e) = response.bytes().await {
		debug!(error = %e, "Failed to drain response body");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use reqwest::header::HeaderValue;

	#[test]
	fn test_parses_rfc1123_date() {
		let mut headers = HeaderMap::new();
		headers.insert(DATE, HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"));
		assert_eq!(server_time_millis(&headers), Some(784_111_777_000));
	}

	#[test]
	fn test_missing_date_is_none() {
		assert_eq!(server_time_millis(&HeaderMap::new()), None);
	}

	#[test]
	fn test_malformed_date_is_none() {
		let mut headers = HeaderMap::new();
		headers.insert(DATE, HeaderValue::from_static("yesterday-ish"));
		assert_eq!(server_time_millis(&headers), None);
	}

	#[tokio::test]
	async fn test_drain_consumes_body() {
		use wiremock::matchers::method;
		use wiremock::{Mock, MockServer, ResponseTemplate};

		let server = MockServer::start().await;
		Mock::given(method("GET"))
			.respond_with(ResponseTemplate::new(500).set_body_string("boom"))
			.mount(&server)
			.await;

		let response = reqwest::get(server.uri()).await.unwrap();
		assert_eq!(response.status().as_u16(), 500);
		drain(response).await;
	}
}

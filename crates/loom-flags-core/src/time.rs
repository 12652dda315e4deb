// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::Utc;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Clamped to zero for clocks set before 1970.
pub fn now_millis() -> u64 {
	Utc::now().timestamp_millis().max(0) as u64
}

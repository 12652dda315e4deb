// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redaction of private user attributes before users leave the process.

use std::collections::HashSet;

use loom_flags_core::{User, UserAttribute};
use serde::Serialize;

/// A user as written to analytics output.
///
/// `private_attrs` names every attribute that was removed; it is omitted from
/// the wire when nothing was redacted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventUser {
	#[serde(flatten)]
	pub user: User,
	#[serde(rename = "privateAttrs", skip_serializing_if = "Vec::is_empty")]
	pub private_attrs: Vec<String>,
}

/// Returns a redacted copy of `user`.
///
/// An attribute is private when `all_attributes_private` is set, when its name
/// is in `global_private`, or when the user lists it in its own
/// `private_attribute_names`. Built-in attributes are matched by wire name
/// (`email`, `firstName`, ...), custom attributes by their map key. `key` is
/// never removed. The removed names are returned sorted.
pub fn scrub_user(
	user: &User,
	all_attributes_private: bool,
	global_private: &HashSet<String>,
) -> EventUser {
	if !all_attributes_private && global_private.is_empty() && user.private_attribute_names.is_empty() {
		return EventUser {
			user: user.clone(),
			private_attrs: Vec::new(),
		};
	}

	let is_private = |name: &str| {
		all_attributes_private
			|| global_private.contains(name)
			|| user.private_attribute_names.iter().any(|n| n == name)
	};

	let mut scrubbed = user.clone();
	let mut removed = Vec::new();

	for attr in UserAttribute::PRIVATABLE {
		if is_private(attr.as_str()) && scrubbed.clear_attribute(attr) {
			removed.push(attr.as_str().to_string());
		}
	}

	scrubbed.custom.retain(|name, _| {
		if is_private(name) {
			removed.push(name.clone());
			false
		} else {
			true
		}
	});

	scrubbed.private_attribute_names.clear();
	removed.sort();

	EventUser {
		user: scrubbed,
		private_attrs: removed,
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Users that flags are evaluated for.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::FlagValue;

/// Built-in user attributes, named as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserAttribute {
	Key,
	Secondary,
	Ip,
	Country,
	Email,
	FirstName,
	LastName,
	Avatar,
	Name,
	Anonymous,
}

impl UserAttribute {
	/// Every built-in attribute that may be marked private. `key` is the
	/// user's identity and is never redacted.
	pub const PRIVATABLE: [UserAttribute; 9] = [
		UserAttribute::Secondary,
		UserAttribute::Ip,
		UserAttribute::Country,
		UserAttribute::Email,
		UserAttribute::FirstName,
		UserAttribute::LastName,
		UserAttribute::Avatar,
		UserAttribute::Name,
		UserAttribute::Anonymous,
	];

	/// Returns the wire name of the attribute.
	pub fn as_str(&self) -> &'static str {
		match self {
			UserAttribute::Key => "key",
			UserAttribute::Secondary => "secondary",
			UserAttribute::Ip => "ip",
			UserAttribute::Country => "country",
			UserAttribute::Email => "email",
			UserAttribute::FirstName => "firstName",
			UserAttribute::LastName => "lastName",
			UserAttribute::Avatar => "avatar",
			UserAttribute::Name => "name",
			UserAttribute::Anonymous => "anonymous",
		}
	}
}

impl std::fmt::Display for UserAttribute {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A user (or any other subject) that flags are evaluated against.
///
/// Only `key` is used for identity; every other attribute is optional profile
/// data. `private_attribute_names` lists attributes this particular user wants
/// redacted from analytics events, in addition to any configured globally. It
/// is never serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secondary: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ip: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub country: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub first_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub avatar: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub anonymous: Option<bool>,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub custom: BTreeMap<String, FlagValue>,
	#[serde(default, skip_serializing)]
	pub private_attribute_names: Vec<String>,
}

impl User {
	/// Starts building a user with the given key.
	pub fn with_key(key: impl Into<String>) -> UserBuilder {
		UserBuilder::new(key)
	}

	/// Returns the user's key, if any.
	pub fn key(&self) -> Option<&str> {
		self.key.as_deref()
	}

	/// Returns true if the built-in attribute has a value.
	pub fn has_attribute(&self, attr: UserAttribute) -> bool {
		match attr {
			UserAttribute::Key => self.key.is_some(),
			UserAttribute::Secondary => self.secondary.is_some(),
			UserAttribute::Ip => self.ip.is_some(),
			UserAttribute::Country => self.country.is_some(),
			UserAttribute::Email => self.email.is_some(),
			UserAttribute::FirstName => self.first_name.is_some(),
			UserAttribute::LastName => self.last_name.is_some(),
			UserAttribute::Avatar => self.avatar.is_some(),
			UserAttribute::Name => self.name.is_some(),
			UserAttribute::Anonymous => self.anonymous.is_some(),
		}
	}

	/// Clears a built-in attribute, returning true if it had a value.
	///
	/// `key` cannot be cleared and always returns false.
	pub fn clear_attribute(&mut self, attr: UserAttribute) -> bool {
		match attr {
			UserAttribute::Key => false,
			UserAttribute::Secondary => self.secondary.take().is_some(),
			UserAttribute::Ip => self.ip.take().is_some(),
			UserAttribute::Country => self.country.take().is_some(),
			UserAttribute::Email => self.email.take().is_some(),
			UserAttribute::FirstName => self.first_name.take().is_some(),
			UserAttribute::LastName => self.last_name.take().is_some(),
			UserAttribute::Avatar => self.avatar.take().is_some(),
			UserAttribute::Name => self.name.take().is_some(),
			UserAttribute::Anonymous => self.anonymous.take().is_some(),
		}
	}
}

/// Builder for [`User`].
#[derive(Debug, Clone)]
pub struct UserBuilder {
	user: User,
}

impl UserBuilder {
	/// Creates a builder for a user with the given key.
	pub fn new(key: impl Into<String>) -> Self {
		Self {
			user: User {
				key: Some(key.into()),
				..User::default()
			},
		}
	}

	pub fn secondary(mut self, secondary: impl Into<String>) -> Self {
		self.user.secondary = Some(secondary.into());
		self
	}

	pub fn ip(mut self, ip: impl Into<String>) -> Self {
		self.user.ip = Some(ip.into());
		self
	}

	pub fn country(mut self, country: impl Into<String>) -> Self {
		self.user.country = Some(country.into());
		self
	}

	pub fn email(mut self, email: impl Into<String>) -> Self {
		self.user.email = Some(email.into());
		self
	}

	pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
		self.user.first_name = Some(first_name.into());
		self
	}

	pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
		self.user.last_name = Some(last_name.into());
		self
	}

	pub fn avatar(mut self, avatar: impl Into<String>) -> Self {
		self.user.avatar = Some(avatar.into());
		self
	}

	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.user.name = Some(name.into());
		self
	}

	pub fn anonymous(mut self, anonymous: bool) -> Self {
		self.user.anonymous = Some(anonymous);
		self
	}

	/// Sets a custom attribute.
	pub fn custom(mut self, name: impl Into<String>, value: FlagValue) -> Self {
		self.user.custom.insert(name.into(), value);
		self
	}

	/// Marks an attribute (built-in wire name or custom name) as private for
	/// this user.
	pub fn private_attribute(mut self, name: impl Into<String>) -> Self {
		let name = name.into();
		if !self.user.private_attribute_names.contains(&name) {
			self.user.private_attribute_names.push(name);
		}
		self
	}

	/// Sets a custom attribute and marks it private in one step.
	pub fn private_custom(self, name: impl Into<String>, value: FlagValue) -> Self {
		let name = name.into();
		self.custom(name.clone(), value).private_attribute(name)
	}

	pub fn build(self) -> User {
		self.user
	}
}

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Loom feature flags SDK.
//!
//! This crate provides the types shared between the client SDK (`loom-flags`)
//! and the analytics event pipeline (`loom-flags-events`): the [`User`] being
//! evaluated, the locally cached [`FeatureFlag`] rule set, and the epoch
//! millisecond clock used for event timestamps.
//!
//! # Example
//!
//! ```
//! use loom_flags_core::{FeatureFlag, User};
//!
//! let user = User::with_key("user123")
//!     .email("alice@example.com")
//!     .custom("plan", serde_json::json!("enterprise"))
//!     .private_attribute("email")
//!     .build();
//!
//! let flag = FeatureFlag::new("checkout.new_flow", 3)
//!     .with_variations(vec![serde_json::json!(false), serde_json::json!(true)])
//!     .with_fallthrough_variation(1);
//!
//! assert_eq!(user.key(), Some("user123"));
//! assert_eq!(flag.variation(1), Some(&serde_json::json!(true)));
//! ```

pub mod flag;
pub mod time;
pub mod user;

pub use flag::{FeatureFlag, Prerequisite};
pub use time::now_millis;
pub use user::{User, UserAttribute, UserBuilder};

/// A flag variation value. Flags may serve booleans, strings, numbers or
/// arbitrary JSON.
pub type FlagValue = serde_json::Value;

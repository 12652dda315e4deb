// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature Flags Rust SDK for Loom.
//!
//! This crate provides a client that evaluates feature flags from a local
//! store and reports what it served to the Loom events service.
//!
//! # Features
//!
//! - **Typed Evaluation**: boolean, string, integer, float and JSON variations
//!   that fall back to the caller's default instead of failing
//! - **Analytics Events**: every evaluation, `identify` and `track` call is
//!   summarized or recorded and delivered in the background
//! - **Privacy Controls**: per-SDK and per-user private attributes are removed
//!   before events leave the process
//!
//! # Example
//!
//! ```ignore
//! use loom_flags::{Config, FlagsClient, User};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::builder("loom_sdk_server_prod_xxx")
//!         .events_uri("https://events.loom.example.com")
//!         .private_attribute_names(["email"])
//!         .build()?;
//!     let client = FlagsClient::new(config)?;
//!
//!     let user = User::with_key("user123")
//!         .email("alice@example.com")
//!         .custom("plan", serde_json::json!("enterprise"))
//!         .build();
//!
//!     let enabled = client.bool_variation("checkout.new_flow", &user, false);
//!     let theme = client.str_variation("ui.theme", &user, "light");
//!     client.track(&user, "checkout.completed", None);
//!
//!     client.close().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod evaluate;
mod store;

pub use client::FlagsClient;
pub use config::{Config, ConfigBuilder, DEFAULT_EVENTS_URI, DEFAULT_REQUEST_TIMEOUT};
pub use error::{FlagsError, Result};
pub use evaluate::Evaluation;
pub use store::FlagStore;

// Re-export core types for convenience
pub use loom_flags_core::{FeatureFlag, FlagValue, Prerequisite, User, UserAttribute, UserBuilder};
pub use loom_flags_events::{EventsConfig, EventsError};

// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for the Loom SDK crates.
//!
//! This crate provides:
//! - Pre-configured HTTP client builders with a consistent SDK User-Agent header
//! - Parsing of the server `Date` header into epoch milliseconds
//! - Response body draining so pooled connections can be reused

mod client;
mod response;

pub use client::{builder, builder_with_user_agent, new_client_with_timeout, user_agent};
pub use response::{drain, server_time_millis};

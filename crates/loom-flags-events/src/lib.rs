// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Analytics event pipeline for the Loom feature flags SDK.
//!
//! Every flag evaluation, `identify` and `track` call in the SDK produces an
//! [`Event`]. This crate turns that stream into compact batches for the events
//! service:
//!
//! - **Privacy**: user attributes marked private are removed before anything
//!   leaves the process ([`scrub_user`]).
//! - **Deduplication**: a bounded LRU of recently seen user keys decides when
//!   a full user record (`index`) must be sent ([`UserKeyCache`]).
//! - **Summarization**: evaluations of untracked flags are counted instead of
//!   sent one by one ([`EventSummarizer`]).
//! - **Delivery**: a single background task owns all of the above and flushes
//!   on a timer, on request and on close ([`DefaultEventProcessor`]).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use loom_flags_core::User;
//! use loom_flags_events::{
//!     DefaultEventProcessor, EventProcessor, EventsConfig, HttpEventSender, IdentifyEvent,
//! };
//!
//! let client = loom_common_http::new_client_with_timeout(std::time::Duration::from_secs(10))?;
//! let sender = HttpEventSender::new(client, "https://events.loom.example.com", "sdk-key")?;
//! let processor = DefaultEventProcessor::start(EventsConfig::default(), Arc::new(sender));
//!
//! processor.send_event(IdentifyEvent::new(User::with_key("user123").build()).into());
//! processor.close().await?;
//! ```

mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod output;
pub mod privacy;
pub mod processor;
pub mod sender;
pub mod summarizer;
pub mod user_keys;

pub use config::EventsConfig;
pub use error::{EventsError, Result};
pub use event::{BaseEvent, CustomEvent, Event, FeatureRequestEvent, IdentifyEvent};
pub use output::{EventOutputFormatter, OutputEvent};
pub use privacy::{scrub_user, EventUser};
pub use processor::{DefaultEventProcessor, EventProcessor, NullEventProcessor, MAX_FLUSH_WORKERS};
pub use sender::{EventSender, HttpEventSender, InMemoryEventSender};
pub use summarizer::{CounterKey, CounterValue, EventSummarizer, SummaryState};
pub use user_keys::UserKeyCache;

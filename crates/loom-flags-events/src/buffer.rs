// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::{EventsError, Result};
use crate::output::OutputEvent;

/// Output records waiting for the next flush.
#[derive(Debug)]
pub(crate) struct EventBuffer {
	events: Vec<OutputEvent>,
	capacity: usize,
	/// Records rejected since the last flush.
	dropped: usize,
}

impl EventBuffer {
	pub(crate) fn new(capacity: usize) -> Self {
		Self {
			events: Vec::new(),
			capacity,
			dropped: 0,
		}
	}

	/// Queues a record, rejecting it when the buffer is full.
	pub(crate) fn add(&mut self, event: OutputEvent) -> Result<()> {
		if self.events.len() >= self.capacity {
			self.dropped += 1;
			return Err(EventsError::CapacityExceeded);
		}
		self.events.push(event);
		Ok(())
	}

	/// Detaches every queued record and resets the drop counter.
	pub(crate) fn take(&mut self) -> Vec<OutputEvent> {
		self.dropped = 0;
		std::mem::take(&mut self.events)
	}

	pub(crate) fn dropped(&self) -> usize {
		self.dropped
	}

	pub(crate) fn len(&self) -> usize {
		self.events.len()
	}
}

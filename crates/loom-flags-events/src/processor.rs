// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The event processor: a single background task that owns the outbox and
//! the summarizer.
//!
//! Callers on any thread hand events to [`DefaultEventProcessor`] through a
//! bounded channel and never wait for the network. The task drains the
//! channel, decides per event whether to emit index, individual and debug
//! records, and periodically detaches the outbox plus a summary snapshot and
//! hands the batch to a separate delivery task.
//!
//! ```text
//!  callers ──send_event──▶ mpsc ──▶ EventDispatcher ──spawn──▶ EventSender
//!                                      │  ▲
//!                       flush/user-key timers
//! ```

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use loom_flags_core::now_millis;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::buffer::EventBuffer;
use crate::config::EventsConfig;
use crate::error::{EventsError, Result};
use crate::event::{Event, FeatureRequestEvent};
use crate::output::{EventOutputFormatter, OutputEvent};
use crate::sender::EventSender;
use crate::summarizer::EventSummarizer;

/// Maximum number of batches being delivered at once.
pub const MAX_FLUSH_WORKERS: usize = 5;

/// Dropped-event warnings are repeated once per this many drops.
const DROP_WARNING_INTERVAL: u64 = 1000;

type FlushReply = oneshot::Sender<Result<()>>;

/// Accepts analytics events and delivers them in the background.
#[async_trait]
pub trait EventProcessor: Send + Sync {
	/// Queues an event. Never blocks and never fails observably.
	fn send_event(&self, event: Event);

	/// Requests a flush without waiting for it.
	fn flush(&self);

	/// Flushes and waits until the batch has been delivered, returning the
	/// delivery error if there was one.
	async fn flush_and_wait(&self) -> Result<()>;

	/// Stops the processor after a final synchronous flush. Later calls, and
	/// any later `send_event` or `flush`, do nothing.
	async fn close(&self) -> Result<()>;
}

/// Processor used when event sending is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventProcessor;

#[async_trait]
impl EventProcessor for NullEventProcessor {
	fn send_event(&self, _event: Event) {}

	fn flush(&self) {}

	async fn flush_and_wait(&self) -> Result<()> {
		Ok(())
	}

	async fn close(&self) -> Result<()> {
		Ok(())
	}
}

/// Commands sent to the background task.
#[derive(Debug)]
enum Message {
	Event(Event),
	Flush(Option<FlushReply>),
	Close(FlushReply),
}

/// State shared between the dispatcher and its delivery tasks.
#[derive(Debug, Default)]
struct SharedState {
	/// Set once the events service rejects the SDK key.
	disabled: AtomicBool,
	/// Latest server clock seen in a response, in epoch millis.
	last_known_past_time: AtomicU64,
}

impl SharedState {
	fn is_disabled(&self) -> bool {
		self.disabled.load(Ordering::Acquire)
	}
}

/// Channel-backed [`EventProcessor`] running on the Tokio runtime.
#[derive(Debug)]
pub struct DefaultEventProcessor {
	tx: mpsc::Sender<Message>,
	closed: AtomicBool,
	dropped_events: AtomicU64,
	shared: Arc<SharedState>,
}

impl DefaultEventProcessor {
	/// Spawns the processor task. Must be called from within a Tokio runtime.
	pub fn start(config: EventsConfig, sender: Arc<dyn EventSender>) -> Self {
		let shared = Arc::new(SharedState::default());
		let channel_capacity = config.channel_capacity.max(1);
		let dispatcher = EventDispatcher::new(config, sender, Arc::clone(&shared));
		Self::spawn(dispatcher, channel_capacity, shared)
	}

	fn spawn(dispatcher: EventDispatcher, channel_capacity: usize, shared: Arc<SharedState>) -> Self {
		let (tx, rx) = mpsc::channel(channel_capacity);
		tokio::spawn(dispatcher.run(rx));

		Self {
			tx,
			closed: AtomicBool::new(false),
			dropped_events: AtomicU64::new(0),
			shared,
		}
	}

	/// Returns true once the events service has rejected the SDK key.
	pub fn is_disabled(&self) -> bool {
		self.shared.is_disabled()
	}

	/// Returns true once `close` has been called.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	fn inactive(&self) -> bool {
		self.is_closed() || self.is_disabled()
	}

	/// Outcome of a request the dispatcher never answered. A request that lost
	/// a race with `close` is a no-op like any call made after it.
	fn stopped(&self) -> Result<()> {
		if self.is_closed() {
			Ok(())
		} else {
			Err(EventsError::ClientShutdown)
		}
	}
}

#[async_trait]
impl EventProcessor for DefaultEventProcessor {
	fn send_event(&self, event: Event) {
		if self.inactive() {
			return;
		}

		match self.tx.try_send(Message::Event(event)) {
			Ok(()) => {}
			Err(TrySendError::Full(Message::Event(event))) => {
				let dropped = self.dropped_events.fetch_add(1, Ordering::Relaxed);
				if dropped % DROP_WARNING_INTERVAL == 0 {
					warn!(
						kind = event.kind(),
						dropped = dropped + 1,
						"Event channel full, dropping event"
					);
				}
			}
			Err(_) => debug!("Event processor stopped, dropping event"),
		}
	}

	fn flush(&self) {
		if self.inactive() {
			return;
		}
		if self.tx.try_send(Message::Flush(None)).is_err() {
			debug!("Event channel unavailable, skipping flush request");
		}
	}

	async fn flush_and_wait(&self) -> Result<()> {
		if self.inactive() {
			return Ok(());
		}

		let (reply_tx, reply_rx) = oneshot::channel();
		if self.tx.send(Message::Flush(Some(reply_tx))).await.is_err() {
			return self.stopped();
		}
		match reply_rx.await {
			Ok(result) => result,
			Err(_) => self.stopped(),
		}
	}

	async fn close(&self) -> Result<()> {
		if self.closed.swap(true, Ordering::AcqRel) {
			return Ok(());
		}

		let (reply_tx, reply_rx) = oneshot::channel();
		if self.tx.send(Message::Close(reply_tx)).await.is_err() {
			return Ok(());
		}
		reply_rx.await.unwrap_or(Ok(()))
	}
}

/// The single consumer of the event channel.
struct EventDispatcher {
	config: EventsConfig,
	formatter: EventOutputFormatter,
	summarizer: EventSummarizer,
	outbox: EventBuffer,
	sender: Arc<dyn EventSender>,
	shared: Arc<SharedState>,
	workers: Arc<Semaphore>,
	/// Custom event key that makes processing panic.
	#[cfg(test)]
	panic_on_key: Option<String>,
}

impl EventDispatcher {
	fn new(config: EventsConfig, sender: Arc<dyn EventSender>, shared: Arc<SharedState>) -> Self {
		Self {
			formatter: EventOutputFormatter::new(&config),
			summarizer: EventSummarizer::new(config.user_keys_capacity),
			outbox: EventBuffer::new(config.capacity),
			sender,
			shared,
			workers: Arc::new(Semaphore::new(MAX_FLUSH_WORKERS)),
			config,
			#[cfg(test)]
			panic_on_key: None,
		}
	}

	async fn run(mut self, mut rx: mpsc::Receiver<Message>) {
		info!(
			capacity = self.config.capacity,
			flush_interval_ms = self.config.flush_interval.as_millis() as u64,
			inline_users = self.config.inline_users_in_events,
			"Starting event processor"
		);

		let mut flush_timer = ticker(self.config.flush_interval);
		let mut user_keys_timer = ticker(self.config.user_keys_flush_interval);

		loop {
			tokio::select! {
				message = rx.recv() => match message {
					Some(Message::Event(event)) => self.process_event_guarded(event),
					Some(Message::Flush(reply)) => self.flush(reply),
					Some(Message::Close(reply)) => {
						let result = self.shutdown().await;
						let _ = reply.send(result);
						break;
					}
					None => {
						debug!("All processor handles dropped");
						let _ = self.shutdown().await;
						break;
					}
				},
				_ = flush_timer.tick() => self.flush(None),
				_ = user_keys_timer.tick() => {
					debug!("Clearing remembered user keys");
					self.summarizer.reset_users();
				}
			}
		}

		info!("Event processor stopped");
	}

	/// Processes one event, logging rather than propagating a panic so one bad
	/// event cannot stop the pipeline.
	fn process_event_guarded(&mut self, event: Event) {
		let kind = event.kind();
		if let Err(panic) = catch_unwind(AssertUnwindSafe(|| self.process_event(event))) {
			error!(
				kind,
				panic = panic_message(panic.as_ref()),
				"Unexpected panic while processing event"
			);
		}
	}

	fn process_event(&mut self, event: Event) {
		#[cfg(test)]
		if let Event::Custom(custom) = &event {
			if self.panic_on_key.as_deref() == Some(custom.key.as_str()) {
				panic!("rejected event {}", custom.key);
			}
		}

		if self.shared.is_disabled() {
			return;
		}

		let is_identify = matches!(event, Event::Identify(_));

		if !self.config.inline_users_in_events {
			let already_seen = self.summarizer.notice_user(event.user());
			if !already_seen && !is_identify {
				let index = self.formatter.make_index_event(event.base());
				self.queue(index);
			}
		}

		let summarized = self.summarizer.summarize_event(&event);
		if !summarized && self.should_sample() {
			let output = self.formatter.make_output_event(&event);
			self.queue(output);
		}

		if let Event::FeatureRequest(fe) = &event {
			if self.should_debug(fe) {
				let debug_event = self.formatter.make_debug_event(fe);
				self.queue(debug_event);
			}
		}
	}

	fn queue(&mut self, event: OutputEvent) {
		let kind = event.kind();
		if self.outbox.add(event).is_err() {
			if self.outbox.dropped() == 1 {
				warn!(
					capacity = self.config.capacity,
					kind, "Exceeded event queue capacity, dropping events until next flush"
				);
			} else {
				debug!(kind, "Event queue full, dropping event");
			}
		}
	}

	fn should_sample(&self) -> bool {
		match self.config.sampling_interval {
			0 | 1 => true,
			n => fastrand::u32(..n) == 0,
		}
	}

	/// A debug window is open while its end is later than both the local
	/// clock and the last server clock seen.
	fn should_debug(&self, event: &FeatureRequestEvent) -> bool {
		let Some(until) = event.debug_events_until_date else {
			return false;
		};
		let last_known_past = self.shared.last_known_past_time.load(Ordering::Acquire);
		until > last_known_past && until > now_millis()
	}

	/// Detaches the outbox and the summary window in one step. The summary
	/// record is always last and is not subject to the capacity limit.
	fn take_batch(&mut self) -> Vec<OutputEvent> {
		let mut events = self.outbox.take();
		if let Some(summary) = self.formatter.make_summary_event(self.summarizer.snapshot()) {
			events.push(summary);
		}
		events
	}

	/// Serializes the pending batch, or returns `None` when there is nothing
	/// to send.
	fn prepare_payload(&mut self) -> Result<Option<(Vec<u8>, usize)>> {
		let events = self.take_batch();
		if events.is_empty() {
			return Ok(None);
		}
		let payload = serde_json::to_vec(&events)?;
		Ok(Some((payload, events.len())))
	}

	/// Detaches the pending batch and hands it to a worker task.
	///
	/// A timer-driven flush is skipped when every worker is busy, leaving the
	/// batch for the next attempt. A requested flush detaches the batch
	/// immediately; its task queues for a worker and reports the delivery
	/// result through `reply`, so the loop never waits on the network.
	fn flush(&mut self, reply: Option<FlushReply>) {
		if self.shared.is_disabled() {
			self.take_batch();
			respond(reply, Ok(()));
			return;
		}

		let permit = match reply {
			Some(_) => None,
			None => match Arc::clone(&self.workers).try_acquire_owned() {
				Ok(permit) => Some(permit),
				Err(_) => {
					debug!("All flush workers busy, deferring flush");
					return;
				}
			},
		};

		debug!(pending = self.outbox.len(), "Flushing events");
		let (payload, count) = match self.prepare_payload() {
			Ok(Some(batch)) => batch,
			Ok(None) => {
				respond(reply, Ok(()));
				return;
			}
			Err(e) => {
				error!(error = %e, "Failed to serialize event batch, dropping it");
				respond(reply, Err(e));
				return;
			}
		};

		let sender = Arc::clone(&self.sender);
		let shared = Arc::clone(&self.shared);
		let workers = Arc::clone(&self.workers);
		tokio::spawn(async move {
			let permit = match permit {
				Some(permit) => permit,
				None => match workers.acquire_owned().await {
					Ok(permit) => permit,
					Err(_) => {
						respond(reply, Err(EventsError::ClientShutdown));
						return;
					}
				},
			};
			let result = deliver(sender.as_ref(), &shared, payload, count, permit).await;
			respond(reply, result);
		});
	}

	/// Final synchronous flush, then waits for every in-flight delivery.
	async fn shutdown(&mut self) -> Result<()> {
		debug!("Event processor shutting down");

		let result = if self.shared.is_disabled() {
			Ok(())
		} else {
			match Arc::clone(&self.workers).acquire_owned().await {
				Ok(permit) => match self.prepare_payload() {
					Ok(Some((payload, count))) => {
						deliver(self.sender.as_ref(), &self.shared, payload, count, permit).await
					}
					Ok(None) => Ok(()),
					Err(e) => {
						error!(error = %e, "Failed to serialize final event batch");
						Err(e)
					}
				},
				Err(_) => Ok(()),
			}
		};

		let _ = self.workers.acquire_many(MAX_FLUSH_WORKERS as u32).await;
		result
	}
}

/// Sends one batch, recording the server clock on success and disabling the
/// pipeline when the SDK key is rejected.
async fn deliver(
	sender: &dyn EventSender,
	shared: &SharedState,
	payload: Vec<u8>,
	count: usize,
	_permit: OwnedSemaphorePermit,
) -> Result<()> {
	if shared.is_disabled() {
		return Ok(());
	}

	match sender.send_event_data(payload, count).await {
		Ok(server_time) => {
			if let Some(server_time) = server_time {
				shared
					.last_known_past_time
					.store(server_time, Ordering::Release);
			}
			debug!(count, "Delivered event batch");
			Ok(())
		}
		Err(e) if e.is_fatal() => {
			error!(
				error = %e,
				"Events service rejected the SDK key, no further events will be sent"
			);
			shared.disabled.store(true, Ordering::Release);
			Err(e)
		}
		Err(e) => {
			warn!(error = %e, count, "Failed to deliver event batch, dropping it");
			Err(e)
		}
	}
}

fn respond(reply: Option<FlushReply>, result: Result<()>) {
	if let Some(reply) = reply {
		let _ = reply.send(result);
	}
}

/// Interval timer whose first tick is one period from now.
fn ticker(period: Duration) -> Interval {
	let period = period.max(Duration::from_millis(1));
	let mut interval = interval_at(Instant::now() + period, period);
	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
	interval
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
	if let Some(message) = panic.downcast_ref::<&str>() {
		message
	} else if let Some(message) = panic.downcast_ref::<String>() {
		message
	} else {
		"unknown panic"
	}
}

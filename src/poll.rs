//! Scheduled re-fetching bound to the lifetime of the consuming view.
//!
//! Dashboards re-issue the same descriptor on a fixed cadence. A poll runs on its own `tokio`
//! task and routes every tick through [`PortalClient::run`], so expiry handling is shared with
//! every other caller. The [`PollHandle`] returned to the view owns a cancellation token. Dropping
//! the handle or calling [`PollHandle::cancel`] stops the task, and any result still in flight is
//! discarded. A poll is also pinned to the session generation it started under: once the user
//! logs out or a different login lands, the poll stops without delivering anything further.

// crates.io
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	flows::PortalClient,
	http::HttpTransport,
	obs::{self, FlowKind, flow_event},
	request::RequestDescriptor,
};

const MIN_PERIOD: std::time::Duration = std::time::Duration::from_millis(1);

/// Spawns pollers.
#[derive(Debug)]
pub struct Poller;
impl Poller {
	/// Polls `descriptor` every `interval` (first tick immediately), handing each result to `sink`.
	///
	/// Must be called from within a `tokio` runtime.
	pub fn spawn<T, F>(
		client: PortalClient<T>,
		descriptor: RequestDescriptor,
		interval: Duration,
		sink: F,
	) -> PollHandle
	where
		T: ?Sized + HttpTransport,
		F: 'static + FnMut(Result<Value>) + Send,
	{
		let token = CancellationToken::new();
		let cancelled = token.clone();
		let period = interval.unsigned_abs().max(MIN_PERIOD);
		let task = tokio::spawn(Self::drive(client, descriptor, period, cancelled, sink));

		PollHandle { token, task: Some(task) }
	}

	async fn drive<T, F>(
		client: PortalClient<T>,
		descriptor: RequestDescriptor,
		period: std::time::Duration,
		cancelled: CancellationToken,
		mut sink: F,
	) where
		T: ?Sized + HttpTransport,
		F: 'static + FnMut(Result<Value>) + Send,
	{
		let generation = client.store.generation();
		let mut ticker = tokio::time::interval(period);

		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				biased;
				_ = cancelled.cancelled() => break,
				_ = ticker.tick() => {},
			}

			let result = tokio::select! {
				biased;
				_ = cancelled.cancelled() => break,
				result = obs::observe(FlowKind::Poll, "tick", client.run(&descriptor)) => result,
			};

			if cancelled.is_cancelled() {
				break;
			}
			if client.store.generation() != generation {
				flow_event!(debug, path = %descriptor.path, "Session changed; stopping poll.");
				cancelled.cancel();

				break;
			}

			sink(result);
		}
	}
}

impl<T> PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Polls `descriptor` at the configured polling interval.
	///
	/// Must be called from within a `tokio` runtime.
	pub fn poll<F>(&self, descriptor: RequestDescriptor, sink: F) -> PollHandle
	where
		F: 'static + FnMut(Result<Value>) + Send,
	{
		Poller::spawn(self.clone(), descriptor, self.config.polling_interval, sink)
	}
}

/// Owner of a running poll; dropping it cancels the poll.
#[derive(Debug)]
pub struct PollHandle {
	token: CancellationToken,
	task: Option<JoinHandle<()>>,
}
impl PollHandle {
	/// Stops the poll. Results still in flight are discarded.
	pub fn cancel(&self) {
		self.token.cancel();
	}

	/// Returns `true` once the poll was cancelled or stopped on a session change.
	pub fn is_cancelled(&self) -> bool {
		self.token.is_cancelled()
	}

	/// Waits for the polling task to exit. Does not cancel it.
	pub async fn stopped(mut self) {
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}
impl Drop for PollHandle {
	fn drop(&mut self) {
		self.token.cancel();
	}
}

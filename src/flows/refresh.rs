//! Refresh coordination with a single-flight slot, bounded retries, and metrics.
//!
//! [`PortalClient::run`] executes a descriptor and inspects the result. Anything other than the
//! credential-expiry signal goes straight back to the caller. On the signal, the caller either
//! joins the refresh cycle already in flight or opens a new one. Opening a cycle withdraws the
//! stale credential from request decoration and calls `auth/refresh-token/` on a detached task.
//! Every participant of a cycle awaits the same outcome, and a participant giving up early does
//! not affect the others. After a successful refresh each participant re-issues its
//! original descriptor exactly once. A failed refresh clears the session and hands each
//! participant its original expiry error.
//!
//! Cycles are pinned to the session generation they started under. When the user logs out or a
//! different login lands mid-refresh, the outcome is discarded instead of being written into the
//! newer session, and the next expiry opens a fresh cycle rather than joining the stale one.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{Credential, RefreshResponse},
	error::is_expiry_signal,
	executor::decode,
	flows::PortalClient,
	http::HttpTransport,
	obs::{self, FlowKind, flow_event},
	request::RequestDescriptor,
};

/// Backend path of the refresh call.
pub const REFRESH_PATH: &str = "auth/refresh-token/";

/// Result of one refresh cycle, shared by every caller that awaited it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// A new credential was installed.
	Refreshed,
	/// The refresh call failed and the session was cleared.
	Failed,
	/// The session changed while refreshing, so the outcome was dropped.
	Discarded,
}

#[derive(Default)]
pub(crate) enum RefreshState {
	#[default]
	Idle,
	Refreshing(Arc<RefreshCycle>),
}

pub(crate) struct RefreshCycle {
	generation: u64,
	outcome: AsyncOnceCell<RefreshOutcome>,
}
impl RefreshCycle {
	fn new(generation: u64) -> Self {
		Self { generation, outcome: AsyncOnceCell::new() }
	}
}

enum Recovery {
	Retry,
	GiveUp,
	Await(Arc<RefreshCycle>),
}

impl<T> PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Executes `descriptor`, transparently refreshing the credential on the expiry signal.
	///
	/// Public descriptors never trigger a refresh; their errors are returned untouched.
	///
	/// Per call there is at most one refresh and at most one retried execution. The retry result
	/// is returned as-is, even if it is another expiry signal.
	///
	/// The refresh itself runs on a spawned `tokio` task, so this must be called from within a
	/// `tokio` runtime. Dropping the returned future never cancels a refresh in flight.
	pub async fn run(&self, descriptor: &RequestDescriptor) -> Result<Value> {
		obs::observe(FlowKind::Request, "run", self.run_coordinated(descriptor)).await
	}

	/// Same as [`run`](Self::run), decoding the payload into `R`.
	pub async fn run_json<R>(&self, descriptor: &RequestDescriptor) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let payload = self.run(descriptor).await?;

		decode(&descriptor.path, payload)
	}

	/// Calls the refresh endpoint once and returns the replacement credential.
	///
	/// The long-lived refresh credential travels out of band (the transport's cookie jar). This
	/// call leaves the session store untouched; [`run`](Self::run) installs the result.
	pub async fn refresh(&self) -> Result<Credential> {
		obs::observe(FlowKind::Refresh, "refresh", async {
			let descriptor = RequestDescriptor::post(REFRESH_PATH).public();
			let payload = self.executor.execute(&descriptor).await?;
			let response = if payload.is_null() {
				RefreshResponse::default()
			} else {
				decode::<RefreshResponse>(REFRESH_PATH, payload)?
			};

			response.into_credential().ok_or(Error::MissingCredential)
		})
		.await
	}

	async fn run_coordinated(&self, descriptor: &RequestDescriptor) -> Result<Value> {
		let attempt = self.executor.execute_attempt(descriptor).await;
		let expired = match attempt.result {
			Err(err) if descriptor.requires_auth && is_expiry_signal(&err) => err,
			other => return other,
		};
		let retry = match self.plan_recovery(attempt.credential_version) {
			Recovery::Retry => true,
			Recovery::GiveUp => false,
			Recovery::Await(cycle) => *cycle.outcome.wait().await == RefreshOutcome::Refreshed,
		};

		if !retry {
			return Err(expired);
		}

		self.refresh_metrics.record_retry();
		flow_event!(debug, path = %descriptor.path, "Retrying request after credential refresh.");

		self.executor.execute(descriptor).await
	}

	fn plan_recovery(&self, sent_version: Option<u64>) -> Recovery {
		let mut state = self.refresh_state.lock();
		let session = self.store.snapshot();

		if let RefreshState::Refreshing(cycle) = &*state {
			if cycle.generation == session.generation() {
				self.refresh_metrics.record_coalesced();
				flow_event!(debug, "Joining in-flight credential refresh.");

				return Recovery::Await(cycle.clone());
			}

			flow_event!(debug, "In-flight refresh belongs to an earlier session; superseding it.");
		}
		if session.identity().is_none() {
			return Recovery::GiveUp;
		}
		// Another caller already rotated the credential this request was sent with.
		if !session.is_credential_suspended() && sent_version != Some(session.credential_version())
		{
			return Recovery::Retry;
		}

		let cycle = Arc::new(RefreshCycle::new(session.generation()));
		let client = self.clone();
		let driven = cycle.clone();

		*state = RefreshState::Refreshing(cycle.clone());

		// Detached so that dropping any caller, including the one that opened the cycle, cannot
		// leave it unresolved.
		tokio::spawn(async move {
			driven.outcome.get_or_init(|| client.drive_cycle(&driven)).await;
		});

		Recovery::Await(cycle)
	}

	async fn drive_cycle(&self, cycle: &Arc<RefreshCycle>) -> RefreshOutcome {
		self.store.suspend_credential_for(cycle.generation);
		self.refresh_metrics.record_attempt();
		flow_event!(info, "Credential expired; refreshing.");

		let outcome = match self.refresh().await {
			Ok(credential) =>
				if self.store.update_credential_for(cycle.generation, credential) {
					self.refresh_metrics.record_success();
					flow_event!(info, "Credential refreshed.");

					RefreshOutcome::Refreshed
				} else {
					self.refresh_metrics.record_failure();
					flow_event!(debug, "Session changed during refresh; discarding new credential.");

					RefreshOutcome::Discarded
				},
			Err(_err) => {
				self.refresh_metrics.record_failure();
				flow_event!(warn, error = %_err, "Credential refresh failed; logging out.");

				if self.store.clear_for(cycle.generation) {
					RefreshOutcome::Failed
				} else {
					RefreshOutcome::Discarded
				}
			},
		};
		let mut state = self.refresh_state.lock();

		if matches!(&*state, RefreshState::Refreshing(current) if Arc::ptr_eq(current, cycle)) {
			*state = RefreshState::Idle;
		}

		outcome
	}
}

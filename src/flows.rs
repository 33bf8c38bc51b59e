//! Client facade: the refresh-coordinated request pipeline plus the account flows built on it.

pub mod account;
pub mod refresh;

pub use account::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*, config::ClientConfig, executor::RequestExecutor, http::HttpTransport,
	session::SessionStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestPortalClient = PortalClient<ReqwestTransport>;

/// Issues backend calls on behalf of the current session.
///
/// The client owns the request executor, a handle to the shared session store, and the refresh
/// coordinator state, so every caller that clones it shares one single-flight slot. Cloning is
/// cheap; all state lives behind `Arc`.
pub struct PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Validated configuration the client was built with.
	pub config: ClientConfig,
	/// Session store read for credentials and mutated by login, refresh, and logout.
	pub store: Arc<SessionStore>,
	/// Shared counters for refresh coordinator outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	executor: Arc<RequestExecutor<T>>,
	refresh_state: Arc<Mutex<RefreshState>>,
}
impl<T> PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<SessionStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let executor = RequestExecutor::new(transport, store.clone(), config.base_url.clone());

		Self {
			config,
			store,
			refresh_metrics: Default::default(),
			executor: Arc::new(executor),
			refresh_state: Default::default(),
		}
	}

	/// Underlying single-shot executor; bypasses refresh handling.
	pub fn executor(&self) -> &RequestExecutor<T> {
		&self.executor
	}

	/// Returns `true` while a refresh call is outstanding.
	pub fn is_refreshing(&self) -> bool {
		matches!(*self.refresh_state.lock(), RefreshState::Refreshing(_))
	}
}
#[cfg(feature = "reqwest")]
impl PortalClient<ReqwestTransport> {
	/// Creates a client backed by a cookie-aware reqwest transport.
	///
	/// The cookie jar carries the long-lived refresh credential the backend sets on login, so use
	/// one client (or clones of it) for the whole browsing session.
	pub fn new(config: ClientConfig, store: Arc<SessionStore>) -> Result<Self> {
		let transport = ReqwestTransport::new(config.user_agent.as_deref())?;

		Ok(Self::with_transport(config, store, transport))
	}
}
impl<T> Clone for PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			store: self.store.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			executor: self.executor.clone(),
			refresh_state: self.refresh_state.clone(),
		}
	}
}
impl<T> Debug for PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PortalClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refreshing", &self.is_refreshing())
			.finish()
	}
}

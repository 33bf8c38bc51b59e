//! Client configuration and its validating builder.

// self
use crate::{_prelude::*, error::ConfigError};

/// Backend root used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/";
/// Route callers are sent to when they are not allowed into a protected view.
pub const DEFAULT_ENTRY_POINT: &str = "/login";

/// Settings shared by every request the client issues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// API root; always ends with `/`.
	pub base_url: Url,
	/// Interval between polled fetches.
	pub polling_interval: Duration,
	/// Unauthenticated entry point that guards redirect to.
	pub entry_point: String,
	/// Optional `User-Agent` for the default transport.
	pub user_agent: Option<String>,
}
impl ClientConfig {
	/// Default polling cadence for dashboard queries.
	pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::seconds(15);

	/// Starts a builder for the provided base URL.
	pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder {
			base_url: base_url.into(),
			polling_interval: Self::DEFAULT_POLLING_INTERVAL,
			entry_point: DEFAULT_ENTRY_POINT.into(),
			user_agent: None,
		}
	}

	/// Polling interval as a standard duration for timers.
	pub fn polling_interval_std(&self) -> std::time::Duration {
		self.polling_interval.unsigned_abs()
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_url: Url::parse(DEFAULT_BASE_URL).expect("Default base URL must parse."),
			polling_interval: Self::DEFAULT_POLLING_INTERVAL,
			entry_point: DEFAULT_ENTRY_POINT.into(),
			user_agent: None,
		}
	}
}

/// Builder for [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	base_url: String,
	polling_interval: Duration,
	entry_point: String,
	user_agent: Option<String>,
}
impl ClientConfigBuilder {
	/// Overrides the polling interval (defaults to 15 seconds).
	pub fn polling_interval(mut self, interval: Duration) -> Self {
		self.polling_interval = interval;

		self
	}

	/// Overrides the unauthenticated entry point (defaults to `/login`).
	pub fn entry_point(mut self, route: impl Into<String>) -> Self {
		self.entry_point = route.into();

		self
	}

	/// Sets the `User-Agent` used by the default transport.
	pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
		self.user_agent = Some(agent.into());

		self
	}

	/// Validates the settings and produces a [`ClientConfig`].
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let mut base_url = Url::parse(self.base_url.trim())
			.map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		if !matches!(base_url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { scheme: base_url.scheme().to_owned() });
		}
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}
		if !self.polling_interval.is_positive() {
			return Err(ConfigError::NonPositivePollingInterval);
		}
		if !self.entry_point.starts_with('/') {
			return Err(ConfigError::InvalidEntryPoint { route: self.entry_point });
		}

		Ok(ClientConfig {
			base_url,
			polling_interval: self.polling_interval,
			entry_point: self.entry_point,
			user_agent: self.user_agent,
		})
	}
}

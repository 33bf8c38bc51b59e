//! Pipeline-level error types and the expiry-signal classifier.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Backend `detail` literal meaning the request carried no usable credential.
pub const DETAIL_CREDENTIALS_NOT_PROVIDED: &str = "Authentication credentials were not provided.";
/// Backend `code` literal meaning the credential was rejected as invalid or expired.
pub const CODE_TOKEN_NOT_VALID: &str = "token_not_valid";

/// Canonical error returned by every request made through the pipeline.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure; no response was received.
	#[error(transparent)]
	Network(#[from] TransportError),
	/// Backend answered with a non-2xx status.
	#[error(transparent)]
	Http(#[from] HttpError),
	/// Backend answered 2xx but the payload did not match the expected shape.
	#[error("Response body from `{path}` could not be decoded.")]
	Decode {
		/// Request path the payload belongs to.
		path: String,
		/// Structured parsing failure, including the JSON path that failed.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Refresh endpoint answered 2xx without a replacement credential.
	#[error("Refresh endpoint returned no credential.")]
	MissingCredential,
}
impl Error {
	/// Classifies the error into the taxonomy callers branch on.
	pub fn category(&self) -> ErrorCategory {
		match self {
			Self::Network(_) => ErrorCategory::Network,
			Self::Http(err) if err.is_expiry_signal() => ErrorCategory::Expiry,
			Self::Http(err) if err.is_client_error() && matches!(err.body, Some(Value::Object(_))) =>
				ErrorCategory::Validation,
			_ => ErrorCategory::Unknown,
		}
	}

	/// Returns the HTTP error when the backend produced a response.
	pub fn as_http(&self) -> Option<&HttpError> {
		match self {
			Self::Http(err) => Some(err),
			_ => None,
		}
	}

	/// Returns the HTTP status code, if any.
	pub fn status(&self) -> Option<u16> {
		self.as_http().map(|err| err.status)
	}
}

/// Error taxonomy exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
	/// No response was received.
	Network,
	/// 401 carrying one of the recognized credential-expiry markers.
	Expiry,
	/// Any other 4xx with a structured body (e.g. field errors).
	Validation,
	/// Everything else.
	Unknown,
}

/// Non-2xx response captured by the request executor.
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("Backend responded with HTTP {status}.")]
pub struct HttpError {
	/// HTTP status code.
	pub status: u16,
	/// Parsed JSON payload, when the response carried one.
	pub body: Option<Value>,
}
impl HttpError {
	/// Creates a new HTTP error.
	pub fn new(status: u16, body: Option<Value>) -> Self {
		Self { status, body }
	}

	/// Returns `true` for 4xx statuses.
	pub fn is_client_error(&self) -> bool {
		(400..500).contains(&self.status)
	}

	/// Returns `true` when the response is the backend's credential-expiry signal.
	pub fn is_expiry_signal(&self) -> bool {
		if self.status != 401 {
			return false;
		}

		let Some(body) = self.body.as_ref() else {
			return false;
		};

		body.get("detail").and_then(Value::as_str) == Some(DETAIL_CREDENTIALS_NOT_PROVIDED)
			|| body.get("code").and_then(Value::as_str) == Some(CODE_TOKEN_NOT_VALID)
	}

	/// Returns a string field from the response body, if present.
	pub fn field(&self, name: &str) -> Option<&str> {
		self.body.as_ref()?.get(name)?.as_str()
	}
}

/// Returns `true` when `err` is the credential-expiry signal.
pub fn is_expiry_signal(err: &Error) -> bool {
	err.as_http().is_some_and(HttpError::is_expiry_signal)
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http or https.
	#[error("Base URL scheme `{scheme}` is not supported.")]
	UnsupportedScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
	/// Polling interval must be strictly positive.
	#[error("Polling interval must be positive.")]
	NonPositivePollingInterval,
	/// Entry point must be an absolute route.
	#[error("Entry point `{route}` must start with `/`.")]
	InvalidEntryPoint {
		/// Offending route.
		route: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the backend.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

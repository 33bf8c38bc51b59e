//! Transport primitives for backend calls.
//!
//! The executor depends on nothing but [`HttpTransport`]. The crate ships
//! [`ReqwestTransport`] behind the `reqwest` feature; tests and embedders can plug in any other
//! client by implementing the trait. Implementations must report a response for every status
//! code (classification happens upstream) and reserve [`TransportError`] for calls that produced
//! no response at all.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError, request::Method};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to carry pipeline requests.
///
/// Implementations are shared behind `Arc` by every request, so they must be
/// `Send + Sync + 'static`, and the returned futures must be `Send` so pipeline futures can hop
/// executors. Any long-lived credential the backend keeps out of band (the refresh cookie) is the
/// transport's responsibility to carry between calls.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves once the full response body has been read.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Fully resolved outgoing request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL.
	pub url: Url,
	/// Header name/value pairs; names are lower-case.
	pub headers: Vec<(String, String)>,
	/// Encoded body, if any.
	pub body: Option<Vec<u8>>,
}
impl HttpRequest {
	/// Returns the first header value matching `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}

/// Response as seen by the executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Creates a response from a status and raw body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Creates a response carrying `value` as its JSON body.
	pub fn json(status: u16, value: &Value) -> Self {
		Self::new(status, value.to_string())
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The default client keeps a cookie jar, because the backend ships the long-lived refresh
/// credential as an http-only cookie on login and expects it back on refresh. Redirects are not
/// followed, since the API answers directly. Configure any custom [`ReqwestClient`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds the default cookie-aware client.
	pub fn new(user_agent: Option<&str>) -> Result<Self, crate::error::ConfigError> {
		let mut builder =
			ReqwestClient::builder().cookie_store(true).redirect(reqwest::redirect::Policy::none());

		if let Some(agent) = user_agent {
			builder = builder.user_agent(agent.to_owned());
		}

		Ok(Self(builder.build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	fn method(method: Method) -> reqwest::Method {
		match method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Patch => reqwest::Method::PATCH,
			Method::Delete => reqwest::Method::DELETE,
		}
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestTransport(..)")
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(Self::method(request.method), request.url);

			for (name, value) in request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok(HttpResponse { status, body })
		})
	}
}

//! Single-shot request execution: decorate, send, normalize.

// self
use crate::{
	_prelude::*,
	error::{ConfigError, HttpError},
	http::{HttpRequest, HttpResponse, HttpTransport},
	request::RequestDescriptor,
	session::SessionStore,
};

/// Outcome of one executed request plus the credential version it carried.
#[derive(Debug)]
pub struct Attempt {
	/// Normalized result.
	pub result: Result<Value>,
	/// [`Session::credential_version`](crate::session::Session::credential_version) of the
	/// credential attached, or `None` when the request went out without one.
	pub credential_version: Option<u64>,
}

/// Performs exactly one HTTP call per descriptor; retry policy lives in the refresh coordinator.
pub struct RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	store: Arc<SessionStore>,
	base_url: Url,
}
impl<T> RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an executor resolving paths against `base_url`.
	pub fn new(transport: impl Into<Arc<T>>, store: Arc<SessionStore>, base_url: Url) -> Self {
		Self { transport: transport.into(), store, base_url }
	}

	/// Base URL paths are resolved against.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Session store credentials are read from.
	pub fn store(&self) -> &Arc<SessionStore> {
		&self.store
	}

	/// Executes `descriptor` once.
	pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Value> {
		self.execute_attempt(descriptor).await.result
	}

	/// Executes `descriptor` once, also reporting which credential version was attached.
	pub async fn execute_attempt(&self, descriptor: &RequestDescriptor) -> Attempt {
		let bearer = if descriptor.requires_auth { self.store.bearer() } else { None };
		let credential_version = bearer.as_ref().map(|bearer| bearer.version);
		let authorization = bearer.map(|bearer| bearer.credential.bearer_header());
		let request = match self.build_request(descriptor, authorization) {
			Ok(request) => request,
			Err(err) => return Attempt { result: Err(err.into()), credential_version },
		};
		let result = match self.transport.send(request).await {
			Ok(response) => normalize(&descriptor.path, response),
			Err(err) => Err(err.into()),
		};

		Attempt { result, credential_version }
	}

	fn build_request(
		&self,
		descriptor: &RequestDescriptor,
		authorization: Option<String>,
	) -> Result<HttpRequest, ConfigError> {
		let url = descriptor.resolve(&self.base_url)?;
		let body = descriptor.body.to_bytes()?;
		let mut headers = Vec::with_capacity(2);

		if let Some(value) = authorization {
			headers.push(("authorization".to_owned(), value));
		}

		headers.push(("content-type".to_owned(), descriptor.body.content_type().to_owned()));

		Ok(HttpRequest { method: descriptor.method, url, headers, body })
	}
}
impl<T> Debug for RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor").field("base_url", &self.base_url.as_str()).finish()
	}
}

fn normalize(path: &str, response: HttpResponse) -> Result<Value> {
	if !response.is_success() {
		let body = serde_json::from_slice::<Value>(&response.body).ok();

		return Err(HttpError::new(response.status, body).into());
	}
	if response.body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Value::Null);
	}

	let mut de = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| Error::Decode { path: path.to_owned(), source })
}

/// Decodes a payload into `T`, keeping the failing JSON path.
pub(crate) fn decode<T>(path: &str, value: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(value).map_err(|source| Error::Decode {
		path: path.to_owned(),
		source,
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		auth::{Credential, Identity, Role},
		error::{ErrorCategory, TransportError},
		http::TransportFuture,
	};

	#[derive(Default)]
	struct EchoTransport {
		sent: Mutex<Vec<HttpRequest>>,
		reply: Mutex<Option<HttpResponse>>,
	}
	impl HttpTransport for EchoTransport {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			self.sent.lock().push(request);

			let reply = self.reply.lock().clone();

			Box::pin(async move {
				reply.ok_or_else(|| TransportError::Io(std::io::Error::other("connection refused")))
			})
		}
	}

	fn build_executor(
		reply: Option<HttpResponse>,
	) -> (RequestExecutor<EchoTransport>, Arc<EchoTransport>) {
		let transport = Arc::new(EchoTransport { reply: Mutex::new(reply), ..Default::default() });
		let store = Arc::new(SessionStore::default());
		let base = Url::parse("http://127.0.0.1:8000/api/").expect("Base URL should parse.");

		(RequestExecutor::new(transport.clone(), store, base), transport)
	}

	#[tokio::test]
	async fn attaches_bearer_only_when_required_and_present() {
		let (executor, transport) = build_executor(Some(HttpResponse::json(200, &json!({ "ok": true }))));

		executor
			.execute(&RequestDescriptor::get("patient/me/"))
			.await
			.expect("Request should succeed.");
		executor.store().set_session(
			Identity::new("Asha", "9000000001", Some(Role::Patient)),
			Credential::new("tok-1"),
		);
		executor
			.execute(&RequestDescriptor::get("patient/me/"))
			.await
			.expect("Request should succeed.");
		executor
			.execute(&RequestDescriptor::post("auth/login/").public())
			.await
			.expect("Request should succeed.");

		let sent = transport.sent.lock();

		assert_eq!(sent[0].header("authorization"), None);
		assert_eq!(sent[1].header("authorization"), Some("Bearer tok-1"));
		assert_eq!(sent[2].header("authorization"), None);
		assert!(sent.iter().all(|req| req.header("content-type") == Some("application/json")));
		assert_eq!(sent[1].url.as_str(), "http://127.0.0.1:8000/api/patient/me/");
	}

	#[tokio::test]
	async fn non_success_carries_status_and_parsed_body() {
		let body = json!({ "detail": "Authentication credentials were not provided." });
		let (executor, _) = build_executor(Some(HttpResponse::json(401, &body)));
		let err = executor
			.execute(&RequestDescriptor::get("patient/tests/"))
			.await
			.expect_err("401 should surface as an error.");

		assert_eq!(err.as_http(), Some(&HttpError::new(401, Some(body))));
		assert_eq!(err.category(), ErrorCategory::Expiry);
	}

	#[tokio::test]
	async fn non_json_error_body_is_absent() {
		let (executor, _) = build_executor(Some(HttpResponse::new(502, "<html>Bad Gateway</html>")));
		let err = executor
			.execute(&RequestDescriptor::get("patient/tests/"))
			.await
			.expect_err("502 should surface as an error.");

		assert_eq!(err.as_http(), Some(&HttpError::new(502, None)));
	}

	#[tokio::test]
	async fn transport_failure_is_network_error() {
		let (executor, _) = build_executor(None);
		let err = executor
			.execute(&RequestDescriptor::get("patient/tests/"))
			.await
			.expect_err("Transport failure should surface.");

		assert_eq!(err.category(), ErrorCategory::Network);
	}

	#[tokio::test]
	async fn empty_success_body_is_null_and_garbage_is_decode_error() {
		let (executor, _) = build_executor(Some(HttpResponse::new(204, Vec::new())));

		assert_eq!(
			executor.execute(&RequestDescriptor::post("auth/logout/")).await.ok(),
			Some(Value::Null)
		);

		let (executor, _) = build_executor(Some(HttpResponse::new(200, "{not json")));
		let err = executor
			.execute(&RequestDescriptor::get("patient/me/"))
			.await
			.expect_err("Malformed JSON should fail to decode.");

		assert!(matches!(err, Error::Decode { ref path, .. } if path == "patient/me/"));
	}

	#[tokio::test]
	async fn attempt_reports_credential_version() {
		let (executor, _) = build_executor(Some(HttpResponse::json(200, &json!({}))));

		executor.store().set_session(
			Identity::new("Asha", "9000000001", Some(Role::Patient)),
			Credential::new("tok-1"),
		);

		let attempt = executor.execute_attempt(&RequestDescriptor::get("patient/me/")).await;

		assert_eq!(attempt.credential_version, Some(executor.store().snapshot().credential_version()));

		let public = executor.execute_attempt(&RequestDescriptor::get("patient/me/").public()).await;

		assert_eq!(public.credential_version, None);
	}
}

//! In-process backend double shared by integration tests.

#![allow(dead_code)]

// std
use std::{sync::Arc, time::Duration};
// crates.io
use parking_lot::Mutex;
use serde_json::{Value, json};
// self
use portal_client::{
	auth::{Credential, Identity, Role},
	config::ClientConfig,
	error::TransportError,
	flows::PortalClient,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	session::SessionStore,
};

pub const BASE_URL: &str = "http://portal.test/api/";

/// How the fake answers `auth/refresh-token/`.
#[derive(Clone, Debug)]
pub enum RefreshBehavior {
	/// Issues the token and starts accepting it.
	Issue(String),
	/// Issues the token but keeps rejecting it.
	IssueRejected(String),
	/// Answers 200 without an `access` field.
	NoData,
	/// Answers 401 with an error body.
	Reject,
}

/// Scripted backend implementing the portal wire contract.
///
/// Protected paths answer 200 for the currently valid bearer, the "not provided" expiry body for
/// requests without one, and the `token_not_valid` expiry body for any other bearer. The paths
/// `broken/` and `offline/` answer 500 and a transport failure respectively.
pub struct FakeBackend {
	pub log: Mutex<Vec<HttpRequest>>,
	pub valid_token: Mutex<String>,
	pub refresh: Mutex<RefreshBehavior>,
	pub refresh_delay: Mutex<Duration>,
	pub data_delay: Mutex<Duration>,
	pub login_role: Mutex<String>,
}
impl FakeBackend {
	pub fn new(valid_token: &str) -> Arc<Self> {
		Arc::new(Self {
			log: Mutex::new(Vec::new()),
			valid_token: Mutex::new(valid_token.into()),
			refresh: Mutex::new(RefreshBehavior::Issue("fresh".into())),
			refresh_delay: Mutex::new(Duration::ZERO),
			data_delay: Mutex::new(Duration::ZERO),
			login_role: Mutex::new("PATIENT".into()),
		})
	}

	pub fn with_refresh(self: Arc<Self>, behavior: RefreshBehavior) -> Arc<Self> {
		*self.refresh.lock() = behavior;

		self
	}

	pub fn with_delays(self: Arc<Self>, data: Duration, refresh: Duration) -> Arc<Self> {
		*self.data_delay.lock() = data;
		*self.refresh_delay.lock() = refresh;

		self
	}

	/// Number of requests whose path ends with `suffix`.
	pub fn calls(&self, suffix: &str) -> usize {
		self.log.lock().iter().filter(|req| req.url.path().ends_with(suffix)).count()
	}

	/// Authorization headers sent to paths ending with `suffix`, in order.
	pub fn authorizations(&self, suffix: &str) -> Vec<Option<String>> {
		self.log
			.lock()
			.iter()
			.filter(|req| req.url.path().ends_with(suffix))
			.map(|req| req.header("authorization").map(str::to_owned))
			.collect()
	}

	fn answer_refresh(&self) -> HttpResponse {
		match self.refresh.lock().clone() {
			RefreshBehavior::Issue(token) => {
				*self.valid_token.lock() = token.clone();

				HttpResponse::json(200, &json!({ "access": token }))
			},
			RefreshBehavior::IssueRejected(token) => HttpResponse::json(200, &json!({ "access": token })),
			RefreshBehavior::NoData => HttpResponse::json(200, &json!({})),
			RefreshBehavior::Reject =>
				HttpResponse::json(401, &json!({ "error": "Invalid refresh token" })),
		}
	}

	fn answer_protected(&self, request: &HttpRequest) -> HttpResponse {
		let valid = format!("Bearer {}", self.valid_token.lock());

		match request.header("authorization") {
			None => HttpResponse::json(
				401,
				&json!({ "detail": "Authentication credentials were not provided." }),
			),
			Some(value) if value == valid =>
				HttpResponse::json(200, &json!({ "path": request.url.path(), "ok": true })),
			Some(_) => HttpResponse::json(
				401,
				&json!({
					"detail": "Given token not valid for any token type",
					"code": "token_not_valid",
				}),
			),
		}
	}
}
impl HttpTransport for FakeBackend {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		self.log.lock().push(request.clone());

		Box::pin(async move {
			let path = request.url.path().to_owned();

			if path.ends_with("auth/refresh-token/") {
				let delay = *self.refresh_delay.lock();

				if !delay.is_zero() {
					tokio::time::sleep(delay).await;
				}

				return Ok(self.answer_refresh());
			}
			if path.ends_with("auth/login/") {
				let token = self.valid_token.lock().clone();
				let role = self.login_role.lock().clone();

				return Ok(HttpResponse::json(
					200,
					&json!({
						"message": "Login successful",
						"access": token,
						"name": "Asha Rao",
						"phone": "9000000001",
						"role": role,
					}),
				));
			}
			if path.ends_with("auth/logout/") {
				return Ok(HttpResponse::json(200, &json!({ "message": "Logout successful" })));
			}
			if path.ends_with("offline/") {
				return Err(TransportError::Io(std::io::Error::other("connection reset")));
			}

			let delay = *self.data_delay.lock();

			if !delay.is_zero() {
				tokio::time::sleep(delay).await;
			}
			if path.ends_with("broken/") {
				return Ok(HttpResponse::json(500, &json!({ "error": "boom" })));
			}

			Ok(self.answer_protected(&request))
		})
	}
}

pub fn client(backend: &Arc<FakeBackend>) -> (PortalClient<FakeBackend>, Arc<SessionStore>) {
	let config = ClientConfig::builder(BASE_URL).build().expect("Test base URL should be valid.");
	let store = Arc::new(SessionStore::default());
	let client = PortalClient::with_transport(config, store.clone(), backend.clone());

	(client, store)
}

pub fn patient() -> Identity {
	Identity::new("Asha Rao", "9000000001", Some(Role::Patient))
}

pub fn sign_in(store: &SessionStore, credential: &str) {
	store.set_session(patient(), Credential::new(credential));
}

pub fn payload_path(value: &Value) -> Option<&str> {
	value.get("path").and_then(Value::as_str)
}

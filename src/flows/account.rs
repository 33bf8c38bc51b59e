//! Login, logout, and registration against the `auth/` endpoints.

// self
use crate::{
	_prelude::*,
	auth::{Identity, LoginRequest, LoginResponse, RegisterRequest, RegisteredUser},
	executor::decode,
	flows::PortalClient,
	http::HttpTransport,
	obs::{self, FlowKind, flow_event},
	request::RequestDescriptor,
};

/// Backend path of the login call.
pub const LOGIN_PATH: &str = "auth/login/";
/// Backend path of the logout call.
pub const LOGOUT_PATH: &str = "auth/logout/";
/// Backend path of the registration call.
pub const REGISTER_PATH: &str = "auth/register/";

impl<T> PortalClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Signs in with phone + password and seeds the session store.
	///
	/// The backend also sets the long-lived refresh cookie on this response; the transport keeps
	/// it for later refresh calls.
	pub async fn login(
		&self,
		phone: impl Into<String>,
		password: impl Into<String>,
	) -> Result<Identity> {
		let body = LoginRequest::new(phone, password);

		obs::observe(FlowKind::Login, "login", async move {
			let descriptor = RequestDescriptor::post(LOGIN_PATH).public().json(&body)?;
			let payload = self.executor.execute(&descriptor).await?;
			let response: LoginResponse = decode(LOGIN_PATH, payload)?;
			let (identity, credential) = response.into_session_parts();

			if identity.role.is_none() {
				flow_event!(warn, "Signed-in identity carries an unrecognized role.");
			}

			self.store.set_session(identity.clone(), credential);

			Ok(identity)
		})
		.await
	}

	/// Invalidates the server-side session, then clears the local one.
	///
	/// On failure the error is returned and the local session is left as it was, unless the
	/// refresh coordinator already cleared it.
	pub async fn logout(&self) -> Result<()> {
		obs::observe(FlowKind::Logout, "logout", async {
			self.run(&RequestDescriptor::post(LOGOUT_PATH)).await?;
			self.store.clear();

			Ok(())
		})
		.await
	}

	/// Creates a new account. Does not sign in; call [`login`](Self::login) afterwards.
	pub async fn register(&self, request: &RegisterRequest) -> Result<RegisteredUser> {
		obs::observe(FlowKind::Register, "register", async {
			let descriptor = RequestDescriptor::post(REGISTER_PATH).public().json(request)?;
			let payload = self.executor.execute(&descriptor).await?;

			decode(REGISTER_PATH, payload)
		})
		.await
	}
}

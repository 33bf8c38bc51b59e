//! Request and response payloads for the `auth/` endpoints.

// self
use crate::{
	_prelude::*,
	auth::{Credential, Identity, Role},
};

/// Body of `POST auth/login/`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
	/// Phone number used as the login handle.
	pub phone: String,
	/// Plain-text password.
	pub password: String,
}
impl LoginRequest {
	/// Creates a new login body.
	pub fn new(phone: impl Into<String>, password: impl Into<String>) -> Self {
		Self { phone: phone.into(), password: password.into() }
	}
}
impl Debug for LoginRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("phone", &self.phone)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Success payload of `POST auth/login/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
	/// Freshly issued bearer credential.
	pub access: Credential,
	/// Full name of the signed-in user.
	pub name: String,
	/// Phone number of the signed-in user.
	pub phone: String,
	/// Raw role label.
	pub role: String,
	/// Optional human-readable status message.
	#[serde(default)]
	pub message: Option<String>,
}
impl LoginResponse {
	/// Splits the payload into the identity and credential the session store holds.
	pub fn into_session_parts(self) -> (Identity, Credential) {
		let role = Role::parse(&self.role);

		(Identity::new(self.name, self.phone, role), self.access)
	}
}

/// Success payload of `POST auth/refresh-token/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
	/// Replacement bearer credential.
	#[serde(default)]
	pub access: Option<String>,
}
impl RefreshResponse {
	/// Returns the new credential, treating a missing or blank value as no data.
	pub fn into_credential(self) -> Option<Credential> {
		self.access.filter(|value| !value.trim().is_empty()).map(Credential::new)
	}
}

/// Body of `POST auth/register/`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
	/// Full legal name.
	pub full_name: String,
	/// Phone number used as the login handle.
	pub phone: String,
	/// Optional contact e-mail; serialized as `null` when absent.
	pub email: Option<String>,
	/// Requested portal role.
	pub role: Role,
	/// Optional ABHA health identifier; serialized as `null` when absent.
	pub abha_id: Option<String>,
	/// Plain-text password.
	pub password: String,
}
impl RegisterRequest {
	/// Creates a registration body without the optional fields.
	pub fn new(
		full_name: impl Into<String>,
		phone: impl Into<String>,
		role: Role,
		password: impl Into<String>,
	) -> Self {
		Self {
			full_name: full_name.into(),
			phone: phone.into(),
			email: None,
			role,
			abha_id: None,
			password: password.into(),
		}
	}

	/// Attaches a contact e-mail.
	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());

		self
	}

	/// Attaches an ABHA identifier.
	pub fn with_abha_id(mut self, abha_id: impl Into<String>) -> Self {
		self.abha_id = Some(abha_id.into());

		self
	}
}
impl Debug for RegisterRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegisterRequest")
			.field("full_name", &self.full_name)
			.field("phone", &self.phone)
			.field("email", &self.email)
			.field("role", &self.role)
			.field("abha_id", &self.abha_id)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Success payload of `POST auth/register/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
	/// Optional human-readable status message.
	#[serde(default)]
	pub message: Option<String>,
	/// Full name as stored by the backend.
	pub name: String,
	/// Raw role label as stored by the backend.
	pub role: String,
	/// Contact e-mail, if one was provided.
	#[serde(default)]
	pub email: Option<String>,
}

//! Per-call request descriptors consumed by the executor.

// self
use crate::{_prelude::*, error::ConfigError};

/// Content type used for JSON and empty bodies.
pub const APPLICATION_JSON: &str = "application/json";

/// HTTP method of a request descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
}
impl Method {
	/// Returns the method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
	/// No payload.
	#[default]
	Empty,
	/// JSON document.
	Json(Value),
	/// Pre-encoded payload (file uploads, multipart forms) with its own content type.
	Binary {
		/// Content type sent verbatim, including any multipart boundary.
		content_type: String,
		/// Encoded payload.
		bytes: Vec<u8>,
	},
}
impl RequestBody {
	/// Content type header value for this payload.
	pub fn content_type(&self) -> &str {
		match self {
			Self::Empty | Self::Json(_) => APPLICATION_JSON,
			Self::Binary { content_type, .. } => content_type,
		}
	}

	/// Encodes the payload; `None` for [`RequestBody::Empty`].
	pub fn to_bytes(&self) -> Result<Option<Vec<u8>>, ConfigError> {
		match self {
			Self::Empty => Ok(None),
			Self::Json(value) => Ok(Some(serde_json::to_vec(value)?)),
			Self::Binary { bytes, .. } => Ok(Some(bytes.clone())),
		}
	}
}

/// Describes one backend call: where, how, and whether it needs the bearer credential.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL (e.g. `patient/tests/`).
	pub path: String,
	/// Query parameters appended in order.
	pub query: Vec<(String, String)>,
	/// Payload.
	pub body: RequestBody,
	/// Attach the bearer credential when one is held.
	pub requires_auth: bool,
}
impl RequestDescriptor {
	/// Creates an authenticated descriptor with no body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			body: RequestBody::Empty,
			requires_auth: true,
		}
	}

	/// Shorthand for a `GET` descriptor.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` descriptor.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` descriptor.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` descriptor.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` descriptor.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Marks the descriptor as not needing the bearer credential.
	pub fn public(mut self) -> Self {
		self.requires_auth = false;

		self
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = RequestBody::Json(serde_json::to_value(body)?);

		Ok(self)
	}

	/// Uses a pre-encoded payload.
	pub fn binary(mut self, content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
		self.body = RequestBody::Binary { content_type: content_type.into(), bytes: bytes.into() };

		self
	}

	/// Resolves the descriptor against `base` (which must end with `/`).
	pub fn resolve(&self, base: &Url) -> Result<Url, ConfigError> {
		let relative = self.path.trim_start_matches('/');
		let mut url = base
			.join(relative)
			.map_err(|source| ConfigError::InvalidPath { path: self.path.clone(), source })?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		Ok(url)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn content_type_follows_body() {
		assert_eq!(RequestDescriptor::get("x/").body.content_type(), APPLICATION_JSON);

		let json = RequestDescriptor::post("x/")
			.json(&json!({ "a": 1 }))
			.expect("JSON body should serialize.");

		assert_eq!(json.body.content_type(), APPLICATION_JSON);

		let upload = RequestDescriptor::post("practitioner/tests/7/upload/")
			.binary("multipart/form-data; boundary=XyZ", b"--XyZ--".to_vec());

		assert_eq!(upload.body.content_type(), "multipart/form-data; boundary=XyZ");
	}

	#[test]
	fn paths_resolve_under_base_with_query() {
		let base = Url::parse("http://127.0.0.1:8000/api/").expect("Base URL should parse.");
		let url = RequestDescriptor::get("/practitioner/patient-search/")
			.query("phone", "9000000001")
			.resolve(&base)
			.expect("Descriptor should resolve.");

		assert_eq!(
			url.as_str(),
			"http://127.0.0.1:8000/api/practitioner/patient-search/?phone=9000000001"
		);
	}

	#[test]
	fn descriptors_default_to_authenticated() {
		assert!(RequestDescriptor::get("patient/me/").requires_auth);
		assert!(!RequestDescriptor::post("auth/login/").public().requires_auth);
	}
}

//! Identity claims and the closed role set that gates protected views.

// self
use crate::_prelude::*;

/// Role claim carried by a signed-in identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
	/// Patient portal.
	Patient,
	/// Practitioner portal.
	Practitioner,
	/// Doctor portal.
	Doctor,
}
impl Role {
	/// Every recognized role.
	pub const ALL: [Role; 3] = [Role::Patient, Role::Practitioner, Role::Doctor];

	/// Returns the wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Role::Patient => "PATIENT",
			Role::Practitioner => "PRACTITIONER",
			Role::Doctor => "DOCTOR",
		}
	}

	/// Parses a wire label; anything outside the closed set yields `None`.
	pub fn parse(label: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|role| role.as_str() == label)
	}

	/// Landing route for the role's protected view subtree.
	pub const fn home_route(self) -> &'static str {
		match self {
			Role::Patient => "/patient",
			Role::Practitioner => "/practitioner",
			Role::Doctor => "/doctor",
		}
	}
}
impl Display for Role {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Role {
	type Err = UnknownRole;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s).ok_or_else(|| UnknownRole(s.to_owned()))
	}
}

/// Error returned when a role label falls outside the recognized set.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Role `{0}` is not recognized.")]
pub struct UnknownRole(pub String);

/// Claims about the signed-in user, held alongside the credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Full name shown in the portal chrome.
	pub display_name: String,
	/// Phone number the user signed in with.
	pub phone_number: String,
	/// Role claim; `None` when the backend sent a label outside the closed set.
	pub role: Option<Role>,
}
impl Identity {
	/// Creates an identity.
	pub fn new(
		display_name: impl Into<String>,
		phone_number: impl Into<String>,
		role: Option<Role>,
	) -> Self {
		Self { display_name: display_name.into(), phone_number: phone_number.into(), role }
	}

	/// Returns `true` when the identity carries exactly `role`.
	pub fn has_role(&self, role: Role) -> bool {
		self.role == Some(role)
	}
}

//! Auth-domain models: the bearer credential, the signed-in identity, and wire payloads.

pub mod credential;
pub mod identity;
pub mod wire;

pub use credential::*;
pub use identity::*;
pub use wire::*;

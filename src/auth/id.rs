//! Strongly typed caller identity.

// std
use std::{borrow::Borrow, ops::Deref, str::FromStr};
// self
use crate::_prelude::*;

const ACCESS_ID_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("Access identifier cannot be empty.")]
	Empty,
	/// The identifier contains whitespace characters.
	#[error("Access identifier contains whitespace.")]
	ContainsWhitespace,
	/// The identifier contains control or non-ASCII characters.
	#[error("Access identifier must contain only visible ASCII characters.")]
	NotVisibleAscii,
	/// The identifier exceeded the allowed character count.
	#[error("Access identifier exceeds {max} characters.")]
	TooLong {
		/// Maximum permitted character count.
		max: usize,
	},
}

/// Public identifier of the calling application, sent as `x-access-id`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessId(String);
impl AccessId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for AccessId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for AccessId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Borrow<str> for AccessId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<AccessId> for String {
	fn from(value: AccessId) -> Self {
		value.0
	}
}
impl TryFrom<String> for AccessId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for AccessId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "AccessId({})", self.0)
	}
}
impl Display for AccessId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for AccessId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty);
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace);
	}
	if !view.bytes().all(|byte| byte.is_ascii_graphic()) {
		return Err(IdentifierError::NotVisibleAscii);
	}
	if view.len() > ACCESS_ID_MAX_LEN {
		return Err(IdentifierError::TooLong { max: ACCESS_ID_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn access_ids_validate() {
		assert_eq!(AccessId::new(""), Err(IdentifierError::Empty));
		assert_eq!(AccessId::new(" app-123"), Err(IdentifierError::ContainsWhitespace));
		assert_eq!(AccessId::new("app\u{00A0}123"), Err(IdentifierError::ContainsWhitespace));

		let id = AccessId::new("app-123").expect("Access identifier fixture should be valid.");

		assert_eq!(id.as_ref(), "app-123");
		assert_eq!(format!("{id:?}"), "AccessId(app-123)");
	}

	#[test]
	fn access_ids_must_be_valid_header_values() {
		for raw in ["app\u{7}1", "app\u{0}", "app\u{7F}", "appé", "应用"] {
			assert_eq!(AccessId::new(raw), Err(IdentifierError::NotVisibleAscii), "{raw:?}");
		}

		AccessId::new("app_1.tenant-A:v2").expect("Visible ASCII punctuation should be accepted.");
	}

	#[test]
	fn length_limit_is_inclusive() {
		AccessId::new("a".repeat(ACCESS_ID_MAX_LEN)).expect("Exact length should succeed.");

		assert_eq!(
			AccessId::new("a".repeat(ACCESS_ID_MAX_LEN + 1)),
			Err(IdentifierError::TooLong { max: ACCESS_ID_MAX_LEN })
		);
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let id: AccessId =
			serde_json::from_str("\"app-42\"").expect("Access identifier should deserialize.");

		assert_eq!(&*id, "app-42");
		assert!(serde_json::from_str::<AccessId>("\"with space\"").is_err());
	}
}

//! Scalar field extraction from authentication responses.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Pulls a single top-level scalar field out of a response body.
///
/// This is deliberately not a general JSON API: the authentication endpoint returns a flat
/// object and the token manager only ever needs `accessKey` and `expireSeconds`.
pub trait FieldExtractor
where
	Self: Send + Sync,
{
	/// Returns the textual value of `field`, or `None` when it is absent or not a scalar.
	fn extract(&self, raw: &str, field: &str) -> Option<String>;
}

/// Default [`FieldExtractor`] backed by `serde_json`.
///
/// Strings are returned verbatim, numbers and booleans in their JSON text form. Nested objects,
/// arrays, `null`, and unparseable bodies all yield `None`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFieldExtractor;
impl FieldExtractor for JsonFieldExtractor {
	fn extract(&self, raw: &str, field: &str) -> Option<String> {
		let Value::Object(map) = serde_json::from_str::<Value>(raw).ok()? else {
			return None;
		};

		match map.get(field)? {
			Value::String(value) => Some(value.clone()),
			Value::Number(value) => Some(value.to_string()),
			Value::Bool(value) => Some(value.to_string()),
			Value::Null | Value::Array(_) | Value::Object(_) => None,
		}
	}
}
impl<T> FieldExtractor for Arc<T>
where
	T: ?Sized + FieldExtractor,
{
	fn extract(&self, raw: &str, field: &str) -> Option<String> {
		(**self).extract(raw, field)
	}
}

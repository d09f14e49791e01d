//! Token cache contract and the built-in in-memory implementation.

pub mod memory;

pub use memory::{CacheEntry, Clock, MemoryTokenCache};

// self
use crate::{
	_prelude::*,
	auth::{AccessId, Secret},
};

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Storage contract for access tokens, keyed per identity.
///
/// Implementations must be safe for concurrent use without external locking. `get` returns
/// `None` for missing, expired, or empty tokens; expiry is evaluated on read, so a cache may
/// keep stale entries around as long as it never hands them out.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Returns the cached token for `key` when it is still valid.
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<Secret>>;

	/// Stores `token` under `key` for `ttl`. A zero or negative `ttl` stores an entry that is
	/// already expired.
	fn set<'a>(&'a self, key: &'a CacheKey, token: Secret, ttl: Duration) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Cache key derived from an access identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);
impl CacheKey {
	const PREFIX: &'static str = "token::";

	/// Builds the key for tokens issued to `access_id`.
	pub fn for_identity(access_id: &AccessId) -> Self {
		Self(format!("{}{access_id}", Self::PREFIX))
	}

	/// Returns the key as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for CacheKey {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

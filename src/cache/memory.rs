//! Thread-safe in-memory [`TokenCache`] implementation.

// crates.io
use time::macros::datetime;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	cache::{CacheError, CacheFuture, CacheKey, TokenCache},
};

/// Source of "now" for expiry checks.
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

type EntryMap = Arc<RwLock<HashMap<CacheKey, CacheEntry>>>;

const FAR_FUTURE: OffsetDateTime = datetime!(9999-12-31 23:59:59 UTC);

/// Cached token plus the instant it stops being served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
	/// Cached access token.
	pub token: Secret,
	/// First instant at which the entry is no longer valid.
	pub expires_at: OffsetDateTime,
}
impl CacheEntry {
	/// Creates an entry expiring `ttl` after `now`, saturating instead of overflowing.
	pub fn new(token: Secret, now: OffsetDateTime, ttl: Duration) -> Self {
		let expires_at = now
			.checked_add(ttl)
			.unwrap_or(if ttl.is_negative() { OffsetDateTime::UNIX_EPOCH } else { FAR_FUTURE });

		Self { token, expires_at }
	}

	/// Returns `true` when the entry may be served at `now`.
	pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
		now < self.expires_at && !self.token.is_empty()
	}
}

/// Process-local token cache guarded by a read/write lock.
///
/// Expired entries are not purged; they are skipped on read and overwritten by the next `set`.
/// Clones share the same storage, so one instance can be handed to several clients.
#[derive(Clone)]
pub struct MemoryTokenCache {
	entries: EntryMap,
	clock: Clock,
}
impl MemoryTokenCache {
	/// Creates an empty cache that reads the system clock.
	pub fn new() -> Self {
		Self::with_clock(Arc::new(OffsetDateTime::now_utc))
	}

	/// Creates an empty cache that evaluates expiry against `clock`.
	pub fn with_clock(clock: Clock) -> Self {
		Self { entries: Default::default(), clock }
	}

	/// Number of stored entries, including expired ones.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing has been stored.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Returns the raw entry for `key`, valid or not.
	pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
		self.entries.read().get(key).cloned()
	}

	fn get_now(&self, key: &CacheKey) -> Option<Secret> {
		let now = (self.clock)();

		self.entries
			.read()
			.get(key)
			.filter(|entry| entry.is_valid_at(now))
			.map(|entry| entry.token.clone())
	}

	fn set_now(&self, key: &CacheKey, token: Secret, ttl: Duration) -> Result<(), CacheError> {
		let entry = CacheEntry::new(token, (self.clock)(), ttl);

		self.entries.write().insert(key.clone(), entry);

		Ok(())
	}
}
impl Default for MemoryTokenCache {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for MemoryTokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryTokenCache").field("entries", &self.len()).finish()
	}
}
impl TokenCache for MemoryTokenCache {
	fn get<'a>(&'a self, key: &'a CacheKey) -> CacheFuture<'a, Option<Secret>> {
		Box::pin(async move { Ok(self.get_now(key)) })
	}

	fn set<'a>(&'a self, key: &'a CacheKey, token: Secret, ttl: Duration) -> CacheFuture<'a, ()> {
		Box::pin(async move { self.set_now(key, token, ttl) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn entry_validity_respects_expiry_and_emptiness() {
		let now = datetime!(2025-11-10 12:00 UTC);
		let entry = CacheEntry::new(Secret::new("tok"), now, Duration::seconds(100));

		assert!(entry.is_valid_at(now));
		assert!(entry.is_valid_at(now + Duration::seconds(99)));
		assert!(!entry.is_valid_at(now + Duration::seconds(100)));
		assert!(!CacheEntry::new(Secret::new(""), now, Duration::seconds(100)).is_valid_at(now));
		assert!(!CacheEntry::new(Secret::new("tok"), now, Duration::seconds(-30)).is_valid_at(now));
		assert!(!CacheEntry::new(Secret::new("tok"), now, Duration::ZERO).is_valid_at(now));
	}

	#[test]
	fn entry_expiry_saturates_instead_of_overflowing() {
		let now = datetime!(2025-11-10 12:00 UTC);

		assert_eq!(CacheEntry::new(Secret::new("tok"), now, Duration::MAX).expires_at, FAR_FUTURE);
		assert_eq!(
			CacheEntry::new(Secret::new("tok"), now, Duration::MIN).expires_at,
			OffsetDateTime::UNIX_EPOCH
		);
	}
}

//! Signed-header generation shared by the authentication and business call paths.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	auth::{AccessId, Secret},
	signature::{self, SigningContext},
};

/// Header carrying the caller identity.
pub const ACCESS_ID_HEADER: &str = "x-access-id";
/// Header carrying the per-request random nonce.
pub const NONCE_HEADER: &str = "x-nonce";
/// Header carrying the signature scheme version.
pub const SIGN_VERSION_HEADER: &str = "x-sign-version";
/// Header carrying the Unix timestamp in milliseconds.
pub const TIMESTAMP_HEADER: &str = "x-timestamp";
/// Header carrying the computed signature.
pub const SIGNATURE_HEADER: &str = "x-signature";
/// Header listing the signed header names.
pub const SIGNATURE_HEADERS_HEADER: &str = "x-signature-headers";
/// Header carrying the access token on business calls.
pub const ACCESS_TOKEN_HEADER: &str = "open-access-key";
/// Signature scheme understood by the gateway.
pub const SIGN_VERSION: &str = "V3";

/// Returns the current Unix time in milliseconds as a decimal string.
pub fn current_timestamp_millis() -> String {
	(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).to_string()
}

/// Generates a random six-digit decimal nonce.
pub fn generate_nonce() -> String {
	rand::rng().random_range(100_000_u32..1_000_000).to_string()
}

/// Describes the parts of a request that participate in its signature.
#[derive(Clone, Debug)]
pub struct SignRequest<'a> {
	/// HTTP method.
	pub method: &'a str,
	/// Path relative to the gateway root, starting with `/`, without the query string.
	pub path: &'a str,
	/// Sorted query string (see [`signature::build_query_string`]).
	pub query: &'a str,
	/// Raw request body; empty for bodiless requests.
	pub body: &'a str,
	/// Pinned timestamp; a fresh one is generated when unset.
	pub timestamp: Option<String>,
	/// Pinned nonce; a fresh one is generated when unset.
	pub nonce: Option<String>,
}
impl<'a> SignRequest<'a> {
	/// Creates a request description with an empty query and body.
	pub fn new(method: &'a str, path: &'a str) -> Self {
		Self { method, path, query: "", body: "", timestamp: None, nonce: None }
	}

	/// Sets the sorted query string.
	pub fn with_query(mut self, query: &'a str) -> Self {
		self.query = query;

		self
	}

	/// Sets the raw request body.
	pub fn with_body(mut self, body: &'a str) -> Self {
		self.body = body;

		self
	}

	/// Pins the timestamp (Unix milliseconds) instead of reading the clock.
	pub fn with_timestamp(mut self, millis: i64) -> Self {
		self.timestamp = Some(millis.to_string());

		self
	}

	/// Pins the nonce instead of generating a random one.
	pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
		self.nonce = Some(nonce.into());

		self
	}
}

/// Result of signing a request: the signed headers plus the signature over them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedHeaders {
	/// Headers that took part in the signature, sorted by name.
	pub signed: BTreeMap<String, String>,
	/// Lowercase hex signature.
	pub signature: String,
}
impl SignedHeaders {
	/// Returns the signed header names, sorted and comma-joined.
	pub fn signed_header_names(&self) -> String {
		self.signed.keys().map(String::as_str).collect::<Vec<_>>().join(",")
	}

	/// Returns the value of a signed header.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.signed.get(name).map(String::as_str)
	}

	/// Flattens the signed headers into wire order: each signed header, then
	/// `x-signature-headers`, then `x-signature`.
	pub fn to_header_pairs(&self) -> Vec<(String, String)> {
		let mut pairs = self
			.signed
			.iter()
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect::<Vec<_>>();

		pairs.push((SIGNATURE_HEADERS_HEADER.into(), self.signed_header_names()));
		pairs.push((SIGNATURE_HEADER.into(), self.signature.clone()));

		pairs
	}
}

/// Signs requests on behalf of one access identity.
#[derive(Clone)]
pub struct RequestSigner {
	access_id: AccessId,
	secret_key: Secret,
}
impl RequestSigner {
	/// Creates a signer for the provided identity.
	pub fn new(access_id: AccessId, secret_key: Secret) -> Self {
		Self { access_id, secret_key }
	}

	/// Identity this signer signs for.
	pub fn access_id(&self) -> &AccessId {
		&self.access_id
	}

	/// Builds the signed header set for `request`.
	pub fn sign(&self, request: &SignRequest) -> SignedHeaders {
		let timestamp = request.timestamp.clone().unwrap_or_else(current_timestamp_millis);
		let nonce = request.nonce.clone().unwrap_or_else(generate_nonce);
		let signed = BTreeMap::from([
			(ACCESS_ID_HEADER.to_owned(), self.access_id.to_string()),
			(NONCE_HEADER.to_owned(), nonce),
			(SIGN_VERSION_HEADER.to_owned(), SIGN_VERSION.to_owned()),
			(TIMESTAMP_HEADER.to_owned(), timestamp),
		]);
		let body_digest = signature::process_body(request.body);
		let signature = SigningContext {
			method: request.method,
			path: request.path,
			headers: &signed,
			query: request.query,
			body_digest: &body_digest,
			secret: self.secret_key.expose(),
		}
		.signature();

		SignedHeaders { signed, signature }
	}
}
impl Debug for RequestSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestSigner")
			.field("access_id", &self.access_id)
			.field("secret_key", &self.secret_key)
			.finish()
	}
}

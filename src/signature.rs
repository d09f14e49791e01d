//! Canonical request signing for the gateway's `V3` signature scheme.
//!
//! Every function here is pure: the same inputs produce byte-identical output on every run and
//! platform. The gateway recomputes the signature server-side, so the canonical layout below is a
//! wire contract:
//!
//! ```text
//! METHOD
//! /path
//! <query>\n<header block>\n<body digest>   (non-empty parts only, may be an empty line)
//! secret
//! ```
//!
//! Digests use MD5 throughout; the server only recognizes MD5 for sign version `V3`.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use md5::{Digest, Md5};
// self
use crate::_prelude::*;

/// Joins sorted signed headers into `name:value` lines without a trailing newline.
pub fn build_header_block(headers: &BTreeMap<String, String>) -> String {
	let mut block = String::new();

	for (idx, (name, value)) in headers.iter().enumerate() {
		if idx > 0 {
			block.push('\n');
		}

		block.push_str(name);
		block.push(':');
		block.push_str(value);
	}

	block
}

/// Digests a request body as `base64(hex(md5(body)))`.
///
/// The base64 step encodes the *hex string*, not the raw digest bytes. Empty bodies produce an
/// empty string so they drop out of the canonical string entirely.
pub fn process_body(body: &str) -> String {
	if body.is_empty() {
		return String::new();
	}

	STANDARD.encode(md5_hex(body.as_bytes()))
}

/// Builds the string to sign from its already-processed parts.
///
/// `method` is upper-cased. The third line holds whichever of `query`, `header_block`, and
/// `body_digest` are non-empty, newline-joined in that order; it is emitted even when all three
/// are empty.
pub fn join(
	method: &str,
	path: &str,
	query: &str,
	header_block: &str,
	body_digest: &str,
	secret: &str,
) -> String {
	let middle = [query, header_block, body_digest]
		.into_iter()
		.filter(|part| !part.is_empty())
		.collect::<Vec<_>>()
		.join("\n");

	[method.to_uppercase().as_str(), path, middle.as_str(), secret].join("\n")
}

/// Returns the lowercase hex MD5 digest of `string_to_sign`.
pub fn sign(string_to_sign: &str) -> String {
	md5_hex(string_to_sign.as_bytes())
}

/// Sorts query parameters by key, drops empty values, and joins them as `k=v&k=v`.
///
/// Keys and values are used verbatim; callers supply already-encoded text.
pub fn build_query_string<'a, I>(params: I) -> String
where
	I: IntoIterator<Item = (&'a str, &'a str)>,
{
	let sorted = params.into_iter().collect::<BTreeMap<_, _>>();
	let mut query = String::new();

	for (key, value) in sorted {
		if value.is_empty() {
			continue;
		}
		if !query.is_empty() {
			query.push('&');
		}

		query.push_str(key);
		query.push('=');
		query.push_str(value);
	}

	query
}

/// Inputs to a single signature computation.
///
/// Only the headers in `headers` take part in the signature; the map keeps them sorted by name.
#[derive(Clone)]
pub struct SigningContext<'a> {
	/// HTTP method; upper-cased when joined.
	pub method: &'a str,
	/// Request path without the query string, starting with `/`.
	pub path: &'a str,
	/// Headers designated for signing.
	pub headers: &'a BTreeMap<String, String>,
	/// Pre-sorted query string (see [`build_query_string`]).
	pub query: &'a str,
	/// Processed body digest (see [`process_body`]).
	pub body_digest: &'a str,
	/// Secret key appended as the final line.
	pub secret: &'a str,
}
impl SigningContext<'_> {
	/// Renders the canonical string for this context.
	pub fn canonical_string(&self) -> String {
		join(
			self.method,
			self.path,
			self.query,
			&build_header_block(self.headers),
			self.body_digest,
			self.secret,
		)
	}

	/// Computes the signature for this context.
	pub fn signature(&self) -> String {
		sign(&self.canonical_string())
	}
}
impl Debug for SigningContext<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SigningContext")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("headers", self.headers)
			.field("query", &self.query)
			.field("body_digest", &self.body_digest)
			.field("secret", &"<redacted>")
			.finish()
	}
}

fn md5_hex(bytes: &[u8]) -> String {
	hex::encode(Md5::digest(bytes))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
	}

	#[test]
	fn header_block_joins_sorted_pairs() {
		assert_eq!(build_header_block(&headers(&[("b", "2"), ("a", "1")])), "a:1\nb:2");
		assert_eq!(build_header_block(&BTreeMap::new()), "");
		assert_eq!(build_header_block(&headers(&[("x-empty", "")])), "x-empty:");
	}

	#[test]
	fn body_digest_encodes_the_hex_string() {
		assert_eq!(process_body(""), "");
		assert_eq!(process_body("{}"), "OTk5MTRiOTMyYmQzN2E1MGI5ODNjNWU3YzkwYWU5M2I=");
		assert_eq!(
			process_body("{\"name\":\"demo\"}"),
			"NDk1ZDVlZGIwZmFkMGFiZDc1M2FhMjNhMGRmOTAyM2Y="
		);
		assert_eq!(process_body("{}"), process_body("{}"));
	}

	#[test]
	fn join_uppercases_method_and_skips_empty_parts() {
		assert_eq!(join("post", "/x", "q", "h", "b", "s"), "POST\n/x\nq\nh\nb\ns");
		assert_eq!(join("get", "/x", "", "h", "", "s"), "GET\n/x\nh\ns");
		assert_eq!(join("get", "/x", "q", "", "b", "s"), "GET\n/x\nq\nb\ns");
		assert_eq!(join("GET", "/auth", "", "", "", "s"), "GET\n/auth\n\ns");
	}

	#[test]
	fn sign_matches_reference_vectors() {
		assert_eq!(sign("abc"), "900150983cd24fb0d6963f7d28e17f72");
		assert_eq!(sign(""), "d41d8cd98f00b204e9800998ecf8427e");
		assert_eq!(sign("abc").len(), 32);
	}

	#[test]
	fn query_string_sorts_and_drops_empty_values() {
		assert_eq!(
			build_query_string([("size", "20"), ("page", "1"), ("filter", "")]),
			"page=1&size=20"
		);
		assert_eq!(build_query_string(Vec::<(&str, &str)>::new()), "");
		assert_eq!(build_query_string([("empty", "")]), "");
	}

	#[test]
	fn signing_context_matches_known_auth_signature() {
		let headers = headers(&[
			("x-timestamp", "1700000000000"),
			("x-sign-version", "V3"),
			("x-nonce", "123456"),
			("x-access-id", "demo-app"),
		]);
		let ctx = SigningContext {
			method: "GET",
			path: "/auth",
			headers: &headers,
			query: "",
			body_digest: "",
			secret: "demo-secret",
		};

		assert_eq!(
			ctx.canonical_string(),
			"GET\n/auth\nx-access-id:demo-app\nx-nonce:123456\nx-sign-version:V3\nx-timestamp:1700000000000\ndemo-secret"
		);
		assert_eq!(ctx.signature(), "ab4af70d640d6ee3cbecc80bb99899e8");
		assert!(!format!("{ctx:?}").contains("demo-secret"));
	}

	#[test]
	fn signing_context_matches_known_business_signature() {
		let headers = headers(&[
			("x-access-id", "demo-app"),
			("x-nonce", "654321"),
			("x-sign-version", "V3"),
			("x-timestamp", "1700000000000"),
		]);
		let query = build_query_string([("size", "20"), ("page", "1")]);
		let body_digest = process_body("{}");
		let ctx = SigningContext {
			method: "post",
			path: "/oapi/users",
			headers: &headers,
			query: &query,
			body_digest: &body_digest,
			secret: "demo-secret",
		};

		assert_eq!(ctx.signature(), "c6de8bb984d5b8da7a38f0257f16b68b");
	}
}

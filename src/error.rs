//! Client-level error types shared across signing, token management, and business calls.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; raised before any network traffic.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The gateway answered, but not with what the client expected.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),
	/// Token cache backend failure.
	#[error(transparent)]
	Cache(#[from] crate::cache::CacheError),

	/// The caller's cancellation token fired before the operation completed.
	#[error("Operation was cancelled by the caller.")]
	Cancelled,
}

/// Configuration and validation failures raised before a request is sent.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No transport was supplied and the crate was built without the `reqwest` feature.
	#[error("No HTTP transport is configured.")]
	MissingTransport,
	/// Base URI is missing or cannot be parsed.
	#[error("Base URI `{value}` is invalid.")]
	InvalidBaseUri {
		/// Raw value supplied by the caller.
		value: String,
		/// Underlying parsing failure, when the value was non-empty.
		#[source]
		source: Option<url::ParseError>,
	},
	/// Base URI cannot carry a path (e.g. `mailto:` or `data:` URLs).
	#[error("Base URI `{value}` cannot be used as a request base.")]
	UnsupportedBaseUri {
		/// Raw value supplied by the caller.
		value: String,
	},
	/// Access identifier failed validation.
	#[error("Access identifier is invalid.")]
	InvalidAccessId(#[from] crate::auth::IdentifierError),
	/// Secret key is empty.
	#[error("Secret key cannot be empty.")]
	MissingSecretKey,
	/// Request timeout must be a positive number of seconds.
	#[error("Timeout must be a positive number of seconds, got {seconds}.")]
	InvalidTimeout {
		/// Configured timeout.
		seconds: u64,
	},
	/// HTTP method cannot be represented on the wire.
	#[error("HTTP method `{method}` is invalid.")]
	InvalidMethod {
		/// Method supplied by the caller.
		method: String,
	},
	/// Request path would leave the base URI or carries its own query, fragment, or scheme.
	#[error("Request path `{path}` cannot be placed under the base URI.")]
	InvalidPath {
		/// Path supplied by the caller.
		path: String,
	},
	/// Header name or value cannot be sent by the transport.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Header name supplied by the caller.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO). Surfaced to callers unmodified and never retried.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the gateway.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request did not complete within the configured timeout.
	#[error("Request timed out while calling the gateway.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the gateway.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Unexpected gateway responses, carrying enough context to debug the exchange.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
	/// The authentication endpoint returned a non-2xx status.
	#[error("Authentication endpoint `{method} {path}` returned HTTP {status}: {body}")]
	AuthStatus {
		/// Request method.
		method: String,
		/// Request path relative to the base URI.
		path: String,
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// The authentication response lacked a usable `accessKey` or `expireSeconds`.
	#[error("Unable to read `{field}` from the authentication response: {body}")]
	MalformedAuthResponse {
		/// Field that was missing or malformed.
		field: &'static str,
		/// Raw response body.
		body: String,
	},
	/// A business endpoint returned a non-2xx status.
	#[error("Gateway call `{method} {uri}` returned HTTP {status}: {body}")]
	BusinessStatus {
		/// Request method.
		method: String,
		/// Fully qualified request URI.
		uri: String,
		/// Headers sent with the request (signature inputs included, token redacted).
		headers: Vec<(String, String)>,
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
		/// cURL command reproducing the request for manual replay.
		replay: String,
	},
}
impl ProtocolError {
	/// Returns the HTTP status attached to the failure, when there is one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::AuthStatus { status, .. } | Self::BusinessStatus { status, .. } => Some(*status),
			Self::MalformedAuthResponse { .. } => None,
		}
	}

	/// Returns the raw response body that triggered the failure.
	pub fn body(&self) -> &str {
		match self {
			Self::AuthStatus { body, .. }
			| Self::MalformedAuthResponse { body, .. }
			| Self::BusinessStatus { body, .. } => body,
		}
	}
}

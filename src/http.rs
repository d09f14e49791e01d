//! Transport primitives for gateway calls.
//!
//! The module exposes [`HttpTransport`], the crate's only dependency on an HTTP stack, together
//! with the plain [`GatewayRequest`]/[`GatewayResponse`] values that cross it. Signing happens
//! before a request reaches the transport, so implementations only move bytes: they must not
//! rewrite headers, follow redirects that change the path, or retry.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{_prelude::*, error::TransportError, signer::ACCESS_TOKEN_HEADER};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<GatewayResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing signed gateway requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared (behind an
/// `Arc`) by the token manager and the business call path. Any status code is a successful
/// transport outcome; only failures to obtain a response map to [`TransportError`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and returns the status and body.
	fn send(&self, request: GatewayRequest) -> TransportFuture<'_>;
}

/// Outbound request with its final header set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayRequest {
	/// Upper-case HTTP method.
	pub method: String,
	/// Fully qualified request URL, query included.
	pub url: Url,
	/// Headers in send order. Names are unique (case-insensitively).
	pub headers: Vec<(String, String)>,
	/// Request body, if any.
	pub body: Option<String>,
}
impl GatewayRequest {
	/// Creates a request without headers or body.
	pub fn new(method: impl Into<String>, url: Url) -> Self {
		Self { method: method.into(), url, headers: Vec::new(), body: None }
	}

	/// Sets a header, replacing any earlier header with the same name (case-insensitive).
	pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
		let name = name.into();
		let value = value.into();

		match self.headers.iter_mut().find(|(existing, _)| existing.eq_ignore_ascii_case(&name)) {
			Some(slot) => *slot = (name, value),
			None => self.headers.push((name, value)),
		}
	}

	/// Builder-style variant of [`set_header`](Self::set_header).
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.set_header(name, value);

		self
	}

	/// Sets the request body.
	pub fn with_body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Returns the value of the header named `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(existing, _)| existing.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}

	/// Returns the headers with the access token replaced by `<redacted>`.
	pub fn redacted_headers(&self) -> Vec<(String, String)> {
		self.headers
			.iter()
			.map(|(name, value)| {
				if name.eq_ignore_ascii_case(ACCESS_TOKEN_HEADER) {
					(name.clone(), "<redacted>".to_owned())
				} else {
					(name.clone(), value.clone())
				}
			})
			.collect()
	}

	/// Renders a cURL command reproducing the request, with the access token redacted.
	///
	/// The token is not part of the signature, so a replay only needs a current token pasted in.
	pub fn to_curl(&self) -> String {
		let mut curl = format!("curl -X {} \"{}\"", self.method, self.url);

		for (name, value) in self.redacted_headers() {
			curl.push_str(&format!(" \\\n -H \"{name}: {value}\""));
		}
		if let Some(body) = self.body.as_deref().filter(|body| !body.is_empty()) {
			curl.push_str(&format!(" \\\n -d '{}'", body.replace('\'', "'\\''")));
		}

		curl
	}
}

/// Status and body returned by the gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body decoded as text.
	pub body: String,
}
impl GatewayResponse {
	/// Creates a response value.
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose requests fail after `timeout`.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, crate::error::ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn send(&self, request: GatewayRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let method = reqwest::Method::from_bytes(request.method.as_bytes())
				.map_err(TransportError::network)?;
			let mut builder = self.0.request(method, request.url);

			for (name, value) in request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.text().await?;

			Ok(GatewayResponse { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request() -> GatewayRequest {
		GatewayRequest::new(
			"POST",
			Url::parse("https://gateway.example.com/oapi/users?page=1")
				.expect("Request URL fixture should parse."),
		)
	}

	#[test]
	fn set_header_replaces_case_insensitively() {
		let request = request()
			.with_header("x-tenant-id", "tenant-a")
			.with_header("X-Tenant-Id", "tenant-b")
			.with_header("x-other", "1");

		assert_eq!(request.headers.len(), 2);
		assert_eq!(request.header("x-tenant-id"), Some("tenant-b"));
		assert_eq!(request.headers[0].0, "X-Tenant-Id");
	}

	#[test]
	fn curl_replay_redacts_token_and_quotes_body() {
		let request = request()
			.with_header(ACCESS_TOKEN_HEADER, "live-token")
			.with_header("x-signature", "abc")
			.with_body("{\"name\":\"o'neil\"}");
		let curl = request.to_curl();

		assert!(
			curl.starts_with("curl -X POST \"https://gateway.example.com/oapi/users?page=1\"")
		);
		assert!(curl.contains("-H \"open-access-key: <redacted>\""));
		assert!(curl.contains("-H \"x-signature: abc\""));
		assert!(curl.contains(r#"-d '{"name":"o'\''neil"}'"#));
		assert!(!curl.contains("live-token"));
	}

	#[test]
	fn response_success_covers_2xx_only() {
		assert!(GatewayResponse::new(200, "").is_success());
		assert!(GatewayResponse::new(204, "").is_success());
		assert!(!GatewayResponse::new(199, "").is_success());
		assert!(!GatewayResponse::new(301, "").is_success());
		assert!(!GatewayResponse::new(500, "").is_success());
	}
}

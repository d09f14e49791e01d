//! Client options and their validation into typed values.

// self
use crate::{
	_prelude::*,
	auth::{AccessId, Secret},
	error::ConfigError,
};

/// Default request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Raw client options, typically deserialized from application configuration.
///
/// Field names accept both `snake_case` and the gateway's `camelCase` spelling
/// (`baseUri`, `accessId`, `secretKey`, `timeoutSeconds`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Gateway root; business paths are joined under it.
	#[serde(alias = "baseUri")]
	pub base_uri: String,
	/// Caller identity sent as `x-access-id`.
	#[serde(alias = "accessId")]
	pub access_id: String,
	/// Shared signing secret. Never sent on the wire.
	#[serde(alias = "secretKey")]
	pub secret_key: Secret,
	/// Per-request timeout for the default transport.
	#[serde(alias = "timeoutSeconds", default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
}
impl ClientConfig {
	/// Creates options with the default timeout.
	pub fn new(
		base_uri: impl Into<String>,
		access_id: impl Into<String>,
		secret_key: impl Into<Secret>,
	) -> Self {
		Self {
			base_uri: base_uri.into(),
			access_id: access_id.into(),
			secret_key: secret_key.into(),
			timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
		}
	}

	/// Overrides the request timeout.
	pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
		self.timeout_seconds = seconds;

		self
	}

	/// Validates the options, failing before any network traffic.
	pub fn validate(&self) -> Result<ResolvedConfig, ConfigError> {
		let base_uri = parse_base_uri(&self.base_uri)?;
		let access_id = AccessId::new(self.access_id.as_str())?;

		if self.secret_key.is_empty() {
			return Err(ConfigError::MissingSecretKey);
		}
		if self.timeout_seconds == 0 {
			return Err(ConfigError::InvalidTimeout { seconds: self.timeout_seconds });
		}

		Ok(ResolvedConfig {
			base_uri,
			access_id,
			secret_key: self.secret_key.clone(),
			timeout: std::time::Duration::from_secs(self.timeout_seconds),
		})
	}
}

/// Validated form of [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
	/// Gateway root, always ending with `/`.
	pub base_uri: Url,
	/// Caller identity.
	pub access_id: AccessId,
	/// Signing secret.
	pub secret_key: Secret,
	/// Per-request timeout.
	pub timeout: std::time::Duration,
}

/// Parses a gateway root and normalizes it to end with `/`.
pub fn parse_base_uri(raw: &str) -> Result<Url, ConfigError> {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return Err(ConfigError::InvalidBaseUri { value: raw.into(), source: None });
	}

	let url = Url::parse(trimmed)
		.map_err(|e| ConfigError::InvalidBaseUri { value: raw.into(), source: Some(e) })?;

	if url.cannot_be_a_base() {
		return Err(ConfigError::UnsupportedBaseUri { value: raw.into() });
	}

	Ok(with_trailing_slash(url))
}

/// Places `path` under the gateway root by concatenation.
///
/// Returns the request URL and the signed path (`/` followed by `path` without its leading
/// slashes). Paths carrying a query, fragment, scheme, backslash, or dot segment are rejected so
/// the URL that is sent always matches the path that is signed.
pub fn resolve_gateway_path(base: &Url, path: &str) -> Result<(Url, String), ConfigError> {
	let relative = path.trim_start_matches('/');
	let invalid = || ConfigError::InvalidPath { path: path.into() };

	if relative.contains(['?', '#', '\\']) || relative.contains("://") {
		return Err(invalid());
	}
	if relative.split('/').any(is_dot_segment) {
		return Err(invalid());
	}

	let base = with_trailing_slash(base.clone());
	let mut url = base.clone();

	url.set_path(&format!("{}{relative}", base.path()));
	url.set_query(None);
	url.set_fragment(None);

	if !url.path().starts_with(base.path()) {
		return Err(invalid());
	}

	Ok((url, format!("/{relative}")))
}

/// Appends `/` to the path unless it already ends with one, so concatenated paths stay under it.
pub fn with_trailing_slash(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url
}

fn is_dot_segment(segment: &str) -> bool {
	let decoded = segment.to_ascii_lowercase().replace("%2e", ".");

	decoded == "." || decoded == ".."
}

fn default_timeout_seconds() -> u64 {
	DEFAULT_TIMEOUT_SECONDS
}

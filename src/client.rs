//! Business call path: token acquisition, signing, and response classification.
//!
//! [`GatewayClient`] ties a validated [`ClientConfig`] to a transport, a token cache, and a
//! [`TokenManager`]. Every business call fetches a token (usually from the cache), signs the
//! request with a fresh timestamp and nonce, attaches the token header plus any caller headers,
//! and returns the raw response body on 2xx. Anything else becomes
//! [`ProtocolError::BusinessStatus`] carrying a cURL replay of the request.

// self
use crate::{
	_prelude::*,
	auth::{AccessId, Secret},
	cache::{MemoryTokenCache, TokenCache},
	config::{self, ClientConfig, ResolvedConfig},
	error::{ConfigError, ProtocolError},
	extract::FieldExtractor,
	http::{GatewayRequest, HttpTransport},
	obs::{self, CallKind, CallOutcome, CallSpan},
	signature,
	signer::{ACCESS_TOKEN_HEADER, RequestSigner, SignRequest},
	token::TokenManager,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

const CONTENT_TYPE_HEADER: &str = "content-type";
const JSON_CONTENT_TYPE: &str = "application/json";

/// One business call: method, path under the gateway root, query, body, and extra headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusinessRequest {
	/// HTTP method; normalized to upper case before signing.
	pub method: String,
	/// Path appended to the gateway root, with or without a leading `/`. It may not carry a
	/// query, fragment, scheme, or dot segment; use [`with_query`](Self::with_query) instead.
	pub path: String,
	/// Query parameters. Entries with empty values are neither signed nor sent.
	pub query: BTreeMap<String, String>,
	/// Caller headers, applied after the signed headers.
	pub headers: Vec<(String, String)>,
	/// JSON request body.
	pub body: Option<String>,
}
impl BusinessRequest {
	/// Creates a bodiless request.
	pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
		Self {
			method: method.into(),
			path: path.into(),
			query: BTreeMap::new(),
			headers: Vec::new(),
			body: None,
		}
	}

	/// Creates a `POST` request carrying a JSON body.
	pub fn post(path: impl Into<String>, body: impl Into<String>) -> Self {
		Self::new("POST", path).with_body(body)
	}

	/// Sets the JSON body.
	pub fn with_body(mut self, body: impl Into<String>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Adds a query parameter, replacing an earlier one with the same key.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(key.into(), value.into());

		self
	}

	/// Adds a caller header.
	///
	/// Caller headers are applied after the token and signature headers. On a name collision
	/// (compared case-insensitively) the caller's value wins, so overriding any `x-` signing header
	/// or `open-access-key` produces a request the gateway will reject.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));

		self
	}
}

/// Signed-request client bound to one gateway and one access identity.
///
/// Cloning is cheap; clones share the token manager, its refresh guards, and the transport.
#[derive(Clone)]
pub struct GatewayClient {
	base_uri: Url,
	signer: RequestSigner,
	tokens: Arc<TokenManager>,
	transport: Arc<dyn HttpTransport>,
}
impl GatewayClient {
	/// Starts building a client from raw options.
	pub fn builder(config: ClientConfig) -> GatewayClientBuilder {
		GatewayClientBuilder::new(config)
	}

	/// Builds a client with the default transport and a fresh in-memory token cache.
	pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
		Self::builder(config).build()
	}

	/// Gateway root, always ending with `/`.
	pub fn base_uri(&self) -> &Url {
		&self.base_uri
	}

	/// Identity the client signs for.
	pub fn access_id(&self) -> &AccessId {
		self.signer.access_id()
	}

	/// Token manager backing this client.
	pub fn token_manager(&self) -> &TokenManager {
		&self.tokens
	}

	/// Returns a valid access token; see [`TokenManager::get_token`].
	pub async fn get_token(&self) -> Result<Secret> {
		self.tokens.get_token().await
	}

	/// Sends a signed `POST` with a JSON body and returns the response body.
	pub async fn post(&self, path: &str, body: &str) -> Result<String> {
		self.send(BusinessRequest::post(path, body)).await
	}

	/// Sends a signed business request and returns the response body on 2xx.
	pub async fn send(&self, request: BusinessRequest) -> Result<String> {
		const KIND: CallKind = CallKind::Business;

		let span = CallSpan::new(KIND, "send");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.send_inner(request)).await;

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		result
	}

	/// Same as [`send`](Self::send), but gives up with [`Error::Cancelled`] once `cancel` fires.
	pub async fn send_with_cancel(
		&self,
		request: BusinessRequest,
		cancel: &CancellationToken,
	) -> Result<String> {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(Error::Cancelled),
			result = self.send(request) => result,
		}
	}

	async fn send_inner(&self, request: BusinessRequest) -> Result<String> {
		let prepared = self.prepare(request)?;
		let token = self.tokens.get_token().await?;
		let outbound = self.sign_prepared(prepared, &token);
		let snapshot = outbound.clone();
		let response = self.transport.send(outbound).await?;

		obs::record_gateway_status(CallKind::Business, response.status);

		if response.is_success() {
			return Ok(response.body);
		}

		let uri = snapshot.url.to_string();
		let replay = snapshot.to_curl();

		obs::log_business_failure(&snapshot.method, &uri, response.status, &response.body, &replay);

		Err(ProtocolError::BusinessStatus {
			method: snapshot.method.clone(),
			uri,
			headers: snapshot.redacted_headers(),
			status: response.status,
			body: response.body,
			replay,
		}
		.into())
	}

	/// Validates the request and resolves its URL before any token is fetched.
	fn prepare(&self, request: BusinessRequest) -> Result<PreparedRequest, ConfigError> {
		let method = normalize_method(&request.method)?;
		let (mut url, signed_path) = config::resolve_gateway_path(&self.base_uri, &request.path)?;
		let query = signature::build_query_string(
			request.query.iter().map(|(key, value)| (key.as_str(), value.as_str())),
		);

		url.set_query((!query.is_empty()).then_some(query.as_str()));

		for (name, value) in &request.headers {
			validate_header(name, value)?;
		}

		Ok(PreparedRequest {
			method,
			signed_path,
			query,
			url,
			headers: request.headers,
			body: request.body,
		})
	}

	fn sign_prepared(&self, prepared: PreparedRequest, token: &Secret) -> GatewayRequest {
		let body = prepared.body.as_deref().unwrap_or_default();
		let signed = self.signer.sign(
			&SignRequest::new(&prepared.method, &prepared.signed_path)
				.with_query(&prepared.query)
				.with_body(body),
		);
		let mut outbound = GatewayRequest::new(prepared.method.as_str(), prepared.url);

		outbound.set_header(ACCESS_TOKEN_HEADER, token.expose());

		for (name, value) in signed.to_header_pairs() {
			outbound.set_header(name, value);
		}
		if let Some(body) = prepared.body {
			outbound.set_header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE);
			outbound.body = Some(body);
		}
		for (name, value) in prepared.headers {
			outbound.set_header(name, value);
		}

		outbound
	}
}
impl Debug for GatewayClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GatewayClient")
			.field("base_uri", &self.base_uri.as_str())
			.field("access_id", self.signer.access_id())
			.finish()
	}
}

/// Builder for [`GatewayClient`].
///
/// Unset collaborators fall back to defaults: a fresh [`MemoryTokenCache`], the reqwest
/// transport with the configured timeout, and the JSON field extractor. Pass the same
/// `Arc<dyn TokenCache>` to several builders to share tokens between clients.
pub struct GatewayClientBuilder {
	config: ClientConfig,
	token_cache: Option<Arc<dyn TokenCache>>,
	transport: Option<Arc<dyn HttpTransport>>,
	extractor: Option<Arc<dyn FieldExtractor>>,
}
impl GatewayClientBuilder {
	/// Creates a builder with no collaborators set.
	pub fn new(config: ClientConfig) -> Self {
		Self { config, token_cache: None, transport: None, extractor: None }
	}

	/// Uses `cache` for access tokens.
	pub fn token_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
		self.token_cache = Some(cache);

		self
	}

	/// Uses `transport` for both authentication and business calls.
	pub fn transport(mut self, transport: impl HttpTransport) -> Self {
		self.transport = Some(Arc::new(transport));

		self
	}

	/// Uses an already shared transport.
	pub fn shared_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Uses `extractor` to read authentication responses.
	pub fn extractor(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
		self.extractor = Some(extractor);

		self
	}

	/// Validates the configuration and assembles the client.
	pub fn build(self) -> Result<GatewayClient, ConfigError> {
		let resolved = self.config.validate()?;
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport(&resolved)?,
		};
		let token_cache =
			self.token_cache.unwrap_or_else(|| Arc::new(MemoryTokenCache::default()));
		let ResolvedConfig { base_uri, access_id, secret_key, .. } = resolved;
		let signer = RequestSigner::new(access_id, secret_key);
		let mut tokens =
			TokenManager::new(signer.clone(), &base_uri, token_cache, transport.clone())?;

		if let Some(extractor) = self.extractor {
			tokens = tokens.with_extractor(extractor);
		}

		Ok(GatewayClient { base_uri, signer, tokens: Arc::new(tokens), transport })
	}
}
impl Debug for GatewayClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GatewayClientBuilder")
			.field("config", &self.config)
			.field("token_cache_set", &self.token_cache.is_some())
			.field("transport_set", &self.transport.is_some())
			.field("extractor_set", &self.extractor.is_some())
			.finish()
	}
}

struct PreparedRequest {
	method: String,
	signed_path: String,
	query: String,
	url: Url,
	headers: Vec<(String, String)>,
	body: Option<String>,
}

#[cfg(feature = "reqwest")]
fn default_transport(config: &ResolvedConfig) -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Ok(Arc::new(ReqwestHttpClient::with_timeout(config.timeout)?))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport(_: &ResolvedConfig) -> Result<Arc<dyn HttpTransport>, ConfigError> {
	Err(ConfigError::MissingTransport)
}

fn normalize_method(raw: &str) -> Result<String, ConfigError> {
	let method = raw.trim().to_ascii_uppercase();

	if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
		return Err(ConfigError::InvalidMethod { method: raw.into() });
	}

	Ok(method)
}

fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
	let valid_name = !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':');
	let valid_value = !value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0);

	if valid_name && valid_value {
		Ok(())
	} else {
		Err(ConfigError::InvalidHeader { name: name.into() })
	}
}

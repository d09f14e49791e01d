//! Access-token acquisition with cache reuse, single-flight refresh, and a clock-skew buffer.
//!
//! [`TokenManager::get_token`] answers from the [`TokenCache`] whenever it can. On a miss it
//! takes the per-key refresh guard, re-checks the cache (another caller may have refreshed while
//! this one waited), and only then signs and sends `GET /auth`. The returned `expireSeconds` is
//! shortened by [`EXPIRY_BUFFER_SECS`] before caching so a token never expires mid-flight.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccessId, Secret},
	cache::{CacheKey, TokenCache},
	config,
	error::{ConfigError, ProtocolError},
	extract::{FieldExtractor, JsonFieldExtractor},
	http::{GatewayRequest, HttpTransport},
	obs::{self, CallKind, CallOutcome, CallSpan},
	signer::{RequestSigner, SignRequest},
};

/// Seconds subtracted from the advertised token lifetime before caching.
pub const EXPIRY_BUFFER_SECS: i64 = 60;

const AUTH_METHOD: &str = "GET";
const AUTH_PATH: &str = "/auth";
const ACCESS_KEY_FIELD: &str = "accessKey";
const EXPIRE_SECONDS_FIELD: &str = "expireSeconds";

/// Produces a currently valid access token for one identity while minimizing
/// authentication calls under concurrent load.
pub struct TokenManager {
	signer: RequestSigner,
	auth_url: Url,
	cache: Arc<dyn TokenCache>,
	transport: Arc<dyn HttpTransport>,
	extractor: Arc<dyn FieldExtractor>,
	metrics: Arc<RefreshMetrics>,
	refresh_guards: Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>,
}
impl TokenManager {
	/// Creates a manager that authenticates against `{base_uri}/auth`.
	pub fn new(
		signer: RequestSigner,
		base_uri: &Url,
		cache: Arc<dyn TokenCache>,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self, ConfigError> {
		let (auth_url, _) = config::resolve_gateway_path(base_uri, AUTH_PATH)?;

		Ok(Self {
			signer,
			auth_url,
			cache,
			transport,
			extractor: Arc::new(JsonFieldExtractor),
			metrics: Default::default(),
			refresh_guards: Default::default(),
		})
	}

	/// Replaces the field extractor used to read authentication responses.
	pub fn with_extractor(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
		self.extractor = extractor;

		self
	}

	/// Identity whose tokens this manager acquires.
	pub fn access_id(&self) -> &AccessId {
		self.signer.access_id()
	}

	/// Cache key under which this identity's token is stored.
	pub fn cache_key(&self) -> CacheKey {
		CacheKey::for_identity(self.signer.access_id())
	}

	/// URL of the authentication endpoint.
	pub fn auth_url(&self) -> &Url {
		&self.auth_url
	}

	/// Counters describing cache reuse and authentication calls.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns a valid access token, authenticating at most once across concurrent callers.
	///
	/// Dropping the returned future cancels it; a refresh guard held by the dropped future is
	/// released immediately.
	pub async fn get_token(&self) -> Result<Secret> {
		let key = self.cache_key();

		if let Some(token) = self.cached(&key).await? {
			return Ok(token);
		}

		let guard = self.refresh_guard(&key);
		let _singleflight = guard.lock().await;

		if let Some(token) = self.cached(&key).await? {
			return Ok(token);
		}

		self.refresh(&key).await
	}

	/// Same as [`get_token`](Self::get_token), but gives up with [`Error::Cancelled`] once
	/// `cancel` fires, whether the caller is waiting for the refresh guard or the network.
	pub async fn get_token_with_cancel(&self, cancel: &CancellationToken) -> Result<Secret> {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(Error::Cancelled),
			result = self.get_token() => result,
		}
	}

	async fn cached(&self, key: &CacheKey) -> Result<Option<Secret>> {
		let token = self.cache.get(key).await?;

		if token.is_some() {
			self.metrics.record_cache_hit();
		}

		Ok(token)
	}

	/// Returns (and creates on demand) the singleflight guard for a cache key.
	fn refresh_guard(&self, key: &CacheKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.refresh_guards.lock();

		guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	async fn refresh(&self, key: &CacheKey) -> Result<Secret> {
		const KIND: CallKind = CallKind::Authenticate;

		let span = CallSpan::new(KIND, "refresh_token");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span.instrument(self.authenticate(key)).await;

		if result.is_ok() {
			self.metrics.record_success();
		} else {
			self.metrics.record_failure();
		}

		obs::record_call_outcome(KIND, CallOutcome::of(&result));

		result
	}

	async fn authenticate(&self, key: &CacheKey) -> Result<Secret> {
		let signed = self.signer.sign(&SignRequest::new(AUTH_METHOD, AUTH_PATH));
		let mut request = GatewayRequest::new(AUTH_METHOD, self.auth_url.clone());

		for (name, value) in signed.to_header_pairs() {
			request.set_header(name, value);
		}

		let response = self.transport.send(request).await?;

		obs::record_gateway_status(CallKind::Authenticate, response.status);

		if !response.is_success() {
			return Err(ProtocolError::AuthStatus {
				method: AUTH_METHOD.into(),
				path: AUTH_PATH.into(),
				status: response.status,
				body: response.body,
			}
			.into());
		}

		let body = response.body;
		let Some(access_key) = self
			.extractor
			.extract(&body, ACCESS_KEY_FIELD)
			.filter(|value| !value.is_empty())
		else {
			return Err(ProtocolError::MalformedAuthResponse { field: ACCESS_KEY_FIELD, body }.into());
		};
		let Some(expire_seconds) = self
			.extractor
			.extract(&body, EXPIRE_SECONDS_FIELD)
			.and_then(|value| value.trim().parse::<i64>().ok())
		else {
			return Err(
				ProtocolError::MalformedAuthResponse { field: EXPIRE_SECONDS_FIELD, body }.into()
			);
		};
		let ttl_seconds = expire_seconds.saturating_sub(EXPIRY_BUFFER_SECS);

		if ttl_seconds <= 0 {
			obs::log_non_positive_ttl(key.as_str(), expire_seconds, ttl_seconds);
		}

		let token = Secret::new(access_key);

		self.cache.set(key, token.clone(), Duration::seconds(ttl_seconds)).await?;
		obs::log_token_refreshed(key.as_str(), ttl_seconds);

		Ok(token)
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("access_id", self.signer.access_id())
			.field("auth_url", &self.auth_url.as_str())
			.field("metrics", &self.metrics)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		cache::MemoryTokenCache,
		error::TransportError,
		http::{GatewayResponse, TransportFuture},
	};

	struct StaticTransport {
		response: GatewayResponse,
		requests: Mutex<Vec<GatewayRequest>>,
	}
	impl StaticTransport {
		fn new(status: u16, body: &str) -> Arc<Self> {
			Arc::new(Self {
				response: GatewayResponse::new(status, body),
				requests: Default::default(),
			})
		}
	}
	impl HttpTransport for StaticTransport {
		fn send(&self, request: GatewayRequest) -> TransportFuture<'_> {
			self.requests.lock().push(request);

			let response = self.response.clone();

			Box::pin(async move { Ok::<_, TransportError>(response) })
		}
	}

	fn manager(transport: Arc<StaticTransport>) -> (TokenManager, Arc<MemoryTokenCache>) {
		let cache = Arc::new(MemoryTokenCache::default());
		let signer = RequestSigner::new(
			AccessId::new("demo-app").expect("Access identifier fixture should be valid."),
			Secret::new("demo-secret"),
		);
		let base = Url::parse("https://gateway.example.com/gw").expect("Base URL should parse.");
		let manager = TokenManager::new(signer, &base, cache.clone(), transport)
			.expect("Token manager should build.");

		(manager, cache)
	}

	#[test]
	fn auth_url_is_joined_under_base_path() {
		let (manager, _) = manager(StaticTransport::new(200, "{}"));

		assert_eq!(manager.auth_url().as_str(), "https://gateway.example.com/gw/auth");
		assert_eq!(manager.cache_key().as_str(), "token::demo-app");
	}

	#[tokio::test]
	async fn auth_request_is_signed_without_token_header() {
		let transport = StaticTransport::new(200, r#"{"accessKey":"tok","expireSeconds":7200}"#);
		let (manager, cache) = manager(transport.clone());
		let token = manager.get_token().await.expect("Token request should succeed.");

		assert_eq!(token.expose(), "tok");

		let requests = transport.requests.lock();
		let request = &requests[0];

		assert_eq!(request.method, "GET");
		assert_eq!(request.header("x-access-id"), Some("demo-app"));
		assert_eq!(request.header("x-sign-version"), Some("V3"));
		assert_eq!(
			request.header("x-signature-headers"),
			Some("x-access-id,x-nonce,x-sign-version,x-timestamp")
		);
		assert_eq!(request.header("x-signature").map(str::len), Some(32));
		assert_eq!(request.header("open-access-key"), None);
		assert_eq!(request.body, None);

		let entry =
			cache.entry(&manager.cache_key()).expect("Token should be cached after success.");
		let remaining = entry.expires_at - OffsetDateTime::now_utc();

		assert!(remaining <= Duration::seconds(7140));
		assert!(remaining > Duration::seconds(7100));
	}

	#[tokio::test]
	async fn non_integer_expiry_is_rejected() {
		let transport = StaticTransport::new(200, r#"{"accessKey":"tok","expireSeconds":"soon"}"#);
		let (manager, cache) = manager(transport);
		let err = manager.get_token().await.expect_err("Malformed expiry should fail.");

		assert!(matches!(
			err,
			Error::Protocol(ProtocolError::MalformedAuthResponse { field: "expireSeconds", .. })
		));
		assert!(cache.is_empty());
		assert_eq!(manager.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn empty_access_key_is_rejected() {
		let transport = StaticTransport::new(200, r#"{"accessKey":"","expireSeconds":7200}"#);
		let (manager, cache) = manager(transport);
		let err = manager.get_token().await.expect_err("Empty access key should fail.");

		assert!(matches!(
			err,
			Error::Protocol(ProtocolError::MalformedAuthResponse { field: "accessKey", .. })
		));
		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn already_cancelled_token_short_circuits() {
		let transport = StaticTransport::new(200, r#"{"accessKey":"tok","expireSeconds":7200}"#);
		let (manager, _) = manager(transport.clone());
		let cancel = CancellationToken::new();

		cancel.cancel();

		let err = manager
			.get_token_with_cancel(&cancel)
			.await
			.expect_err("Cancelled requests should fail.");

		assert!(matches!(err, Error::Cancelled));
		assert!(transport.requests.lock().is_empty());
	}
}

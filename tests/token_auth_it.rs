// crates.io
use httpmock::prelude::*;
// self
use epaas_signer::{_preludet::*, cache::CacheKey, error::ProtocolError};

#[tokio::test]
async fn auth_request_is_signed_and_carries_no_token() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/auth")
				.header("x-access-id", TEST_ACCESS_ID)
				.header("x-sign-version", "V3")
				.header("x-signature-headers", "x-access-id,x-nonce,x-sign-version,x-timestamp")
				.header_exists("x-nonce")
				.header_exists("x-timestamp")
				.header_exists("x-signature")
				.header_missing("open-access-key");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"accessKey":"auth-token","expireSeconds":7200}"#);
		})
		.await;
	let (client, cache) = build_reqwest_test_client(&server.base_url());
	let token = client.get_token().await.expect("Token request should succeed.");

	assert_eq!(token.expose(), "auth-token");

	mock.assert_calls_async(1).await;

	let entry = cache
		.entry(&client.token_manager().cache_key())
		.expect("Token should be cached after a successful authentication.");

	assert_eq!(entry.token.expose(), "auth-token");
}

#[tokio::test]
async fn cached_token_skips_the_network() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth");
			then.status(200).body(r#"{"accessKey":"cached-token","expireSeconds":3600}"#);
		})
		.await;
	let (client, _cache) = build_reqwest_test_client(&server.base_url());
	let first = client.get_token().await.expect("First token request should succeed.");
	let second = client.get_token().await.expect("Second token request should succeed.");

	assert_eq!(first, second);

	mock.assert_calls_async(1).await;

	let metrics = client.token_manager().metrics();

	assert_eq!(metrics.attempts(), 1);
	assert_eq!(metrics.successes(), 1);
	assert_eq!(metrics.cache_hits(), 1);
}

#[tokio::test]
async fn expiry_shorter_than_buffer_is_never_served_from_cache() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth");
			then.status(200).body(r#"{"accessKey":"short-lived","expireSeconds":30}"#);
		})
		.await;
	let (client, cache) = build_reqwest_test_client(&server.base_url());

	for _ in 0..2 {
		let token = client.get_token().await.expect("Short-lived token should still be returned.");

		assert_eq!(token.expose(), "short-lived");
	}

	mock.assert_calls_async(2).await;

	let key = CacheKey::for_identity(client.access_id());
	let entry = cache.entry(&key).expect("Short-lived token should still be stored.");

	assert!(entry.expires_at <= OffsetDateTime::now_utc());
}

#[tokio::test]
async fn missing_access_key_fails_without_caching() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth");
			then.status(200).body(r#"{"expireSeconds":7200}"#);
		})
		.await;
	let (client, cache) = build_reqwest_test_client(&server.base_url());
	let err = client.get_token().await.expect_err("Missing accessKey should fail.");

	match err {
		Error::Protocol(ProtocolError::MalformedAuthResponse { field, body }) => {
			assert_eq!(field, "accessKey");
			assert_eq!(body, r#"{"expireSeconds":7200}"#);
		},
		other => panic!("Expected a malformed auth response, got {other:?}."),
	}

	mock.assert_calls_async(1).await;

	assert!(cache.is_empty());
	assert_eq!(client.token_manager().metrics().failures(), 1);
}

#[tokio::test]
async fn auth_rejection_surfaces_status_and_body() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/auth");
			then.status(401).body(r#"{"message":"bad signature"}"#);
		})
		.await;
	let (client, cache) = build_reqwest_test_client(&server.base_url());
	let err = client.get_token().await.expect_err("HTTP 401 should fail.");

	match err {
		Error::Protocol(error @ ProtocolError::AuthStatus { .. }) => {
			assert_eq!(error.status(), Some(401));
			assert_eq!(error.body(), r#"{"message":"bad signature"}"#);
		},
		other => panic!("Expected an auth status error, got {other:?}."),
	}

	mock.assert_calls_async(1).await;

	assert!(cache.is_empty());
}

#[tokio::test]
async fn unreachable_gateway_maps_to_transport_error() {
	let (client, _cache) = build_reqwest_test_client("http://127.0.0.1:9");
	let err = client.get_token().await.expect_err("Closed port should fail.");

	assert!(matches!(err, Error::Transport(_)));
}

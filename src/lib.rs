//! Signed-request client for the EPaaS open API gateway: deterministic V3 request signatures,
//! single-flight access-token refresh, and pluggable token caches in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod obs;
pub mod signature;
pub mod signer;
pub mod token;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests and demos.

	pub use crate::_prelude::*;

	// self
	use crate::{
		cache::{MemoryTokenCache, TokenCache},
		client::GatewayClient,
		config::ClientConfig,
		http::ReqwestHttpClient,
	};

	/// Access identifier shared by the integration test fixtures.
	pub const TEST_ACCESS_ID: &str = "demo-app";
	/// Secret key shared by the integration test fixtures.
	pub const TEST_SECRET_KEY: &str = "demo-secret";

	/// Builds a client configuration pointing at the provided mock server base URI.
	pub fn test_config(base_uri: &str) -> ClientConfig {
		ClientConfig::new(base_uri, TEST_ACCESS_ID, TEST_SECRET_KEY)
	}

	/// Constructs a [`GatewayClient`] backed by a fresh in-memory cache and the reqwest transport
	/// used across integration tests.
	pub fn build_reqwest_test_client(base_uri: &str) -> (GatewayClient, Arc<MemoryTokenCache>) {
		let cache_backend = Arc::new(MemoryTokenCache::default());
		let cache: Arc<dyn TokenCache> = cache_backend.clone();
		let client = GatewayClient::builder(test_config(base_uri))
			.token_cache(cache)
			.transport(ReqwestHttpClient::default())
			.build()
			.expect("Failed to build gateway client for tests.");

		(client, cache_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use tokio_util;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

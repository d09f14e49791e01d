//! Console walkthrough of a signed business call.
//!
//! With `EPAAS_BASE_URI`, `EPAAS_ACCESS_ID`, and `EPAAS_SECRET_KEY` set, the demo calls that
//! gateway (`EPAAS_PATH` picks the business path, `EPAAS_TENANT_ID` the tenant header).
//! Otherwise it starts a local mock gateway so the whole exchange can be observed offline.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use epaas_signer::{
	cache::{MemoryTokenCache, TokenCache},
	client::{BusinessRequest, GatewayClient},
	config::ClientConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let mut mock_gateway = None;
	let (config, path) = match env::var("EPAAS_BASE_URI") {
		Ok(base_uri) => (
			ClientConfig::new(base_uri, env::var("EPAAS_ACCESS_ID")?, env::var("EPAAS_SECRET_KEY")?),
			env::var("EPAAS_PATH").unwrap_or_else(|_| "oapi/ping".into()),
		),
		Err(_) => {
			let server = mock_gateway.insert(MockServer::start_async().await);

			server
				.mock_async(|when, then| {
					when.method(GET).path("/auth").header("x-sign-version", "V3");
					then.status(200)
						.header("content-type", "application/json")
						.body(r#"{"accessKey":"demo-access","expireSeconds":7200}"#);
				})
				.await;
			server
				.mock_async(|when, then| {
					when.method(POST)
						.path("/oapi/users/paginate")
						.header("open-access-key", "demo-access");
					then.status(200)
						.header("content-type", "application/json")
						.body(r#"{"total":1,"items":[{"name":"demo"}]}"#);
				})
				.await;

			(
				ClientConfig::new(server.base_url(), "demo-app", "demo-secret"),
				"oapi/users/paginate".into(),
			)
		},
	};
	let tenant = env::var("EPAAS_TENANT_ID").unwrap_or_else(|_| "demo-tenant".into());
	// Hand the same cache to any other client signing for this identity.
	let cache: Arc<dyn TokenCache> = Arc::new(MemoryTokenCache::default());
	let client = GatewayClient::builder(config).token_cache(cache).build()?;

	println!("Calling {}{path} as {}...", client.base_uri(), client.access_id());

	let request = BusinessRequest::post(path, "{}").with_header("x-tenant-id", tenant);

	match client.send(request).await {
		Ok(body) => println!("Response: {body}"),
		Err(e) => eprintln!("Call failed: {e}"),
	}

	let metrics = client.token_manager().metrics();

	println!(
		"Token refreshes: {} attempted, {} succeeded, {} cache hits.",
		metrics.attempts(),
		metrics.successes(),
		metrics.cache_hits()
	);

	Ok(())
}

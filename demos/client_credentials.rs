//! Demonstrates the client-credentials flow with the default reqwest transport and the in-memory
//! token cache: the first call hits the token endpoint, the second is served from the cache.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use oauth2_acquirer::{
	auth::{ClientId, ResourceId},
	authority::{AuthorityDescriptor, StaticAuthenticator},
	cache::MemoryTokenCache,
	credential::Credential,
	flows::Acquirer,
	url::Url,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/contoso/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"Bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let descriptor = AuthorityDescriptor::builder(Url::parse("https://login.example.com/contoso")?)
		.token_endpoint(Url::parse(&server.url("/contoso/oauth2/token"))?)
		.build()?;
	let cache = Arc::new(MemoryTokenCache::default());
	let acquirer = Acquirer::new(
		Arc::new(StaticAuthenticator::new(descriptor)),
		Credential::with_secret(ClientId::new("demo-client")?, "super-secret"),
	)?
	.with_cache(cache.clone());
	let resource = ResourceId::new("https://graph.example.com")?;
	let first = acquirer.acquire_token_for_client(resource.clone()).await?;
	let second = acquirer.acquire_token_for_client(resource).await?;

	println!(
		"Access token fingerprint: {}.",
		first.access_token.as_ref().map(|token| token.fingerprint()).unwrap_or_default()
	);
	println!("Served from cache: {}.", first == second);
	println!("Cached entries: {}.", cache.len());

	token_mock.assert_async().await;

	Ok(())
}

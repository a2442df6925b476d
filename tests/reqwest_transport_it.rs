#![cfg(feature = "reqwest")]

// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use oauth2_acquirer::{
	auth::{ClientId, CorrelationId, ResourceId, TokenSecret},
	authority::{AuthorityDescriptor, StaticAuthenticator},
	cache::MemoryTokenCache,
	credential::Credential,
	error::TransportError,
	http::{ReqwestTransport, TokenTransport},
	request::{CallState, ExecutionMode, RequestParameters},
	reqwest::Client,
	url::Url,
};

fn call_state() -> CallState {
	CallState::new(
		Some(CorrelationId::new("corr-http").expect("Correlation id should be valid.")),
		ExecutionMode::Async,
	)
}

fn endpoint(server: &MockServer) -> Url {
	Url::parse(&server.url("/token")).expect("Mock token endpoint should parse successfully.")
}

fn client_credentials_params() -> RequestParameters {
	let mut params = RequestParameters::new();

	params
		.insert("grant_type", "client_credentials")
		.insert("resource", "https://graph.example.com")
		.insert("client_id", "app-1");

	params
}

#[tokio::test]
async fn posts_form_with_correlation_headers() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.header("client-request-id", "corr-http")
				.header("return-client-request-id", "true")
				.form_urlencoded_tuple("grant_type", "client_credentials")
				.form_urlencoded_tuple("resource", "https://graph.example.com");
			then.status(200).header("content-type", "application/json").body(
				"{\"token_type\":\"Bearer\",\"access_token\":\"access-http\",\"refresh_token\":\"refresh-http\",\"expires_in\":3600}",
			);
		})
		.await;
	let transport = ReqwestTransport::new().expect("Reqwest transport should build.");
	let result = transport
		.exchange(&endpoint(&server), client_credentials_params(), &call_state())
		.await
		.expect("Token exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(result.access_token.as_ref().map(TokenSecret::expose), Some("access-http"));
	assert_eq!(result.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-http"));
	assert_eq!(result.access_token_type.as_deref(), Some("Bearer"));
	assert!(!result.expires_within(time::OffsetDateTime::now_utc(), Duration::minutes(55)));
}

#[tokio::test]
async fn oauth_errors_carry_code_status_and_retry_after() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400)
				.header("content-type", "application/json")
				.header("retry-after", "7")
				.body("{\"error\":\"invalid_request\",\"error_description\":\"AADSTS90014\"}");
		})
		.await;
	let err = ReqwestTransport::new()
		.expect("Reqwest transport should build.")
		.exchange(&endpoint(&server), client_credentials_params(), &call_state())
		.await
		.expect_err("OAuth error payload should fail.");

	mock.assert_async().await;

	match err {
		TransportError::Server { code, description, status, retry_after } => {
			assert_eq!(code, "invalid_request");
			assert_eq!(description.as_deref(), Some("AADSTS90014"));
			assert_eq!(status, Some(400));
			assert_eq!(retry_after, Some(Duration::seconds(7)));
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn gateway_pages_are_unexpected_responses() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(502).header("content-type", "text/html").body("<html>bad gateway</html>");
		})
		.await;
	let err = ReqwestTransport::new()
		.expect("Reqwest transport should build.")
		.exchange(&endpoint(&server), client_credentials_params(), &call_state())
		.await
		.expect_err("HTML body should fail.");

	assert!(matches!(err, TransportError::UnexpectedResponse { status: Some(502), .. }));
}

#[tokio::test]
async fn oversized_expiries_fail_without_panicking() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"token_type\":\"Bearer\",\"access_token\":\"a\",\"expires_in\":9223372036854775807}",
			);
		})
		.await;
	let err = ReqwestTransport::new()
		.expect("Reqwest transport should build.")
		.exchange(&endpoint(&server), client_credentials_params(), &call_state())
		.await
		.expect_err("Expiry past the representable range should fail.");

	assert!(matches!(err, TransportError::UnexpectedResponse { status: Some(200), .. }));
}

#[tokio::test]
async fn authorization_code_requests_carry_code_and_redirect_uri() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.form_urlencoded_tuple("grant_type", "authorization_code")
				.form_urlencoded_tuple("code", "code-1")
				.form_urlencoded_tuple("redirect_uri", "https://app.example.com/callback")
				.form_urlencoded_tuple("client_id", "app-1");
			then.status(200).header("content-type", "application/json").body(
				"{\"token_type\":\"Bearer\",\"access_token\":\"access-code\",\"expires_in\":600}",
			);
		})
		.await;
	let mut params = RequestParameters::new();

	params
		.insert("grant_type", "authorization_code")
		.insert("code", "code-1")
		.insert("redirect_uri", "https://app.example.com/callback")
		.insert("client_id", "app-1");

	let result = ReqwestTransport::new()
		.expect("Reqwest transport should build.")
		.exchange(&endpoint(&server), params, &call_state())
		.await
		.expect("Authorization code exchange should succeed.");

	mock.assert_async().await;

	assert_eq!(result.access_token.as_ref().map(TokenSecret::expose), Some("access-code"));
}

#[tokio::test]
async fn unsupported_grants_are_rejected_before_sending() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(500);
		})
		.await;
	let mut params = client_credentials_params();

	params.insert("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer");

	let err = ReqwestTransport::new()
		.expect("Reqwest transport should build.")
		.exchange(&endpoint(&server), params, &call_state())
		.await
		.expect_err("Unknown grant types should fail.");

	mock.assert_calls_async(0).await;

	assert!(matches!(err, TransportError::RequestBuild { .. }));
}

#[tokio::test]
async fn slow_endpoints_time_out() {
	let server = MockServer::start_async().await;
	let _mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).delay(StdDuration::from_millis(500)).body("{}");
		})
		.await;
	let client = Client::builder()
		.timeout(StdDuration::from_millis(50))
		.build()
		.expect("Reqwest client should build.");
	let err = ReqwestTransport::with_client(client)
		.exchange(&endpoint(&server), client_credentials_params(), &call_state())
		.await
		.expect_err("Delayed response should time out.");

	assert!(matches!(err, TransportError::Timeout));
}

#[tokio::test]
async fn acquirer_serves_the_second_call_from_cache() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/contoso/oauth2/token")
				.form_urlencoded_tuple("client_secret", "s3cret");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"access-cached\",\"token_type\":\"Bearer\",\"expires_in\":1800}",
			);
		})
		.await;
	let descriptor = AuthorityDescriptor::builder(
		Url::parse("https://login.example.com/contoso").expect("Authority should parse."),
	)
	.token_endpoint(
		Url::parse(&server.url("/contoso/oauth2/token")).expect("Token endpoint should parse."),
	)
	.build()
	.expect("Authority descriptor should build.");
	let acquirer = oauth2_acquirer::flows::Acquirer::new(
		Arc::new(StaticAuthenticator::new(descriptor)),
		Credential::with_secret(ClientId::new("app-1").expect("Client should be valid."), "s3cret"),
	)
	.expect("Acquirer should build.")
	.with_cache(Arc::new(MemoryTokenCache::default()));
	let resource = ResourceId::new("https://graph.example.com").expect("Resource should be valid.");
	let first = acquirer
		.acquire_token_for_client(resource.clone())
		.await
		.expect("First acquisition should succeed.");
	let second = acquirer
		.acquire_token_for_client(resource)
		.await
		.expect("Second acquisition should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(first, second);
	assert_eq!(acquirer.metrics.cache_hits(), 1);
}

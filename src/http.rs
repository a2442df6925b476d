//! Token endpoint transport contract and the default reqwest-backed implementation.
//!
//! [`TokenTransport`] is the orchestrator's only dependency on an HTTP stack: it receives the
//! fully built [`RequestParameters`] for one attempt and returns either a normalized
//! [`AuthenticationResult`] or a tagged [`TransportError`]. Timeouts and connection handling
//! belong to the transport; a timeout surfaces as an ordinary failure.
//!
//! [`ReqwestTransport`] drives the exchange through the `oauth2` crate's typed token requests,
//! handing it an [`AsyncHttpClient`](oauth2::AsyncHttpClient) that stamps correlation headers
//! and captures [`ResponseMetadata`](response::ResponseMetadata) for error mapping.

pub mod response;

// std
#[cfg(feature = "reqwest")] use std::{borrow::Cow, ops::Deref};
// crates.io
#[cfg(feature = "reqwest")]
use oauth2::{
	AsyncHttpClient, AuthType, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, HttpClientError, HttpRequest, HttpResponse, RedirectUrl, RefreshToken,
	StandardRevocableToken, TokenUrl,
	basic::{BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse},
};
#[cfg(feature = "reqwest")] use parking_lot::Mutex;
#[cfg(feature = "reqwest")]
use reqwest::header::{HeaderValue, RETRY_AFTER};
// self
use crate::{
	_prelude::*,
	auth::AuthenticationResult,
	error::TransportError,
	request::{CallState, RequestParameters},
};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError,
	http::response::{ResponseMetadata, TokenEndpointResponse},
	request::{grant, param},
};

/// Header carrying the invocation's correlation identifier.
pub const CLIENT_REQUEST_ID_HEADER: &str = "client-request-id";
/// Header asking the token endpoint to echo the correlation identifier.
pub const RETURN_CLIENT_REQUEST_ID_HEADER: &str = "return-client-request-id";

#[cfg(feature = "reqwest")]
type TokenClient = oauth2::Client<
	BasicErrorResponse,
	TokenEndpointResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Boxed future returned by [`TokenTransport::exchange`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AuthenticationResult, TransportError>> + 'a + Send>>;

/// Performs token endpoint exchanges.
///
/// Implementations must be `Send + Sync` so one transport can serve concurrent acquisitions.
pub trait TokenTransport
where
	Self: Send + Sync,
{
	/// Submits `parameters` to `token_endpoint` and normalizes the response.
	fn exchange<'a>(
		&'a self,
		token_endpoint: &'a Url,
		parameters: RequestParameters,
		call_state: &'a CallState,
	) -> TransportFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`] that submits token requests through `oauth2`.
///
/// Supports the `client_credentials`, `authorization_code`, and `refresh_token` grants; any
/// other grant type fails with [`TransportError::RequestBuild`]. Client secrets travel in the
/// request body. Token endpoints answer directly instead of redirecting, so clients built by
/// [`ReqwestTransport::new`] never follow redirects; configure any client passed to
/// [`ReqwestTransport::with_client`] the same way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport with redirects disabled.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn request_token(
		&self,
		token_endpoint: &Url,
		mut parameters: RequestParameters,
		call_state: &CallState,
	) -> Result<AuthenticationResult, TransportError> {
		let client_id = take(&mut parameters, param::CLIENT_ID)?;
		let mut client: TokenClient = oauth2::Client::new(ClientId::new(client_id))
			.set_token_uri(TokenUrl::from_url(token_endpoint.clone()))
			.set_auth_type(AuthType::RequestBody);

		if let Some(secret) = parameters.remove(param::CLIENT_SECRET) {
			client = client.set_client_secret(ClientSecret::new(secret));
		}

		let grant_type = parameters.remove(param::GRANT_TYPE).unwrap_or_default();
		let http = CorrelatedHttpClient::new(self.0.clone(), call_state);
		let outcome = match grant_type.as_str() {
			grant::CLIENT_CREDENTIALS => {
				let mut request = client.exchange_client_credentials();

				for (key, value) in parameters.iter() {
					request = request.add_extra_param(key, value);
				}

				request.request_async(&http).await
			},
			grant::AUTHORIZATION_CODE => {
				let code = AuthorizationCode::new(take(&mut parameters, param::CODE)?);
				let redirect_uri = parameters
					.remove(param::REDIRECT_URI)
					.map(RedirectUrl::new)
					.transpose()
					.map_err(|e| TransportError::RequestBuild { message: e.to_string() })?;
				let mut request = client.exchange_code(code);

				if let Some(redirect_uri) = redirect_uri {
					request = request.set_redirect_uri(Cow::Owned(redirect_uri));
				}
				for (key, value) in parameters.iter() {
					request = request.add_extra_param(key, value);
				}

				request.request_async(&http).await
			},
			grant::REFRESH_TOKEN => {
				let refresh_token = RefreshToken::new(take(&mut parameters, param::REFRESH_TOKEN)?);
				let mut request = client.exchange_refresh_token(&refresh_token);

				for (key, value) in parameters.iter() {
					request = request.add_extra_param(key, value);
				}

				request.request_async(&http).await
			},
			other =>
				return Err(TransportError::RequestBuild {
					message: format!("grant type `{other}` is not supported"),
				}),
		};
		let meta = http.take_metadata();
		let token = outcome.map_err(|e| response::map_request_error(e, &meta))?;

		response::into_authentication_result(&token, meta.status, OffsetDateTime::now_utc())
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl TokenTransport for ReqwestTransport {
	fn exchange<'a>(
		&'a self,
		token_endpoint: &'a Url,
		parameters: RequestParameters,
		call_state: &'a CallState,
	) -> TransportFuture<'a> {
		Box::pin(self.request_token(token_endpoint, parameters, call_state))
	}
}

/// Per-exchange [`AsyncHttpClient`] that tags requests with the correlation id and records the
/// response status and retry hint.
#[cfg(feature = "reqwest")]
struct CorrelatedHttpClient {
	client: ReqwestClient,
	correlation_id: Option<HeaderValue>,
	metadata: Mutex<ResponseMetadata>,
}
#[cfg(feature = "reqwest")]
impl CorrelatedHttpClient {
	fn new(client: ReqwestClient, call_state: &CallState) -> Self {
		Self {
			client,
			correlation_id: HeaderValue::from_str(&call_state.correlation_id).ok(),
			metadata: Default::default(),
		}
	}

	fn take_metadata(&self) -> ResponseMetadata {
		std::mem::take(&mut *self.metadata.lock())
	}
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for CorrelatedHttpClient {
	type Error = HttpClientError<ReqwestError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			if let Some(correlation_id) = &self.correlation_id {
				let headers = request.headers_mut();

				headers.insert(CLIENT_REQUEST_ID_HEADER, correlation_id.clone());
				headers.insert(RETURN_CLIENT_REQUEST_ID_HEADER, HeaderValue::from_static("true"));
			}

			let response = self.client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let retry_after = headers
				.get(RETRY_AFTER)
				.and_then(|value| value.to_str().ok())
				.and_then(|raw| response::parse_retry_after(raw, OffsetDateTime::now_utc()));

			*self.metadata.lock() = ResponseMetadata { status: Some(status.as_u16()), retry_after };

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

#[cfg(feature = "reqwest")]
fn take(parameters: &mut RequestParameters, key: &str) -> Result<String, TransportError> {
	parameters
		.remove(key)
		.ok_or_else(|| TransportError::RequestBuild { message: format!("`{key}` is missing") })
}

//! Token endpoint response normalization.
//!
//! `oauth2` parses the wire format; this module lifts its [`TokenEndpointResponse`] into an
//! [`AuthenticationResult`] (tenant and user identity come from the ID token claims) and folds
//! its [`RequestTokenError`]s into [`TransportError`]s so callers can inspect the server's
//! `error` code.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use oauth2::{
	ExtraTokenFields, HttpClientError, RequestTokenError, StandardTokenResponse,
	TokenResponse,
	basic::{BasicErrorResponse, BasicTokenType},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	auth::{AuthenticationResult, TenantId, TokenSecret, UserInfo},
	error::TransportError,
};

/// Token endpoint payload with the identity extensions lifted by [`IdentityTokenFields`].
pub type TokenEndpointResponse = StandardTokenResponse<IdentityTokenFields, BasicTokenType>;

/// Status and retry hint captured from the HTTP response that carried a token payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Token response fields outside RFC 6749 that identity providers return.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IdentityTokenFields {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	id_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_on: Option<Seconds>,
}
impl IdentityTokenFields {
	/// Raw ID token, when the server issued a non-empty one.
	pub fn id_token(&self) -> Option<&str> {
		self.id_token.as_deref().filter(|token| !token.is_empty())
	}

	/// Absolute expiry in Unix seconds, when present.
	pub fn expires_on(&self) -> Option<i64> {
		self.expires_on.as_ref().and_then(Seconds::value)
	}
}
impl ExtraTokenFields for IdentityTokenFields {}

/// Some endpoints send numeric fields as JSON strings.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum Seconds {
	Number(i64),
	Text(String),
}
impl Seconds {
	fn value(&self) -> Option<i64> {
		match self {
			Self::Number(n) => Some(*n),
			Self::Text(s) => s.trim().parse().ok(),
		}
	}
}

/// Claims lifted from an ID token payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct IdTokenClaims {
	/// Tenant identifier (`tid`).
	#[serde(default)]
	pub tid: Option<String>,
	/// Object identifier (`oid`).
	#[serde(default)]
	pub oid: Option<String>,
	/// Subject (`sub`).
	#[serde(default)]
	pub sub: Option<String>,
	/// User principal name (`upn`).
	#[serde(default)]
	pub upn: Option<String>,
	/// Email address (`email`).
	#[serde(default)]
	pub email: Option<String>,
	/// Legacy display name (`unique_name`).
	#[serde(default)]
	pub unique_name: Option<String>,
	/// Given name (`given_name`).
	#[serde(default)]
	pub given_name: Option<String>,
	/// Family name (`family_name`).
	#[serde(default)]
	pub family_name: Option<String>,
	/// Identity provider (`idp`).
	#[serde(default)]
	pub idp: Option<String>,
}
impl IdTokenClaims {
	/// Decodes the unverified payload segment of a compact JWT.
	///
	/// Signature validation is the resource server's concern; only identity hints are read.
	pub fn decode(id_token: &str) -> Option<Self> {
		let payload = id_token.split('.').nth(1)?;
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;

		serde_json::from_slice(&bytes).ok()
	}

	/// Returns the issuing tenant, if it is a valid identifier.
	pub fn tenant_id(&self) -> Option<TenantId> {
		self.tid.as_deref().and_then(|tid| TenantId::new(tid).ok())
	}

	/// Builds the user identity described by the claims.
	pub fn user_info(&self) -> UserInfo {
		fn non_blank(value: &Option<String>) -> Option<String> {
			value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
		}

		UserInfo {
			unique_id: non_blank(&self.oid).or_else(|| non_blank(&self.sub)),
			displayable_id: non_blank(&self.upn)
				.or_else(|| non_blank(&self.email))
				.or_else(|| non_blank(&self.unique_name)),
			given_name: non_blank(&self.given_name),
			family_name: non_blank(&self.family_name),
			identity_provider: non_blank(&self.idp),
		}
	}
}

/// Parses a `Retry-After` header value given as delta seconds or an HTTP date.
pub fn parse_retry_after(raw: &str, now: OffsetDateTime) -> Option<Duration> {
	let raw = raw.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).ok()?));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - now;

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

/// Converts a parsed token endpoint payload into an [`AuthenticationResult`].
///
/// `now` anchors relative `expires_in` values; `status` is only used for error reporting.
pub fn into_authentication_result(
	response: &TokenEndpointResponse,
	status: Option<u16>,
	now: OffsetDateTime,
) -> Result<AuthenticationResult, TransportError> {
	let unexpected =
		|message: &str| TransportError::UnexpectedResponse { message: message.into(), status };
	let access_token = response.access_token().secret();

	if access_token.is_empty() {
		return Err(unexpected("token response is missing access_token"));
	}

	let extra = response.extra_fields();
	let expires_on = match (response.expires_in(), extra.expires_on()) {
		(Some(relative), _) => Duration::try_from(relative)
			.ok()
			.and_then(|relative| now.checked_add(relative))
			.ok_or_else(|| unexpected("token response carries an out-of-range expires_in"))?,
		(None, Some(epoch)) => OffsetDateTime::from_unix_timestamp(epoch)
			.map_err(|_| unexpected("token response carries an out-of-range expires_on"))?,
		(None, None) => return Err(unexpected("token response is missing expires_in")),
	};
	let token_type = match response.token_type() {
		BasicTokenType::Bearer => "Bearer".to_owned(),
		BasicTokenType::Extension(value) => value.clone(),
		_ => "MAC".to_owned(),
	};
	let id_token = extra.id_token().map(str::to_owned);
	let claims = id_token.as_deref().and_then(IdTokenClaims::decode);

	Ok(AuthenticationResult {
		access_token_type: Some(token_type),
		access_token: Some(TokenSecret::new(access_token.as_str())),
		refresh_token: response
			.refresh_token()
			.map(|token| token.secret())
			.filter(|token| !token.is_empty())
			.map(|token| TokenSecret::new(token.as_str())),
		tenant_id: claims.as_ref().and_then(IdTokenClaims::tenant_id),
		user_info: claims.as_ref().map(IdTokenClaims::user_info),
		id_token,
		expires_on,
	})
}

/// Folds an `oauth2` request failure into a [`TransportError`].
///
/// OAuth error payloads keep their `error` code verbatim. Undecodable bodies are parse errors on
/// success statuses and unexpected responses otherwise (gateway pages, proxies).
pub fn map_request_error<RE>(
	err: RequestTokenError<HttpClientError<RE>, BasicErrorResponse>,
	meta: &ResponseMetadata,
) -> TransportError
where
	RE: 'static + Send + Sync + StdError,
	TransportError: From<RE>,
{
	let status = meta.status;

	match err {
		RequestTokenError::ServerResponse(response) => TransportError::Server {
			code: response.error().as_ref().to_owned(),
			description: response.error_description().cloned(),
			status,
			retry_after: meta.retry_after,
		},
		RequestTokenError::Request(error) => map_client_error(error),
		RequestTokenError::Parse(source, _body)
			if status.is_none_or(|code| (200..300).contains(&code)) =>
			TransportError::ResponseParse { source, status },
		RequestTokenError::Parse(..) => TransportError::UnexpectedResponse {
			message: format!(
				"HTTP {} without an OAuth error payload",
				status.map_or_else(|| "response".to_owned(), |code| code.to_string())
			),
			status,
		},
		RequestTokenError::Other(message) => TransportError::UnexpectedResponse { message, status },
	}
}

fn map_client_error<RE>(err: HttpClientError<RE>) -> TransportError
where
	RE: 'static + Send + Sync + StdError,
	TransportError: From<RE>,
{
	match err {
		HttpClientError::Reqwest(inner) => TransportError::from(*inner),
		HttpClientError::Http(inner) => TransportError::RequestBuild { message: inner.to_string() },
		HttpClientError::Io(inner) => TransportError::Io(inner),
		HttpClientError::Other(message) => TransportError::Network { source: message.into() },
		_ => TransportError::Network {
			source: "HTTP client error occurred while calling the token endpoint".into(),
		},
	}
}

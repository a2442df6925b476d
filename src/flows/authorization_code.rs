//! Authorization Code grant: redeems a code obtained from an interactive sign-in.
//!
//! The code is single-use, so the cache is never read; the redeemed result is written back
//! so later silent acquisitions can refresh it.

// self
use crate::{
	_prelude::*,
	auth::{AuthenticationResult, ResourceId, TokenSecret},
	cache::SubjectType,
	flows::{Acquirer, FlowFuture, GrantFlow},
	obs::FlowKind,
	request::{CallState, RequestParameters, grant, param},
};

/// `grant_type=authorization_code` specialization.
#[derive(Clone, Debug)]
pub struct AuthorizationCodeFlow {
	code: TokenSecret,
	redirect_uri: Url,
}
impl AuthorizationCodeFlow {
	/// Creates a flow redeeming `code` that was issued for `redirect_uri`.
	pub fn new(code: impl Into<String>, redirect_uri: Url) -> Self {
		Self { code: TokenSecret::new(code), redirect_uri }
	}
}
impl GrantFlow for AuthorizationCodeFlow {
	fn kind(&self) -> FlowKind {
		FlowKind::AuthorizationCode
	}

	fn supports_adfs(&self) -> bool {
		true
	}

	fn add_grant_fields(&self, params: &mut RequestParameters) -> Result<()> {
		params
			.insert(param::GRANT_TYPE, grant::AUTHORIZATION_CODE)
			.insert(param::CODE, self.code.expose())
			.insert(param::REDIRECT_URI, self.redirect_uri.as_str());

		Ok(())
	}

	fn post_token_request<'a>(
		&'a self,
		result: &'a AuthenticationResult,
		call_state: &'a CallState,
	) -> FlowFuture<'a, ()> {
		Box::pin(async move {
			#[cfg(feature = "tracing")]
			{
				let displayable_id =
					result.user_info.as_ref().and_then(|user| user.displayable_id.as_deref());

				tracing::debug!(
					correlation_id = %call_state.correlation_id,
					displayable_id = displayable_id.unwrap_or("<unknown>"),
					"Redeemed authorization code."
				);
			}
			#[cfg(not(feature = "tracing"))]
			{
				let _ = (result, call_state);
			}

			Ok(())
		})
	}
}

impl Acquirer {
	/// Redeems an authorization code and stores the result for later silent use.
	pub async fn acquire_token_by_authorization_code(
		&self,
		code: impl Into<String>,
		redirect_uri: Url,
		resource: Option<ResourceId>,
	) -> Result<AuthenticationResult> {
		let flow = AuthorizationCodeFlow::new(code, redirect_uri);
		let subject_type = if self.credential.is_confidential() {
			SubjectType::UserPlusClient
		} else {
			SubjectType::User
		};

		self.handler(&flow)
			.resource(resource)
			.subject_type(subject_type)
			.load_from_cache(false)
			.build()
			.acquire_token()
			.await
	}
}

//! Refresh Token grant: redeems a refresh token the caller kept outside the cache.
//!
//! The cache is neither read nor written, so the caller stays responsible for the token it
//! supplied and for the one returned.

// self
use crate::{
	_prelude::*,
	auth::{AuthenticationResult, ResourceId, TokenSecret},
	cache::SubjectType,
	flows::{Acquirer, GrantFlow},
	obs::FlowKind,
	request::{RequestParameters, grant, param},
};

/// `grant_type=refresh_token` specialization for caller-supplied refresh tokens.
#[derive(Clone, Debug)]
pub struct RefreshTokenFlow {
	refresh_token: TokenSecret,
}
impl RefreshTokenFlow {
	/// Creates a flow redeeming `refresh_token`.
	pub fn new(refresh_token: impl Into<String>) -> Self {
		Self { refresh_token: TokenSecret::new(refresh_token) }
	}
}
impl GrantFlow for RefreshTokenFlow {
	fn kind(&self) -> FlowKind {
		FlowKind::RefreshToken
	}

	fn supports_adfs(&self) -> bool {
		true
	}

	fn add_grant_fields(&self, params: &mut RequestParameters) -> Result<()> {
		params
			.insert(param::GRANT_TYPE, grant::REFRESH_TOKEN)
			.insert(param::REFRESH_TOKEN, self.refresh_token.expose());

		Ok(())
	}
}

impl Acquirer {
	/// Redeems a caller-supplied refresh token without touching the cache.
	pub async fn acquire_token_by_refresh_token(
		&self,
		refresh_token: impl Into<String>,
		resource: Option<ResourceId>,
	) -> Result<AuthenticationResult> {
		let flow = RefreshTokenFlow::new(refresh_token);
		let subject_type = if self.credential.is_confidential() {
			SubjectType::UserPlusClient
		} else {
			SubjectType::User
		};

		self.handler(&flow)
			.resource(resource)
			.subject_type(subject_type)
			.load_from_cache(false)
			.store_to_cache(false)
			.build()
			.acquire_token()
			.await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn adds_refresh_token_grant() {
		let flow = RefreshTokenFlow::new("rt-1");
		let mut params = RequestParameters::new();

		flow.add_grant_fields(&mut params).expect("Grant fields never fail.");

		assert_eq!(params.get(param::GRANT_TYPE), Some("refresh_token"));
		assert_eq!(params.get(param::REFRESH_TOKEN), Some("rt-1"));
		assert!(flow.supports_adfs());
	}
}

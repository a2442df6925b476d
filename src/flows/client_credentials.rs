//! Client Credentials grant: the application acquires a token for itself.
//!
//! Results are cached under [`SubjectType::Client`], so a cached access token is served
//! without a network call until the cache judges it stale.

// self
use crate::{
	_prelude::*,
	auth::{AuthenticationResult, ResourceId},
	cache::SubjectType,
	flows::{Acquirer, GrantFlow},
	obs::FlowKind,
	request::{RequestParameters, grant, param},
};

/// `grant_type=client_credentials` specialization.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientCredentialsFlow;
impl GrantFlow for ClientCredentialsFlow {
	fn kind(&self) -> FlowKind {
		FlowKind::ClientCredentials
	}

	fn add_grant_fields(&self, params: &mut RequestParameters) -> Result<()> {
		params.insert(param::GRANT_TYPE, grant::CLIENT_CREDENTIALS);

		Ok(())
	}
}

impl Acquirer {
	/// Acquires an app-only token for `resource`, consulting the cache first.
	pub async fn acquire_token_for_client(
		&self,
		resource: ResourceId,
	) -> Result<AuthenticationResult> {
		self.handler(&ClientCredentialsFlow)
			.resource(resource)
			.subject_type(SubjectType::Client)
			.build()
			.acquire_token()
			.await
	}
}

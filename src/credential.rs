//! Client credentials that prove the calling application's identity to the token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
	error::{BoxError, ConfigError},
	request::{RequestParameters, param},
};

/// `client_assertion_type` value for JWT bearer assertions.
pub const JWT_BEARER_ASSERTION_TYPE: &str =
	"urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Signs client assertions on demand (for example a certificate-backed JWT).
pub trait AssertionSigner
where
	Self: Send + Sync,
{
	/// Produces a signed assertion for `client_id` targeting `audience`.
	fn sign(&self, client_id: &ClientId, audience: &str) -> Result<String, BoxError>;
}

/// Proof material carried by a [`Credential`].
#[derive(Clone)]
pub enum CredentialKind {
	/// Public client; only the client identifier is sent.
	Public,
	/// Shared client secret.
	Secret(TokenSecret),
	/// Pre-built client assertion.
	Assertion {
		/// Assertion value.
		assertion: TokenSecret,
		/// `client_assertion_type` value.
		assertion_type: String,
	},
	/// Assertion produced per request for the authority's audience.
	Signed(Arc<dyn AssertionSigner>),
}
impl Debug for CredentialKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Public => f.write_str("Public"),
			Self::Secret(_) => f.write_str("Secret(<redacted>)"),
			Self::Assertion { assertion_type, .. } => f
				.debug_struct("Assertion")
				.field("assertion", &"<redacted>")
				.field("assertion_type", assertion_type)
				.finish(),
			Self::Signed(_) => f.write_str("Signed(..)"),
		}
	}
}

/// Calling application's identity.
#[derive(Clone, Debug)]
pub struct Credential {
	/// OAuth 2.0 client identifier.
	pub client_id: ClientId,
	/// Proof material.
	pub kind: CredentialKind,
}
impl Credential {
	/// Public client credential.
	pub fn public(client_id: ClientId) -> Self {
		Self { client_id, kind: CredentialKind::Public }
	}

	/// Confidential client authenticating with a shared secret.
	pub fn with_secret(client_id: ClientId, secret: impl Into<String>) -> Self {
		Self { client_id, kind: CredentialKind::Secret(TokenSecret::new(secret)) }
	}

	/// Confidential client authenticating with a pre-built JWT bearer assertion.
	pub fn with_assertion(client_id: ClientId, assertion: impl Into<String>) -> Self {
		Self {
			client_id,
			kind: CredentialKind::Assertion {
				assertion: TokenSecret::new(assertion),
				assertion_type: JWT_BEARER_ASSERTION_TYPE.into(),
			},
		}
	}

	/// Confidential client whose assertion is signed per request.
	pub fn with_signer(client_id: ClientId, signer: Arc<dyn AssertionSigner>) -> Self {
		Self { client_id, kind: CredentialKind::Signed(signer) }
	}

	/// Returns `true` for confidential clients.
	pub fn is_confidential(&self) -> bool {
		!matches!(self.kind, CredentialKind::Public)
	}

	/// Writes the client authentication fields into `params`.
	pub fn apply(&self, params: &mut RequestParameters, audience: &str) -> Result<()> {
		params.insert(param::CLIENT_ID, self.client_id.to_string());

		match &self.kind {
			CredentialKind::Public => {},
			CredentialKind::Secret(secret) => {
				params.insert(param::CLIENT_SECRET, secret.expose());
			},
			CredentialKind::Assertion { assertion, assertion_type } => {
				params
					.insert(param::CLIENT_ASSERTION_TYPE, assertion_type.as_str())
					.insert(param::CLIENT_ASSERTION, assertion.expose());
			},
			CredentialKind::Signed(signer) => {
				let assertion = signer
					.sign(&self.client_id, audience)
					.map_err(ConfigError::assertion_signing)?;

				params
					.insert(param::CLIENT_ASSERTION_TYPE, JWT_BEARER_ASSERTION_TYPE)
					.insert(param::CLIENT_ASSERTION, assertion);
			},
		}

		Ok(())
	}
}

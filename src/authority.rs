//! Authority metadata contract consumed by the acquisition orchestrator.
//!
//! [`Authenticator`] is the single seam through which flows learn the token endpoint, the
//! authority classification, and the assertion audience. Metadata discovery itself lives
//! behind the trait; [`StaticAuthenticator`] serves pre-resolved metadata from an
//! [`AuthorityDescriptor`] and promotes tenantless authorities once a server reports a tenant.

pub mod descriptor;

pub use descriptor::*;

// self
use crate::{
	_prelude::*,
	auth::{CorrelationId, TenantId},
	error::AuthorityError,
	request::CallState,
};

/// Boxed future returned by [`Authenticator`] operations.
pub type AuthorityFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, AuthorityError>> + 'a + Send>>;

/// Authority classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityType {
	/// Multi-tenant or tenant-bound cloud directory.
	Standard,
	/// Active Directory Federation Services.
	Adfs,
}
impl AuthorityType {
	/// Returns a stable label suitable for span fields and messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthorityType::Standard => "standard",
			AuthorityType::Adfs => "adfs",
		}
	}
}
impl Display for AuthorityType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Resolves and caches authority metadata.
///
/// Implementations outlive individual acquisitions and may be shared by concurrent ones, so
/// every method takes `&self` and interior state must carry its own synchronization.
pub trait Authenticator
where
	Self: Send + Sync,
{
	/// Ensures authority metadata is current; may perform network I/O.
	fn refresh_metadata_if_needed<'a>(&'a self, call_state: &'a CallState)
	-> AuthorityFuture<'a, ()>;

	/// Returns the authority classification.
	fn authority_type(&self) -> AuthorityType;

	/// Returns the stable authority URL used in cache keys.
	fn authority(&self) -> Url;

	/// Returns the token endpoint used for exchanges.
	fn token_endpoint(&self) -> Url;

	/// Returns the audience signed client assertions must target.
	fn self_signed_jwt_audience(&self) -> String;

	/// Returns a correlation identifier established for this authenticator, if any.
	fn correlation_id(&self) -> Option<CorrelationId> {
		None
	}

	/// Applies the tenant reported by a token response.
	fn update_tenant(&self, tenant: &TenantId, call_state: &CallState);
}

/// [`Authenticator`] backed by pre-resolved metadata.
#[derive(Debug)]
pub struct StaticAuthenticator(RwLock<AuthorityDescriptor>);
impl StaticAuthenticator {
	/// Wraps a validated descriptor.
	pub fn new(descriptor: AuthorityDescriptor) -> Self {
		Self(RwLock::new(descriptor))
	}

	/// Returns a snapshot of the current metadata.
	pub fn descriptor(&self) -> AuthorityDescriptor {
		self.0.read().clone()
	}

	/// Returns the tenant currently bound to the authority.
	pub fn tenant(&self) -> Option<TenantId> {
		self.0.read().tenant.clone()
	}
}
impl From<AuthorityDescriptor> for StaticAuthenticator {
	fn from(descriptor: AuthorityDescriptor) -> Self {
		Self::new(descriptor)
	}
}
impl Authenticator for StaticAuthenticator {
	fn refresh_metadata_if_needed<'a>(
		&'a self,
		_call_state: &'a CallState,
	) -> AuthorityFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}

	fn authority_type(&self) -> AuthorityType {
		self.0.read().authority_type
	}

	fn authority(&self) -> Url {
		self.0.read().authority.clone()
	}

	fn token_endpoint(&self) -> Url {
		self.0.read().token_endpoint.clone()
	}

	fn self_signed_jwt_audience(&self) -> String {
		self.0.read().self_signed_jwt_audience.clone()
	}

	fn correlation_id(&self) -> Option<CorrelationId> {
		self.0.read().correlation_id.clone()
	}

	fn update_tenant(&self, tenant: &TenantId, call_state: &CallState) {
		let promoted = self.0.write().promote_tenant(tenant);

		#[cfg(feature = "tracing")]
		{
			if promoted {
				tracing::debug!(
					correlation_id = %call_state.correlation_id,
					%tenant,
					"Bound tenantless authority to the tenant reported by the token endpoint."
				);
			}
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (promoted, call_state);
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::request::ExecutionMode;

	#[tokio::test]
	async fn static_authenticator_serves_and_promotes_metadata() {
		let descriptor = AuthorityDescriptor::builder(
			Url::parse("https://login.example.com/common").expect("Authority URL should parse."),
		)
		.correlation_id(CorrelationId::new("corr-static").expect("Correlation id should be valid."))
		.build()
		.expect("Tenantless authority should build.");
		let authenticator = StaticAuthenticator::new(descriptor);
		let call_state = CallState::new(authenticator.correlation_id(), ExecutionMode::Async);

		authenticator
			.refresh_metadata_if_needed(&call_state)
			.await
			.expect("Static metadata never fails to refresh.");

		assert_eq!(call_state.correlation_id.to_string(), "corr-static");
		assert_eq!(authenticator.authority_type(), AuthorityType::Standard);
		assert_eq!(authenticator.tenant(), None);

		authenticator
			.update_tenant(&TenantId::new("contoso").expect("Tenant should be valid."), &call_state);

		assert_eq!(authenticator.authority().as_str(), "https://login.example.com/contoso/");
		assert_eq!(
			authenticator.token_endpoint().as_str(),
			"https://login.example.com/contoso/oauth2/token"
		);
		assert_eq!(authenticator.tenant().as_deref(), Some("contoso"));
	}
}

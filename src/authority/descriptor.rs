//! Validated authority metadata and its builder.

// self
use crate::{
	_prelude::*,
	auth::{CorrelationId, IdentifierError, TenantId},
	authority::AuthorityType,
};

const TENANTLESS_SEGMENT: &str = "common";
const ADFS_SEGMENT: &str = "adfs";
const TOKEN_PATH: &str = "oauth2/token";

/// Errors raised while constructing or validating authority descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthorityDescriptorError {
	/// Authorities must use HTTPS.
	#[error("The authority must use HTTPS: {url}.")]
	InsecureAuthority {
		/// Authority URL that failed validation.
		url: String,
	},
	/// Authorities need a host.
	#[error("The authority has no host: {url}.")]
	MissingHost {
		/// Authority URL that failed validation.
		url: String,
	},
	/// Authorities need a tenant (or `adfs`) path segment.
	#[error("The authority has no tenant path segment: {url}.")]
	MissingTenant {
		/// Authority URL that failed validation.
		url: String,
	},
	/// The tenant path segment is not a valid tenant identifier.
	#[error("The authority tenant segment is invalid.")]
	InvalidTenant(#[from] IdentifierError),
	/// The default token endpoint could not be derived from the authority.
	#[error("The token endpoint could not be derived from the authority.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Immutable authority metadata consumed by [`StaticAuthenticator`](crate::authority::StaticAuthenticator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityDescriptor {
	/// Authority URL, always ending with `/`.
	pub authority: Url,
	/// Token endpoint used for every exchange.
	pub token_endpoint: Url,
	/// Authority classification.
	pub authority_type: AuthorityType,
	/// Audience that signed client assertions must target.
	pub self_signed_jwt_audience: String,
	/// Tenant bound to the authority; `None` for tenantless and ADFS authorities.
	pub tenant: Option<TenantId>,
	/// Correlation identifier established by the caller, if any.
	pub correlation_id: Option<CorrelationId>,
}
impl AuthorityDescriptor {
	/// Creates a new builder for the provided authority URL.
	pub fn builder(authority: Url) -> AuthorityDescriptorBuilder {
		AuthorityDescriptorBuilder::new(authority)
	}

	/// Returns `true` for standard authorities addressed through the `common` tenant.
	pub fn is_tenantless(&self) -> bool {
		self.authority_type == AuthorityType::Standard && self.tenant.is_none()
	}

	/// Rebinds a tenantless authority to `tenant`; returns `false` if nothing changed.
	pub fn promote_tenant(&mut self, tenant: &TenantId) -> bool {
		if !self.is_tenantless() {
			return false;
		}

		replace_tenant_segment(&mut self.authority, tenant);
		replace_tenant_segment(&mut self.token_endpoint, tenant);

		if let Ok(mut audience) = Url::parse(&self.self_signed_jwt_audience) {
			replace_tenant_segment(&mut audience, tenant);

			self.self_signed_jwt_audience = audience.to_string();
		}

		self.tenant = Some(tenant.clone());

		true
	}
}

/// Builder for [`AuthorityDescriptor`] values.
#[derive(Debug)]
pub struct AuthorityDescriptorBuilder {
	/// Authority URL being described.
	pub authority: Url,
	/// Optional token endpoint override.
	pub token_endpoint: Option<Url>,
	/// Optional authority type override.
	pub authority_type: Option<AuthorityType>,
	/// Optional assertion audience override.
	pub self_signed_jwt_audience: Option<String>,
	/// Optional tenant override.
	pub tenant: Option<TenantId>,
	/// Optional correlation identifier.
	pub correlation_id: Option<CorrelationId>,
}
impl AuthorityDescriptorBuilder {
	/// Creates a new builder seeded with the authority URL.
	pub fn new(authority: Url) -> Self {
		Self {
			authority,
			token_endpoint: None,
			authority_type: None,
			self_signed_jwt_audience: None,
			tenant: None,
			correlation_id: None,
		}
	}

	/// Overrides the token endpoint (defaults to `<authority>/oauth2/token`).
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the authority type (detected from an `adfs` path segment by default).
	pub fn authority_type(mut self, authority_type: AuthorityType) -> Self {
		self.authority_type = Some(authority_type);

		self
	}

	/// Overrides the assertion audience (defaults to the token endpoint).
	pub fn self_signed_jwt_audience(mut self, audience: impl Into<String>) -> Self {
		self.self_signed_jwt_audience = Some(audience.into());

		self
	}

	/// Overrides the tenant (derived from the first path segment by default).
	pub fn tenant(mut self, tenant: TenantId) -> Self {
		self.tenant = Some(tenant);

		self
	}

	/// Sets the correlation identifier reused by every acquisition.
	pub fn correlation_id(mut self, correlation_id: CorrelationId) -> Self {
		self.correlation_id = Some(correlation_id);

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<AuthorityDescriptor, AuthorityDescriptorError> {
		let mut authority = self.authority;

		if authority.scheme() != "https" {
			return Err(AuthorityDescriptorError::InsecureAuthority { url: authority.to_string() });
		}
		if authority.host_str().is_none_or(str::is_empty) {
			return Err(AuthorityDescriptorError::MissingHost { url: authority.to_string() });
		}

		let first_segment = first_segment(&authority)
			.ok_or_else(|| AuthorityDescriptorError::MissingTenant { url: authority.to_string() })?;

		if !authority.path().ends_with('/') {
			let path = format!("{}/", authority.path());

			authority.set_path(&path);
		}

		let authority_type = self.authority_type.unwrap_or_else(|| {
			if first_segment.eq_ignore_ascii_case(ADFS_SEGMENT) {
				AuthorityType::Adfs
			} else {
				AuthorityType::Standard
			}
		});
		let tenant = match self.tenant {
			Some(tenant) => Some(tenant),
			None
				if authority_type == AuthorityType::Standard
					&& !first_segment.eq_ignore_ascii_case(TENANTLESS_SEGMENT) =>
				Some(TenantId::new(&first_segment)?),
			None => None,
		};
		let token_endpoint = match self.token_endpoint {
			Some(url) => url,
			None => authority
				.join(TOKEN_PATH)
				.map_err(|source| AuthorityDescriptorError::InvalidTokenEndpoint { source })?,
		};
		let self_signed_jwt_audience =
			self.self_signed_jwt_audience.unwrap_or_else(|| token_endpoint.to_string());

		Ok(AuthorityDescriptor {
			authority,
			token_endpoint,
			authority_type,
			self_signed_jwt_audience,
			tenant,
			correlation_id: self.correlation_id,
		})
	}
}

fn first_segment(url: &Url) -> Option<String> {
	url.path_segments()?.next().filter(|segment| !segment.is_empty()).map(str::to_owned)
}

fn replace_tenant_segment(url: &mut Url, tenant: &TenantId) {
	let Some(segments) = url.path_segments() else {
		return;
	};
	let mut segments = segments.map(str::to_owned).collect::<Vec<_>>();

	match segments.first_mut() {
		Some(first) if first.eq_ignore_ascii_case(TENANTLESS_SEGMENT) => {
			*first = tenant.to_string();
		},
		_ => return,
	}

	let path = format!("/{}", segments.join("/"));

	url.set_path(&path);
}

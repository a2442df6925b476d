//! Acquisition results returned to callers and stored in token caches.

// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenSecret},
};

/// Errors produced by [`AuthenticationResultBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AuthenticationResultBuilderError {
	/// Issued when neither an access token nor a refresh token was provided.
	#[error("An access token or a refresh token is required.")]
	MissingToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_on or expires_in.")]
	MissingExpiry,
	/// Issued when a relative expiry lands outside the representable time range.
	#[error("Relative expiry is out of range.")]
	ExpiryOutOfRange,
}

/// Identity of the user a token was issued for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
	/// Immutable, directory-assigned user identifier (`oid` or `sub`).
	pub unique_id: Option<String>,
	/// Human readable identifier such as a UPN or email address.
	pub displayable_id: Option<String>,
	/// Given name claim.
	pub given_name: Option<String>,
	/// Family name claim.
	pub family_name: Option<String>,
	/// Identity provider that authenticated the user.
	pub identity_provider: Option<String>,
}

/// Outcome of a token exchange or cache hit.
///
/// A result without an access token but with a refresh token is a valid cache entry that means
/// "refresh required before use".
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResult {
	/// Token type reported by the server, usually `Bearer`.
	pub access_token_type: Option<String>,
	/// Access token secret; absent for refresh-only cache hints.
	pub access_token: Option<TokenSecret>,
	/// Refresh token secret, if the server issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Raw ID token, if the server issued one.
	pub id_token: Option<String>,
	/// Tenant that issued the token.
	pub tenant_id: Option<TenantId>,
	/// User the token was issued for.
	pub user_info: Option<UserInfo>,
	/// Instant the access token expires.
	pub expires_on: OffsetDateTime,
}
impl AuthenticationResult {
	/// Returns a builder for assembling results.
	pub fn builder() -> AuthenticationResultBuilder {
		AuthenticationResultBuilder::default()
	}

	/// Returns `true` once `instant` reaches the expiry.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_on
	}

	/// Returns `true` if the access token expires within `margin` of `instant`.
	///
	/// A margin reaching past the representable time range covers every expiry.
	pub fn expires_within(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		match instant.checked_add(margin) {
			Some(deadline) => self.is_expired_at(deadline),
			None => margin.is_positive(),
		}
	}

	/// Returns `true` when only a refresh token is usable.
	pub fn requires_refresh(&self) -> bool {
		self.access_token.is_none() && self.refresh_token.is_some()
	}

	/// Drops the access token, turning the result into a refresh-only hint.
	pub fn without_access_token(mut self) -> Self {
		self.access_token = None;

		self
	}

	/// Replaces tenant, ID token, and user info in one step.
	pub fn update_tenant_and_user_info(
		&mut self,
		tenant_id: Option<TenantId>,
		id_token: Option<String>,
		user_info: Option<UserInfo>,
	) {
		self.tenant_id = tenant_id;
		self.id_token = id_token;
		self.user_info = user_info;
	}

	/// Copies tenant, ID token, and user info forward from an earlier result.
	pub fn inherit_identity(&mut self, earlier: &AuthenticationResult) {
		self.update_tenant_and_user_info(
			earlier.tenant_id.clone(),
			earlier.id_token.clone(),
			earlier.user_info.clone(),
		);
	}

	/// Builds an `Authorization` header value from the access token.
	pub fn authorization_header(&self) -> Option<String> {
		let token = self.access_token.as_ref()?;
		let scheme = self.access_token_type.as_deref().unwrap_or("Bearer");

		Some(format!("{scheme} {}", token.expose()))
	}
}
impl Debug for AuthenticationResult {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticationResult")
			.field("access_token_type", &self.access_token_type)
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
			.field("tenant_id", &self.tenant_id)
			.field("user_info", &self.user_info)
			.field("expires_on", &self.expires_on)
			.finish()
	}
}

/// Builder for [`AuthenticationResult`].
#[derive(Clone, Debug, Default)]
pub struct AuthenticationResultBuilder {
	access_token_type: Option<String>,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	id_token: Option<String>,
	tenant_id: Option<TenantId>,
	user_info: Option<UserInfo>,
	expires_on: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl AuthenticationResultBuilder {
	/// Sets the token type.
	pub fn access_token_type(mut self, token_type: impl Into<String>) -> Self {
		self.access_token_type = Some(token_type.into());

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the raw ID token.
	pub fn id_token(mut self, token: impl Into<String>) -> Self {
		self.id_token = Some(token.into());

		self
	}

	/// Sets the issuing tenant.
	pub fn tenant_id(mut self, tenant: TenantId) -> Self {
		self.tenant_id = Some(tenant);

		self
	}

	/// Sets the user identity.
	pub fn user_info(mut self, user_info: UserInfo) -> Self {
		self.user_info = Some(user_info);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_on(mut self, instant: OffsetDateTime) -> Self {
		self.expires_on = Some(instant);

		self
	}

	/// Sets a relative expiry measured from the moment [`build`](Self::build) runs.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces an [`AuthenticationResult`].
	pub fn build(self) -> Result<AuthenticationResult, AuthenticationResultBuilderError> {
		if self.access_token.is_none() && self.refresh_token.is_none() {
			return Err(AuthenticationResultBuilderError::MissingToken);
		}

		let expires_on = match (self.expires_on, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => OffsetDateTime::now_utc()
				.checked_add(delta)
				.ok_or(AuthenticationResultBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(AuthenticationResultBuilderError::MissingExpiry),
		};

		Ok(AuthenticationResult {
			access_token_type: self.access_token_type,
			access_token: self.access_token,
			refresh_token: self.refresh_token,
			id_token: self.id_token,
			tenant_id: self.tenant_id,
			user_info: self.user_info,
			expires_on,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn cached() -> AuthenticationResult {
		AuthenticationResult::builder()
			.access_token("access-old")
			.refresh_token("refresh-old")
			.id_token("header.payload.signature")
			.tenant_id(TenantId::new("contoso").expect("Tenant fixture should be valid."))
			.user_info(UserInfo {
				unique_id: Some("oid-1".into()),
				displayable_id: Some("alice@contoso.com".into()),
				..Default::default()
			})
			.expires_on(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Cached result fixture should build.")
	}

	#[test]
	fn builder_requires_a_token_and_an_expiry() {
		assert_eq!(
			AuthenticationResult::builder().expires_in(Duration::hours(1)).build(),
			Err(AuthenticationResultBuilderError::MissingToken)
		);
		assert_eq!(
			AuthenticationResult::builder().refresh_token("refresh").build(),
			Err(AuthenticationResultBuilderError::MissingExpiry)
		);
	}

	#[test]
	fn expiry_checks_honor_margins() {
		let result = cached();

		assert!(!result.is_expired_at(macros::datetime!(2025-01-01 00:30 UTC)));
		assert!(result.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert!(result.expires_within(macros::datetime!(2025-01-01 00:56 UTC), Duration::minutes(5)));
		assert!(!result.expires_within(macros::datetime!(2025-01-01 00:54 UTC), Duration::minutes(5)));
	}

	#[test]
	fn oversized_expiry_windows_never_overflow() {
		let result = cached();

		assert!(result.expires_within(macros::datetime!(2025-01-01 00:00 UTC), Duration::MAX));
		assert!(!result.expires_within(macros::datetime!(2025-01-01 00:00 UTC), Duration::MIN));
		assert_eq!(
			AuthenticationResult::builder().access_token("access").expires_in(Duration::MAX).build(),
			Err(AuthenticationResultBuilderError::ExpiryOutOfRange)
		);
	}

	#[test]
	fn refresh_only_hint_requires_refresh() {
		let hint = cached().without_access_token();

		assert!(hint.requires_refresh());
		assert!(!cached().requires_refresh());
		assert_eq!(hint.authorization_header(), None);
	}

	#[test]
	fn inherit_identity_copies_tenant_id_token_and_user() {
		let earlier = cached();
		let mut refreshed = AuthenticationResult::builder()
			.access_token("access-new")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Refreshed result fixture should build.");

		refreshed.inherit_identity(&earlier);

		assert_eq!(refreshed.tenant_id, earlier.tenant_id);
		assert_eq!(refreshed.id_token, earlier.id_token);
		assert_eq!(refreshed.user_info, earlier.user_info);
		assert_eq!(refreshed.access_token.as_ref().map(TokenSecret::expose), Some("access-new"));
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let rendered = format!("{:?}", cached());

		assert!(!rendered.contains("access-old"));
		assert!(!rendered.contains("refresh-old"));
		assert!(!rendered.contains("header.payload"));
		assert_eq!(cached().authorization_header().as_deref(), Some("Bearer access-old"));
	}
}

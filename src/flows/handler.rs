//! Token acquisition orchestrator shared by every grant.
//!
//! [`AcquireTokenHandler::acquire_token`] runs one linear attempt:
//!
//! 1. refresh authority metadata and reject ADFS authorities the grant cannot use,
//! 2. consult the cache (when loading is enabled) and serve a usable access token,
//! 3. redeem a cached refresh token, falling back to a full exchange on soft failures,
//! 4. perform the grant's full exchange and write the result back (when storing is enabled).
//!
//! Cache reads and writes of one attempt are bracketed by a single pair of access
//! notifications that closes on every exit path. There is no retry loop; retries belong to
//! the caller.

// self
use crate::{
	_prelude::*,
	auth::AuthenticationResult,
	authority::{Authenticator, AuthorityType},
	cache::{CacheKey, CacheNotificationArgs, ResourceScope, SubjectType, TokenCache},
	credential::Credential,
	error::INVALID_REQUEST,
	flows::{AcquisitionMetrics, GrantFlow, UserIdentifier, notify::CacheAccessScope},
	http::TokenTransport,
	obs::{self, CacheOutcome, FlowOutcome, FlowSpan},
	request::{CallState, ExecutionMode, RequestParameters, grant, param},
};

/// Orchestrates a single token acquisition for one grant.
///
/// The handler borrows its collaborators; it owns only the per-invocation
/// [`CallState`] and the [`RequestParameters`] it builds for each exchange.
pub struct AcquireTokenHandler<'a> {
	authenticator: &'a dyn Authenticator,
	transport: &'a dyn TokenTransport,
	credential: &'a Credential,
	flow: &'a dyn GrantFlow,
	cache: Option<&'a dyn TokenCache>,
	resource: ResourceScope,
	subject_type: SubjectType,
	load_from_cache: bool,
	store_to_cache: bool,
	execution_mode: ExecutionMode,
	metrics: Option<&'a AcquisitionMetrics>,
}
impl<'a> AcquireTokenHandler<'a> {
	/// Starts configuring a handler for `flow`.
	pub fn builder(
		authenticator: &'a dyn Authenticator,
		transport: &'a dyn TokenTransport,
		credential: &'a Credential,
		flow: &'a dyn GrantFlow,
	) -> AcquireTokenHandlerBuilder<'a> {
		AcquireTokenHandlerBuilder {
			authenticator,
			transport,
			credential,
			flow,
			cache: None,
			resource: ResourceScope::NoResource,
			subject_type: SubjectType::User,
			load_from_cache: true,
			store_to_cache: true,
			execution_mode: ExecutionMode::default(),
			metrics: None,
		}
	}

	/// Returns `true` if the handler reads the cache.
	pub fn load_from_cache(&self) -> bool {
		self.load_from_cache
	}

	/// Returns `true` if the handler writes results to the cache.
	pub fn store_to_cache(&self) -> bool {
		self.store_to_cache
	}

	/// Acquires a token, serving it from the cache, a silent refresh, or a full exchange.
	pub async fn acquire_token(&self) -> Result<AuthenticationResult> {
		let kind = self.flow.kind();
		let call_state = CallState::new(self.authenticator.correlation_id(), self.execution_mode);
		let span = FlowSpan::new(kind, "acquire_token", &call_state.correlation_id);

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);
		self.with_metrics(AcquisitionMetrics::record_attempt);

		let result = span.instrument(self.run(&call_state)).await;

		match &result {
			Ok(result) => {
				obs::record_flow_outcome(kind, FlowOutcome::Success);
				obs::log_returned_token(kind, result, &call_state);
			},
			Err(_) => {
				obs::record_flow_outcome(kind, FlowOutcome::Failure);
				self.with_metrics(AcquisitionMetrics::record_failure);
			},
		}

		result
	}

	async fn run(&self, call_state: &CallState) -> Result<AuthenticationResult> {
		self.authenticator.refresh_metadata_if_needed(call_state).await?;

		let authority_type = self.authenticator.authority_type();

		if authority_type == AuthorityType::Adfs && !self.flow.supports_adfs() {
			return Err(Error::InvalidAuthorityType { authority_type, flow: self.flow.kind() });
		}

		let user = self.flow.resolve_user_identifier(call_state).await?;
		let mut scope = CacheAccessScope::new(
			self.cache,
			CacheNotificationArgs {
				resource: self.resource.clone(),
				client_id: self.credential.client_id.clone(),
				unique_id: user.unique_id.clone(),
				displayable_id: user.displayable_id.clone(),
			},
		);
		let cached = match self.cache.filter(|_| self.load_from_cache) {
			Some(cache) => self.load(cache, &mut scope, &user, call_state).await?,
			None => None,
		};

		match cached {
			Some(result) => Ok(result),
			None => self.exchange(&mut scope, call_state).await,
		}
	}

	async fn load(
		&self,
		cache: &dyn TokenCache,
		scope: &mut CacheAccessScope<'_>,
		user: &UserIdentifier,
		call_state: &CallState,
	) -> Result<Option<AuthenticationResult>> {
		let kind = self.flow.kind();

		scope.notify_before_access();

		let key = self.cache_key(user.unique_id.clone(), user.displayable_id.clone());
		let Some(cached) = cache.lookup(&key, call_state).await? else {
			obs::record_cache_outcome(kind, CacheOutcome::Miss);

			return Ok(None);
		};

		if cached.access_token.is_some() {
			#[cfg(feature = "tracing")]
			tracing::debug!(expires_on = %cached.expires_on, "Serving cached access token.");

			obs::record_cache_outcome(kind, CacheOutcome::Hit);
			self.with_metrics(AcquisitionMetrics::record_cache_hit);

			return Ok(Some(cached));
		}
		if cached.refresh_token.is_none() {
			obs::record_cache_outcome(kind, CacheOutcome::Miss);

			return Ok(None);
		}
		if self.resource == ResourceScope::NoResource {
			#[cfg(feature = "tracing")]
			tracing::debug!("Skipping refresh for a resource-agnostic cache entry.");

			obs::record_cache_outcome(kind, CacheOutcome::Miss);

			return Ok(None);
		}

		match self.refresh(&cached, call_state).await? {
			Some(refreshed) => {
				obs::record_cache_outcome(kind, CacheOutcome::Refreshed);
				self.store(scope, &refreshed).await?;

				Ok(Some(refreshed))
			},
			None => {
				obs::record_cache_outcome(kind, CacheOutcome::RefreshFallback);
				self.with_metrics(AcquisitionMetrics::record_refresh_fallback);

				Ok(None)
			},
		}
	}

	/// Returns `Ok(None)` when the refresh failed softly and a full exchange should follow.
	async fn refresh(
		&self,
		cached: &AuthenticationResult,
		call_state: &CallState,
	) -> Result<Option<AuthenticationResult>> {
		let Some(refresh_token) = cached.refresh_token.as_ref() else {
			return Ok(None);
		};

		#[cfg(feature = "tracing")]
		tracing::debug!(refresh_token_hash = %refresh_token.fingerprint(), "Refreshing cached token.");

		self.with_metrics(AcquisitionMetrics::record_refresh_attempt);

		let mut params = RequestParameters::new();

		params
			.insert(param::GRANT_TYPE, grant::REFRESH_TOKEN)
			.insert(param::REFRESH_TOKEN, refresh_token.expose());
		self.add_common_fields(&mut params)?;

		let token_endpoint = self.authenticator.token_endpoint();

		match self.transport.exchange(&token_endpoint, params, call_state).await {
			Ok(mut refreshed) => {
				self.update_tenant(&refreshed, call_state);

				if refreshed.id_token.is_none() {
					refreshed.inherit_identity(cached);
				}
				if refreshed.refresh_token.is_none() {
					refreshed.refresh_token = Some(refresh_token.clone());
				}

				Ok(Some(refreshed))
			},
			Err(source) if source.server_error_code() == Some(INVALID_REQUEST) =>
				Err(Error::FailedToRefreshToken { source }),
			// Any other failure, transient ones included, falls back to a full exchange.
			Err(e) => {
				#[cfg(feature = "tracing")]
				{
					tracing::warn!(
						error_code = e.server_error_code().unwrap_or("<none>"),
						"Refresh failed; falling back to a full token exchange."
					);
				}
				#[cfg(not(feature = "tracing"))]
				{
					let _ = e;
				}

				Ok(None)
			},
		}
	}

	async fn exchange(
		&self,
		scope: &mut CacheAccessScope<'_>,
		call_state: &CallState,
	) -> Result<AuthenticationResult> {
		self.with_metrics(AcquisitionMetrics::record_full_exchange);
		self.flow.pre_token_request(call_state).await?;

		let mut params = RequestParameters::new();

		self.add_common_fields(&mut params)?;
		self.flow.add_grant_fields(&mut params)?;

		let token_endpoint = self.authenticator.token_endpoint();
		let result = self.transport.exchange(&token_endpoint, params, call_state).await?;

		self.flow.post_token_request(&result, call_state).await?;
		self.update_tenant(&result, call_state);
		self.store(scope, &result).await?;

		Ok(result)
	}

	async fn store(
		&self,
		scope: &mut CacheAccessScope<'_>,
		result: &AuthenticationResult,
	) -> Result<()> {
		let Some(cache) = self.cache.filter(|_| self.store_to_cache) else {
			return Ok(());
		};

		scope.notify_before_access();

		let user = result.user_info.as_ref();
		let key = self.cache_key(
			user.and_then(|u| u.unique_id.clone()),
			user.and_then(|u| u.displayable_id.clone()),
		);

		cache.store(key, result.clone()).await?;

		Ok(())
	}

	fn add_common_fields(&self, params: &mut RequestParameters) -> Result<()> {
		if let Some(resource) = self.resource.resource() {
			params.insert(param::RESOURCE, resource.to_string());
		}

		self.credential.apply(params, &self.authenticator.self_signed_jwt_audience())
	}

	fn update_tenant(&self, result: &AuthenticationResult, call_state: &CallState) {
		if let Some(tenant) = &result.tenant_id {
			self.authenticator.update_tenant(tenant, call_state);
		}
	}

	fn cache_key(&self, unique_id: Option<String>, displayable_id: Option<String>) -> CacheKey {
		CacheKey::new(
			&self.authenticator.authority(),
			self.resource.clone(),
			self.credential.client_id.clone(),
			self.subject_type,
			unique_id,
			displayable_id,
		)
	}

	fn with_metrics(&self, record: impl FnOnce(&AcquisitionMetrics)) {
		if let Some(metrics) = self.metrics {
			record(metrics);
		}
	}
}
impl Debug for AcquireTokenHandler<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AcquireTokenHandler")
			.field("flow", &self.flow.kind())
			.field("client_id", &self.credential.client_id)
			.field("resource", &self.resource)
			.field("subject_type", &self.subject_type)
			.field("load_from_cache", &self.load_from_cache)
			.field("store_to_cache", &self.store_to_cache)
			.field("execution_mode", &self.execution_mode)
			.finish()
	}
}

/// Builder for [`AcquireTokenHandler`].
///
/// Both cache flags default to `true` and are forced to `false` by
/// [`build`](Self::build) when no cache is attached.
pub struct AcquireTokenHandlerBuilder<'a> {
	authenticator: &'a dyn Authenticator,
	transport: &'a dyn TokenTransport,
	credential: &'a Credential,
	flow: &'a dyn GrantFlow,
	cache: Option<&'a dyn TokenCache>,
	resource: ResourceScope,
	subject_type: SubjectType,
	load_from_cache: bool,
	store_to_cache: bool,
	execution_mode: ExecutionMode,
	metrics: Option<&'a AcquisitionMetrics>,
}
impl<'a> AcquireTokenHandlerBuilder<'a> {
	/// Attaches a token cache.
	pub fn cache(mut self, cache: &'a dyn TokenCache) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Sets the target resource; defaults to [`ResourceScope::NoResource`].
	pub fn resource(mut self, resource: impl Into<ResourceScope>) -> Self {
		self.resource = resource.into();

		self
	}

	/// Sets which identity dimension keys the cache; defaults to [`SubjectType::User`].
	pub fn subject_type(mut self, subject_type: SubjectType) -> Self {
		self.subject_type = subject_type;

		self
	}

	/// Enables or disables cache reads.
	pub fn load_from_cache(mut self, enabled: bool) -> Self {
		self.load_from_cache = enabled;

		self
	}

	/// Enables or disables cache writes.
	pub fn store_to_cache(mut self, enabled: bool) -> Self {
		self.store_to_cache = enabled;

		self
	}

	/// Sets the execution marker carried by the call state.
	pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
		self.execution_mode = mode;

		self
	}

	/// Attaches shared acquisition counters.
	pub fn metrics(mut self, metrics: &'a AcquisitionMetrics) -> Self {
		self.metrics = Some(metrics);

		self
	}

	/// Finalizes the handler.
	pub fn build(self) -> AcquireTokenHandler<'a> {
		let has_cache = self.cache.is_some();

		AcquireTokenHandler {
			authenticator: self.authenticator,
			transport: self.transport,
			credential: self.credential,
			flow: self.flow,
			cache: self.cache,
			resource: self.resource,
			subject_type: self.subject_type,
			load_from_cache: self.load_from_cache && has_cache,
			store_to_cache: self.store_to_cache && has_cache,
			execution_mode: self.execution_mode,
			metrics: self.metrics,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		auth::ClientId,
		authority::{AuthorityDescriptor, StaticAuthenticator},
		cache::MemoryTokenCache,
		error::TransportError,
		http::TransportFuture,
		obs::FlowKind,
	};

	struct Unreachable;
	impl TokenTransport for Unreachable {
		fn exchange<'a>(
			&'a self,
			_token_endpoint: &'a Url,
			_parameters: RequestParameters,
			_call_state: &'a CallState,
		) -> TransportFuture<'a> {
			Box::pin(async { Err(TransportError::Timeout) })
		}
	}

	struct Bare;
	impl GrantFlow for Bare {
		fn kind(&self) -> FlowKind {
			FlowKind::Custom
		}

		fn add_grant_fields(&self, params: &mut RequestParameters) -> Result<()> {
			params.insert(param::GRANT_TYPE, "urn:example:bare");

			Ok(())
		}
	}

	fn authenticator() -> StaticAuthenticator {
		StaticAuthenticator::new(
			AuthorityDescriptor::builder(
				Url::parse("https://login.example.com/contoso").expect("Authority should parse."),
			)
			.build()
			.expect("Authority fixture should build."),
		)
	}

	#[test]
	fn cache_flags_are_forced_off_without_a_cache() {
		let authenticator = authenticator();
		let credential =
			Credential::public(ClientId::new("app-1").expect("Client fixture should be valid."));
		let handler =
			AcquireTokenHandler::builder(&authenticator, &Unreachable, &credential, &Bare).build();

		assert!(!handler.load_from_cache());
		assert!(!handler.store_to_cache());

		let cache = MemoryTokenCache::default();
		let handler = AcquireTokenHandler::builder(&authenticator, &Unreachable, &credential, &Bare)
			.cache(&cache)
			.load_from_cache(false)
			.build();

		assert!(!handler.load_from_cache());
		assert!(handler.store_to_cache());
	}

	#[tokio::test]
	async fn failures_are_counted() {
		let authenticator = authenticator();
		let credential =
			Credential::public(ClientId::new("app-1").expect("Client fixture should be valid."));
		let metrics = AcquisitionMetrics::default();
		let err = AcquireTokenHandler::builder(&authenticator, &Unreachable, &credential, &Bare)
			.metrics(&metrics)
			.build()
			.acquire_token()
			.await
			.expect_err("Timed out exchange should fail.");

		assert!(matches!(err, Error::Transport(TransportError::Timeout)));
		assert_eq!(metrics.attempts(), 1);
		assert_eq!(metrics.full_exchanges(), 1);
		assert_eq!(metrics.failures(), 1);
		assert_eq!(metrics.cache_hits(), 0);
	}
}

//! Collaborator doubles shared by the acquisition integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::atomic::{AtomicUsize, Ordering},
};
// crates.io
use parking_lot::Mutex;
// self
use oauth2_acquirer::{
	auth::{AuthenticationResult, ClientId, CorrelationId, ResourceId, TenantId, UserInfo},
	authority::{
		Authenticator, AuthorityDescriptor, AuthorityFuture, AuthorityType, StaticAuthenticator,
	},
	cache::{
		CacheError, CacheFuture, CacheKey, CacheNotificationArgs, MemoryTokenCache, ResourceScope,
		SubjectType, TokenCache,
	},
	error::TransportError,
	http::{TokenTransport, TransportFuture},
	request::{CallState, RequestParameters},
	url::Url,
};
use time::Duration;

pub const AUTHORITY: &str = "https://login.example.com/contoso";
pub const ADFS_AUTHORITY: &str = "https://adfs.example.com/adfs";
pub const CLIENT_ID: &str = "app-1";
pub const RESOURCE: &str = "https://graph.example.com";

/// Observable cache interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEvent {
	BeforeAccess,
	Lookup(CacheKey),
	Store(CacheKey),
	AfterAccess,
}

/// [`MemoryTokenCache`] wrapper that records every port call.
#[derive(Debug, Default)]
pub struct RecordingCache {
	pub inner: MemoryTokenCache,
	events: Mutex<Vec<CacheEvent>>,
	fail_lookups: bool,
}
impl RecordingCache {
	pub fn failing_lookups() -> Self {
		Self { fail_lookups: true, ..Default::default() }
	}

	pub async fn seed(&self, key: CacheKey, result: AuthenticationResult) {
		self.inner.store(key, result).await.expect("Seeding the memory cache should succeed.");
	}

	pub fn events(&self) -> Vec<CacheEvent> {
		self.events.lock().clone()
	}

	pub fn count(&self, matcher: impl Fn(&CacheEvent) -> bool) -> usize {
		self.events.lock().iter().filter(|event| matcher(event)).count()
	}

	pub fn lookups(&self) -> usize {
		self.count(|event| matches!(event, CacheEvent::Lookup(_)))
	}

	pub fn stores(&self) -> Vec<CacheKey> {
		self.events
			.lock()
			.iter()
			.filter_map(|event| match event {
				CacheEvent::Store(key) => Some(key.clone()),
				_ => None,
			})
			.collect()
	}

	pub fn befores(&self) -> usize {
		self.count(|event| matches!(event, CacheEvent::BeforeAccess))
	}

	pub fn afters(&self) -> usize {
		self.count(|event| matches!(event, CacheEvent::AfterAccess))
	}
}
impl TokenCache for RecordingCache {
	fn lookup<'a>(
		&'a self,
		key: &'a CacheKey,
		call_state: &'a CallState,
	) -> CacheFuture<'a, Option<AuthenticationResult>> {
		self.events.lock().push(CacheEvent::Lookup(key.clone()));

		if self.fail_lookups {
			return Box::pin(async {
				Err(CacheError::Backend { message: "lookup unavailable".into() })
			});
		}

		self.inner.lookup(key, call_state)
	}

	fn store(&self, key: CacheKey, result: AuthenticationResult) -> CacheFuture<'_, ()> {
		self.events.lock().push(CacheEvent::Store(key.clone()));

		self.inner.store(key, result)
	}

	fn notify_before_access(&self, _args: &CacheNotificationArgs) {
		self.events.lock().push(CacheEvent::BeforeAccess);
	}

	fn notify_after_access(&self, _args: &CacheNotificationArgs) {
		self.events.lock().push(CacheEvent::AfterAccess);
	}
}

/// Transport replaying queued responses and recording submitted parameters.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
	responses: Mutex<VecDeque<Result<AuthenticationResult, TransportError>>>,
	requests: Mutex<Vec<RequestParameters>>,
}
impl ScriptedTransport {
	pub fn new(
		responses: impl IntoIterator<Item = Result<AuthenticationResult, TransportError>>,
	) -> Self {
		Self { responses: Mutex::new(responses.into_iter().collect()), ..Default::default() }
	}

	pub fn requests(&self) -> Vec<RequestParameters> {
		self.requests.lock().clone()
	}

	pub fn calls(&self) -> usize {
		self.requests.lock().len()
	}

	pub fn grant_types(&self) -> Vec<String> {
		self.requests
			.lock()
			.iter()
			.map(|params| params.get("grant_type").unwrap_or_default().to_owned())
			.collect()
	}
}
impl TokenTransport for ScriptedTransport {
	fn exchange<'a>(
		&'a self,
		_token_endpoint: &'a Url,
		parameters: RequestParameters,
		_call_state: &'a CallState,
	) -> TransportFuture<'a> {
		self.requests.lock().push(parameters);

		let next = self.responses.lock().pop_front().unwrap_or_else(|| {
			Err(TransportError::UnexpectedResponse {
				message: "no scripted response left".into(),
				status: None,
			})
		});

		Box::pin(async move { next })
	}
}

/// [`StaticAuthenticator`] wrapper counting metadata refreshes and tenant updates.
#[derive(Debug)]
pub struct CountingAuthenticator {
	pub inner: StaticAuthenticator,
	metadata_refreshes: AtomicUsize,
	tenant_updates: Mutex<Vec<TenantId>>,
}
impl CountingAuthenticator {
	pub fn new(authority: &str) -> Self {
		let descriptor = AuthorityDescriptor::builder(
			Url::parse(authority).expect("Authority fixture should parse."),
		)
		.correlation_id(CorrelationId::new("corr-fixture").expect("Correlation id should be valid."))
		.build()
		.expect("Authority fixture should build.");

		Self {
			inner: StaticAuthenticator::new(descriptor),
			metadata_refreshes: AtomicUsize::new(0),
			tenant_updates: Mutex::new(Vec::new()),
		}
	}

	pub fn standard() -> Self {
		Self::new(AUTHORITY)
	}

	pub fn adfs() -> Self {
		Self::new(ADFS_AUTHORITY)
	}

	pub fn metadata_refreshes(&self) -> usize {
		self.metadata_refreshes.load(Ordering::SeqCst)
	}

	pub fn tenant_updates(&self) -> Vec<TenantId> {
		self.tenant_updates.lock().clone()
	}
}
impl Authenticator for CountingAuthenticator {
	fn refresh_metadata_if_needed<'a>(
		&'a self,
		call_state: &'a CallState,
	) -> AuthorityFuture<'a, ()> {
		self.metadata_refreshes.fetch_add(1, Ordering::SeqCst);

		self.inner.refresh_metadata_if_needed(call_state)
	}

	fn authority_type(&self) -> AuthorityType {
		self.inner.authority_type()
	}

	fn authority(&self) -> Url {
		self.inner.authority()
	}

	fn token_endpoint(&self) -> Url {
		self.inner.token_endpoint()
	}

	fn self_signed_jwt_audience(&self) -> String {
		self.inner.self_signed_jwt_audience()
	}

	fn correlation_id(&self) -> Option<CorrelationId> {
		self.inner.correlation_id()
	}

	fn update_tenant(&self, tenant: &TenantId, call_state: &CallState) {
		self.tenant_updates.lock().push(tenant.clone());
		self.inner.update_tenant(tenant, call_state);
	}
}

pub fn client_id() -> ClientId {
	ClientId::new(CLIENT_ID).expect("Client fixture should be valid.")
}

pub fn resource() -> ResourceId {
	ResourceId::new(RESOURCE).expect("Resource fixture should be valid.")
}

/// Key the orchestrator uses for app-only entries of [`AUTHORITY`].
pub fn client_key(resource: ResourceScope) -> CacheKey {
	CacheKey::new(
		&Url::parse(&format!("{AUTHORITY}/")).expect("Authority fixture should parse."),
		resource,
		client_id(),
		SubjectType::Client,
		None,
		None,
	)
}

pub fn alice() -> UserInfo {
	UserInfo {
		unique_id: Some("oid-alice".into()),
		displayable_id: Some("alice@contoso.com".into()),
		given_name: Some("Alice".into()),
		..Default::default()
	}
}

pub fn issued(access: &str, refresh: Option<&str>) -> AuthenticationResult {
	let mut builder = AuthenticationResult::builder()
		.access_token_type("Bearer")
		.access_token(access)
		.expires_in(Duration::hours(1));

	if let Some(refresh) = refresh {
		builder = builder.refresh_token(refresh);
	}

	builder.build().expect("Issued result fixture should build.")
}

pub fn issued_with_identity(access: &str, refresh: Option<&str>) -> AuthenticationResult {
	let mut result = issued(access, refresh);

	result.update_tenant_and_user_info(
		Some(TenantId::new("contoso").expect("Tenant fixture should be valid.")),
		Some("header.alice.signature".into()),
		Some(alice()),
	);

	result
}

pub fn refresh_only(refresh: &str) -> AuthenticationResult {
	AuthenticationResult::builder()
		.refresh_token(refresh)
		.expires_in(Duration::minutes(-1))
		.build()
		.expect("Refresh-only fixture should build.")
}

pub fn server_error(code: &str) -> TransportError {
	TransportError::Server {
		code: code.into(),
		description: Some(format!("{code} description")),
		status: Some(400),
		retry_after: None,
	}
}

//! Token cache port consumed by the acquisition orchestrator and its built-in memory adapter.
//!
//! The orchestrator brackets every cache read and write of one acquisition between
//! [`TokenCache::notify_before_access`] and [`TokenCache::notify_after_access`]; adapters use
//! the pair to scope external locking, auditing, or lazy (re)loading of serialized state.
//! Adapters own their concurrency discipline because concurrent acquisitions may hit the same
//! key.

pub mod memory;

pub use memory::MemoryTokenCache;

// self
use crate::{
	_prelude::*,
	auth::{AuthenticationResult, ClientId, ResourceId},
	request::CallState,
};

/// Boxed future returned by [`TokenCache`] lookups and stores.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Keyed token store with an access-notification protocol.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Returns the entry matching `key`, already judged for freshness by the cache.
	///
	/// A returned result carrying an access token is usable as-is; one carrying only a refresh
	/// token asks the caller to refresh before use.
	fn lookup<'a>(
		&'a self,
		key: &'a CacheKey,
		call_state: &'a CallState,
	) -> CacheFuture<'a, Option<AuthenticationResult>>;

	/// Persists or replaces the entry for `key`.
	fn store(&self, key: CacheKey, result: AuthenticationResult) -> CacheFuture<'_, ()>;

	/// Called once before the first cache read or write of an acquisition.
	fn notify_before_access(&self, args: &CacheNotificationArgs);

	/// Called exactly once after the last cache access of an acquisition, even on failure.
	fn notify_after_access(&self, args: &CacheNotificationArgs);
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// More than one entry matched a lookup that left the user unspecified.
	#[error("Multiple cached tokens match the request; specify the user.")]
	MultipleMatches,
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Target resource of a cache entry; [`ResourceScope::NoResource`] is distinct from any
/// resource identifier, including an empty one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceScope {
	/// Token for a specific resource.
	Resource(ResourceId),
	/// Resource-agnostic entry.
	NoResource,
}
impl ResourceScope {
	/// Returns the resource identifier, if any.
	pub fn resource(&self) -> Option<&ResourceId> {
		match self {
			Self::Resource(resource) => Some(resource),
			Self::NoResource => None,
		}
	}
}
impl From<ResourceId> for ResourceScope {
	fn from(resource: ResourceId) -> Self {
		Self::Resource(resource)
	}
}
impl From<Option<ResourceId>> for ResourceScope {
	fn from(resource: Option<ResourceId>) -> Self {
		resource.map_or(Self::NoResource, Self::Resource)
	}
}

/// Which identity dimension keys a cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
	/// Token issued to a user through a public client.
	User,
	/// Token issued to the application itself.
	Client,
	/// Token issued to a user through a confidential client.
	UserPlusClient,
}

/// Composite key identifying a cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
	/// Authority URL, lowercased.
	pub authority: String,
	/// Target resource.
	pub resource: ResourceScope,
	/// Client identifier.
	pub client_id: ClientId,
	/// Identity dimension.
	pub subject_type: SubjectType,
	/// Unique user identifier, if known.
	pub unique_id: Option<String>,
	/// Displayable user identifier, lowercased, if known.
	pub displayable_id: Option<String>,
}
impl CacheKey {
	/// Builds a normalized key.
	pub fn new(
		authority: &Url,
		resource: ResourceScope,
		client_id: ClientId,
		subject_type: SubjectType,
		unique_id: Option<String>,
		displayable_id: Option<String>,
	) -> Self {
		Self {
			authority: authority.as_str().to_ascii_lowercase(),
			resource,
			client_id,
			subject_type,
			unique_id,
			displayable_id: displayable_id.map(|id| id.to_lowercase()),
		}
	}

	/// Returns `true` if a lookup with `self` should return the entry stored under `stored`.
	///
	/// User components left unset on the lookup key match any stored value.
	pub fn matches(&self, stored: &CacheKey) -> bool {
		self.authority == stored.authority
			&& self.resource == stored.resource
			&& self.client_id == stored.client_id
			&& self.subject_type == stored.subject_type
			&& self.unique_id.as_ref().is_none_or(|id| stored.unique_id.as_ref() == Some(id))
			&& self
				.displayable_id
				.as_ref()
				.is_none_or(|id| stored.displayable_id.as_ref() == Some(id))
	}

	/// Returns the notification context describing this key.
	pub fn notification_args(&self) -> CacheNotificationArgs {
		CacheNotificationArgs {
			resource: self.resource.clone(),
			client_id: self.client_id.clone(),
			unique_id: self.unique_id.clone(),
			displayable_id: self.displayable_id.clone(),
		}
	}
}

/// Context handed to the cache access notifications.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNotificationArgs {
	/// Target resource of the acquisition.
	pub resource: ResourceScope,
	/// Client identifier of the acquisition.
	pub client_id: ClientId,
	/// Unique user identifier, if known.
	pub unique_id: Option<String>,
	/// Displayable user identifier, if known.
	pub displayable_id: Option<String>,
}

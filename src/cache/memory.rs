//! Thread-safe in-memory [`TokenCache`] implementation.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	auth::AuthenticationResult,
	cache::{CacheError, CacheFuture, CacheKey, CacheNotificationArgs, TokenCache},
	request::CallState,
};

type Entries = Arc<RwLock<HashMap<CacheKey, AuthenticationResult>>>;
type NotificationHook = Arc<dyn Fn(&CacheNotificationArgs) + Send + Sync>;

/// In-process token cache with optional access notification hooks.
///
/// Lookups judge freshness with an expiration margin: an access token expiring within the
/// margin is stripped from the returned copy so the caller refreshes it, and an entry with
/// neither a fresh access token nor a refresh token counts as a miss.
#[derive(Clone)]
pub struct MemoryTokenCache {
	entries: Entries,
	expiration_margin: Duration,
	state_changed: Arc<AtomicBool>,
	before_access: Option<NotificationHook>,
	after_access: Option<NotificationHook>,
}
impl MemoryTokenCache {
	/// Default margin before expiry at which access tokens stop being served.
	pub const DEFAULT_EXPIRATION_MARGIN: Duration = Duration::minutes(5);

	/// Overrides the expiration margin.
	pub fn with_expiration_margin(mut self, margin: Duration) -> Self {
		self.expiration_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Registers a hook invoked by [`TokenCache::notify_before_access`].
	pub fn on_before_access(
		mut self,
		hook: impl Fn(&CacheNotificationArgs) + Send + Sync + 'static,
	) -> Self {
		self.before_access = Some(Arc::new(hook));

		self
	}

	/// Registers a hook invoked by [`TokenCache::notify_after_access`].
	pub fn on_after_access(
		mut self,
		hook: impl Fn(&CacheNotificationArgs) + Send + Sync + 'static,
	) -> Self {
		self.after_access = Some(Arc::new(hook));

		self
	}

	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Returns a snapshot of every stored entry.
	pub fn entries(&self) -> Vec<(CacheKey, AuthenticationResult)> {
		self.entries.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
	}

	/// Removes the entry stored under exactly `key`.
	pub fn remove(&self, key: &CacheKey) -> Option<AuthenticationResult> {
		let removed = self.entries.write().remove(key);

		if removed.is_some() {
			self.state_changed.store(true, Ordering::Release);
		}

		removed
	}

	/// Removes every entry.
	pub fn clear(&self) {
		self.entries.write().clear();
		self.state_changed.store(true, Ordering::Release);
	}

	/// Returns `true` if entries changed since the last [`mark_persisted`](Self::mark_persisted).
	pub fn has_state_changed(&self) -> bool {
		self.state_changed.load(Ordering::Acquire)
	}

	/// Clears the state-changed flag, typically after serializing the cache.
	pub fn mark_persisted(&self) {
		self.state_changed.store(false, Ordering::Release);
	}

	fn lookup_now(
		entries: &Entries,
		key: &CacheKey,
		margin: Duration,
		now: OffsetDateTime,
	) -> Result<Option<AuthenticationResult>, CacheError> {
		let guard = entries.read();

		if let Some(entry) = guard.get(key) {
			return Ok(Self::judge(entry, margin, now));
		}

		let mut matches = guard.iter().filter(|(stored, _)| key.matches(stored));
		let Some((_, entry)) = matches.next() else {
			return Ok(None);
		};

		if matches.next().is_some() {
			return Err(CacheError::MultipleMatches);
		}

		Ok(Self::judge(entry, margin, now))
	}

	fn judge(
		entry: &AuthenticationResult,
		margin: Duration,
		now: OffsetDateTime,
	) -> Option<AuthenticationResult> {
		if entry.access_token.is_some() && !entry.expires_within(now, margin) {
			return Some(entry.clone());
		}
		if entry.refresh_token.is_some() {
			return Some(entry.clone().without_access_token());
		}

		None
	}
}
impl Default for MemoryTokenCache {
	fn default() -> Self {
		Self {
			entries: Default::default(),
			expiration_margin: Self::DEFAULT_EXPIRATION_MARGIN,
			state_changed: Default::default(),
			before_access: None,
			after_access: None,
		}
	}
}
impl Debug for MemoryTokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryTokenCache")
			.field("entries", &self.len())
			.field("expiration_margin", &self.expiration_margin)
			.field("state_changed", &self.has_state_changed())
			.finish()
	}
}
impl TokenCache for MemoryTokenCache {
	fn lookup<'a>(
		&'a self,
		key: &'a CacheKey,
		_call_state: &'a CallState,
	) -> CacheFuture<'a, Option<AuthenticationResult>> {
		let entries = self.entries.clone();
		let margin = self.expiration_margin;

		Box::pin(async move { Self::lookup_now(&entries, key, margin, OffsetDateTime::now_utc()) })
	}

	fn store(&self, key: CacheKey, result: AuthenticationResult) -> CacheFuture<'_, ()> {
		Box::pin(async move {
			self.entries.write().insert(key, result);
			self.state_changed.store(true, Ordering::Release);

			Ok(())
		})
	}

	fn notify_before_access(&self, args: &CacheNotificationArgs) {
		if let Some(hook) = &self.before_access {
			hook(args);
		}
	}

	fn notify_after_access(&self, args: &CacheNotificationArgs) {
		if let Some(hook) = &self.after_access {
			hook(args);
		}
	}
}

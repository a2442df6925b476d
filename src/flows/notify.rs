//! Scoped pairing of cache access notifications.

// self
use crate::cache::{CacheNotificationArgs, TokenCache};

/// Emits the before-access notification at most once and the matching after-access
/// notification exactly once when dropped.
///
/// The guard lives for the whole acquisition, so every return path (including `?`
/// propagation and future cancellation) closes an opened pair.
pub(crate) struct CacheAccessScope<'a> {
	cache: Option<&'a dyn TokenCache>,
	args: CacheNotificationArgs,
	notified: bool,
}
impl<'a> CacheAccessScope<'a> {
	pub(crate) fn new(cache: Option<&'a dyn TokenCache>, args: CacheNotificationArgs) -> Self {
		Self { cache, args, notified: false }
	}

	/// Emits the before-access notification unless this scope already did.
	pub(crate) fn notify_before_access(&mut self) {
		if self.notified {
			return;
		}
		if let Some(cache) = self.cache {
			cache.notify_before_access(&self.args);

			self.notified = true;
		}
	}

	#[cfg(test)]
	fn has_notified(&self) -> bool {
		self.notified
	}
}
impl Drop for CacheAccessScope<'_> {
	fn drop(&mut self) {
		if !self.notified {
			return;
		}
		if let Some(cache) = self.cache {
			cache.notify_after_access(&self.args);
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		_prelude::*,
		auth::ClientId,
		cache::{MemoryTokenCache, ResourceScope},
	};

	fn counting_cache() -> (MemoryTokenCache, Arc<AtomicUsize>, Arc<AtomicUsize>) {
		let before = Arc::new(AtomicUsize::new(0));
		let after = Arc::new(AtomicUsize::new(0));
		let cache = MemoryTokenCache::default()
			.on_before_access({
				let before = before.clone();

				move |_| {
					before.fetch_add(1, Ordering::SeqCst);
				}
			})
			.on_after_access({
				let after = after.clone();

				move |_| {
					after.fetch_add(1, Ordering::SeqCst);
				}
			});

		(cache, before, after)
	}

	fn args() -> CacheNotificationArgs {
		CacheNotificationArgs {
			resource: ResourceScope::NoResource,
			client_id: ClientId::new("app-1").expect("Client fixture should be valid."),
			unique_id: None,
			displayable_id: None,
		}
	}

	#[test]
	fn before_fires_once_and_after_fires_on_drop() {
		let (cache, before, after) = counting_cache();

		{
			let mut scope = CacheAccessScope::new(Some(&cache), args());

			scope.notify_before_access();
			scope.notify_before_access();

			assert!(scope.has_notified());
			assert_eq!(after.load(Ordering::SeqCst), 0);
		}

		assert_eq!(before.load(Ordering::SeqCst), 1);
		assert_eq!(after.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn unopened_scopes_stay_silent() {
		let (cache, before, after) = counting_cache();

		drop(CacheAccessScope::new(Some(&cache), args()));

		let mut cacheless = CacheAccessScope::new(None, args());

		cacheless.notify_before_access();

		assert!(!cacheless.has_notified());
		assert_eq!(before.load(Ordering::SeqCst), 0);
		assert_eq!(after.load(Ordering::SeqCst), 0);
	}
}

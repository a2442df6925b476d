//! Optional observability helpers for token acquisitions.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_acquirer.flow` with the `flow` (grant),
//!   `stage` (call site), and `correlation_id` fields.
//! - Enable `metrics` to increment the `oauth2_acquirer_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and the `oauth2_acquirer_cache_total`
//!   counter for every cache decision.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, auth::AuthenticationResult, request::CallState};

/// Grant kinds observed by the acquirer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
	/// Client Credentials grant.
	ClientCredentials,
	/// Authorization Code grant.
	AuthorizationCode,
	/// Caller-supplied refresh token grant.
	RefreshToken,
	/// Caller-defined grant plugged in through the handler builder.
	Custom,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ClientCredentials => "client_credentials",
			FlowKind::AuthorizationCode => "authorization_code",
			FlowKind::RefreshToken => "refresh_token",
			FlowKind::Custom => "custom",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to an acquisition.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Cache decision labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheOutcome {
	/// Cached access token served without a network call.
	Hit,
	/// Cached refresh token redeemed successfully.
	Refreshed,
	/// Refresh failed softly and the acquisition fell back to a full exchange.
	RefreshFallback,
	/// Nothing usable was cached.
	Miss,
}
impl CacheOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheOutcome::Hit => "hit",
			CacheOutcome::Refreshed => "refreshed",
			CacheOutcome::RefreshFallback => "refresh_fallback",
			CacheOutcome::Miss => "miss",
		}
	}
}
impl Display for CacheOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Logs fingerprints of the tokens about to be returned.
///
/// Raw token values are never formatted.
pub fn log_returned_token(kind: FlowKind, result: &AuthenticationResult, call_state: &CallState) {
	#[cfg(feature = "tracing")]
	{
		let access = result.access_token.as_ref().map(|t| t.fingerprint());
		let refresh = result.refresh_token.as_ref().map(|t| t.fingerprint());

		::tracing::debug!(
			flow = kind.as_str(),
			correlation_id = %call_state.correlation_id,
			access_token_hash = access.as_deref().unwrap_or("<none>"),
			refresh_token_hash = refresh.as_deref().unwrap_or("<none>"),
			expires_on = %result.expires_on,
			"Returning token."
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, result, call_state);
	}
}

//! Grant specialization contract plugged into [`AcquireTokenHandler`](crate::flows::AcquireTokenHandler).

// self
use crate::{
	_prelude::*,
	auth::AuthenticationResult,
	obs::FlowKind,
	request::{CallState, RequestParameters},
};

/// Boxed future returned by [`GrantFlow`] hooks.
pub type FlowFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// User the acquisition is performed for, as far as the grant knows before the exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserIdentifier {
	/// Unique user identifier.
	pub unique_id: Option<String>,
	/// Displayable user identifier.
	pub displayable_id: Option<String>,
}

/// Grant-specific behavior layered over the shared acquisition algorithm.
///
/// Only [`kind`](Self::kind) and [`add_grant_fields`](Self::add_grant_fields) are required;
/// every hook defaults to a no-op.
pub trait GrantFlow
where
	Self: Send + Sync,
{
	/// Label used for spans, metrics, and error messages.
	fn kind(&self) -> FlowKind;

	/// Returns `true` if the grant may be used against ADFS authorities.
	fn supports_adfs(&self) -> bool {
		false
	}

	/// Resolves the user whose cache entry the acquisition reads.
	fn resolve_user_identifier<'a>(
		&'a self,
		_call_state: &'a CallState,
	) -> FlowFuture<'a, UserIdentifier> {
		Box::pin(async { Ok(UserIdentifier::default()) })
	}

	/// Adds grant-specific fields to a full exchange request.
	fn add_grant_fields(&self, params: &mut RequestParameters) -> Result<()>;

	/// Runs before a full exchange; may perform I/O.
	fn pre_token_request<'a>(&'a self, _call_state: &'a CallState) -> FlowFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}

	/// Observes the result of a full exchange.
	fn post_token_request<'a>(
		&'a self,
		_result: &'a AuthenticationResult,
		_call_state: &'a CallState,
	) -> FlowFuture<'a, ()> {
		Box::pin(async { Ok(()) })
	}
}

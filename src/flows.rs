//! Token acquisition orchestrator, grant specializations, and the [`Acquirer`] facade.

pub mod authorization_code;
pub mod client_credentials;
pub mod grant;
pub mod handler;
pub mod refresh_token;

mod metrics;
mod notify;

pub use authorization_code::*;
pub use client_credentials::*;
pub use grant::*;
pub use handler::*;
pub use metrics::AcquisitionMetrics;
pub use refresh_token::*;

// self
use crate::{
	_prelude::*, authority::Authenticator, cache::TokenCache, credential::Credential,
	http::TokenTransport, request::ExecutionMode,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Acquires tokens for one client against one authority.
///
/// The acquirer owns shared handles to the authenticator, transport, and optional cache so
/// individual grants only describe their request fields and cache policy. Clones share the
/// same collaborators and counters.
#[derive(Clone)]
pub struct Acquirer {
	/// Authority metadata source.
	pub authenticator: Arc<dyn Authenticator>,
	/// Token endpoint transport.
	pub transport: Arc<dyn TokenTransport>,
	/// Calling application's credential.
	pub credential: Credential,
	/// Token cache consulted and updated by cache-aware grants.
	pub cache: Option<Arc<dyn TokenCache>>,
	/// Execution marker attached to every call state.
	pub execution_mode: ExecutionMode,
	/// Shared acquisition counters.
	pub metrics: Arc<AcquisitionMetrics>,
}
impl Acquirer {
	/// Creates an acquirer that reuses the caller-provided transport.
	pub fn with_transport(
		authenticator: Arc<dyn Authenticator>,
		transport: Arc<dyn TokenTransport>,
		credential: Credential,
	) -> Self {
		Self {
			authenticator,
			transport,
			credential,
			cache: None,
			execution_mode: ExecutionMode::default(),
			metrics: Default::default(),
		}
	}

	/// Attaches a token cache.
	pub fn with_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Sets the execution marker attached to every call state.
	pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
		self.execution_mode = mode;

		self
	}

	/// Returns a handler builder for a caller-defined grant, pre-wired with this acquirer's
	/// collaborators, cache, and counters.
	pub fn handler<'a>(&'a self, flow: &'a dyn GrantFlow) -> AcquireTokenHandlerBuilder<'a> {
		let builder = AcquireTokenHandler::builder(
			&*self.authenticator,
			&*self.transport,
			&self.credential,
			flow,
		)
		.execution_mode(self.execution_mode)
		.metrics(&self.metrics);

		match &self.cache {
			Some(cache) => builder.cache(&**cache),
			None => builder,
		}
	}
}
#[cfg(feature = "reqwest")]
impl Acquirer {
	/// Creates an acquirer backed by the crate's default reqwest transport.
	pub fn new(authenticator: Arc<dyn Authenticator>, credential: Credential) -> Result<Self> {
		let transport = ReqwestTransport::new()?;

		Ok(Self::with_transport(authenticator, Arc::new(transport), credential))
	}
}
impl Debug for Acquirer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Acquirer")
			.field("authority", &self.authenticator.authority())
			.field("credential", &self.credential)
			.field("cache_set", &self.cache.is_some())
			.field("execution_mode", &self.execution_mode)
			.finish()
	}
}

//! Per-attempt request parameters and per-invocation call state.

// self
use crate::{_prelude::*, auth::CorrelationId};

/// OAuth 2.0 form field names used by token requests.
pub mod param {
	/// `grant_type` field.
	pub const GRANT_TYPE: &str = "grant_type";
	/// `resource` field.
	pub const RESOURCE: &str = "resource";
	/// `client_id` field.
	pub const CLIENT_ID: &str = "client_id";
	/// `client_secret` field.
	pub const CLIENT_SECRET: &str = "client_secret";
	/// `client_assertion` field.
	pub const CLIENT_ASSERTION: &str = "client_assertion";
	/// `client_assertion_type` field.
	pub const CLIENT_ASSERTION_TYPE: &str = "client_assertion_type";
	/// `refresh_token` field.
	pub const REFRESH_TOKEN: &str = "refresh_token";
	/// `code` field.
	pub const CODE: &str = "code";
	/// `redirect_uri` field.
	pub const REDIRECT_URI: &str = "redirect_uri";
}

/// OAuth 2.0 `grant_type` values used by the built-in flows.
pub mod grant {
	/// Authorization Code grant.
	pub const AUTHORIZATION_CODE: &str = "authorization_code";
	/// Refresh Token grant.
	pub const REFRESH_TOKEN: &str = "refresh_token";
	/// Client Credentials grant.
	pub const CLIENT_CREDENTIALS: &str = "client_credentials";
}

const SECRET_FIELDS: [&str; 4] =
	[param::CLIENT_SECRET, param::CLIENT_ASSERTION, param::REFRESH_TOKEN, param::CODE];

/// Form fields for a single token request attempt.
///
/// Built fresh for every exchange and never reused across attempts.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestParameters(BTreeMap<String, String>);
impl RequestParameters {
	/// Creates an empty parameter set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces a field.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
		self.0.insert(key.into(), value.into());

		self
	}

	/// Returns a field value.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}

	/// Removes a field, returning its value.
	pub fn remove(&mut self, key: &str) -> Option<String> {
		self.0.remove(key)
	}

	/// Returns `true` if the field is present.
	pub fn contains(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	/// Number of fields.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no fields are present.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates fields in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Consumes the parameters into the underlying map.
	pub fn into_inner(self) -> BTreeMap<String, String> {
		self.0
	}
}
impl Debug for RequestParameters {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut map = f.debug_map();

		for (key, value) in &self.0 {
			if SECRET_FIELDS.contains(&key.as_str()) {
				map.entry(key, &"<redacted>");
			} else {
				map.entry(key, value);
			}
		}

		map.finish()
	}
}

/// Whether the caller drives the acquisition synchronously or asynchronously.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
	/// Awaited from async code.
	#[default]
	Async,
	/// Driven to completion by a blocking wrapper.
	Blocking,
}
impl ExecutionMode {
	/// Returns a stable label suitable for span fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ExecutionMode::Async => "async",
			ExecutionMode::Blocking => "blocking",
		}
	}
}

/// Per-invocation context used for downstream log correlation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallState {
	/// Correlation identifier sent to the token endpoint and attached to log records.
	pub correlation_id: CorrelationId,
	/// Execution marker of the invocation.
	pub execution: ExecutionMode,
}
impl CallState {
	/// Creates a call state, reusing `correlation_id` when one was already established.
	pub fn new(correlation_id: Option<CorrelationId>, execution: ExecutionMode) -> Self {
		Self { correlation_id: correlation_id.unwrap_or_else(CorrelationId::generate), execution }
	}
}

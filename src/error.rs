//! Acquisition error taxonomy shared by the orchestrator, transports, caches, and authorities.

// self
use crate::{_prelude::*, authority::AuthorityType, obs::FlowKind};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;

/// OAuth error code that turns a failed refresh into a fatal [`Error::FailedToRefreshToken`].
pub const INVALID_REQUEST: &str = "invalid_request";

/// Canonical error returned by [`acquire_token`](crate::flows::AcquireTokenHandler::acquire_token).
#[derive(Debug, ThisError)]
pub enum Error {
	/// The authority is of a type the requesting flow cannot talk to.
	#[error("The {flow} flow does not support {authority_type} authorities.")]
	InvalidAuthorityType {
		/// Authority classification reported by the authenticator.
		authority_type: AuthorityType,
		/// Flow that rejected the authority.
		flow: FlowKind,
	},
	/// Token endpoint rejected the refresh request itself as malformed.
	#[error("Failed to refresh token: the token endpoint rejected the refresh request.")]
	FailedToRefreshToken {
		/// Transport failure reported for the refresh exchange.
		#[source]
		source: TransportError,
	},
	/// Token exchange failed.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token cache failure.
	#[error("{0}")]
	Cache(#[from] crate::cache::CacheError),
	/// Authority metadata could not be resolved.
	#[error(transparent)]
	Authority(#[from] AuthorityError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns the OAuth error code reported by the token endpoint, if any.
	pub fn server_error_code(&self) -> Option<&str> {
		match self {
			Self::FailedToRefreshToken { source } | Self::Transport(source) =>
				source.server_error_code(),
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Authority descriptor failed validation.
	#[error("Authority descriptor is invalid.")]
	InvalidAuthority(#[from] crate::authority::AuthorityDescriptorError),
	/// An identifier failed validation.
	#[error("Identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// The credential's assertion signer failed.
	#[error("Client assertion could not be signed.")]
	AssertionSigning {
		/// Signer-specific failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a signer failure inside [`ConfigError`].
	pub fn assertion_signing(src: impl Into<BoxError>) -> Self {
		Self::AssertionSigning { source: src.into() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Authority metadata failures surfaced by an [`Authenticator`](crate::authority::Authenticator).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum AuthorityError {
	/// Metadata discovery failed.
	#[error("Authority metadata is unavailable: {message}.")]
	MetadataUnavailable {
		/// Authenticator-supplied reason.
		message: String,
	},
	/// Discovered metadata is unusable.
	#[error("Authority metadata is invalid: {message}.")]
	InvalidMetadata {
		/// Authenticator-supplied reason.
		message: String,
	},
}

/// Failures surfaced by a [`TokenTransport`](crate::http::TokenTransport) exchange.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Token endpoint answered with an OAuth error payload.
	#[error("Token endpoint returned the OAuth error `{code}`.")]
	Server {
		/// OAuth `error` field.
		code: String,
		/// OAuth `error_description` field.
		description: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
	/// Token request could not be assembled from the supplied parameters.
	#[error("Token request could not be built: {message}.")]
	RequestBuild {
		/// Reason the request was rejected before sending.
		message: String,
	},
	/// Request exceeded the transport's deadline.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout,
	/// Token endpoint answered with something other than a token or an OAuth error.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	UnexpectedResponse {
		/// Transport-supplied summary.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Builds a server-reported OAuth error with only a code.
	pub fn server(code: impl Into<String>) -> Self {
		Self::Server { code: code.into(), description: None, status: None, retry_after: None }
	}

	/// Returns the OAuth error code reported by the token endpoint, if any.
	pub fn server_error_code(&self) -> Option<&str> {
		match self {
			Self::Server { code, .. } => Some(code),
			_ => None,
		}
	}

	/// Returns the HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Server { status, .. }
			| Self::UnexpectedResponse { status, .. }
			| Self::ResponseParse { status, .. } => *status,
			_ => None,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

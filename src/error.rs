//! Gateway-level error types shared across the transport, refresh, and configuration layers.
//!
//! Persistent authentication failures are deliberately absent: the gateway returns the failing
//! response to the caller and reports the failure through [`crate::notify`] instead.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Session refresh failure.
	#[error(transparent)]
	Refresh(#[from] RefreshError),
}

/// Configuration and validation failures raised while assembling a gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Backend base URL cannot be parsed.
	#[error("Backend base URL is invalid.")]
	InvalidBackendBase {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Backend base URL must use an http(s) scheme with a host.
	#[error("Backend base URL must be an absolute http(s) URL: {url}.")]
	UnsupportedBackendBase {
		/// Offending URL.
		url: String,
	},
	/// Allowlisted prefixes must be absolute paths.
	#[error("Backend path prefix `{prefix}` must start with `/`.")]
	InvalidPrefix {
		/// Offending prefix.
		prefix: String,
	},
	/// Durations must not be negative.
	#[error("The {field} window must not be negative.")]
	NegativeWindow {
		/// Name of the offending field.
		field: &'static str,
	},
	/// Request body is a stream that cannot be replayed on retry.
	#[error("Request body is a stream and cannot be replayed.")]
	UnreplayableBody,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO). The gateway never retries these.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Target URL of the failed call.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request URL is relative and the transport has no origin to resolve it against.
	#[error("Request URL `{url}` cannot be resolved to an absolute URL.")]
	InvalidUrl {
		/// Offending URL.
		url: String,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.into(), source: Box::new(src) }
	}
}

/// Session refresh failures. Cloneable so every waiter of a shared refresh observes the same
/// outcome.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefreshError {
	/// No refresh hook has been configured.
	#[error("No session refresh hook is configured.")]
	NotConfigured,
	/// The session source rejected the refresh.
	#[error("Session refresh was rejected: {message}.")]
	Rejected {
		/// Source-supplied message.
		message: String,
	},
}
impl RefreshError {
	/// Builds a [`RefreshError::Rejected`] from any displayable reason.
	pub fn rejected(message: impl Display) -> Self {
		Self::Rejected { message: message.to_string() }
	}
}

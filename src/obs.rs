//! Optional observability helpers for gateway stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to open one span per stage (`auth_gateway.fetch`, `auth_gateway.refresh`,
//!   `auth_gateway.notify`) carrying the entering `site`, plus debug events for each request
//!   attempt and warnings for persistent auth failures and panicking listeners. Tokens are never
//!   recorded.
//! - Enable `metrics` to increment `auth_gateway_fetch_total`, `auth_gateway_refresh_total` and
//!   `auth_gateway_notify_total`, each labeled by `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gateway stages observed by the instrumentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GatewayStage {
	/// A call through [`crate::gateway::FetchGateway`].
	Fetch,
	/// A session refresh through [`crate::refresh::RefreshCoordinator`].
	Refresh,
	/// An auth-failure notification through [`crate::notify::AuthFailureNotifier`].
	Notify,
}
impl GatewayStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GatewayStage::Fetch => "fetch",
			GatewayStage::Refresh => "refresh",
			GatewayStage::Notify => "notify",
		}
	}

	/// Counter incremented for every outcome of this stage.
	pub const fn counter_name(self) -> &'static str {
		match self {
			GatewayStage::Fetch => "auth_gateway_fetch_total",
			GatewayStage::Refresh => "auth_gateway_refresh_total",
			GatewayStage::Notify => "auth_gateway_notify_total",
		}
	}
}
impl Display for GatewayStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Request forwarded without credentials.
	Passthrough,
	/// Request re-issued after an auth failure.
	Retry,
	/// Caller joined an operation already in flight.
	Joined,
	/// Successful completion.
	Success,
	/// Failure observed by the caller.
	Failure,
	/// Work skipped by a cooldown.
	Suppressed,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Passthrough => "passthrough",
			StageOutcome::Retry => "retry",
			StageOutcome::Joined => "joined",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
			StageOutcome::Suppressed => "suppressed",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

//! Single-flight session refresh.
//!
//! [`RefreshCoordinator::refresh_once`] guarantees that at most one call to the configured
//! `refresh_session` hook is in flight. Callers that arrive while a refresh is pending wait on
//! the same guard and, once it settles, observe its outcome instead of starting their own; the
//! first caller to arrive after settlement starts a fresh refresh. N simultaneous 401s
//! therefore produce exactly one call into the session source.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::SessionHooks,
	error::RefreshError,
	obs::{self, GatewayStage, StageOutcome, StageSpan},
};

#[derive(Debug, Default)]
struct RefreshState {
	/// Bumped every time a refresh settles.
	generation: u64,
	last: Option<Result<(), RefreshError>>,
}

/// Coordinates session refreshes across every concurrent caller.
pub struct RefreshCoordinator {
	hooks: Arc<SessionHooks>,
	guard: AsyncMutex<()>,
	state: Mutex<RefreshState>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates a coordinator that refreshes through `hooks`.
	pub fn new(hooks: Arc<SessionHooks>) -> Self {
		Self {
			hooks,
			guard: AsyncMutex::new(()),
			state: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Shared refresh counters.
	pub fn metrics(&self) -> Arc<RefreshMetrics> {
		self.metrics.clone()
	}

	/// Refreshes the session, joining a refresh that is already in flight.
	///
	/// A rejected refresh is returned to every caller that shared it.
	pub async fn refresh_once(&self) -> Result<(), RefreshError> {
		const STAGE: GatewayStage = GatewayStage::Refresh;

		let span = StageSpan::new(STAGE, "refresh_once");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);
		self.metrics.record_attempt();

		let observed = self.state.lock().generation;
		let result = span
			.instrument(async move {
				let _singleflight = self.guard.lock().await;

				if let Some(outcome) = self.settled_since(observed) {
					obs::record_stage_outcome(STAGE, StageOutcome::Joined);

					return outcome;
				}

				self.metrics.record_execution();

				let outcome = self.hooks.refresh_session().await;
				let mut state = self.state.lock();

				state.generation = state.generation.wrapping_add(1);
				state.last = Some(outcome.clone());

				outcome
			})
			.await;

		match &result {
			Ok(()) => {
				self.metrics.record_success();
				obs::record_stage_outcome(STAGE, StageOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);
			},
		}

		result
	}

	/// Forgets the last settled outcome so the next caller always starts a fresh refresh.
	pub fn reset(&self) {
		self.state.lock().last = None;
	}

	fn settled_since(&self, observed: u64) -> Option<Result<(), RefreshError>> {
		let state = self.state.lock();

		if state.generation == observed { None } else { state.last.clone() }
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("state", &*self.state.lock())
			.field("metrics", &self.metrics)
			.finish()
	}
}

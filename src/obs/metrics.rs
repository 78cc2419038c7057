// self
use crate::obs::{GatewayStage, StageOutcome};

/// Increments the stage's own counter (see [`GatewayStage::counter_name`]) with an `outcome`
/// label. A no-op without the `metrics` feature.
pub fn record_stage_outcome(stage: GatewayStage, outcome: StageOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(stage.counter_name(), "outcome" => outcome.as_str()).increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

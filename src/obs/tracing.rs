// self
use crate::{_prelude::*, error::RefreshError, obs::GatewayStage};

/// Future returned by [`StageSpan::instrument`]; instrumented only with the `tracing` feature.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`StageSpan::instrument`]; instrumented only with the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// Span covering one pass through a gateway stage.
///
/// Each stage gets its own span name (`auth_gateway.fetch`, `auth_gateway.refresh`,
/// `auth_gateway.notify`) so subscribers can filter them independently.
#[derive(Clone, Debug)]
pub struct StageSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StageSpan {
	/// Opens the span for `stage`, recording the method that entered it as `site`.
	pub fn new(stage: GatewayStage, site: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = match stage {
				GatewayStage::Fetch => tracing::info_span!("auth_gateway.fetch", site),
				GatewayStage::Refresh => tracing::info_span!("auth_gateway.refresh", site),
				GatewayStage::Notify => tracing::info_span!("auth_gateway.notify", site),
			};

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (stage, site);

			Self {}
		}
	}

	/// Runs `fut` inside the span without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a debug event for a completed request attempt. Headers are never recorded.
pub fn trace_attempt(method: &Method, url: &str, attempt: u8, status: StatusCode) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			method = method.as_str(),
			url,
			attempt,
			status = status.as_u16(),
			"backend request attempt completed"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, url, attempt, status);
	}
}

/// Emits a debug event for a refresh failure the request path swallowed.
pub fn trace_swallowed_refresh(site: &'static str, error: &RefreshError) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(site, error = %error, "session refresh failed; continuing");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (site, error);
	}
}

/// Emits a warning for an auth failure that survived the retry.
pub fn trace_auth_failure(url: &str, status: StatusCode, emitted: bool) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			url,
			status = status.as_u16(),
			emitted,
			"backend request failed authentication after retry"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (url, status, emitted);
	}
}

/// Emits a warning for an event listener that panicked while handling `topic`.
pub fn trace_listener_panic(topic: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(topic, "auth event listener panicked; remaining listeners still notified");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = topic;
	}
}

/// Emits a warning for an event that could not be encoded as its topic payload.
pub fn trace_payload_error(topic: &'static str, error: &serde_json::Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(topic, error = %error, "auth event payload could not be encoded");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (topic, error);
	}
}

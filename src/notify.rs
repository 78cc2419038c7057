//! Terminal auth-failure notifications.
//!
//! [`AuthFailureNotifier`] turns a request that still fails authentication after its retry into
//! a `backend-auth-failed` + `auth-expired` event pair on an [`EventBus`], then awaits the
//! configured `on_auth_expired` hook. A [`CooldownGate`] collapses bursts of concurrent failures
//! into a single notification cycle per window.

mod bus;
mod policy;

pub use bus::*;
pub use policy::*;

// std
use std::time::{Duration as StdDuration, Instant};
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::SessionHooks,
	http::GatewayResponse,
	obs::{self, GatewayStage, StageOutcome, StageSpan},
};

const MESSAGE_FIELDS: &[&str] = &["message", "error_description", "error", "msg"];
const REQUEST_ID_HEADERS: &[&str] = &["x-request-id", "x-correlation-id", "request-id"];

/// Topics published on the event bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthTopic {
	/// Low-level notice that a backend call failed authentication.
	BackendAuthFailed,
	/// Application-level notice that the session is unusable.
	AuthExpired,
}
impl AuthTopic {
	/// Topic name as seen by platform adapters.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthTopic::BackendAuthFailed => "backend-auth-failed",
			AuthTopic::AuthExpired => "auth-expired",
		}
	}
}
impl Display for AuthTopic {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Classification attached to `auth-expired`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureReason {
	/// The body says the session is invalid or expired.
	InvalidSession,
	/// Generic 401/403.
	AuthFailed,
}

/// Event delivered to auth-failure listeners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFailureEvent {
	/// Human-readable failure message.
	pub message: String,
	/// URL of the failing request as the caller supplied it.
	pub url: String,
	/// HTTP status of the final response.
	pub status: u16,
	/// Backend correlation identifier, when one was returned.
	pub request_id: Option<String>,
	/// Failure classification.
	pub reason: AuthFailureReason,
	/// Moment the failure was announced.
	#[serde(with = "time::serde::rfc3339")]
	pub at: OffsetDateTime,
}
impl AuthFailureEvent {
	/// JSON payload published on `topic`; `backend-auth-failed` carries no `reason`.
	pub fn payload(&self, topic: AuthTopic) -> Result<Value, serde_json::Error> {
		let mut payload = serde_json::to_value(self)?;

		if let (AuthTopic::BackendAuthFailed, Value::Object(fields)) = (topic, &mut payload) {
			fields.remove("reason");
		}

		Ok(payload)
	}
}

/// Facts extracted from a response that failed authentication after retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthFailureDetail {
	/// Failure message.
	pub message: String,
	/// Request URL.
	pub url: String,
	/// Response status.
	pub status: StatusCode,
	/// Correlation identifier.
	pub request_id: Option<String>,
	/// Response body, used to classify the failure.
	pub body: String,
}
impl AuthFailureDetail {
	/// Extracts the message and request id from `response`.
	///
	/// The message comes from the first non-empty `message`, `error_description`, `error` or
	/// `msg` JSON field, else the status reason. The request id comes from the `x-request-id`,
	/// `x-correlation-id` or `request-id` header, else the JSON `request_id` field.
	pub fn from_response(url: impl Into<String>, response: &GatewayResponse) -> Self {
		let body = response.text().into_owned();
		let json = serde_json::from_str::<Value>(&body).ok();
		let message = json
			.as_ref()
			.and_then(|json| {
				MESSAGE_FIELDS.iter().find_map(|field| {
					json.get(field)
						.and_then(Value::as_str)
						.map(str::trim)
						.filter(|message| !message.is_empty())
						.map(ToOwned::to_owned)
				})
			})
			.unwrap_or_else(|| {
				response.status.canonical_reason().unwrap_or("Authentication failed").to_owned()
			});
		let request_id = REQUEST_ID_HEADERS
			.iter()
			.find_map(|name| response.header(*name))
			.map(ToOwned::to_owned)
			.or_else(|| {
				json.as_ref()
					.and_then(|json| json.get("request_id"))
					.and_then(Value::as_str)
					.map(ToOwned::to_owned)
			});

		Self { message, url: url.into(), status: response.status, request_id, body }
	}
}

/// Admits at most one caller per cooldown window.
#[derive(Debug)]
pub struct CooldownGate {
	cooldown: StdDuration,
	tripped_at: Mutex<Option<Instant>>,
}
impl CooldownGate {
	/// Creates an open gate with the provided window.
	pub fn new(cooldown: StdDuration) -> Self {
		Self { cooldown, tripped_at: Mutex::new(None) }
	}

	/// Configured window.
	pub fn cooldown(&self) -> StdDuration {
		self.cooldown
	}

	/// Trips the gate unless it was tripped less than one window before `now`.
	pub fn try_acquire_at(&self, now: Instant) -> bool {
		let mut tripped_at = self.tripped_at.lock();

		let cooling = |previous: Instant| now.saturating_duration_since(previous) < self.cooldown;

		if tripped_at.is_some_and(cooling) {
			return false;
		}

		*tripped_at = Some(now);

		true
	}

	/// [`CooldownGate::try_acquire_at`] against the current instant.
	pub fn try_acquire(&self) -> bool {
		self.try_acquire_at(Instant::now())
	}

	/// Re-opens the gate.
	pub fn reset(&self) {
		*self.tripped_at.lock() = None;
	}
}

/// Publishes terminal auth failures.
pub struct AuthFailureNotifier {
	bus: Arc<dyn EventBus>,
	hooks: Arc<SessionHooks>,
	policy: Arc<dyn AuthFailurePolicy>,
	gate: CooldownGate,
}
impl AuthFailureNotifier {
	/// Creates a notifier over `bus` that reads `on_auth_expired` from `hooks`.
	pub fn new(
		bus: Arc<dyn EventBus>,
		hooks: Arc<SessionHooks>,
		policy: Arc<dyn AuthFailurePolicy>,
		cooldown: StdDuration,
	) -> Self {
		Self { bus, hooks, policy, gate: CooldownGate::new(cooldown) }
	}

	/// Announces `detail` unless a notification went out within the cooldown window.
	///
	/// Returns whether the event pair was published.
	pub async fn notify(&self, detail: AuthFailureDetail) -> bool {
		const STAGE: GatewayStage = GatewayStage::Notify;

		let span = StageSpan::new(STAGE, "notify");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		if !self.gate.try_acquire() {
			obs::record_stage_outcome(STAGE, StageOutcome::Suppressed);

			return false;
		}

		let event = AuthFailureEvent {
			reason: self.policy.reason(&detail.body),
			message: detail.message,
			url: detail.url,
			status: detail.status.as_u16(),
			request_id: detail.request_id,
			at: OffsetDateTime::now_utc(),
		};

		// Bus adapters shape each topic's payload through `AuthFailureEvent::payload`.
		self.bus.publish(AuthTopic::BackendAuthFailed, &event);
		self.bus.publish(AuthTopic::AuthExpired, &event);
		span.instrument(self.hooks.on_auth_expired(event)).await;
		obs::record_stage_outcome(STAGE, StageOutcome::Success);

		true
	}

	/// Registers `listener` for `auth-expired`.
	pub fn on_auth_expired_event<F>(&self, listener: F) -> Subscription
	where
		F: 'static + Send + Sync + Fn(&AuthFailureEvent),
	{
		self.bus.subscribe(AuthTopic::AuthExpired, Arc::new(listener))
	}

	/// Re-opens the cooldown gate.
	pub fn reset(&self) {
		self.gate.reset();
	}
}
impl Debug for AuthFailureNotifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthFailureNotifier").field("gate", &self.gate).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::auth::GatewayOptions;

	fn unauthorized(body: &str) -> GatewayResponse {
		GatewayResponse::new(StatusCode::UNAUTHORIZED).with_body(body)
	}

	#[test]
	fn gate_suppresses_within_window_and_reopens_after() {
		let gate = CooldownGate::new(StdDuration::from_millis(1_000));
		let start = Instant::now();

		assert!(gate.try_acquire_at(start));
		assert!(!gate.try_acquire_at(start + StdDuration::from_millis(200)));
		assert!(gate.try_acquire_at(start + StdDuration::from_millis(1_500)));
		assert!(!gate.try_acquire_at(start + StdDuration::from_millis(1_700)));

		gate.reset();

		assert!(gate.try_acquire_at(start + StdDuration::from_millis(1_800)));
	}

	#[test]
	fn detail_prefers_json_message_and_header_request_id() {
		let body = r#"{"error":"","message":"JWT expired","request_id":"body-id"}"#;
		let response = unauthorized(body).with_header(
			HeaderName::from_static("x-request-id"),
			HeaderValue::from_static("header-id"),
		);
		let detail = AuthFailureDetail::from_response("/movements", &response);

		assert_eq!(detail.message, "JWT expired");
		assert_eq!(detail.request_id.as_deref(), Some("header-id"));
		assert_eq!(detail.status, StatusCode::UNAUTHORIZED);
	}

	#[test]
	fn detail_falls_back_to_body_request_id_and_status_reason() {
		let detail = AuthFailureDetail::from_response(
			"/movements",
			&unauthorized(r#"{"request_id":"body-id"}"#),
		);

		assert_eq!(detail.message, "Unauthorized");
		assert_eq!(detail.request_id.as_deref(), Some("body-id"));

		let detail = AuthFailureDetail::from_response("/movements", &unauthorized("plain text"));

		assert_eq!(detail.message, "Unauthorized");
		assert!(detail.request_id.is_none());
	}

	#[test]
	fn backend_payload_omits_reason() {
		let event = AuthFailureEvent {
			message: "Invalid session".into(),
			url: "/movements".into(),
			status: 403,
			request_id: Some("req-1".into()),
			reason: AuthFailureReason::InvalidSession,
			at: OffsetDateTime::UNIX_EPOCH,
		};
		let backend = event.payload(AuthTopic::BackendAuthFailed).expect("Payload should encode.");
		let expired = event.payload(AuthTopic::AuthExpired).expect("Payload should encode.");

		assert!(backend.get("reason").is_none());
		assert_eq!(expired["reason"], "invalid_session");
		assert_eq!(expired["at"], "1970-01-01T00:00:00Z");
		assert_eq!(backend["request_id"], "req-1");
	}

	#[tokio::test]
	async fn notify_publishes_both_topics_and_awaits_hook_once_per_window() {
		let bus = Arc::new(MemoryEventBus::default());
		let hook_calls = Arc::new(AtomicUsize::new(0));
		let hook_counter = hook_calls.clone();
		let options = GatewayOptions::default().with_on_auth_expired(move |_| {
			let counter = hook_counter.clone();

			async move {
				counter.fetch_add(1, Ordering::SeqCst);
			}
		});
		let hooks = Arc::new(SessionHooks::with_options(options));
		let notifier = AuthFailureNotifier::new(
			bus.clone(),
			hooks,
			Arc::new(DefaultAuthFailurePolicy::default()),
			StdDuration::from_secs(60),
		);
		let backend = Arc::new(Mutex::new(Vec::new()));
		let expired = Arc::new(Mutex::new(Vec::new()));
		let backend_sink = backend.clone();
		let expired_sink = expired.clone();

		bus.subscribe(
			AuthTopic::BackendAuthFailed,
			Arc::new(move |event: &AuthFailureEvent| backend_sink.lock().push(event.clone())),
		);

		let subscription = notifier.on_auth_expired_event(move |event: &AuthFailureEvent| {
			expired_sink.lock().push(event.clone());
		});

		assert!(
			notifier
				.notify(AuthFailureDetail::from_response(
					"/movements",
					&unauthorized(r#"{"message":"JWT expired"}"#),
				))
				.await
		);
		assert!(
			!notifier
				.notify(AuthFailureDetail::from_response("/events", &unauthorized("")))
				.await
		);
		assert_eq!(backend.lock().len(), 1);
		assert_eq!(expired.lock().len(), 1);
		assert_eq!(expired.lock()[0].reason, AuthFailureReason::InvalidSession);
		assert_eq!(hook_calls.load(Ordering::SeqCst), 1);

		subscription.unsubscribe();
		notifier.reset();

		assert!(
			notifier.notify(AuthFailureDetail::from_response("/events", &unauthorized(""))).await
		);
		assert_eq!(backend.lock().len(), 2);
		assert_eq!(expired.lock().len(), 1);
		assert_eq!(hook_calls.load(Ordering::SeqCst), 2);
	}
}

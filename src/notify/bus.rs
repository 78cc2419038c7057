//! Publish/subscribe contract for auth notifications and an in-process implementation.

// std
use std::{
	panic::{self, AssertUnwindSafe},
	sync::atomic::{AtomicU64, Ordering},
};
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	notify::{AuthFailureEvent, AuthTopic},
	obs,
};

/// Listener invoked for every event published on a subscribed topic.
pub type EventHandler = Arc<dyn Fn(&AuthFailureEvent) + Send + Sync>;
/// Receives the topic name and the JSON payload shaped for that topic.
pub type PayloadSink = Arc<dyn Fn(&'static str, Value) + Send + Sync>;

/// Platform event bus abstraction.
///
/// In-process listeners receive the typed [`AuthFailureEvent`], `reason` included on both
/// topics. Adapters that hand events to a host notification channel must encode them with
/// [`AuthFailureEvent::payload`], which drops `reason` from `backend-auth-failed`;
/// [`JsonEventBus`] does exactly that.
pub trait EventBus
where
	Self: Send + Sync,
{
	/// Delivers `event` to every listener of `topic`.
	fn publish(&self, topic: AuthTopic, event: &AuthFailureEvent);

	/// Registers `handler` for `topic`.
	fn subscribe(&self, topic: AuthTopic, handler: EventHandler) -> Subscription;
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle keeps the listener registered; call [`Subscription::unsubscribe`] to
/// detach it.
pub struct Subscription(Option<Box<dyn FnOnce() + Send + Sync>>);
impl Subscription {
	/// Wraps the closure that detaches the listener.
	pub fn new<F>(cancel: F) -> Self
	where
		F: 'static + Send + Sync + FnOnce(),
	{
		Self(Some(Box::new(cancel)))
	}

	/// Handle for a listener that cannot be detached.
	pub fn detached() -> Self {
		Self(None)
	}

	/// Detaches the listener.
	pub fn unsubscribe(mut self) {
		if let Some(cancel) = self.0.take() {
			cancel();
		}
	}
}
impl Debug for Subscription {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Subscription").field(&self.0.is_some()).finish()
	}
}

type ListenerMap = Arc<RwLock<HashMap<AuthTopic, Vec<(u64, EventHandler)>>>>;

/// Thread-safe in-process event bus.
///
/// Listeners run synchronously on the publishing task. A panicking listener is isolated so
/// the remaining listeners still receive the event.
#[derive(Clone, Default)]
pub struct MemoryEventBus {
	listeners: ListenerMap,
	next_id: Arc<AtomicU64>,
}
impl MemoryEventBus {
	/// Number of listeners registered for `topic`.
	pub fn listener_count(&self, topic: AuthTopic) -> usize {
		self.listeners.read().get(&topic).map_or(0, Vec::len)
	}
}
impl EventBus for MemoryEventBus {
	fn publish(&self, topic: AuthTopic, event: &AuthFailureEvent) {
		let handlers = match self.listeners.read().get(&topic) {
			Some(entries) =>
				entries.iter().map(|(_, handler)| handler.clone()).collect::<Vec<_>>(),
			None => return,
		};

		for handler in handlers {
			if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
				obs::trace_listener_panic(topic.as_str());
			}
		}
	}

	fn subscribe(&self, topic: AuthTopic, handler: EventHandler) -> Subscription {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let listeners = self.listeners.clone();

		listeners.write().entry(topic).or_default().push((id, handler));

		Subscription::new(move || {
			if let Some(entries) = listeners.write().get_mut(&topic) {
				entries.retain(|(entry_id, _)| *entry_id != id);
			}
		})
	}
}
impl Debug for MemoryEventBus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryEventBus")
			.field("backend_auth_failed", &self.listener_count(AuthTopic::BackendAuthFailed))
			.field("auth_expired", &self.listener_count(AuthTopic::AuthExpired))
			.finish()
	}
}

/// Adapter that forwards every event to a host channel as its topic payload.
///
/// The sink receives `(topic name, payload)` where the payload comes from
/// [`AuthFailureEvent::payload`]. Typed listeners registered through [`EventBus::subscribe`] are
/// served by an inner [`MemoryEventBus`].
#[derive(Clone)]
pub struct JsonEventBus {
	sink: PayloadSink,
	local: MemoryEventBus,
}
impl JsonEventBus {
	/// Creates an adapter that forwards payloads to `sink`.
	pub fn new<F>(sink: F) -> Self
	where
		F: 'static + Send + Sync + Fn(&'static str, Value),
	{
		Self { sink: Arc::new(sink), local: MemoryEventBus::default() }
	}
}
impl EventBus for JsonEventBus {
	fn publish(&self, topic: AuthTopic, event: &AuthFailureEvent) {
		let name = topic.as_str();

		match event.payload(topic) {
			Ok(payload) => {
				let forward = AssertUnwindSafe(|| (self.sink)(name, payload));

				if panic::catch_unwind(forward).is_err() {
					obs::trace_listener_panic(name);
				}
			},
			Err(e) => obs::trace_payload_error(name, &e),
		}

		self.local.publish(topic, event);
	}

	fn subscribe(&self, topic: AuthTopic, handler: EventHandler) -> Subscription {
		self.local.subscribe(topic, handler)
	}
}
impl Debug for JsonEventBus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JsonEventBus").field("local", &self.local).finish()
	}
}

//! Session source strategy contract and a thread-safe in-memory implementation.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, HookFuture, Session},
	error::RefreshError,
};

/// Strategy interface over the identity provider's session store.
///
/// Every method has a no-op default so implementors override only what their backend offers.
/// Returned futures must own their state (`'static`) because the gateway may await them after
/// the borrow of `self` ends.
pub trait SessionSource
where
	Self: Send + Sync,
{
	/// Best-effort cached session.
	fn session(&self) -> Option<Session> {
		None
	}

	/// Best-effort cached token; defaults to the cached session's token.
	fn access_token(&self) -> Option<AccessToken> {
		self.session().map(|session| session.access_token)
	}

	/// Authoritative session lookup; defaults to the cached session.
	fn session_async(&self) -> HookFuture<Option<Session>> {
		let session = self.session();

		Box::pin(async move { session })
	}

	/// Authoritative token lookup; defaults to the cached token.
	fn access_token_async(&self) -> HookFuture<Option<AccessToken>> {
		let token = self.access_token();

		Box::pin(async move { token })
	}

	/// Refreshes the session with the identity provider.
	fn refresh_session(&self) -> HookFuture<Result<(), RefreshError>> {
		Box::pin(async { Err(RefreshError::NotConfigured) })
	}
}

/// Produces the next session from the current one during a refresh.
pub type SessionRefresher =
	Arc<dyn Fn(Option<Session>) -> HookFuture<Result<Session, RefreshError>> + Send + Sync>;

/// Thread-safe session source that keeps the session in-process for tests and demos.
#[derive(Clone, Default)]
pub struct MemorySessionSource {
	session: Arc<RwLock<Option<Session>>>,
	refresher: Arc<RwLock<Option<SessionRefresher>>>,
	refreshes: Arc<AtomicU64>,
}
impl MemorySessionSource {
	/// Creates a source seeded with `session`.
	pub fn new(session: Session) -> Self {
		let source = Self::default();

		source.set_session(session);

		source
	}

	/// Installs the refresher used by [`SessionSource::refresh_session`].
	pub fn with_refresher<F, Fut>(self, refresher: F) -> Self
	where
		F: 'static + Send + Sync + Fn(Option<Session>) -> Fut,
		Fut: 'static + Send + Future<Output = Result<Session, RefreshError>>,
	{
		*self.refresher.write() = Some(Arc::new(
			move |current: Option<Session>| -> HookFuture<Result<Session, RefreshError>> {
				Box::pin(refresher(current))
			},
		));

		self
	}

	/// Replaces the stored session.
	pub fn set_session(&self, session: Session) {
		*self.session.write() = Some(session);
	}

	/// Removes the stored session (signed out).
	pub fn clear(&self) {
		self.session.write().take();
	}

	/// Number of refreshes that reached the refresher.
	pub fn refresh_count(&self) -> u64 {
		self.refreshes.load(Ordering::Relaxed)
	}
}
impl SessionSource for MemorySessionSource {
	fn session(&self) -> Option<Session> {
		self.session.read().clone()
	}

	fn refresh_session(&self) -> HookFuture<Result<(), RefreshError>> {
		let slot = self.session.clone();
		let refresher = self.refresher.read().clone();
		let refreshes = self.refreshes.clone();

		Box::pin(async move {
			let Some(refresher) = refresher else {
				return Err(RefreshError::NotConfigured);
			};

			refreshes.fetch_add(1, Ordering::Relaxed);

			let current = slot.read().clone();
			let next = refresher(current).await?;

			*slot.write() = Some(next);

			Ok(())
		})
	}
}
impl Debug for MemorySessionSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemorySessionSource")
			.field("session", &*self.session.read())
			.field("refresher_set", &self.refresher.read().is_some())
			.field("refreshes", &self.refresh_count())
			.finish()
	}
}

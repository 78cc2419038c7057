//! Injected hooks for reading tokens, refreshing sessions, and reacting to expired auth.
//!
//! [`GatewayOptions`] collects the hooks a composition root wants to install; every field is
//! optional. [`SessionHooks`] holds the installed set and swaps it atomically on
//! [`SessionHooks::configure`], keeping previously installed hooks for any option left unset.
//! Until configured, every getter yields `None` and refreshes report
//! [`RefreshError::NotConfigured`], so the gateway is safe to install early.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Session, SessionSource},
	error::RefreshError,
	notify::AuthFailureEvent,
};

/// Boxed `'static` future returned by asynchronous hooks.
pub type HookFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Synchronous best-effort token getter.
pub type AccessTokenHook = Arc<dyn Fn() -> Option<AccessToken> + Send + Sync>;
/// Synchronous best-effort session getter.
pub type SessionHook = Arc<dyn Fn() -> Option<Session> + Send + Sync>;
/// Authoritative asynchronous token getter.
pub type AsyncAccessTokenHook = Arc<dyn Fn() -> HookFuture<Option<AccessToken>> + Send + Sync>;
/// Authoritative asynchronous session getter.
pub type AsyncSessionHook = Arc<dyn Fn() -> HookFuture<Option<Session>> + Send + Sync>;
/// Asks the session source to refresh the session.
pub type RefreshHook = Arc<dyn Fn() -> HookFuture<Result<(), RefreshError>> + Send + Sync>;
/// Awaited after an `auth-expired` notification so the application can force a sign-out.
pub type AuthExpiredHook = Arc<dyn Fn(AuthFailureEvent) -> HookFuture<()> + Send + Sync>;

/// Optional hook set applied through [`SessionHooks::configure`].
#[derive(Clone, Default)]
pub struct GatewayOptions {
	/// Synchronous best-effort token getter.
	pub get_access_token: Option<AccessTokenHook>,
	/// Synchronous best-effort session getter.
	pub get_session: Option<SessionHook>,
	/// Authoritative asynchronous token getter.
	pub get_access_token_async: Option<AsyncAccessTokenHook>,
	/// Authoritative asynchronous session getter.
	pub get_session_async: Option<AsyncSessionHook>,
	/// Callback awaited when authentication is unrecoverable.
	pub on_auth_expired: Option<AuthExpiredHook>,
	/// Session refresh callback.
	pub refresh_session: Option<RefreshHook>,
}
impl GatewayOptions {
	/// Wires every hook to a single [`SessionSource`] strategy.
	pub fn from_source<S>(source: Arc<S>) -> Self
	where
		S: 'static + SessionSource,
	{
		let token_source = source.clone();
		let session_source = source.clone();
		let async_token_source = source.clone();
		let async_session_source = source.clone();
		let refresh_source = source;

		Self {
			get_access_token: Some(Arc::new(move || token_source.access_token())),
			get_session: Some(Arc::new(move || session_source.session())),
			get_access_token_async: Some(Arc::new(move || {
				async_token_source.access_token_async()
			})),
			get_session_async: Some(Arc::new(move || async_session_source.session_async())),
			on_auth_expired: None,
			refresh_session: Some(Arc::new(move || refresh_source.refresh_session())),
		}
	}

	/// Sets the synchronous token getter.
	pub fn with_access_token<F>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Option<AccessToken>,
	{
		self.get_access_token = Some(Arc::new(hook));

		self
	}

	/// Sets the synchronous session getter.
	pub fn with_session<F>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Option<Session>,
	{
		self.get_session = Some(Arc::new(hook));

		self
	}

	/// Sets the asynchronous token getter.
	pub fn with_access_token_async<F, Fut>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Fut,
		Fut: 'static + Send + Future<Output = Option<AccessToken>>,
	{
		self.get_access_token_async =
			Some(Arc::new(move || -> HookFuture<Option<AccessToken>> { Box::pin(hook()) }));

		self
	}

	/// Sets the asynchronous session getter.
	pub fn with_session_async<F, Fut>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Fut,
		Fut: 'static + Send + Future<Output = Option<Session>>,
	{
		self.get_session_async =
			Some(Arc::new(move || -> HookFuture<Option<Session>> { Box::pin(hook()) }));

		self
	}

	/// Sets the callback awaited on `auth-expired`.
	pub fn with_on_auth_expired<F, Fut>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn(AuthFailureEvent) -> Fut,
		Fut: 'static + Send + Future<Output = ()>,
	{
		self.on_auth_expired = Some(Arc::new(move |event: AuthFailureEvent| -> HookFuture<()> {
			Box::pin(hook(event))
		}));

		self
	}

	/// Sets the session refresh callback.
	pub fn with_refresh_session<F, Fut>(mut self, hook: F) -> Self
	where
		F: 'static + Send + Sync + Fn() -> Fut,
		Fut: 'static + Send + Future<Output = Result<(), RefreshError>>,
	{
		self.refresh_session =
			Some(Arc::new(move || -> HookFuture<Result<(), RefreshError>> { Box::pin(hook()) }));

		self
	}
}
impl Debug for GatewayOptions {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GatewayOptions")
			.field("get_access_token", &self.get_access_token.is_some())
			.field("get_session", &self.get_session.is_some())
			.field("get_access_token_async", &self.get_access_token_async.is_some())
			.field("get_session_async", &self.get_session_async.is_some())
			.field("on_auth_expired", &self.on_auth_expired.is_some())
			.field("refresh_session", &self.refresh_session.is_some())
			.finish()
	}
}

#[derive(Clone)]
struct HookSet {
	get_access_token: AccessTokenHook,
	get_session: SessionHook,
	get_access_token_async: AsyncAccessTokenHook,
	get_session_async: AsyncSessionHook,
	on_auth_expired: AuthExpiredHook,
	refresh_session: RefreshHook,
}
impl HookSet {
	fn merge(&self, options: GatewayOptions) -> Self {
		Self {
			get_access_token: options
				.get_access_token
				.unwrap_or_else(|| self.get_access_token.clone()),
			get_session: options.get_session.unwrap_or_else(|| self.get_session.clone()),
			get_access_token_async: options
				.get_access_token_async
				.unwrap_or_else(|| self.get_access_token_async.clone()),
			get_session_async: options
				.get_session_async
				.unwrap_or_else(|| self.get_session_async.clone()),
			on_auth_expired: options
				.on_auth_expired
				.unwrap_or_else(|| self.on_auth_expired.clone()),
			refresh_session: options
				.refresh_session
				.unwrap_or_else(|| self.refresh_session.clone()),
		}
	}
}
impl Default for HookSet {
	fn default() -> Self {
		Self {
			get_access_token: Arc::new(|| -> Option<AccessToken> { None }),
			get_session: Arc::new(|| -> Option<Session> { None }),
			get_access_token_async: Arc::new(|| -> HookFuture<Option<AccessToken>> {
				Box::pin(async { None })
			}),
			get_session_async: Arc::new(|| -> HookFuture<Option<Session>> {
				Box::pin(async { None })
			}),
			on_auth_expired: Arc::new(|_: AuthFailureEvent| -> HookFuture<()> {
				Box::pin(async {})
			}),
			refresh_session: Arc::new(|| -> HookFuture<Result<(), RefreshError>> {
				Box::pin(async { Err(RefreshError::NotConfigured) })
			}),
		}
	}
}

/// Installed hook set shared by the gateway, refresh coordinator, and notifier.
///
/// Each call reads a snapshot of the hooks and releases the lock before invoking them, so a
/// hook may call [`SessionHooks::configure`] without deadlocking.
#[derive(Default)]
pub struct SessionHooks(RwLock<Arc<HookSet>>);
impl SessionHooks {
	/// Creates a hook set pre-populated with `options`.
	pub fn with_options(options: GatewayOptions) -> Self {
		let hooks = Self::default();

		hooks.configure(options);

		hooks
	}

	/// Replaces the hooks supplied in `options` in a single swap; unset options keep their
	/// previously installed hooks.
	pub fn configure(&self, options: GatewayOptions) {
		let mut guard = self.0.write();
		let merged = guard.merge(options);

		*guard = Arc::new(merged);
	}

	/// Restores the no-op defaults.
	pub fn reset(&self) {
		*self.0.write() = Arc::default();
	}

	/// Synchronous best-effort token; may be stale or absent.
	pub fn access_token(&self) -> Option<AccessToken> {
		(self.snapshot().get_access_token)()
	}

	/// Synchronous best-effort session; may be stale or absent.
	pub fn session(&self) -> Option<Session> {
		(self.snapshot().get_session)()
	}

	/// Authoritative token lookup.
	pub async fn access_token_async(&self) -> Option<AccessToken> {
		let hook = self.snapshot().get_access_token_async.clone();

		hook().await
	}

	/// Authoritative session lookup.
	pub async fn session_async(&self) -> Option<Session> {
		let hook = self.snapshot().get_session_async.clone();

		hook().await
	}

	/// Current session: the synchronous getter first, then the asynchronous one on a miss.
	pub async fn current_session(&self) -> Option<Session> {
		match self.session() {
			Some(session) => Some(session),
			None => self.session_async().await,
		}
	}

	/// Freshest token available: the synchronous getter first, then the asynchronous one.
	///
	/// Blank tokens count as a miss.
	pub async fn freshest_token(&self) -> Option<AccessToken> {
		match self.access_token().filter(|token| !token.is_blank()) {
			Some(token) => Some(token),
			None => self.access_token_async().await.filter(|token| !token.is_blank()),
		}
	}

	/// Starts a session refresh through the configured hook.
	pub fn refresh_session(&self) -> HookFuture<Result<(), RefreshError>> {
		(self.snapshot().refresh_session)()
	}

	/// Invokes the configured `on_auth_expired` callback.
	pub fn on_auth_expired(&self, event: AuthFailureEvent) -> HookFuture<()> {
		(self.snapshot().on_auth_expired)(event)
	}

	fn snapshot(&self) -> Arc<HookSet> {
		self.0.read().clone()
	}
}
impl Debug for SessionHooks {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("SessionHooks(..)")
	}
}

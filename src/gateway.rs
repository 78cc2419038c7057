//! Authenticated fetch decorator.
//!
//! [`FetchGateway`] wraps any [`HttpClient`] and implements [`HttpClient`] itself. For
//! backend-bound requests it proactively refreshes sessions that are about to expire, injects
//! the freshest bearer token (overwriting whatever `Authorization` the caller supplied), retries
//! exactly once after an authentication failure, and hands persistent failures to the
//! [`AuthFailureNotifier`]. Every other request passes through untouched.
//!
//! Persistent authentication failures are returned to the caller as ordinary responses; only
//! transport failures surface as errors.

// std
use std::{
	sync::atomic::{AtomicBool, Ordering},
	time::Duration as StdDuration,
};
// self
use crate::{
	_prelude::*,
	auth::{GatewayOptions, SessionHooks},
	classify::RequestClassifier,
	config::GatewayConfig,
	error::{ConfigError, TransportError},
	http::{GatewayRequest, GatewayResponse, HttpClient, HttpFuture},
	notify::{
		AuthFailureDetail, AuthFailureEvent, AuthFailureNotifier, AuthFailurePolicy,
		DefaultAuthFailurePolicy, EventBus, MemoryEventBus, Subscription,
	},
	obs::{self, GatewayStage, StageOutcome, StageSpan},
	refresh::{RefreshCoordinator, RefreshMetrics},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

// Final response of an authenticated send, classified once by the auth-failure policy.
enum Delivery {
	Accepted(GatewayResponse),
	Rejected(GatewayResponse),
}

/// Builder for [`FetchGateway`].
pub struct FetchGatewayBuilder<C> {
	config: GatewayConfig,
	inner: C,
	bus: Option<Arc<dyn EventBus>>,
	policy: Option<Arc<dyn AuthFailurePolicy>>,
	options: GatewayOptions,
}
impl<C> FetchGatewayBuilder<C>
where
	C: HttpClient,
{
	/// Publishes notifications on `bus` instead of a private [`MemoryEventBus`].
	pub fn event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
		self.bus = Some(bus);

		self
	}

	/// Replaces the [`DefaultAuthFailurePolicy`].
	pub fn policy<P>(mut self, policy: P) -> Self
	where
		P: 'static + AuthFailurePolicy,
	{
		self.policy = Some(Arc::new(policy));

		self
	}

	/// Hooks installed when the gateway is built.
	pub fn options(mut self, options: GatewayOptions) -> Self {
		self.options = options;

		self
	}

	/// Validates the configuration and assembles the gateway.
	///
	/// The gateway starts uninstalled; call [`FetchGateway::install`] once the composition root
	/// is ready.
	pub fn build(self) -> Result<FetchGateway<C>, ConfigError> {
		self.config.validate()?;

		let notify_cooldown = StdDuration::try_from(self.config.notify_cooldown)
			.map_err(|_| ConfigError::NegativeWindow { field: "notify_cooldown" })?;
		let hooks = Arc::new(SessionHooks::with_options(self.options));
		let bus = self.bus.unwrap_or_else(|| Arc::new(MemoryEventBus::default()));
		let policy = self.policy.unwrap_or_else(|| Arc::new(DefaultAuthFailurePolicy::default()));

		Ok(FetchGateway {
			classifier: RequestClassifier::from_config(&self.config),
			refresher: RefreshCoordinator::new(hooks.clone()),
			notifier: AuthFailureNotifier::new(bus, hooks.clone(), policy.clone(), notify_cooldown),
			near_expiry_window: self.config.near_expiry_window,
			installed: AtomicBool::new(false),
			inner: self.inner,
			hooks,
			policy,
		})
	}
}
impl<C> Debug for FetchGatewayBuilder<C> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FetchGatewayBuilder")
			.field("config", &self.config)
			.field("custom_bus", &self.bus.is_some())
			.field("custom_policy", &self.policy.is_some())
			.field("options", &self.options)
			.finish()
	}
}

/// Decorator that authenticates backend-bound requests.
pub struct FetchGateway<C> {
	inner: C,
	classifier: RequestClassifier,
	hooks: Arc<SessionHooks>,
	refresher: RefreshCoordinator,
	notifier: AuthFailureNotifier,
	policy: Arc<dyn AuthFailurePolicy>,
	near_expiry_window: Duration,
	installed: AtomicBool,
}
impl<C> FetchGateway<C>
where
	C: HttpClient,
{
	/// Starts a builder around the `inner` transport.
	pub fn builder(config: GatewayConfig, inner: C) -> FetchGatewayBuilder<C> {
		FetchGatewayBuilder {
			config,
			inner,
			bus: None,
			policy: None,
			options: GatewayOptions::default(),
		}
	}

	/// Builds a gateway with the default bus and policy.
	pub fn new(config: GatewayConfig, inner: C) -> Result<Self, ConfigError> {
		Self::builder(config, inner).build()
	}

	/// Activates request decoration. Returns `false` if the gateway was already installed.
	pub fn install(&self) -> bool {
		!self.installed.swap(true, Ordering::AcqRel)
	}

	/// Whether request decoration is active.
	pub fn is_installed(&self) -> bool {
		self.installed.load(Ordering::Acquire)
	}

	/// Returns the gateway to its freshly built state: uninstalled, no-op hooks, no remembered
	/// refresh outcome, and an open cooldown gate.
	pub fn reset(&self) {
		self.installed.store(false, Ordering::Release);
		self.hooks.reset();
		self.refresher.reset();
		self.notifier.reset();
	}

	/// Swaps in the hooks supplied by `options`; unset hooks keep their current values.
	pub fn configure(&self, options: GatewayOptions) {
		self.hooks.configure(options);
	}

	/// Registers a listener for `auth-expired` notifications.
	pub fn on_auth_expired_event<F>(&self, listener: F) -> Subscription
	where
		F: 'static + Send + Sync + Fn(&AuthFailureEvent),
	{
		self.notifier.on_auth_expired_event(listener)
	}

	/// Request classifier in use.
	pub fn classifier(&self) -> &RequestClassifier {
		&self.classifier
	}

	/// Shared refresh coordinator.
	pub fn refresher(&self) -> &RefreshCoordinator {
		&self.refresher
	}

	/// Refresh counters.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.refresher.metrics()
	}

	/// Wrapped transport.
	pub fn inner(&self) -> &C {
		&self.inner
	}

	/// Sends `request`, authenticating it when it is backend-bound.
	pub async fn send<R>(&self, request: R) -> Result<GatewayResponse, TransportError>
	where
		R: Into<GatewayRequest>,
	{
		const STAGE: GatewayStage = GatewayStage::Fetch;

		let request = request.into();

		if !self.is_installed() || !self.classifier.is_backend_bound(&request.url) {
			obs::record_stage_outcome(STAGE, StageOutcome::Passthrough);

			return self.inner.fetch(request).await;
		}

		let span = StageSpan::new(STAGE, "send");

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let (outcome, result) = match span.instrument(self.send_authenticated(request)).await {
			Ok(Delivery::Accepted(response)) => (StageOutcome::Success, Ok(response)),
			Ok(Delivery::Rejected(response)) => (StageOutcome::Failure, Ok(response)),
			Err(e) => (StageOutcome::Failure, Err(e)),
		};

		obs::record_stage_outcome(STAGE, outcome);

		result
	}

	async fn send_authenticated(
		&self,
		request: GatewayRequest,
	) -> Result<Delivery, TransportError> {
		self.refresh_if_near_expiry().await;

		let first = self.attempt(&request, 1).await?;

		if !self.is_auth_failure(&first) {
			return Ok(Delivery::Accepted(first));
		}

		obs::record_stage_outcome(GatewayStage::Fetch, StageOutcome::Retry);

		if let Err(e) = self.refresher.refresh_once().await {
			obs::trace_swallowed_refresh("retry", &e);
		}

		let second = self.attempt(&request, 2).await?;

		if !self.is_auth_failure(&second) {
			return Ok(Delivery::Accepted(second));
		}

		let detail = AuthFailureDetail::from_response(request.url.as_str(), &second);
		let emitted = self.notifier.notify(detail).await;

		obs::trace_auth_failure(&request.url, second.status, emitted);

		Ok(Delivery::Rejected(second))
	}

	async fn refresh_if_near_expiry(&self) {
		let Some(session) = self.hooks.current_session().await else {
			return;
		};

		if !session.is_near_expiry(self.near_expiry_window) {
			return;
		}
		if let Err(e) = self.refresher.refresh_once().await {
			obs::trace_swallowed_refresh("proactive", &e);
		}
	}

	async fn attempt(
		&self,
		request: &GatewayRequest,
		attempt: u8,
	) -> Result<GatewayResponse, TransportError> {
		let mut request = request.clone();

		// The caller's credentials never reach the backend; without a usable token the request
		// goes out unauthenticated.
		request.headers.remove(header::AUTHORIZATION);

		if let Some(mut bearer) = self
			.hooks
			.freshest_token()
			.await
			.and_then(|token| HeaderValue::try_from(token.bearer()).ok())
		{
			bearer.set_sensitive(true);
			request.headers.insert(header::AUTHORIZATION, bearer);
		}
		if !request.headers.contains_key(header::CONTENT_TYPE) && request.body.looks_like_json() {
			request
				.headers
				.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
		}

		let method = request.method.clone();
		let url = request.url.clone();
		let response = self.inner.fetch(request).await?;

		obs::trace_attempt(&method, &url, attempt, response.status);

		Ok(response)
	}

	fn is_auth_failure(&self, response: &GatewayResponse) -> bool {
		self.policy.is_auth_failure(response.status, &response.text())
	}
}
#[cfg(feature = "reqwest")]
impl FetchGateway<ReqwestHttpClient> {
	/// Builds a gateway over a default reqwest client; relative paths resolve against the
	/// backend base.
	pub fn reqwest(config: GatewayConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().build()?;
		let origin = config.backend_base.clone();

		Self::new(config, ReqwestHttpClient::with_client(client).with_origin(origin))
	}
}
impl<C> HttpClient for FetchGateway<C>
where
	C: HttpClient,
{
	fn fetch(&self, request: GatewayRequest) -> HttpFuture<'_> {
		Box::pin(self.send(request))
	}
}
impl<C> Debug for FetchGateway<C> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FetchGateway")
			.field("classifier", &self.classifier)
			.field("refresher", &self.refresher)
			.field("notifier", &self.notifier)
			.field("near_expiry_window", &self.near_expiry_window)
			.field("installed", &self.installed.load(Ordering::Relaxed))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicUsize;
	// self
	use super::*;
	use crate::auth::AccessToken;

	struct CountingPolicy {
		calls: Arc<AtomicUsize>,
	}
	impl AuthFailurePolicy for CountingPolicy {
		fn is_invalid_session(&self, _: &str) -> bool {
			false
		}

		fn is_auth_failure(&self, status: StatusCode, _: &str) -> bool {
			self.calls.fetch_add(1, Ordering::SeqCst);

			status == StatusCode::UNAUTHORIZED
		}
	}

	#[derive(Default)]
	struct EchoClient {
		seen: Mutex<Vec<GatewayRequest>>,
	}
	impl HttpClient for EchoClient {
		fn fetch(&self, request: GatewayRequest) -> HttpFuture<'_> {
			self.seen.lock().push(request);

			Box::pin(async { Ok(GatewayResponse::new(StatusCode::OK)) })
		}
	}

	fn gateway() -> FetchGateway<EchoClient> {
		let config = GatewayConfig::builder_from_str("https://api.example.com")
			.expect("Base URL should parse.")
			.build()
			.expect("Config should be valid.");
		let gateway = FetchGateway::new(config, EchoClient::default())
			.expect("Gateway should build from a valid config.");

		gateway.configure(
			GatewayOptions::default().with_access_token(|| Some(AccessToken::new("fresh"))),
		);

		gateway
	}

	fn last_authorization(gateway: &FetchGateway<EchoClient>) -> Option<String> {
		gateway
			.inner()
			.seen
			.lock()
			.last()
			.and_then(|request| request.header(header::AUTHORIZATION))
			.map(ToOwned::to_owned)
	}

	#[test]
	fn install_is_idempotent() {
		let gateway = gateway();

		assert!(!gateway.is_installed());
		assert!(gateway.install());
		assert!(!gateway.install());
		assert!(gateway.is_installed());

		gateway.reset();

		assert!(!gateway.is_installed());
		assert!(gateway.install());
	}

	#[tokio::test]
	async fn uninstalled_gateway_passes_requests_through() {
		let gateway = gateway();

		gateway.send(GatewayRequest::get("/movements")).await.expect("Fetch should succeed.");

		assert_eq!(last_authorization(&gateway), None);

		gateway.install();
		gateway.send(GatewayRequest::get("/movements")).await.expect("Fetch should succeed.");

		assert_eq!(last_authorization(&gateway).as_deref(), Some("Bearer fresh"));
	}

	#[tokio::test]
	async fn reset_drops_configured_hooks() {
		let gateway = gateway();

		gateway.install();
		gateway.reset();
		gateway.install();
		gateway.send(GatewayRequest::get("/movements")).await.expect("Fetch should succeed.");

		assert_eq!(last_authorization(&gateway), None);
	}

	#[tokio::test]
	async fn header_hostile_tokens_drop_caller_authorization() {
		let gateway = gateway();

		gateway.install();
		gateway.configure(
			GatewayOptions::default().with_access_token(|| Some(AccessToken::new("bad\ntoken"))),
		);
		gateway
			.send(GatewayRequest::get("/movements").with_header(
				header::AUTHORIZATION,
				HeaderValue::from_static("Bearer caller"),
			))
			.await
			.expect("Fetch should succeed.");

		assert_eq!(last_authorization(&gateway), None);
	}

	#[tokio::test]
	async fn responses_are_classified_once_per_attempt() {
		let calls = Arc::new(AtomicUsize::new(0));
		let config = GatewayConfig::builder_from_str("https://api.example.com")
			.expect("Base URL should parse.")
			.build()
			.expect("Config should be valid.");
		let gateway = FetchGateway::builder(config, EchoClient::default())
			.policy(CountingPolicy { calls: calls.clone() })
			.build()
			.expect("Gateway should build from a valid config.");

		gateway.install();
		gateway.send(GatewayRequest::get("/movements")).await.expect("Fetch should succeed.");

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn gateway_is_usable_as_a_trait_object() {
		let gateway = gateway();

		gateway.install();

		let client: Arc<dyn HttpClient> = Arc::new(gateway);
		let response = client
			.fetch(GatewayRequest::get("https://api.example.com/x"))
			.await
			.expect("Fetch should succeed.");

		assert_eq!(response.status(), StatusCode::OK);
	}
}

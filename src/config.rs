//! Validated gateway configuration and its builder.

// self
use crate::{_prelude::*, error::ConfigError};

/// Relative path prefixes that identify backend API namespaces by default.
///
/// Covers identity/session, user profile, content (movements, incidents, events, petitions,
/// notifications, reports, resources, evidence), upload, and admin namespaces.
pub const DEFAULT_BACKEND_PREFIXES: &[&str] = &[
	"/auth",
	"/session",
	"/identity",
	"/user",
	"/users",
	"/profile",
	"/profiles",
	"/movements",
	"/incidents",
	"/events",
	"/petitions",
	"/notifications",
	"/reports",
	"/resources",
	"/evidence",
	"/upload",
	"/uploads",
	"/admin",
	"/api",
];

/// Runtime configuration for a [`crate::gateway::FetchGateway`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// Absolute base URL of the backend; absolute request URLs under it receive credentials.
	pub backend_base: Url,
	/// Relative path prefixes that receive credentials.
	#[serde(default = "default_backend_prefixes")]
	pub backend_prefixes: Vec<String>,
	/// Sessions expiring within this window are refreshed before the request is sent.
	#[serde(default = "default_near_expiry_window", with = "duration_millis")]
	pub near_expiry_window: Duration,
	/// Window during which repeated auth-failure notifications are suppressed.
	#[serde(default = "default_notify_cooldown", with = "duration_millis")]
	pub notify_cooldown: Duration,
}
impl GatewayConfig {
	/// Default proactive refresh window.
	pub const DEFAULT_NEAR_EXPIRY_WINDOW: Duration = Duration::seconds(60);
	/// Default notification cooldown.
	pub const DEFAULT_NOTIFY_COOLDOWN: Duration = Duration::milliseconds(1_000);

	/// Returns a builder for the provided backend base URL.
	pub fn builder(backend_base: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(backend_base)
	}

	/// Parses `backend_base` and returns a builder for it.
	pub fn builder_from_str(backend_base: &str) -> Result<GatewayConfigBuilder, ConfigError> {
		let url = Url::parse(backend_base)
			.map_err(|source| ConfigError::InvalidBackendBase { source })?;

		Ok(GatewayConfigBuilder::new(url))
	}

	/// Validates invariants; deserialized configs should be checked before use.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !matches!(self.backend_base.scheme(), "http" | "https")
			|| self.backend_base.host_str().is_none()
		{
			return Err(ConfigError::UnsupportedBackendBase { url: self.backend_base.to_string() });
		}

		for prefix in &self.backend_prefixes {
			if !prefix.starts_with('/') {
				return Err(ConfigError::InvalidPrefix { prefix: prefix.clone() });
			}
		}

		if self.near_expiry_window.is_negative() {
			return Err(ConfigError::NegativeWindow { field: "near_expiry_window" });
		}
		if self.notify_cooldown.is_negative() {
			return Err(ConfigError::NegativeWindow { field: "notify_cooldown" });
		}

		Ok(())
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	backend_base: Url,
	backend_prefixes: Vec<String>,
	near_expiry_window: Duration,
	notify_cooldown: Duration,
}
impl GatewayConfigBuilder {
	fn new(backend_base: Url) -> Self {
		Self {
			backend_base,
			backend_prefixes: default_backend_prefixes(),
			near_expiry_window: GatewayConfig::DEFAULT_NEAR_EXPIRY_WINDOW,
			notify_cooldown: GatewayConfig::DEFAULT_NOTIFY_COOLDOWN,
		}
	}

	/// Replaces the relative path allowlist.
	pub fn backend_prefixes<I, S>(mut self, prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.backend_prefixes = prefixes.into_iter().map(Into::into).collect();

		self
	}

	/// Appends a prefix to the relative path allowlist.
	pub fn backend_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.backend_prefixes.push(prefix.into());

		self
	}

	/// Overrides the proactive refresh window.
	pub fn near_expiry_window(mut self, window: Duration) -> Self {
		self.near_expiry_window = window;

		self
	}

	/// Overrides the notification cooldown.
	pub fn notify_cooldown(mut self, cooldown: Duration) -> Self {
		self.notify_cooldown = cooldown;

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		let config = GatewayConfig {
			backend_base: self.backend_base,
			backend_prefixes: self.backend_prefixes,
			near_expiry_window: self.near_expiry_window,
			notify_cooldown: self.notify_cooldown,
		};

		config.validate()?;

		Ok(config)
	}
}

fn default_backend_prefixes() -> Vec<String> {
	DEFAULT_BACKEND_PREFIXES.iter().map(|prefix| (*prefix).to_owned()).collect()
}

fn default_near_expiry_window() -> Duration {
	GatewayConfig::DEFAULT_NEAR_EXPIRY_WINDOW
}

fn default_notify_cooldown() -> Duration {
	GatewayConfig::DEFAULT_NOTIFY_COOLDOWN
}

mod duration_millis {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(i64::try_from(value.whole_milliseconds()).unwrap_or(i64::MAX))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let millis = i64::deserialize(deserializer)?;

		Ok(Duration::milliseconds(millis))
	}
}

//! Backend-bound request classification.
//!
//! Only backend-bound requests receive an `Authorization` header. Absolute URLs qualify when
//! they share the configured backend origin and sit under its base path; relative paths
//! qualify only when they fall under an allowlisted API namespace, so same-origin assets and
//! documents never carry credentials.

// self
use crate::{_prelude::*, config::GatewayConfig};

/// Pure classifier over request URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestClassifier {
	base: Url,
	prefixes: Vec<String>,
}
impl RequestClassifier {
	/// Creates a classifier for the provided backend base and relative path allowlist.
	pub fn new<I, S>(base: Url, prefixes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let prefixes = prefixes
			.into_iter()
			.map(|prefix| prefix.into().trim_end_matches('/').to_owned())
			.collect();

		Self { base, prefixes }
	}

	/// Builds the classifier described by a gateway config.
	pub fn from_config(config: &GatewayConfig) -> Self {
		Self::new(config.backend_base.clone(), config.backend_prefixes.iter().cloned())
	}

	/// Backend base URL.
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Returns `true` if the request target should receive credentials.
	pub fn is_backend_bound(&self, url: &str) -> bool {
		let url = url.trim();

		if url.starts_with("//") {
			return Url::parse(&format!("{}:{url}", self.base.scheme()))
				.is_ok_and(|target| self.under_base(&target));
		}
		if url.starts_with('/') {
			return self.under_prefix(url);
		}

		// Bare relative paths fail to parse and are never backend-bound.
		Url::parse(url).is_ok_and(|target| self.under_base(&target))
	}

	fn under_base(&self, target: &Url) -> bool {
		target.origin() == self.base.origin()
			&& path_under(target.path(), self.base.path().trim_end_matches('/'))
	}

	fn under_prefix(&self, url: &str) -> bool {
		let path = url.split(['?', '#']).next().unwrap_or_default();

		self.prefixes.iter().any(|prefix| path_under(path, prefix))
	}
}

fn path_under(path: &str, prefix: &str) -> bool {
	if prefix.is_empty() {
		return true;
	}

	match path.strip_prefix(prefix) {
		Some(rest) => rest.is_empty() || rest.starts_with('/'),
		None => false,
	}
}

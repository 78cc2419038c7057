//! Buffered response returned by transports.

// std
use std::borrow::Cow;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

/// Fully buffered HTTP response.
///
/// Buffering lets the gateway inspect the body for auth-failure hints and still hand the
/// untouched response back to the caller.
#[derive(Clone, Debug)]
pub struct GatewayResponse {
	/// Response status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Response payload.
	pub body: Vec<u8>,
}
impl GatewayResponse {
	/// Creates an empty response with the provided status.
	pub fn new(status: StatusCode) -> Self {
		Self { status, headers: HeaderMap::new(), body: Vec::new() }
	}

	/// Sets (replacing) a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets the payload.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Response status.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Header value as text, if present and visible ASCII.
	pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// Payload decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> Cow<'_, str> {
		String::from_utf8_lossy(&self.body)
	}

	/// Payload decoded as JSON.
	pub fn json<T>(&self) -> Result<T, serde_json::Error>
	where
		T: DeserializeOwned,
	{
		serde_json::from_slice(&self.body)
	}
}
impl From<oauth2::http::Response<Vec<u8>>> for GatewayResponse {
	fn from(response: oauth2::http::Response<Vec<u8>>) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}
}

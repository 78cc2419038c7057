//! Normalized request descriptor shared by every transport.

// std
use std::time::Duration as StdDuration;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::ConfigError;

/// Replayable request payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Body {
	/// No payload.
	#[default]
	Empty,
	/// Text payload; the only kind that takes part in the JSON content-type heuristic.
	Text(String),
	/// Opaque binary payload (form data, files).
	Binary(Vec<u8>),
}
impl Body {
	/// Returns `true` if the body carries no payload.
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Empty => true,
			Self::Text(text) => text.is_empty(),
			Self::Binary(bytes) => bytes.is_empty(),
		}
	}

	/// Raw payload bytes.
	pub fn as_bytes(&self) -> &[u8] {
		match self {
			Self::Empty => &[],
			Self::Text(text) => text.as_bytes(),
			Self::Binary(bytes) => bytes,
		}
	}

	/// Text payload, if the body is text.
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			_ => None,
		}
	}

	/// Returns `true` if the body is text beginning with `{` or `[`.
	pub fn looks_like_json(&self) -> bool {
		self.as_text().is_some_and(|text| text.starts_with('{') || text.starts_with('['))
	}
}
impl From<()> for Body {
	fn from(_: ()) -> Self {
		Self::Empty
	}
}
impl From<String> for Body {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<&str> for Body {
	fn from(value: &str) -> Self {
		Self::Text(value.to_owned())
	}
}
impl From<Vec<u8>> for Body {
	fn from(value: Vec<u8>) -> Self {
		if value.is_empty() { Self::Empty } else { Self::Binary(value) }
	}
}

/// Editable request descriptor that can be re-issued on retry.
///
/// `url` may be absolute or a relative path; transports resolve relative paths against their
/// own origin.
#[derive(Clone, Debug)]
pub struct GatewayRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL or relative path.
	pub url: String,
	/// Request headers.
	pub headers: HeaderMap,
	/// Replayable payload.
	pub body: Body,
	/// Caller-supplied deadline forwarded to the transport unmodified.
	pub timeout: Option<StdDuration>,
}
impl GatewayRequest {
	/// Creates a request without headers or body.
	pub fn new(method: Method, url: impl Into<String>) -> Self {
		Self {
			method,
			url: url.into(),
			headers: HeaderMap::new(),
			body: Body::Empty,
			timeout: None,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(url: impl Into<String>) -> Self {
		Self::new(Method::GET, url)
	}

	/// Shorthand for a `POST` request.
	pub fn post(url: impl Into<String>) -> Self {
		Self::new(Method::POST, url)
	}

	/// Sets (replacing) a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets the payload.
	pub fn with_body(mut self, body: impl Into<Body>) -> Self {
		self.body = body.into();

		self
	}

	/// Sets the deadline forwarded to the transport.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Header value as text, if present and visible ASCII.
	pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}
}
impl<B> From<oauth2::http::Request<B>> for GatewayRequest
where
	B: Into<Body>,
{
	fn from(request: oauth2::http::Request<B>) -> Self {
		let (parts, body) = request.into_parts();

		Self {
			method: parts.method,
			url: parts.uri.to_string(),
			headers: parts.headers,
			body: body.into(),
			timeout: None,
		}
	}
}
#[cfg(feature = "reqwest")]
impl TryFrom<reqwest::Request> for GatewayRequest {
	type Error = ConfigError;

	fn try_from(request: reqwest::Request) -> Result<Self, Self::Error> {
		let body = match request.body() {
			None => Body::Empty,
			Some(body) => match body.as_bytes() {
				Some(bytes) => match std::str::from_utf8(bytes) {
					Ok(text) => Body::Text(text.to_owned()),
					Err(_) => Body::Binary(bytes.to_vec()),
				},
				None => return Err(ConfigError::UnreplayableBody),
			},
		};

		Ok(Self {
			method: request.method().clone(),
			url: request.url().to_string(),
			headers: request.headers().clone(),
			body,
			timeout: request.timeout().copied(),
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_detection_requires_text_with_leading_bracket() {
		assert!(Body::from(r#"{"a":1}"#).looks_like_json());
		assert!(Body::from("[1,2]").looks_like_json());
		assert!(!Body::from("hello").looks_like_json());
		assert!(!Body::from(b"{\"a\":1}".to_vec()).looks_like_json());
		assert!(!Body::Empty.looks_like_json());
	}

	#[test]
	fn request_like_values_unwrap_into_descriptors() {
		let request = oauth2::http::Request::builder()
			.method(Method::PATCH)
			.uri("https://api.example.com/movements/7")
			.header(header::AUTHORIZATION, "Bearer caller")
			.body(String::from(r#"{"title":"x"}"#))
			.expect("Request fixture should build.");
		let descriptor = GatewayRequest::from(request);

		assert_eq!(descriptor.method, Method::PATCH);
		assert_eq!(descriptor.url, "https://api.example.com/movements/7");
		assert_eq!(descriptor.header(header::AUTHORIZATION), Some("Bearer caller"));
		assert!(descriptor.body.looks_like_json());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_requests_keep_body_and_timeout() {
		let request = ReqwestClient::new()
			.post("https://api.example.com/reports")
			.body("hello")
			.timeout(StdDuration::from_secs(5))
			.build()
			.expect("Reqwest request fixture should build.");
		let descriptor =
			GatewayRequest::try_from(request).expect("Buffered bodies should be replayable.");

		assert_eq!(descriptor.body, Body::Text("hello".into()));
		assert_eq!(descriptor.timeout, Some(StdDuration::from_secs(5)));
	}
}

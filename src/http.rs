//! Transport primitives for gateway-mediated requests.
//!
//! The module exposes [`HttpClient`], the only seam between the gateway and an HTTP stack,
//! alongside the normalized [`GatewayRequest`] and buffered [`GatewayResponse`] values that
//! flow through it. The gateway itself implements [`HttpClient`], so call sites depend on the
//! trait and never notice whether requests are decorated.

mod request;
mod response;

pub use request::*;
pub use response::*;

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpClient::fetch`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<GatewayResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing a [`GatewayRequest`].
///
/// Implementations must be `Send + Sync + 'static` so a single instance can be shared by every
/// caller in the process. Network-level failures are reported as [`TransportError`]; any HTTP
/// status, including 4xx/5xx, is a successful response.
pub trait HttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes the request and buffers the response.
	fn fetch(&self, request: GatewayRequest) -> HttpFuture<'_>;
}
impl<T> HttpClient for Arc<T>
where
	T: ?Sized + HttpClient,
{
	fn fetch(&self, request: GatewayRequest) -> HttpFuture<'_> {
		(**self).fetch(request)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Relative request paths are resolved against the configured origin; without one they fail
/// with [`TransportError::InvalidUrl`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient {
	client: ReqwestClient,
	origin: Option<Url>,
}
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, origin: None }
	}

	/// Sets the origin relative request paths resolve against.
	pub fn with_origin(mut self, origin: Url) -> Self {
		self.origin = Some(origin);

		self
	}

	fn resolve(&self, url: &str) -> Result<Url, TransportError> {
		match Url::parse(url) {
			Ok(absolute) => Ok(absolute),
			Err(url::ParseError::RelativeUrlWithoutBase) => self
				.origin
				.as_ref()
				.and_then(|origin| origin.join(url).ok())
				.ok_or_else(|| TransportError::InvalidUrl { url: url.to_owned() }),
			Err(_) => Err(TransportError::InvalidUrl { url: url.to_owned() }),
		}
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl HttpClient for ReqwestHttpClient {
	fn fetch(&self, request: GatewayRequest) -> HttpFuture<'_> {
		let client = self.client.clone();
		let target = self.resolve(&request.url);

		Box::pin(async move {
			let target = target?;
			let url = target.to_string();
			let mut builder = client.request(request.method, target).headers(request.headers);

			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			builder = match request.body {
				Body::Empty => builder,
				Body::Text(text) => builder.body(text),
				Body::Binary(bytes) => builder.body(bytes),
			};

			let response =
				builder.send().await.map_err(|err| TransportError::network(url.as_str(), err))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response
				.bytes()
				.await
				.map_err(|err| TransportError::network(url.as_str(), err))?
				.to_vec();

			Ok(GatewayResponse { status, headers, body })
		})
	}
}

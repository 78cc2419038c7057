//! Authenticated fetch gateway for backend-bound HTTP traffic: bearer injection, single-flight
//! session refresh, retry-once on auth failure, and debounced auth-expired notifications.
//!
//! The crate is organized leaf-first:
//!
//! - [`classify`] decides which request targets receive credentials.
//! - [`auth`] carries the session model and the injected token/session hooks.
//! - [`refresh`] guarantees at most one session refresh is in flight.
//! - [`notify`] publishes terminal auth failures on an event bus behind a cooldown gate.
//! - [`gateway`] composes the above into a decorator over any [`http::HttpClient`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod notify;
pub mod obs;
pub mod refresh;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use oauth2::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use oauth2::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};

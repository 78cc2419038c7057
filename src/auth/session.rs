//! Session snapshots and the redacting bearer token wrapper.

// self
use crate::_prelude::*;

/// Redacted bearer token wrapper keeping credentials out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the token carries no usable characters.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}

	/// Formats the `Authorization` header value for this token.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<&str> for AccessToken {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for AccessToken {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Read-only snapshot of the session owned by the external session source.
///
/// `expires_at` travels as epoch seconds on the wire; an absent value means the source did
/// not report an expiry and the session is never considered near expiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Bearer token attached to backend-bound requests.
	pub access_token: AccessToken,
	/// Expiry instant reported by the session source.
	#[serde(default, with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl Session {
	/// Creates a session without a known expiry.
	pub fn new(access_token: impl Into<AccessToken>) -> Self {
		Self { access_token: access_token.into(), expires_at: None }
	}

	/// Sets an absolute expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry relative to the current clock.
	pub fn with_expires_in(self, ttl: Duration) -> Self {
		self.with_expires_at(OffsetDateTime::now_utc() + ttl)
	}

	/// Remaining validity at the provided instant; negative once expired.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Option<Duration> {
		self.expires_at.map(|expires_at| expires_at - instant)
	}

	/// Returns `true` when the session expires within `window` of `instant` (or already has).
	pub fn is_near_expiry_at(&self, instant: OffsetDateTime, window: Duration) -> bool {
		self.remaining_at(instant).is_some_and(|remaining| remaining <= window)
	}

	/// Convenience helper that checks [`Session::is_near_expiry_at`] against the current clock.
	pub fn is_near_expiry(&self, window: Duration) -> bool {
		self.is_near_expiry_at(OffsetDateTime::now_utc(), window)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn token_formatters_redact() {
		let token = AccessToken::new("super-secret");

		assert_eq!(format!("{token:?}"), "AccessToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
		assert_eq!(token.bearer(), "Bearer super-secret");
	}

	#[test]
	fn near_expiry_uses_inclusive_window() {
		let now = datetime!(2025-01-01 00:00 UTC);
		let soon = Session::new("a").with_expires_at(now + Duration::seconds(30));
		let later = Session::new("b").with_expires_at(now + Duration::seconds(600));
		let edge = Session::new("c").with_expires_at(now + Duration::seconds(60));
		let expired = Session::new("d").with_expires_at(now - Duration::seconds(5));
		let unknown = Session::new("e");
		let window = Duration::seconds(60);

		assert!(soon.is_near_expiry_at(now, window));
		assert!(!later.is_near_expiry_at(now, window));
		assert!(edge.is_near_expiry_at(now, window));
		assert!(expired.is_near_expiry_at(now, window));
		assert!(!unknown.is_near_expiry_at(now, window));
	}

	#[test]
	fn session_reads_epoch_seconds() {
		let session: Session =
			serde_json::from_str(r#"{"access_token":"tok","expires_at":1735689600}"#)
				.expect("Session payload with epoch seconds should deserialize.");

		assert_eq!(session.access_token.expose(), "tok");
		assert_eq!(session.expires_at, Some(datetime!(2025-01-01 00:00 UTC)));

		let absent: Session = serde_json::from_str(r#"{"access_token":"tok"}"#)
			.expect("Session payload without expiry should deserialize.");

		assert_eq!(absent.expires_at, None);
	}
}

//! Configurable predicate that separates session failures from generic authorization denials.

// self
use crate::{_prelude::*, notify::AuthFailureReason};

/// Case-insensitive phrases that mark a response body as an invalid-session failure.
pub const DEFAULT_INVALID_SESSION_PHRASES: &[&str] = &[
	"invalid session",
	"session expired",
	"session not found",
	"jwt expired",
	"invalid jwt",
	"no authorization",
	"missing authorization",
];

/// Decides which responses count as authentication failures.
///
/// Backends phrase their errors differently, so the predicate is injectable. Any
/// `Fn(&str) -> bool` closure works as a policy that inspects the response body.
pub trait AuthFailurePolicy
where
	Self: Send + Sync,
{
	/// Whether `body` describes an invalid or expired session.
	fn is_invalid_session(&self, body: &str) -> bool;

	/// Whether a response with `status` and `body` is an authentication failure.
	///
	/// Every 401 qualifies; a 403 only when its body describes an invalid session.
	fn is_auth_failure(&self, status: StatusCode, body: &str) -> bool {
		match status {
			StatusCode::UNAUTHORIZED => true,
			StatusCode::FORBIDDEN => self.is_invalid_session(body),
			_ => false,
		}
	}

	/// Reason reported on `auth-expired`.
	fn reason(&self, body: &str) -> AuthFailureReason {
		if self.is_invalid_session(body) {
			AuthFailureReason::InvalidSession
		} else {
			AuthFailureReason::AuthFailed
		}
	}
}
impl<F> AuthFailurePolicy for F
where
	F: Send + Sync + Fn(&str) -> bool,
{
	fn is_invalid_session(&self, body: &str) -> bool {
		self(body)
	}
}

/// Substring matcher over a phrase list.
#[derive(Clone, Debug)]
pub struct DefaultAuthFailurePolicy {
	phrases: Vec<String>,
}
impl DefaultAuthFailurePolicy {
	/// Matches the supplied phrases instead of the built-in list.
	pub fn with_phrases<I, S>(phrases: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { phrases: phrases.into_iter().map(|phrase| phrase.into().to_lowercase()).collect() }
	}

	/// Adds one phrase to the list.
	pub fn phrase(mut self, phrase: impl Into<String>) -> Self {
		self.phrases.push(phrase.into().to_lowercase());

		self
	}
}
impl Default for DefaultAuthFailurePolicy {
	fn default() -> Self {
		Self::with_phrases(DEFAULT_INVALID_SESSION_PHRASES.iter().copied())
	}
}
impl AuthFailurePolicy for DefaultAuthFailurePolicy {
	fn is_invalid_session(&self, body: &str) -> bool {
		if body.is_empty() {
			return false;
		}

		let body = body.to_lowercase();

		self.phrases.iter().any(|phrase| body.contains(phrase.as_str()))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn default_policy_matches_known_phrases_case_insensitively() {
		let policy = DefaultAuthFailurePolicy::default();

		assert!(policy.is_invalid_session(r#"{"message":"JWT Expired"}"#));
		assert!(policy.is_invalid_session("No Authorization header supplied"));
		assert!(!policy.is_invalid_session(r#"{"message":"insufficient role"}"#));
		assert!(!policy.is_invalid_session(""));
	}

	#[test]
	fn forbidden_needs_a_matching_body() {
		let policy = DefaultAuthFailurePolicy::default();

		assert!(policy.is_auth_failure(StatusCode::UNAUTHORIZED, ""));
		assert!(policy.is_auth_failure(StatusCode::FORBIDDEN, "invalid session"));
		assert!(!policy.is_auth_failure(StatusCode::FORBIDDEN, "not your movement"));
		assert!(!policy.is_auth_failure(StatusCode::INTERNAL_SERVER_ERROR, "jwt expired"));
	}

	#[test]
	fn reason_reflects_the_body() {
		let policy = DefaultAuthFailurePolicy::default();

		assert_eq!(policy.reason("Session not found"), AuthFailureReason::InvalidSession);
		assert_eq!(policy.reason("Unauthorized"), AuthFailureReason::AuthFailed);
	}

	#[test]
	fn closures_act_as_policies() {
		let policy = |body: &str| body.contains("token_revoked");

		assert!(policy.is_auth_failure(StatusCode::FORBIDDEN, r#"{"code":"token_revoked"}"#));
		assert!(!policy.is_auth_failure(StatusCode::FORBIDDEN, "jwt expired"));
	}

	#[test]
	fn custom_phrases_extend_the_matcher() {
		let policy =
			DefaultAuthFailurePolicy::with_phrases(["token revoked"]).phrase("Login Required");

		assert!(policy.is_invalid_session("login required"));
		assert!(policy.is_invalid_session("Token revoked by admin"));
		assert!(!policy.is_invalid_session("jwt expired"));
	}
}

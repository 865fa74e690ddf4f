//! Cached access token records and their lifecycle helpers.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Current lifecycle status for a cached token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is usable and outside the refresh window.
	Active,
	/// Token is still valid but close enough to expiry that it should be replaced.
	Expiring,
	/// Token exceeded its expiry instant.
	Expired,
}

/// Access token obtained through the client credentials grant.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer secret; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Scope string granted by the provider, if reported.
	pub scope: Option<String>,
	/// Instant the gateway received the token.
	pub issued_at: OffsetDateTime,
	/// Expiry derived from `expires_in`; `None` when the provider did not report a lifetime.
	pub expires_at: Option<OffsetDateTime>,
}
impl AccessToken {
	/// Creates a record issued at `issued_at` that lives for `expires_in`, when known.
	pub fn new(
		secret: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Option<Duration>,
	) -> Self {
		Self {
			secret: TokenSecret::new(secret),
			scope: None,
			issued_at,
			expires_at: expires_in.map(|lifetime| issued_at + lifetime),
		}
	}

	/// Attaches the granted scope string.
	pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
		self.scope = Some(scope.into());

		self
	}

	/// Computes the lifecycle status at `now` for the provided refresh window.
	///
	/// The window is clamped to half of the token lifetime so short-lived tokens are not
	/// considered expiring from the moment they are issued.
	pub fn status_at(&self, now: OffsetDateTime, refresh_window: Duration) -> TokenStatus {
		let Some(expires_at) = self.expires_at else {
			return TokenStatus::Active;
		};

		if now >= expires_at {
			return TokenStatus::Expired;
		}

		let lifetime = expires_at - self.issued_at;
		let window = refresh_window.min(lifetime / 2).max(Duration::ZERO);

		if expires_at - now <= window { TokenStatus::Expiring } else { TokenStatus::Active }
	}

	/// Returns `true` when the token should be replaced before use at `now`.
	pub fn needs_refresh_at(&self, now: OffsetDateTime, refresh_window: Duration) -> bool {
		!matches!(self.status_at(now, refresh_window), TokenStatus::Active)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn status_transitions_follow_the_refresh_window() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken::new("abc123", issued, Some(Duration::seconds(7200)));
		let window = Duration::seconds(60);

		assert_eq!(token.expires_at, Some(macros::datetime!(2025-01-01 02:00 UTC)));
		assert_eq!(token.status_at(macros::datetime!(2025-01-01 01:00 UTC), window), TokenStatus::Active);
		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 01:59:30 UTC), window),
			TokenStatus::Expiring
		);
		assert_eq!(token.status_at(macros::datetime!(2025-01-01 02:00 UTC), window), TokenStatus::Expired);
	}

	#[test]
	fn short_lifetimes_clamp_the_window() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken::new("short", issued, Some(Duration::seconds(30)));

		assert!(!token.needs_refresh_at(issued, Duration::seconds(60)));
		assert!(token.needs_refresh_at(issued + Duration::seconds(15), Duration::seconds(60)));
	}

	#[test]
	fn tokens_without_lifetime_stay_active() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let token = AccessToken::new("forever", issued, None);

		assert!(!token.needs_refresh_at(issued + Duration::days(365), Duration::seconds(60)));
	}

	#[test]
	fn debug_redacts_the_secret() {
		let token = AccessToken::new("abc123", OffsetDateTime::now_utc(), None).with_scope("public");
		let rendered = format!("{token:?}");

		assert!(!rendered.contains("abc123"));
		assert!(rendered.contains("public"));
	}
}

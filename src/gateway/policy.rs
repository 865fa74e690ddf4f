//! Status policy applied to data calls.
//!
//! 2xx succeeds. 429, 403, and 404 are soft failures: the call yields an empty result carrying a
//! [`SoftFailure`] signal instead of an error, so listing pages can degrade gracefully. Any other
//! status is fatal.

// self
use crate::_prelude::*;

/// How a resource response status should be handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusDisposition {
	/// 2xx; decode the body.
	Success,
	/// Empty result plus an out-of-band signal.
	Soft(SoftFailureKind),
	/// Surface as [`Error::UpstreamRequest`].
	Fatal,
}

/// Soft failure categories surfaced to the consuming layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftFailureKind {
	/// HTTP 429.
	RateLimited,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
}
impl SoftFailureKind {
	/// Out-of-band header the consuming layer sets when forwarding this signal.
	pub fn header(self) -> &'static str {
		match self {
			Self::RateLimited => "X-Rate-Limited",
			Self::Forbidden => "X-Forbidden",
			Self::NotFound => "X-Not-Found",
		}
	}

	/// Human-readable message for banners.
	pub fn message(self) -> &'static str {
		match self {
			Self::RateLimited => "Rate limited - please try again later",
			Self::Forbidden => "Access forbidden - endpoint may require special permissions",
			Self::NotFound => "Resource not found",
		}
	}

	/// HTTP status that maps to this kind.
	pub fn status(self) -> u16 {
		match self {
			Self::RateLimited => 429,
			Self::Forbidden => 403,
			Self::NotFound => 404,
		}
	}
}
impl Display for SoftFailureKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			Self::RateLimited => "rate_limited",
			Self::Forbidden => "forbidden",
			Self::NotFound => "not_found",
		})
	}
}

/// Signal attached to an empty listing when the upstream answered with a soft failure status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftFailure {
	/// Failure category.
	pub kind: SoftFailureKind,
	/// Retry-After hint, only ever present for rate limiting.
	pub retry_after: Option<Duration>,
}
impl SoftFailure {
	/// Creates a signal without a retry hint.
	pub fn new(kind: SoftFailureKind) -> Self {
		Self { kind, retry_after: None }
	}

	/// Header name for the consuming layer.
	pub fn header(&self) -> &'static str {
		self.kind.header()
	}

	/// Banner message for the consuming layer.
	pub fn message(&self) -> &'static str {
		self.kind.message()
	}
}

/// Maps an HTTP status to its disposition.
///
/// 401 is classified as fatal here; the gateway retries it once with a fresh token before this
/// policy is consulted.
pub fn classify_status(status: u16) -> StatusDisposition {
	match status {
		200..=299 => StatusDisposition::Success,
		429 => StatusDisposition::Soft(SoftFailureKind::RateLimited),
		403 => StatusDisposition::Soft(SoftFailureKind::Forbidden),
		404 => StatusDisposition::Soft(SoftFailureKind::NotFound),
		_ => StatusDisposition::Fatal,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn classify_matches_the_policy_table() {
		assert_eq!(classify_status(200), StatusDisposition::Success);
		assert_eq!(classify_status(204), StatusDisposition::Success);
		assert_eq!(classify_status(429), StatusDisposition::Soft(SoftFailureKind::RateLimited));
		assert_eq!(classify_status(403), StatusDisposition::Soft(SoftFailureKind::Forbidden));
		assert_eq!(classify_status(404), StatusDisposition::Soft(SoftFailureKind::NotFound));

		for status in [301, 400, 401, 500, 502, 503] {
			assert_eq!(classify_status(status), StatusDisposition::Fatal, "status {status}");
		}
	}

	#[test]
	fn kinds_expose_headers_and_messages() {
		for kind in [SoftFailureKind::RateLimited, SoftFailureKind::Forbidden, SoftFailureKind::NotFound] {
			assert_eq!(classify_status(kind.status()), StatusDisposition::Soft(kind));
		}

		let signal = SoftFailure::new(SoftFailureKind::RateLimited);

		assert_eq!(signal.header(), "X-Rate-Limited");
		assert_eq!(signal.message(), "Rate limited - please try again later");
		assert_eq!(SoftFailureKind::NotFound.to_string(), "not_found");
	}
}

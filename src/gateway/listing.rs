//! Page of items returned by a listing call.

// self
use crate::{_prelude::*, gateway::policy::SoftFailure};

/// Items of one page, or an empty page plus the soft failure that emptied it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing<T> {
	/// Decoded items; always empty when `signal` is set.
	pub items: Vec<T>,
	/// Page that was requested, if any.
	pub page: Option<u32>,
	/// Page size that was requested, if any.
	pub per_page: Option<u32>,
	/// Soft failure that replaced the upstream result.
	pub signal: Option<SoftFailure>,
}
impl<T> Listing<T> {
	/// Wraps a successfully decoded page.
	pub fn new(items: Vec<T>, page: Option<u32>, per_page: Option<u32>) -> Self {
		Self { items, page, per_page, signal: None }
	}

	/// Builds the empty page returned for a soft failure.
	pub fn soft_failure(signal: SoftFailure, page: Option<u32>, per_page: Option<u32>) -> Self {
		Self { items: Vec::new(), page, per_page, signal: Some(signal) }
	}

	/// Number of items on this page.
	pub fn total_count(&self) -> usize {
		self.items.len()
	}

	/// Returns `true` when the page was emptied by a soft failure.
	pub fn is_soft_failure(&self) -> bool {
		self.signal.is_some()
	}

	/// Transforms the items while keeping paging and signal.
	pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
		Listing {
			items: self.items.into_iter().map(f).collect(),
			page: self.page,
			per_page: self.per_page,
			signal: self.signal,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::gateway::policy::SoftFailureKind;

	#[test]
	fn soft_failure_pages_are_empty() {
		let listing: Listing<u8> =
			Listing::soft_failure(SoftFailure::new(SoftFailureKind::Forbidden), Some(2), Some(50));

		assert!(listing.is_soft_failure());
		assert_eq!(listing.total_count(), 0);
		assert_eq!(listing.page, Some(2));
	}

	#[test]
	fn map_keeps_paging() {
		let listing = Listing::new(vec![1, 2, 3], Some(1), Some(3)).map(|n| n * 10);

		assert_eq!(listing.items, vec![10, 20, 30]);
		assert_eq!(listing.per_page, Some(3));
		assert!(!listing.is_soft_failure());
	}
}

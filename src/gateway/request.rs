//! Resource request descriptors for gated fetches.

// crates.io
use url::Position;
// self
use crate::{_prelude::*, error::ConfigError};

/// Largest `per_page` value the upstream API honors.
pub const MAX_PER_PAGE: u32 = 100;

/// GET request against a path below the API base.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRequest {
	path: String,
	page: Option<u32>,
	per_page: Option<u32>,
	query: Vec<(String, String)>,
}
impl ResourceRequest {
	/// Creates a request for `path`, which must start with `/` and may carry a query string.
	pub fn new(path: impl Into<String>) -> Result<Self, ConfigError> {
		let path = path.into();

		if !path.starts_with('/') || path.starts_with("//") {
			return Err(ConfigError::InvalidResourcePath { path });
		}

		Ok(Self { path, page: None, per_page: None, query: Vec::new() })
	}

	/// Requests the given page; values below 1 are raised to 1.
	pub fn with_page(mut self, page: u32) -> Self {
		self.page = Some(page.max(1));

		self
	}

	/// Requests the given page size, clamped to `1..=MAX_PER_PAGE`.
	pub fn with_per_page(mut self, per_page: u32) -> Self {
		self.per_page = Some(per_page.clamp(1, MAX_PER_PAGE));

		self
	}

	/// Appends an extra query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Path as given at construction.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Requested page, if any.
	pub fn page(&self) -> Option<u32> {
		self.page
	}

	/// Requested page size after clamping, if any.
	pub fn per_page(&self) -> Option<u32> {
		self.per_page
	}

	/// Resolves the absolute URL below `base`, keeping any path prefix the base carries.
	pub fn url(&self, base: &Url) -> Result<Url, ConfigError> {
		let raw = format!("{}{}", base.as_str().trim_end_matches('/'), self.path);
		let mut url = Url::parse(&raw)
			.map_err(|_| ConfigError::InvalidEndpoint { endpoint: "resource", url: raw.clone() })?;
		let mut extra = Vec::with_capacity(self.query.len() + 2);

		if let Some(page) = self.page {
			extra.push(("page".to_owned(), page.to_string()));
		}
		if let Some(per_page) = self.per_page {
			extra.push(("per_page".to_owned(), per_page.to_string()));
		}

		extra.extend(self.query.iter().cloned());

		if !extra.is_empty() {
			url.query_pairs_mut().extend_pairs(extra);
		}

		Ok(url)
	}
}

/// Path and query of `url`, used to label errors and log events.
pub(crate) fn path_and_query(url: &Url) -> String {
	url[Position::BeforePath..].to_owned()
}

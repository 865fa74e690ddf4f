//! Typed student and campus listings on top of the gated fetch.
//!
//! The models are lenient: unknown fields are ignored and everything except the identifiers
//! defaults, so upstream schema drift degrades into empty fields rather than decode failures.

// self
use crate::{
	_prelude::*,
	gateway::{Gateway, Listing, MAX_PER_PAGE, ResourceRequest},
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
};

/// Page selection for student listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageQuery {
	/// 1-based page number.
	pub page: u32,
	/// Items per page, at most [`MAX_PER_PAGE`].
	pub per_page: u32,
}
impl PageQuery {
	/// Page size used when the caller does not pick one.
	pub const DEFAULT_PER_PAGE: u32 = 50;

	/// Creates a query, raising `page` to 1 and clamping `per_page` to `1..=MAX_PER_PAGE`.
	pub fn new(page: u32, per_page: u32) -> Self {
		Self { page: page.max(1), per_page: per_page.clamp(1, MAX_PER_PAGE) }
	}

	fn request(self, path: String) -> Result<ResourceRequest> {
		Ok(ResourceRequest::new(path)?.with_page(self.page).with_per_page(self.per_page))
	}
}
impl Default for PageQuery {
	fn default() -> Self {
		Self { page: 1, per_page: Self::DEFAULT_PER_PAGE }
	}
}

/// User record as returned by `/v2/users` and `/v2/campus/{id}/users`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Student {
	/// Upstream user id.
	pub id: u64,
	/// Login handle.
	pub login: String,
	/// Contact email.
	pub email: Option<String>,
	/// Legal first name.
	pub first_name: Option<String>,
	/// Legal last name.
	pub last_name: Option<String>,
	/// Preferred full name, when the user set one.
	pub usual_full_name: Option<String>,
	/// Name shown by the upstream intranet.
	pub displayname: Option<String>,
	/// Account kind (`student`, `external`, ...).
	pub kind: Option<String>,
	/// API URL of the user.
	pub url: Option<String>,
	/// Profile picture links.
	pub image: StudentImage,
	/// Staff flag.
	#[serde(rename = "staff?")]
	pub staff: bool,
	/// Evaluation points balance.
	pub correction_point: i64,
	/// Wallet balance.
	pub wallet: i64,
	/// Piscine month, e.g. `july`.
	pub pool_month: Option<String>,
	/// Piscine year, e.g. `2025`.
	pub pool_year: Option<String>,
	/// Workstation the user is logged in at, if any.
	pub location: Option<String>,
	/// Alumni flag.
	#[serde(rename = "alumni?")]
	pub alumni: bool,
	/// Account activity flag.
	#[serde(rename = "active?")]
	pub active: bool,
	/// Cursus enrolments; only present when the upstream embeds them.
	pub cursus_users: Vec<CursusUser>,
}
impl Student {
	/// Best available human-readable name.
	pub fn display_name(&self) -> String {
		if let Some(name) = self.usual_full_name.as_deref().filter(|name| !name.trim().is_empty()) {
			return name.to_owned();
		}
		if let Some(name) = self.displayname.as_deref().filter(|name| !name.trim().is_empty()) {
			return name.to_owned();
		}

		let joined = [self.first_name.as_deref(), self.last_name.as_deref()]
			.into_iter()
			.flatten()
			.filter(|part| !part.is_empty())
			.collect::<Vec<_>>()
			.join(" ");

		if joined.is_empty() { self.login.clone() } else { joined }
	}

	/// Highest cursus level among embedded enrolments.
	pub fn max_level(&self) -> Option<f64> {
		self.cursus_users.iter().map(|cursus| cursus.level).reduce(f64::max)
	}
}

/// Profile picture links.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentImage {
	/// Full-size picture.
	pub link: Option<String>,
	/// Resized variants.
	pub versions: ImageVersions,
}

/// Resized profile picture links.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageVersions {
	/// Large variant.
	pub large: Option<String>,
	/// Medium variant.
	pub medium: Option<String>,
	/// Small variant.
	pub small: Option<String>,
	/// Micro variant.
	pub micro: Option<String>,
}

/// Enrolment of a user in a cursus.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursusUser {
	/// Enrolment id.
	pub id: u64,
	/// Current level.
	pub level: f64,
	/// Grade label, if any.
	pub grade: Option<String>,
	/// Blackhole date as sent by the upstream, if any.
	pub blackholed_at: Option<String>,
	/// Cursus the enrolment belongs to.
	pub cursus: Cursus,
}

/// Cursus summary embedded in enrolments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cursus {
	/// Cursus id.
	pub id: u64,
	/// Display name.
	pub name: String,
	/// URL slug.
	pub slug: String,
}

/// Campus record as returned by `/v2/campus`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Campus {
	/// Upstream campus id.
	pub id: u64,
	/// Display name.
	pub name: String,
	/// IANA time zone.
	pub time_zone: Option<String>,
	/// Country name.
	pub country: Option<String>,
	/// City name.
	pub city: Option<String>,
	/// Campus website.
	pub website: Option<String>,
	/// Registered users.
	pub users_count: u64,
	/// Whether the campus is operating.
	pub active: bool,
	/// Whether the campus is publicly listed.
	pub public: bool,
}

impl<C, M> Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Lists users across the whole network (`GET /v2/users`).
	pub async fn students(&self, query: PageQuery) -> Result<Listing<Student>> {
		self.fetch_listing(&query.request("/v2/users".into())?).await
	}

	/// Lists users of one campus (`GET /v2/campus/{id}/users`).
	pub async fn campus_students(&self, campus_id: u64, query: PageQuery) -> Result<Listing<Student>> {
		self.fetch_listing(&query.request(format!("/v2/campus/{campus_id}/users"))?).await
	}

	/// Returns active public campuses sorted by name, ignoring case.
	pub async fn active_campuses(&self) -> Result<Vec<Campus>> {
		let campuses: Vec<Campus> = self.fetch(&ResourceRequest::new("/v2/campus")?).await?;

		Ok(filter_active_campuses(campuses))
	}
}

/// Keeps active public campuses and sorts them by case-insensitive name.
pub fn filter_active_campuses(campuses: Vec<Campus>) -> Vec<Campus> {
	let mut kept =
		campuses.into_iter().filter(|campus| campus.active && campus.public).collect::<Vec<_>>();

	kept.sort_by_cached_key(|campus| campus.name.to_lowercase());

	kept
}

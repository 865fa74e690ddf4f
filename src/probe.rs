//! Sequential endpoint probe for checking which resources the credentials can reach.
//!
//! A probe obtains a token first and aborts if that fails. Every endpoint then goes through the
//! regular gated fetch one after another; per-endpoint failures (non-success statuses, transport
//! errors, malformed JSON) are recorded in the report instead of ending the probe.

// crates.io
use oauth2::http::StatusCode;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	gateway::{Gateway, ResourceRequest},
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, OpKind, OpOutcome, OpSpan},
};

const SAMPLE_LEN: usize = 2;

/// Built-in endpoint lists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeSet {
	/// One listing per top-level resource.
	#[default]
	Basic,
	/// Listings plus single-record lookups and nested collections.
	Detailed,
	/// Broad sweep including endpoints that commonly need extra permissions.
	Comprehensive,
}
impl ProbeSet {
	/// Resource paths probed by this set, in order.
	pub fn endpoints(self) -> &'static [&'static str] {
		match self {
			Self::Basic => &[
				"/v2/campus",
				"/v2/cursus",
				"/v2/users?per_page=5",
				"/v2/languages",
				"/v2/skills",
				"/v2/levels",
				"/v2/achievements",
				"/v2/projects",
			],
			Self::Detailed => &[
				"/v2/campus",
				"/v2/campus/64",
				"/v2/campus/64/users?per_page=3",
				"/v2/cursus",
				"/v2/cursus/21",
				"/v2/cursus/21/users?per_page=3",
				"/v2/cursus/21/projects?per_page=3",
				"/v2/cursus/21/skills?per_page=3",
				"/v2/users?per_page=5",
				"/v2/users/1",
				"/v2/skills?per_page=5",
				"/v2/levels?per_page=5",
				"/v2/projects?per_page=5",
				"/v2/projects/1",
				"/v2/languages",
				"/v2/achievements?per_page=5",
				"/v2/groups?per_page=5",
				"/v2/coalitions?per_page=5",
				"/v2/notions?per_page=5",
			],
			Self::Comprehensive => &[
				"/v2/campus",
				"/v2/campus?per_page=100",
				"/v2/cursus",
				"/v2/cursus?per_page=100",
				"/v2/languages",
				"/v2/skills",
				"/v2/skills?per_page=100",
				"/v2/achievements",
				"/v2/achievements?per_page=100",
				"/v2/projects",
				"/v2/projects?per_page=100",
				"/v2/campus/1",
				"/v2/campus/64",
				"/v2/campus/35",
				"/v2/campus/75",
				"/v2/campus/1/users?per_page=5",
				"/v2/campus/64/users?per_page=10",
				"/v2/cursus/21",
				"/v2/cursus/1",
				"/v2/cursus/21/projects?per_page=20",
				"/v2/cursus/21/skills?per_page=20",
				"/v2/cursus/21/levels?per_page=20",
				"/v2/users?per_page=10",
				"/v2/users?per_page=10&page=2",
				"/v2/users?per_page=10&page=100",
				"/v2/projects/1",
				"/v2/projects/2",
				"/v2/projects/42",
				"/v2/projects/100",
				"/v2/projects/1000",
				"/v2/achievements/1",
				"/v2/achievements/4",
				"/v2/achievements/10",
				"/v2/skills/1",
				"/v2/skills/14",
				"/v2/languages/1",
				"/v2/languages/2",
				"/v2/apps",
				"/v2/me",
				"/v2/teams?per_page=5",
				"/v2/evaluations?per_page=5",
				"/v2/attachments?per_page=5",
				"/v2/events?per_page=5",
				"/v2/locations?per_page=5",
				"/v2/messages?per_page=5",
				"/v2/partnerships?per_page=5",
				"/v2/qualifications?per_page=5",
				"/v2/slots?per_page=5",
				"/v2/topics?per_page=5",
				"/v2/titles?per_page=5",
				"/v2/expertises?per_page=5",
				"/v2/flash?per_page=5",
				"/v2/exams?per_page=5",
				"/v2/scales?per_page=5",
				"/v2/scale_teams?per_page=5",
				"/v2/corrections?per_page=5",
				"/v2/correction_points?per_page=5",
				"/v2/patron_messages?per_page=5",
				"/v2/patron_rewards?per_page=5",
				"/v2/product_actions?per_page=5",
				"/v2/user_actions?per_page=5",
				"/v2/quest_stations?per_page=5",
				"/v2/quests?per_page=5",
				"/v2/roles?per_page=5",
				"/v2/subnotions?per_page=5",
				"/v2/tags?per_page=5",
				"/v2/votes?per_page=5",
				"/v2/webhooks?per_page=5",
			],
		}
	}
}

/// Structure of a successful JSON body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyShape {
	/// JSON array.
	Array {
		/// Number of elements.
		length: usize,
		/// Keys of the first element, when it is an object.
		fields: Vec<String>,
		/// Up to the first two elements.
		sample: Vec<Value>,
	},
	/// JSON object.
	Object {
		/// Top-level keys.
		fields: Vec<String>,
		/// The object itself.
		sample: Value,
	},
	/// String, number, boolean, or null.
	Scalar,
}
impl BodyShape {
	/// Describes `value`.
	pub fn of(value: &Value) -> Self {
		match value {
			Value::Array(items) => Self::Array {
				length: items.len(),
				fields: items.first().map(object_keys).unwrap_or_default(),
				sample: items.iter().take(SAMPLE_LEN).cloned().collect(),
			},
			Value::Object(_) => Self::Object { fields: object_keys(value), sample: value.clone() },
			_ => Self::Scalar,
		}
	}
}

/// Outcome of probing one endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
	/// Path that was probed.
	pub endpoint: String,
	/// HTTP status; `None` when no response arrived.
	pub status: Option<u16>,
	/// `true` for a 2xx response with a JSON body.
	pub success: bool,
	/// Failure description.
	pub error: Option<String>,
	/// Time from entering the gate to the decoded body.
	pub elapsed: StdDuration,
	/// Body structure for successful responses.
	pub shape: Option<BodyShape>,
}

/// Aggregate counts over a probe.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeSummary {
	/// Endpoints probed.
	pub total: usize,
	/// Endpoints that succeeded.
	pub successful: usize,
	/// Endpoints that failed.
	pub failed: usize,
	/// Mean elapsed time; zero for an empty probe.
	pub average_elapsed: StdDuration,
}
impl ProbeSummary {
	/// Summarizes `results`.
	pub fn from_results(results: &[ProbeResult]) -> Self {
		let total = results.len();
		let successful = results.iter().filter(|result| result.success).count();
		let elapsed = results.iter().map(|result| result.elapsed).sum::<StdDuration>();
		let average_elapsed = u32::try_from(total)
			.ok()
			.filter(|count| *count > 0)
			.map(|count| elapsed / count)
			.unwrap_or_default();

		Self { total, successful, failed: total - successful, average_elapsed }
	}
}

/// Full probe output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
	/// Aggregate counts.
	pub summary: ProbeSummary,
	/// Per-endpoint outcomes, in probe order.
	pub results: Vec<ProbeResult>,
	/// Wall-clock time the probe finished.
	pub finished_at: OffsetDateTime,
}

impl<C, M> Gateway<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Probes a built-in endpoint set.
	pub async fn probe_set(&self, set: ProbeSet) -> Result<ProbeReport> {
		self.probe(set.endpoints()).await
	}

	/// Probes `endpoints` sequentially through the gate.
	///
	/// Fails only when the initial token cannot be obtained.
	pub async fn probe<S>(&self, endpoints: &[S]) -> Result<ProbeReport>
	where
		S: AsRef<str>,
	{
		const KIND: OpKind = OpKind::EndpointProbe;

		let span = OpSpan::new(KIND, "probe");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span
			.instrument(async {
				self.tokens().get_token().await?;

				let mut results = Vec::with_capacity(endpoints.len());

				for endpoint in endpoints {
					results.push(self.probe_one(endpoint.as_ref()).await);
				}

				Ok::<_, Error>(ProbeReport {
					summary: ProbeSummary::from_results(&results),
					results,
					finished_at: self.limiter().clock().now_utc(),
				})
			})
			.await;

		obs::record_op_outcome(
			KIND,
			if result.is_ok() { OpOutcome::Success } else { OpOutcome::Failure },
		);

		result
	}

	async fn probe_one(&self, endpoint: &str) -> ProbeResult {
		let clock = self.limiter().clock();
		let started = clock.now();
		let mut result = ProbeResult {
			endpoint: endpoint.to_owned(),
			status: None,
			success: false,
			error: None,
			elapsed: StdDuration::ZERO,
			shape: None,
		};
		let outcome = match ResourceRequest::new(endpoint) {
			Ok(request) => self.fetch_raw(&request).await,
			Err(err) => Err(err.into()),
		};

		match outcome {
			Ok(raw) if raw.is_success() => {
				result.status = Some(raw.status);

				match serde_json::from_slice::<Value>(&raw.body) {
					Ok(body) => {
						result.success = true;
						result.shape = Some(BodyShape::of(&body));
					},
					Err(err) => result.error = Some(format!("Invalid JSON body: {err}.")),
				}
			},
			Ok(raw) => {
				let reason = StatusCode::from_u16(raw.status)
					.ok()
					.and_then(|code| code.canonical_reason())
					.unwrap_or("Unknown status");

				result.status = Some(raw.status);
				result.error = Some(format!("{}: {reason}", raw.status));
			},
			Err(err) => result.error = Some(err.to_string()),
		}

		result.elapsed = clock.now().saturating_duration_since(started);

		#[cfg(feature = "tracing")]
		tracing::debug!(
			endpoint,
			status = ?result.status,
			success = result.success,
			elapsed_ms = result.elapsed.as_millis() as u64,
			"Probed endpoint."
		);

		result
	}
}

fn object_keys(value: &Value) -> Vec<String> {
	value.as_object().map(|map| map.keys().cloned().collect()).unwrap_or_default()
}

//! Optional observability helpers for gateway operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `oauth2_gateway.op` with the `op` (operation)
//!   and `stage` (call site) fields, plus debug/warn events for gate delays and soft failures.
//! - Enable `metrics` to increment the `oauth2_gateway_op_total` counter for every
//!   attempt/success/soft failure/failure, labeled by `op` + `outcome`, and to record gate delays
//!   in the `oauth2_gateway_gate_delay_seconds` histogram.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gateway operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Client credentials exchange against the token endpoint.
	TokenExchange,
	/// Gated resource fetch.
	ResourceFetch,
	/// Sequential endpoint probe.
	EndpointProbe,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::TokenExchange => "token_exchange",
			OpKind::ResourceFetch => "resource_fetch",
			OpKind::EndpointProbe => "endpoint_probe",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a gateway helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Upstream error translated into an empty, annotated result.
	SoftFailure,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::SoftFailure => "soft_failure",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

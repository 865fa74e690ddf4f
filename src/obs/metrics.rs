// self
use crate::{
	_prelude::*,
	obs::{OpKind, OpOutcome},
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_op_outcome(kind: OpKind, outcome: OpOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_gateway_op_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how long the request gate suspended a caller (when enabled).
pub fn record_gate_delay(delay: StdDuration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!("oauth2_gateway_gate_delay_seconds").record(delay.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = delay;
	}
}

//! Optional observability helpers for token manager operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `oauth2_token_manager.operation` with the `operation`
//!   and `stage` fields, plus a `debug` event for every recorded outcome.
//! - Enable `metrics` to increment the `oauth2_token_manager_operation_total` counter, labeled
//!   by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the token manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// A caller asking for a valid token.
	GetToken,
	/// A client-credentials round trip to the token endpoint.
	Exchange,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::GetToken => "get_token",
			Operation::Exchange => "exchange",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation that will reach the token endpoint.
	Attempt,
	/// A cached token was still usable.
	CacheHit,
	/// The caller joined an exchange that was already in flight.
	Coalesced,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::CacheHit => "cache_hit",
			Outcome::Coalesced => "coalesced",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Records an outcome through every enabled backend.
pub fn record(operation: Operation, outcome: Outcome) {
	record_outcome_metric(operation, outcome);
	trace_outcome(operation, outcome);
}

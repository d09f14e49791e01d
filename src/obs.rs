//! Optional observability helpers for gateway calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `epaas_signer.call` with the `call`
//!   (`authenticate`/`business`) and `stage` (call site) fields, plus `warn` events for failed
//!   business calls and non-positive token lifetimes.
//! - Enable `metrics` to increment the `epaas_signer_call_total` counter for every attempt and
//!   its outcome, labeled by `call` + `outcome`. A non-2xx gateway answer is `rejected`, kept
//!   apart from local or transport `failure`s. Every HTTP answer also bumps
//!   `epaas_signer_gateway_status_total`, labeled by `call` + `status_class` (`2xx`..`5xx`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gateway call kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// `GET /auth` token acquisition.
	Authenticate,
	/// Signed business call carrying the access token.
	Business,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Authenticate => "authenticate",
			CallKind::Business => "business",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a call helper.
	Attempt,
	/// Successful completion.
	Success,
	/// The gateway answered with a non-2xx status.
	Rejected,
	/// Failure raised locally or by the transport.
	Failure,
}
impl CallOutcome {
	/// Classifies a finished call.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => CallOutcome::Success,
			Err(Error::Protocol(e)) if e.status().is_some() => CallOutcome::Rejected,
			Err(_) => CallOutcome::Failure,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Rejected => "rejected",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Groups an HTTP status into its class label (`1xx`..`5xx`, `other` outside that range).
pub const fn status_class(status: u16) -> &'static str {
	match status {
		100..=199 => "1xx",
		200..=299 => "2xx",
		300..=399 => "3xx",
		400..=499 => "4xx",
		500..=599 => "5xx",
		_ => "other",
	}
}

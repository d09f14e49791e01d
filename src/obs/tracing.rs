// self
use crate::{_prelude::*, obs::CallKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by gateway calls.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("epaas_signer.call", call = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a `warn` event describing a failed business call, including its cURL replay.
pub fn log_business_failure(method: &str, uri: &str, status: u16, body: &str, replay: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(method, uri, status, body, replay, "Gateway call returned a non-success status.");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (method, uri, status, body, replay);
	}
}

/// Emits a `warn` event when a token's lifetime is shorter than the clock-skew buffer.
pub fn log_non_positive_ttl(cache_key: &str, expire_seconds: i64, ttl_seconds: i64) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		cache_key,
		expire_seconds,
		ttl_seconds,
		"Access token lifetime does not exceed the clock-skew buffer; it will not be served from the cache."
	);

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (cache_key, expire_seconds, ttl_seconds);
	}
}

/// Emits a `debug` event after a token was fetched and cached.
pub fn log_token_refreshed(cache_key: &str, ttl_seconds: i64) {
	#[cfg(feature = "tracing")]
	tracing::debug!(cache_key, ttl_seconds, "Access token refreshed.");

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (cache_key, ttl_seconds);
	}
}

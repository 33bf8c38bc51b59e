//! Optional observability for pipeline flows and the refresh coordinator.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to wrap every flow in a `portal_client.flow` span carrying `flow` and
//!   `stage` fields, and to emit events when a refresh starts, is joined, succeeds, fails, or is
//!   discarded.
//! - Enable `metrics` to count `portal_client_flow_total{flow,outcome}` for every client call and
//!   `portal_client_refresh_total{event}` for every refresh coordinator decision.
//!
//! With both features off every helper here compiles to nothing.

// self
use crate::_prelude::*;

/// Emits a `tracing` event when the feature is enabled; compiles to nothing otherwise.
macro_rules! flow_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		::tracing::$level!($($arg)+);
	};
}
pub(crate) use flow_event;

/// Future returned by [`FlowSpan::instrument`].
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`].
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Pipeline flow kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Authenticated request through the refresh coordinator.
	Request,
	/// Credential refresh call.
	Refresh,
	/// Login call.
	Login,
	/// Logout call.
	Logout,
	/// Registration call.
	Register,
	/// Scheduled polling tick.
	Poll,
}
impl FlowKind {
	/// Stable label for span and metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Request => "request",
			FlowKind::Refresh => "refresh",
			FlowKind::Login => "login",
			FlowKind::Logout => "logout",
			FlowKind::Register => "register",
			FlowKind::Poll => "poll",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How one client call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// The call started.
	Attempt,
	/// The call returned `Ok`.
	Success,
	/// The call returned `Err`.
	Failure,
}
impl FlowOutcome {
	/// Stable label for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}

/// Refresh coordinator decisions mirrored by
/// [`RefreshMetrics`](crate::flows::RefreshMetrics).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshEvent {
	/// A refresh call was issued.
	Attempt,
	/// A replacement credential was installed.
	Success,
	/// The refresh failed or its result was discarded.
	Failure,
	/// An expired request joined a cycle already in flight.
	Coalesced,
	/// An original request was re-issued after recovery.
	Retry,
}
impl RefreshEvent {
	/// Stable label for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshEvent::Attempt => "attempt",
			RefreshEvent::Success => "success",
			RefreshEvent::Failure => "failure",
			RefreshEvent::Coalesced => "coalesced",
			RefreshEvent::Retry => "retry",
		}
	}
}

/// Span wrapping one client call.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind` at call site `stage`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::info_span!("portal_client.flow", flow = kind.as_str(), stage) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Runs `fut` inside the span without holding an entered guard across `.await`.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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

/// Counts one client call outcome.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"portal_client_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Counts one refresh coordinator decision.
pub fn record_refresh_event(event: RefreshEvent) {
	#[cfg(feature = "metrics")]
	metrics::counter!("portal_client_refresh_total", "event" => event.as_str()).increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = event;
}

/// Runs `fut` inside a flow span and counts the attempt and its outcome.
pub(crate) async fn observe<T, Fut>(kind: FlowKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = FlowSpan::new(kind, stage);

	record_flow_outcome(kind, FlowOutcome::Attempt);

	let result = span.instrument(fut).await;

	record_flow_outcome(
		kind,
		if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
	);

	result
}

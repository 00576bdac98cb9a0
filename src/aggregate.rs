use std::net::IpAddr;
use std::time::Duration;

use crate::probe::ProbeResult;
use crate::validity::Validity;

/// Lifecycle of a per-resolver aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateState {
	/// Probe results are still being folded in.
	Accumulating,
	/// All dispatched probes accounted for; stats are frozen.
	Complete,
	/// Validity has been applied; nothing further may change.
	Finalized,
}

/// Per-resolver accumulator for probe outcomes.
///
/// Results for one resolver are folded in one at a time; the fold is
/// commutative, so probe completion order does not matter. The average
/// is divided out exactly once, when the aggregate completes.
#[derive(Debug, Clone)]
pub struct ResolverAggregate {
	/// Resolver identity (socket address in string form).
	pub resolver: String,
	/// Display label, falls back to the address.
	pub label: String,
	/// Number of probes dispatched for this resolver.
	pub expected: usize,
	/// Probes accounted for so far (successes and failures).
	pub attempted: usize,
	/// Probes that returned a usable answer in time.
	pub succeeded: usize,
	sum: Duration,
	min: Option<Duration>,
	max: Option<Duration>,
	avg: Option<Duration>,
	/// Answer addresses from the validation-domain probe, if it succeeded.
	pub validation_addrs: Option<Vec<IpAddr>>,
	pub validity: Validity,
	state: AggregateState,
	/// True when the aggregate was force-finalized at the global timeout
	/// with un-returned probes counted as failures.
	pub forced: bool,
}

impl ResolverAggregate {
	pub fn new(resolver: String, label: String, expected: usize) -> Self {
		Self {
			resolver,
			label,
			expected,
			attempted: 0,
			succeeded: 0,
			sum: Duration::ZERO,
			min: None,
			max: None,
			avg: None,
			validation_addrs: None,
			validity: Validity::Unknown,
			state: AggregateState::Accumulating,
			forced: false,
		}
	}

	pub fn state(&self) -> AggregateState {
		self.state
	}

	pub fn is_complete(&self) -> bool {
		self.state != AggregateState::Accumulating
	}

	/// Fold one probe result into the aggregate.
	///
	/// `is_validation` marks the probe for the validation domain, whose
	/// answer addresses are retained for the ownership check. Results
	/// arriving after completion (e.g. after a force-finalize) are
	/// dropped so the attempted count never exceeds the dispatch count.
	pub fn record(&mut self, result: &ProbeResult, is_validation: bool) {
		if self.is_complete() {
			return;
		}
		debug_assert_eq!(result.resolver, self.resolver);

		self.attempted += 1;
		if result.is_success() {
			self.succeeded += 1;
			if let Some(latency) = result.latency {
				self.sum += latency;
				self.min = Some(self.min.map_or(latency, |m| m.min(latency)));
				self.max = Some(self.max.map_or(latency, |m| m.max(latency)));
			}
			if is_validation {
				self.validation_addrs = Some(result.addrs.clone());
			}
		}

		if self.attempted == self.expected {
			self.complete();
		}
	}

	/// Freeze statistics with whatever partial data is available, counting
	/// un-returned probes as failures. Used at the global run timeout.
	pub fn force_complete(&mut self) {
		if self.is_complete() {
			return;
		}
		self.attempted = self.expected;
		self.forced = true;
		self.complete();
	}

	fn complete(&mut self) {
		// Single division; avg stays None for a fully-failing resolver so
		// it cannot outrank slow-but-working ones with a false zero.
		if self.succeeded > 0 {
			self.avg = Some(self.sum / self.succeeded as u32);
		}
		self.state = AggregateState::Complete;
	}

	/// Apply the validity verdict and seal the aggregate.
	pub fn finalize(&mut self, validity: Validity) {
		debug_assert_eq!(self.state, AggregateState::Complete);
		self.validity = validity;
		self.state = AggregateState::Finalized;
	}

	/// Average latency over successful probes; None when no probe succeeded
	/// or the aggregate has not completed yet.
	pub fn avg_latency(&self) -> Option<Duration> {
		self.avg
	}

	pub fn min_latency(&self) -> Option<Duration> {
		if self.succeeded > 0 { self.min } else { None }
	}

	pub fn max_latency(&self) -> Option<Duration> {
		if self.succeeded > 0 { self.max } else { None }
	}

	pub fn success_rate(&self) -> f64 {
		if self.attempted == 0 {
			0.0
		} else {
			self.succeeded as f64 / self.attempted as f64
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::probe::FailReason;

	fn success(resolver: &str, domain: &str, ms: u64) -> ProbeResult {
		ProbeResult {
			resolver: resolver.to_string(),
			domain: domain.to_string(),
			latency: Some(Duration::from_millis(ms)),
			addrs: vec!["93.184.216.34".parse().unwrap()],
			fail: None,
		}
	}

	fn failure(resolver: &str, domain: &str, reason: FailReason) -> ProbeResult {
		ProbeResult {
			resolver: resolver.to_string(),
			domain: domain.to_string(),
			latency: None,
			addrs: vec![],
			fail: Some(reason),
		}
	}

	#[test]
	fn test_all_success_stats() {
		// 3 successes with latencies 10/20/30 ms
		let mut agg = ResolverAggregate::new("1.1.1.1".into(), "1.1.1.1".into(), 3);
		agg.record(&success("1.1.1.1", "a.com", 10), false);
		agg.record(&success("1.1.1.1", "b.com", 20), false);
		assert!(!agg.is_complete());
		agg.record(&success("1.1.1.1", "c.com", 30), false);

		assert_eq!(agg.state(), AggregateState::Complete);
		assert_eq!(agg.succeeded, 3);
		assert_eq!(agg.attempted, 3);
		assert_eq!(agg.avg_latency(), Some(Duration::from_millis(20)));
		assert_eq!(agg.min_latency(), Some(Duration::from_millis(10)));
		assert_eq!(agg.max_latency(), Some(Duration::from_millis(30)));
	}

	#[test]
	fn test_avg_between_min_and_max() {
		let mut agg = ResolverAggregate::new("9.9.9.9".into(), "9.9.9.9".into(), 4);
		for ms in [7, 13, 29, 41] {
			agg.record(&success("9.9.9.9", "d.com", ms), false);
		}
		let avg = agg.avg_latency().unwrap();
		assert!(agg.min_latency().unwrap() <= avg);
		assert!(avg <= agg.max_latency().unwrap());
	}

	#[test]
	fn test_all_failures_yield_no_stats() {
		let mut agg = ResolverAggregate::new("8.8.8.8".into(), "8.8.8.8".into(), 2);
		agg.record(&failure("8.8.8.8", "a.com", FailReason::Timeout), false);
		agg.record(&failure("8.8.8.8", "b.com", FailReason::Error), false);

		assert!(agg.is_complete());
		assert_eq!(agg.succeeded, 0);
		assert_eq!(agg.attempted, 2);
		// Not-available, never a default zero
		assert_eq!(agg.avg_latency(), None);
		assert_eq!(agg.min_latency(), None);
		assert_eq!(agg.max_latency(), None);
	}

	#[test]
	fn test_force_complete_counts_missing_as_failures() {
		// Global timeout with one probe outstanding: 2/3 successes stand
		let mut agg = ResolverAggregate::new("1.0.0.1".into(), "1.0.0.1".into(), 3);
		agg.record(&success("1.0.0.1", "a.com", 10), false);
		agg.record(&success("1.0.0.1", "b.com", 30), false);
		agg.force_complete();

		assert!(agg.forced);
		assert_eq!(agg.attempted, 3);
		assert_eq!(agg.succeeded, 2);
		assert_eq!(agg.avg_latency(), Some(Duration::from_millis(20)));
	}

	#[test]
	fn test_late_result_dropped_after_completion() {
		let mut agg = ResolverAggregate::new("1.0.0.1".into(), "1.0.0.1".into(), 2);
		agg.record(&success("1.0.0.1", "a.com", 10), false);
		agg.force_complete();
		// A straggler arriving after force-finalization must not mutate stats
		agg.record(&success("1.0.0.1", "b.com", 500), false);

		assert_eq!(agg.attempted, 2);
		assert_eq!(agg.succeeded, 1);
		assert_eq!(agg.avg_latency(), Some(Duration::from_millis(10)));
	}

	#[test]
	fn test_validation_addrs_captured() {
		let mut agg = ResolverAggregate::new("1.1.1.1".into(), "1.1.1.1".into(), 2);
		agg.record(&success("1.1.1.1", "google.com", 15), true);
		agg.record(&success("1.1.1.1", "a.com", 25), false);

		let addrs = agg.validation_addrs.as_ref().unwrap();
		assert_eq!(addrs.len(), 1);
	}

	#[test]
	fn test_finalize_seals_validity() {
		let mut agg = ResolverAggregate::new("1.1.1.1".into(), "1.1.1.1".into(), 1);
		agg.record(&success("1.1.1.1", "a.com", 15), false);
		agg.finalize(Validity::Valid);
		assert_eq!(agg.state(), AggregateState::Finalized);
		assert_eq!(agg.validity, Validity::Valid);
	}
}

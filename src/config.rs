use std::time::Duration;

use crate::error::{Result, RunError};

/// Address-family mode for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyMode {
	V4,
	V6,
	Mixed,
}

/// Static configuration for a single benchmark run.
///
/// Built once from the CLI in main and passed into the scheduler by
/// value; nothing here is mutated during the run.
#[derive(Debug, Clone)]
pub struct RunConfig {
	/// Which address families of resolver candidates to test.
	pub family: FamilyMode,
	/// Bounded worker pool width (maximum in-flight probes).
	pub pool_width: usize,
	/// Per-probe deadline. This is the query timeout, not the latency
	/// filter below.
	pub probe_deadline: Duration,
	/// Number of latency domains to sample from the panel.
	pub sample_count: usize,
	/// Latency ceiling: resolvers whose finalized average exceeds this
	/// are moved from the ranked sequence into diagnostics.
	pub max_avg_latency: Duration,
	/// Global run timeout; outstanding probes are abandoned when it
	/// elapses and unfinished aggregates are force-finalized.
	pub run_timeout: Duration,
	/// Retries for protocol-error probe failures. Timeouts are never
	/// retried.
	pub retries: u32,
	/// Seed for reproducible probe-order shuffling.
	pub seed: Option<u64>,
}

impl Default for RunConfig {
	fn default() -> Self {
		Self {
			family: FamilyMode::V4,
			pool_width: 64,
			probe_deadline: Duration::from_millis(300),
			sample_count: 3,
			max_avg_latency: Duration::from_millis(1000),
			run_timeout: Duration::from_secs(120),
			retries: 1,
			seed: None,
		}
	}
}

impl RunConfig {
	/// Reject configurations that cannot produce a meaningful run.
	pub fn validate(&self) -> Result<()> {
		if self.pool_width == 0 {
			return Err(RunError::Config("pool width must be > 0".into()));
		}
		if self.probe_deadline.is_zero() {
			return Err(RunError::Config("probe deadline must be > 0".into()));
		}
		if self.sample_count == 0 {
			return Err(RunError::Config("domain sample count must be > 0".into()));
		}
		if self.run_timeout.is_zero() {
			return Err(RunError::Config("run timeout must be > 0".into()));
		}
		Ok(())
	}
}

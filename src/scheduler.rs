use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::aggregate::ResolverAggregate;
use crate::config::RunConfig;
use crate::dns::QueryFamily;
use crate::domains::TestDomain;
use crate::error::{Result, RunError};
use crate::probe::{send_probe, FailReason, ProbeResult};
use crate::source::ResolverCandidate;
use crate::validity::{check_validity, OwnershipLookup};

/// Observational sink for incremental completion counts. Implementations
/// must not block; there is no back-pressure on the run.
pub trait ProgressSink: Send + Sync {
	fn probe_completed(&self, done: usize, total: usize);
}

/// Progress sink that discards all updates.
pub struct NullProgress;

impl ProgressSink for NullProgress {
	fn probe_completed(&self, _done: usize, _total: usize) {}
}

/// Final state of a benchmark run.
#[derive(Debug)]
pub struct RunOutcome {
	/// One finalized aggregate per candidate, in first-seen order.
	pub aggregates: Vec<ResolverAggregate>,
	/// True when the global timeout cut the run short and some aggregates
	/// were force-finalized from partial data.
	pub partial: bool,
}

/// One (resolver, domain) unit of work.
#[derive(Clone)]
struct ProbeTask {
	resolver: ResolverCandidate,
	domain: TestDomain,
}

/// Orchestrates one benchmark run: fans the (resolver x domain) probe set
/// out across a bounded worker pool, routes results back to per-resolver
/// aggregates, applies the validity check, and enforces the global
/// timeout.
///
/// Create, run once, discard; no state survives across runs.
pub struct Scheduler {
	cfg: RunConfig,
	lookup: Option<Arc<dyn OwnershipLookup>>,
	operator_keywords: Vec<String>,
	progress: Arc<dyn ProgressSink>,
}

impl Scheduler {
	pub fn new(
		cfg: RunConfig,
		lookup: Option<Arc<dyn OwnershipLookup>>,
		operator_keywords: Vec<String>,
		progress: Arc<dyn ProgressSink>,
	) -> Self {
		Self { cfg, lookup, operator_keywords, progress }
	}

	/// Execute the full probe set and return finalized aggregates.
	///
	/// Fatal only on configuration problems or empty inputs; individual
	/// probe failures are folded into the aggregates.
	pub async fn run(
		&self,
		resolvers: &[ResolverCandidate],
		domains: &[TestDomain],
	) -> Result<RunOutcome> {
		self.cfg.validate()?;
		if resolvers.is_empty() {
			return Err(RunError::EmptyResolvers);
		}
		if domains.is_empty() {
			return Err(RunError::EmptyDomains);
		}

		// One aggregate per resolver, in input order. The collection loop
		// below is the single writer for all of them, so concurrently
		// completing probes never race on an aggregate.
		let mut aggregates: Vec<ResolverAggregate> = resolvers.iter()
			.map(|r| ResolverAggregate::new(r.key(), r.label.clone(), domains.len()))
			.collect();
		let index: HashMap<String, usize> = resolvers.iter()
			.enumerate()
			.map(|(i, r)| (r.key(), i))
			.collect();
		let validation_domains: HashSet<String> = domains.iter()
			.filter(|d| d.is_validation)
			.map(|d| d.name.clone())
			.collect();

		// Full probe set: |resolvers| x |domains|
		let mut tasks: Vec<ProbeTask> = Vec::with_capacity(resolvers.len() * domains.len());
		for resolver in resolvers {
			for domain in domains {
				tasks.push(ProbeTask {
					resolver: resolver.clone(),
					domain: domain.clone(),
				});
			}
		}
		let total = tasks.len();

		// Shuffle so one slow resolver's probes do not monopolize the pool
		let mut rng = match self.cfg.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};
		tasks.shuffle(&mut rng);

		let semaphore = Arc::new(Semaphore::new(self.cfg.pool_width));
		let mut handles = Vec::with_capacity(total);
		for task in tasks {
			let sem = semaphore.clone();
			let deadline = self.cfg.probe_deadline;
			let retries = self.cfg.retries;

			handles.push(tokio::spawn(async move {
				let _permit = sem.acquire().await.expect("semaphore closed");
				probe_with_retries(&task, deadline, retries).await
			}));
		}

		// Collect until done or the global timeout; outstanding probes are
		// abandoned once the run deadline passes.
		let run_deadline = Instant::now() + self.cfg.run_timeout;
		let mut partial = false;
		let mut done = 0usize;
		for handle in handles {
			match tokio::time::timeout_at(run_deadline, handle).await {
				Ok(Ok(result)) => {
					done += 1;
					self.progress.probe_completed(done, total);
					if let Some(&i) = index.get(&result.resolver) {
						let is_validation = validation_domains.contains(&result.domain);
						aggregates[i].record(&result, is_validation);
					} else {
						tracing::warn!(resolver = %result.resolver, "result for unknown resolver");
					}
				}
				Ok(Err(e)) => {
					// A panicked worker counts against its resolver via
					// force-finalization below.
					tracing::warn!("probe task failed: {e}");
					done += 1;
				}
				Err(_) => {
					tracing::warn!("global run timeout after {done}/{total} probes");
					partial = true;
					break;
				}
			}
		}

		// Force-finalize anything still pending, then apply validity
		for agg in &mut aggregates {
			if !agg.is_complete() {
				agg.force_complete();
			}
			let validity = check_validity(
				agg.validation_addrs.as_deref(),
				self.lookup.as_deref(),
				&self.operator_keywords,
			);
			agg.finalize(validity);
		}

		Ok(RunOutcome { aggregates, partial })
	}
}

/// Execute one probe, retrying protocol-error failures up to `retries`
/// times. Timeouts are not retried: a resolver that hit its deadline once
/// would burn another full deadline for little information.
async fn probe_with_retries(
	task: &ProbeTask,
	deadline: std::time::Duration,
	retries: u32,
) -> ProbeResult {
	let family = if task.resolver.is_ipv4() {
		QueryFamily::A
	} else {
		QueryFamily::Aaaa
	};

	let mut attempt = 0;
	loop {
		let result = send_probe(task.resolver.addr, &task.domain.name, family, deadline).await;
		match result.fail {
			Some(FailReason::Error) if attempt < retries => {
				attempt += 1;
				tracing::debug!(
					resolver = %result.resolver, domain = %result.domain,
					attempt, "retrying after protocol error",
				);
			}
			_ => return result,
		}
	}
}

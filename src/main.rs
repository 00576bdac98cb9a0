mod aggregate;
mod cli;
mod config;
mod dns;
mod domains;
mod error;
mod probe;
mod rank;
mod report;
mod scheduler;
mod source;
mod validity;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::RunConfig;
use crate::scheduler::{NullProgress, ProgressSink, Scheduler};
use crate::validity::{OwnershipLookup, PrefixTable};

/// Ranges file probed when --ranges is not given.
const DEFAULT_RANGES_FILE: &str = "ip-ranges.txt";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();

	let cfg = RunConfig {
		family: cli.family.into(),
		pool_width: cli.concurrency,
		probe_deadline: Duration::from_millis(cli.deadline),
		sample_count: cli.domains,
		max_avg_latency: Duration::from_millis(cli.max_avg_ms),
		run_timeout: Duration::from_secs(cli.run_timeout),
		retries: cli.retries,
		seed: cli.seed,
	};
	cfg.validate()?;

	// Collect resolver candidates from all sources
	let mut candidates = Vec::new();
	for r in &cli.resolvers {
		candidates.push(source::parse_candidate(r)?);
	}
	if let Some(path) = &cli.resolver_file {
		candidates.extend(source::read_candidate_file(path)?);
	}
	if let Some(url) = &cli.resolver_url {
		let fetched = source::fetch_candidate_list(url).await
			.map_err(|e| error::RunError::Source(e.to_string()))?;
		candidates.extend(fetched);
	} else if cli.fetch {
		let fetched = source::fetch_candidate_list(source::DEFAULT_LIST_URL).await
			.map_err(|e| error::RunError::Source(e.to_string()))?;
		candidates.extend(fetched);
	}
	if candidates.is_empty() {
		candidates = source::default_candidates();
	}
	candidates = source::dedup_by_addr(candidates);
	candidates = source::filter_family(candidates, cfg.family);

	// Test domain panel
	let latency_domains = match &cli.domain_file {
		Some(path) => domains::read_domain_file(path)?,
		None => domains::default_latency_domains(),
	};
	let panel = domains::build_panel(&latency_domains, &cli.validation_domain, cfg.sample_count);

	// Ownership lookup: explicit flag, or the default file if present.
	// Absence degrades to unknown validity rather than failing the run.
	let ranges_path = cli.ranges.clone().or_else(|| {
		Path::new(DEFAULT_RANGES_FILE)
			.exists()
			.then(|| DEFAULT_RANGES_FILE.to_string())
	});
	let lookup: Option<Arc<dyn OwnershipLookup>> = match ranges_path {
		Some(path) => match PrefixTable::from_file(Path::new(&path)) {
			Ok(table) if !table.is_empty() => {
				println!("Loaded {} ownership ranges from {}", table.len(), path);
				Some(Arc::new(table))
			}
			Ok(_) => {
				eprintln!("Warning: ranges file '{}' is empty; validity will be unknown", path);
				None
			}
			Err(e) => {
				eprintln!("Warning: {}; validity will be unknown", e);
				None
			}
		},
		None => None,
	};

	let operator_keywords = if cli.operator.is_empty() {
		validity::default_operator_keywords()
	} else {
		cli.operator.iter().map(|k| k.to_lowercase()).collect()
	};

	report::print_config_summary(&candidates, &panel, &cfg, lookup.is_some());

	let progress: Arc<dyn ProgressSink> = if cli.quiet {
		Arc::new(NullProgress)
	} else {
		Arc::new(report::ConsoleProgress::default())
	};

	let max_avg_latency = cfg.max_avg_latency;
	let scheduler = Scheduler::new(cfg, lookup, operator_keywords, progress);
	let outcome = scheduler.run(&candidates, &panel).await?;

	let ranking = rank::rank(&outcome.aggregates, max_avg_latency);
	report::print_report(&ranking, outcome.partial);

	if let Some(path) = &cli.output {
		report::write_csv(path, &ranking, outcome.partial)?;
	}

	Ok(())
}

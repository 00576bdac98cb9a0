use clap::{Parser, ValueEnum};

use crate::config::FamilyMode;

/// Benchmark public DNS resolvers and validate their answers
#[derive(Parser, Debug)]
#[command(name = "dnsrank")]
#[command(about = "Rank DNS resolvers by query latency with answer-ownership validation")]
pub struct Cli {
	/// DNS resolver address (repeatable, e.g. 1.1.1.1 or 1.1.1.1:53)
	#[arg(short = 'r', long = "resolver")]
	pub resolvers: Vec<String>,

	/// File containing resolver addresses (one per line)
	#[arg(short = 'f', long = "resolver-file")]
	pub resolver_file: Option<String>,

	/// Fetch the candidate list from a nameserver-list URL
	#[arg(long = "resolver-url")]
	pub resolver_url: Option<String>,

	/// Fetch the default public nameserver list (public-dns.info)
	#[arg(long = "fetch")]
	pub fetch: bool,

	/// Address-family mode
	#[arg(long = "family", value_enum, default_value = "v4")]
	pub family: FamilyArg,

	/// Maximum concurrent in-flight probes
	#[arg(short = 'c', long = "concurrency", default_value = "64")]
	pub concurrency: usize,

	/// Per-probe deadline in milliseconds
	#[arg(short = 't', long = "deadline", default_value = "300")]
	pub deadline: u64,

	/// Number of latency domains to sample from the panel
	#[arg(short = 'n', long = "domains", default_value = "3")]
	pub domains: usize,

	/// File containing latency-test domains (one per line)
	#[arg(long = "domain-file")]
	pub domain_file: Option<String>,

	/// Domain whose answers are checked against the ownership data
	#[arg(long = "validation-domain", default_value = "google.com")]
	pub validation_domain: String,

	/// Average-latency ceiling in ms; slower resolvers go to diagnostics
	#[arg(long = "max-avg-ms", default_value = "1000")]
	pub max_avg_ms: u64,

	/// Global run timeout in seconds
	#[arg(long = "run-timeout", default_value = "120")]
	pub run_timeout: u64,

	/// Retries for protocol-error probe failures (timeouts never retry)
	#[arg(long = "retries", default_value = "1")]
	pub retries: u32,

	/// IP-ownership ranges file (cidr + organization per line)
	#[arg(long = "ranges")]
	pub ranges: Option<String>,

	/// Expected operator keyword for validity matching (repeatable)
	#[arg(long = "operator")]
	pub operator: Vec<String>,

	/// Output CSV file path
	#[arg(short = 'o', long = "output")]
	pub output: Option<String>,

	/// Random seed for reproducible probe-order shuffling
	#[arg(short = 's', long = "seed")]
	pub seed: Option<u64>,

	/// Suppress the progress line
	#[arg(short = 'q', long = "quiet")]
	pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
	V4,
	V6,
	Mixed,
}

impl From<FamilyArg> for FamilyMode {
	fn from(arg: FamilyArg) -> Self {
		match arg {
			FamilyArg::V4 => FamilyMode::V4,
			FamilyArg::V6 => FamilyMode::V6,
			FamilyArg::Mixed => FamilyMode::Mixed,
		}
	}
}

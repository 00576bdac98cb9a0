use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::config::FamilyMode;

/// Default public nameserver list, one address per line.
pub const DEFAULT_LIST_URL: &str = "https://public-dns.info/nameservers.txt";

/// A DNS server candidate to benchmark. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ResolverCandidate {
	/// Display label; falls back to the address string.
	pub label: String,
	pub addr: SocketAddr,
}

impl ResolverCandidate {
	pub fn is_ipv4(&self) -> bool {
		self.addr.is_ipv4()
	}

	/// Routing key: the socket address in string form. Candidates are
	/// deduplicated by IP, so the key is unique within a run.
	pub fn key(&self) -> String {
		self.addr.to_string()
	}
}

/// Parse a resolver address string into a candidate.
///
/// Supports formats:
///   "1.1.1.1"              -- IPv4, default port 53
///   "1.1.1.1:53"           -- IPv4 with explicit port
///   "2606:4700::1111"      -- bare IPv6, default port 53
///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
pub fn parse_candidate(input: &str) -> Result<ResolverCandidate> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(anyhow!("empty resolver address"));
	}

	let addr: SocketAddr = if trimmed.starts_with('[') {
		// Bracketed IPv6 with port: [::1]:53
		trimmed.parse()
			.map_err(|e| anyhow!("invalid bracketed IPv6 address '{}': {}", trimmed, e))?
	} else if trimmed.contains("::") || trimmed.matches(':').count() > 1 {
		// Bare IPv6 address without port
		let ip = trimmed.parse()
			.map_err(|e| anyhow!("invalid IPv6 address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	} else if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		// IPv4 with port (e.g. "8.8.8.8:5353")
		addr
	} else {
		// Plain IPv4 without port
		let ip = trimmed.parse()
			.map_err(|e| anyhow!("invalid IP address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	};

	let label = format!("{}", addr.ip());
	Ok(ResolverCandidate { label, addr })
}

/// Read resolver addresses from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_candidate_file(path: &str) -> Result<Vec<ResolverCandidate>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read resolver file '{}': {}", path, e))?;
	let mut candidates = Vec::new();
	for line in content.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}
		candidates.push(parse_candidate(trimmed)?);
	}
	Ok(candidates)
}

/// Extract resolver candidates from a downloaded nameserver list.
///
/// Tolerant of extra columns: the first whitespace-separated token on a
/// line that parses as an IP address is taken, the rest ignored.
pub fn parse_candidate_list(body: &str) -> Vec<ResolverCandidate> {
	let mut candidates = Vec::new();
	for line in body.lines() {
		for token in line.split_whitespace() {
			if let Ok(ip) = token.parse::<IpAddr>() {
				candidates.push(ResolverCandidate {
					label: ip.to_string(),
					addr: SocketAddr::new(ip, 53),
				});
				break;
			}
		}
	}
	candidates
}

/// Fetch the public nameserver list over HTTPS and parse it.
pub async fn fetch_candidate_list(url: &str) -> Result<Vec<ResolverCandidate>> {
	tracing::debug!(%url, "fetching resolver list");
	let client = reqwest::Client::builder()
		.timeout(Duration::from_secs(15))
		.build()?;
	let body = client.get(url)
		.send()
		.await
		.map_err(|e| anyhow!("failed to fetch resolver list from '{}': {}", url, e))?
		.error_for_status()
		.map_err(|e| anyhow!("resolver list fetch '{}' returned error status: {}", url, e))?
		.text()
		.await
		.map_err(|e| anyhow!("failed to read resolver list body: {}", e))?;
	Ok(parse_candidate_list(&body))
}

/// Return a small panel of well-known public resolvers.
pub fn default_candidates() -> Vec<ResolverCandidate> {
	vec![
		ResolverCandidate {
			label: "Cloudflare".to_string(),
			addr: "1.1.1.1:53".parse().unwrap(),
		},
		ResolverCandidate {
			label: "Google".to_string(),
			addr: "8.8.8.8:53".parse().unwrap(),
		},
		ResolverCandidate {
			label: "Quad9".to_string(),
			addr: "9.9.9.9:53".parse().unwrap(),
		},
		ResolverCandidate {
			label: "OpenDNS".to_string(),
			addr: "208.67.222.222:53".parse().unwrap(),
		},
	]
}

/// Keep only candidates matching the configured address-family mode.
pub fn filter_family(candidates: Vec<ResolverCandidate>, mode: FamilyMode) -> Vec<ResolverCandidate> {
	candidates.into_iter()
		.filter(|c| match mode {
			FamilyMode::V4 => c.is_ipv4(),
			FamilyMode::V6 => !c.is_ipv4(),
			FamilyMode::Mixed => true,
		})
		.collect()
}

/// Deduplicate candidates by IP address, preserving first-seen order.
pub fn dedup_by_addr(candidates: Vec<ResolverCandidate>) -> Vec<ResolverCandidate> {
	let mut seen = HashSet::new();
	candidates.into_iter()
		.filter(|c| seen.insert(c.addr.ip()))
		.collect()
}

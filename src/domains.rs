use anyhow::{anyhow, Result};

/// One domain in the test panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDomain {
	pub name: String,
	/// Exactly one domain per panel carries this flag; its answers feed
	/// the ownership check.
	pub is_validation: bool,
}

/// Domain used for the ownership-validation probe.
pub const DEFAULT_VALIDATION_DOMAIN: &str = "google.com";

/// Return the default panel of well-known latency-test domains.
///
/// The validation domain is excluded here; `build_panel` appends it with
/// its flag set.
pub fn default_latency_domains() -> Vec<String> {
	vec![
		"facebook.com",
		"amazon.com",
		"microsoft.com",
		"apple.com",
		"cloudflare.com",
		"alibaba.com",
		"baidu.com",
		"tencent.com",
		"netflix.com",
	].into_iter().map(String::from).collect()
}

/// Read latency domains from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_domain_file(path: &str) -> Result<Vec<String>> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| anyhow!("failed to read domain file '{}': {}", path, e))?;
	let domains: Vec<String> = content.lines()
		.map(|line| line.trim().to_string())
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.collect();
	Ok(domains)
}

/// Build the final test panel: the first `sample_count` latency domains
/// plus the validation domain, which is always included and flagged.
///
/// The validation domain is never duplicated even when it also appears
/// in the latency list.
pub fn build_panel(
	latency_domains: &[String],
	validation_domain: &str,
	sample_count: usize,
) -> Vec<TestDomain> {
	let mut panel: Vec<TestDomain> = latency_domains.iter()
		.filter(|d| d.as_str() != validation_domain)
		.take(sample_count)
		.map(|d| TestDomain { name: d.clone(), is_validation: false })
		.collect();
	panel.push(TestDomain {
		name: validation_domain.to_string(),
		is_validation: true,
	});
	panel
}

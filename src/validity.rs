use std::fmt;
use std::net::IpAddr;
use std::path::Path;

use anyhow::{anyhow, Result};

/// Tri-state correctness verdict for a resolver.
///
/// `Unknown` is deliberately distinct from `Invalid`: a resolver whose
/// validation could not be performed must not be penalized like one that
/// returned confirmed-foreign addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
	#[default]
	Unknown,
	Valid,
	Invalid,
}

impl fmt::Display for Validity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Validity::Unknown => "unknown",
			Validity::Valid => "valid",
			Validity::Invalid => "invalid",
		};
		f.write_str(s)
	}
}

/// Read-only IP-ownership lookup capability.
///
/// Maps an address to an operator/organization label, or None when the
/// address is not covered. Shared by all workers without locking.
pub trait OwnershipLookup: Send + Sync {
	fn organization(&self, ip: IpAddr) -> Option<String>;
}

/// Organization keywords the original benchmark matches for its
/// reference operator (google.com answers should belong to Google).
pub fn default_operator_keywords() -> Vec<String> {
	["google", "google llc", "google cloud", "alphabet", "gcp"]
		.into_iter()
		.map(String::from)
		.collect()
}

/// Decide validity for the validation-domain answer list.
///
/// - No lookup capability, or no answer list (validation probe failed):
///   `Unknown`.
/// - At least one address owned by an organization matching any expected
///   keyword (case-insensitive substring): `Valid`.
/// - Addresses present but none matched: `Invalid`.
pub fn check_validity(
	addrs: Option<&[IpAddr]>,
	lookup: Option<&dyn OwnershipLookup>,
	expected_keywords: &[String],
) -> Validity {
	let lookup = match lookup {
		Some(l) => l,
		None => return Validity::Unknown,
	};
	let addrs = match addrs {
		Some(a) if !a.is_empty() => a,
		_ => return Validity::Unknown,
	};

	for &ip in addrs {
		if let Some(org) = lookup.organization(ip) {
			let org = org.to_lowercase();
			if expected_keywords.iter().any(|kw| org.contains(kw.as_str())) {
				return Validity::Valid;
			}
		}
	}
	Validity::Invalid
}

/// CIDR prefix table mapping address ranges to organization labels.
///
/// Loaded once from a local ranges file and shared read-only across the
/// worker pool. First matching prefix wins.
#[derive(Debug, Default)]
pub struct PrefixTable {
	v4: Vec<(u32, u8, String)>,
	v6: Vec<(u128, u8, String)>,
}

impl PrefixTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.v4.is_empty() && self.v6.is_empty()
	}

	pub fn len(&self) -> usize {
		self.v4.len() + self.v6.len()
	}

	/// Add one CIDR range (e.g. "8.8.8.0/24") with its organization label.
	pub fn insert(&mut self, cidr: &str, org: &str) -> Result<()> {
		let (prefix, len) = cidr.split_once('/')
			.ok_or_else(|| anyhow!("missing prefix length in '{}'", cidr))?;
		let len: u8 = len.parse()
			.map_err(|_| anyhow!("invalid prefix length in '{}'", cidr))?;
		let ip: IpAddr = prefix.parse()
			.map_err(|_| anyhow!("invalid prefix address in '{}'", cidr))?;

		match ip {
			IpAddr::V4(v4) => {
				if len > 32 {
					return Err(anyhow!("prefix length out of range in '{}'", cidr));
				}
				self.v4.push((u32::from(v4), len, org.to_string()));
			}
			IpAddr::V6(v6) => {
				if len > 128 {
					return Err(anyhow!("prefix length out of range in '{}'", cidr));
				}
				self.v6.push((u128::from(v6), len, org.to_string()));
			}
		}
		Ok(())
	}

	/// Load a ranges file: one `cidr organization...` entry per line.
	///
	/// Blank lines and lines starting with '#' are skipped; malformed
	/// lines abort the load so a truncated file is noticed.
	pub fn from_file(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.map_err(|e| anyhow!("failed to read ranges file '{}': {}", path.display(), e))?;
		Self::from_str_table(&content)
	}

	fn from_str_table(content: &str) -> Result<Self> {
		let mut table = Self::new();
		for line in content.lines() {
			let trimmed = line.trim();
			if trimmed.is_empty() || trimmed.starts_with('#') {
				continue;
			}
			let (cidr, org) = trimmed.split_once(char::is_whitespace)
				.ok_or_else(|| anyhow!("missing organization in ranges line '{}'", trimmed))?;
			table.insert(cidr, org.trim())?;
		}
		Ok(table)
	}
}

fn v4_match(addr: u32, prefix: u32, len: u8) -> bool {
	if len == 0 {
		return true;
	}
	let mask = u32::MAX << (32 - len as u32);
	addr & mask == prefix & mask
}

fn v6_match(addr: u128, prefix: u128, len: u8) -> bool {
	if len == 0 {
		return true;
	}
	let mask = u128::MAX << (128 - len as u32);
	addr & mask == prefix & mask
}

impl OwnershipLookup for PrefixTable {
	fn organization(&self, ip: IpAddr) -> Option<String> {
		match ip {
			IpAddr::V4(v4) => {
				let addr = u32::from(v4);
				self.v4.iter()
					.find(|(prefix, len, _)| v4_match(addr, *prefix, *len))
					.map(|(_, _, org)| org.clone())
			}
			IpAddr::V6(v6) => {
				let addr = u128::from(v6);
				self.v6.iter()
					.find(|(prefix, len, _)| v6_match(addr, *prefix, *len))
					.map(|(_, _, org)| org.clone())
			}
		}
	}
}

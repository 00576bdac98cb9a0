use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::config::RunConfig;
use crate::domains::TestDomain;
use crate::error::Result;
use crate::rank::{Ranking, ReportRow};
use crate::scheduler::ProgressSink;
use crate::source::ResolverCandidate;

fn fmt_ms(latency: Option<Duration>) -> String {
	match latency {
		Some(d) => format!("{:.1} ms", d.as_secs_f64() * 1000.0),
		None => "n/a".to_string(),
	}
}

/// Print a summary of the run configuration before dispatch.
pub fn print_config_summary(
	resolvers: &[ResolverCandidate],
	panel: &[TestDomain],
	cfg: &RunConfig,
	ranges_loaded: bool,
) {
	println!("DNS Resolver Benchmark");
	println!("======================");
	println!("Resolvers:       {}", resolvers.len());
	println!("Domains:         {}", panel.len());
	for d in panel {
		let marker = if d.is_validation { " (validation)" } else { "" };
		println!("  - {}{}", d.name, marker);
	}
	println!("Pool width:      {}", cfg.pool_width);
	println!("Probe deadline:  {} ms", cfg.probe_deadline.as_millis());
	println!("Run timeout:     {} s", cfg.run_timeout.as_secs());
	println!("Latency ceiling: {} ms", cfg.max_avg_latency.as_millis());
	let ownership = if ranges_loaded { "loaded" } else { "absent (validity will be unknown)" };
	println!("Ownership data:  {}", ownership);
	println!();
}

/// Print the ranked report and the diagnostics bucket.
pub fn print_report(ranking: &Ranking, partial: bool) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec![
		"Rank", "Resolver", "Avg", "Min", "Max", "Success", "Validity",
	]);

	for row in &ranking.ranked {
		table.add_row(vec![
			format!("{}", row.rank),
			display_name(row),
			fmt_ms(row.avg_latency),
			fmt_ms(row.min_latency),
			fmt_ms(row.max_latency),
			format!("{}/{}", row.succeeded, row.attempted),
			row.validity.to_string(),
		]);
	}

	println!("\nBenchmark Results");
	println!("=================\n");
	if partial {
		println!("NOTE: global timeout reached; results are partial\n");
	}
	println!("{table}");

	if !ranking.diagnostics.is_empty() {
		let mut diag = Table::new();
		diag.load_preset(UTF8_FULL);
		diag.set_content_arrangement(ContentArrangement::Dynamic);
		diag.set_header(vec!["Resolver", "Avg", "Success", "Validity"]);
		for row in &ranking.diagnostics {
			diag.add_row(vec![
				display_name(row),
				fmt_ms(row.avg_latency),
				format!("{}/{}", row.succeeded, row.attempted),
				row.validity.to_string(),
			]);
		}
		println!("\nDiagnostics (unranked)");
		println!("======================\n");
		println!("{diag}");
	}
}

fn display_name(row: &ReportRow) -> String {
	if row.label == row.resolver || row.resolver.starts_with(&row.label) {
		row.resolver.clone()
	} else {
		format!("{} ({})", row.label, row.resolver)
	}
}

/// Write the ranked rows and diagnostics to a CSV file.
pub fn write_csv(path: &str, ranking: &Ranking, partial: bool) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record([
		"rank", "resolver", "label",
		"avg_ms", "min_ms", "max_ms",
		"succeeded", "attempted", "success_rate",
		"validity", "partial",
	])?;

	let rows = ranking.ranked.iter().chain(ranking.diagnostics.iter());
	for row in rows {
		let csv_ms = |d: Option<Duration>| {
			d.map(|d| format!("{:.2}", d.as_secs_f64() * 1000.0))
				.unwrap_or_default()
		};
		writer.write_record([
			if row.rank > 0 { row.rank.to_string() } else { String::new() },
			row.resolver.clone(),
			row.label.clone(),
			csv_ms(row.avg_latency),
			csv_ms(row.min_latency),
			csv_ms(row.max_latency),
			row.succeeded.to_string(),
			row.attempted.to_string(),
			format!("{:.3}", row.success_rate),
			row.validity.to_string(),
			(partial || row.forced).to_string(),
		])?;
	}

	writer.flush()?;
	println!("\nResults written to: {}", path);
	Ok(())
}

/// Progress sink that rewrites a single console line with the completion
/// count.
#[derive(Default)]
pub struct ConsoleProgress {
	last_pct: AtomicUsize,
}

impl ProgressSink for ConsoleProgress {
	fn probe_completed(&self, done: usize, total: usize) {
		if total == 0 {
			return;
		}
		let pct = done * 100 / total;
		// Only repaint when the percentage moves, stdout is line-buffered
		if pct != self.last_pct.swap(pct, Ordering::Relaxed) || done == total {
			print!("\rProbes: {}/{} ({}%)", done, total, pct);
			std::io::stdout().flush().ok();
			if done == total {
				println!();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::validity::Validity;

	fn sample_row(rank: usize, avg_ms: Option<u64>) -> ReportRow {
		ReportRow {
			rank,
			resolver: "1.1.1.1:53".to_string(),
			label: "Cloudflare".to_string(),
			attempted: 3,
			succeeded: if avg_ms.is_some() { 3 } else { 0 },
			success_rate: if avg_ms.is_some() { 1.0 } else { 0.0 },
			avg_latency: avg_ms.map(Duration::from_millis),
			min_latency: avg_ms.map(Duration::from_millis),
			max_latency: avg_ms.map(Duration::from_millis),
			validity: Validity::Valid,
			forced: false,
		}
	}

	#[test]
	fn test_fmt_ms() {
		assert_eq!(fmt_ms(Some(Duration::from_millis(20))), "20.0 ms");
		assert_eq!(fmt_ms(None), "n/a");
	}

	#[test]
	fn test_display_name_with_label() {
		let row = sample_row(1, Some(20));
		assert_eq!(display_name(&row), "Cloudflare (1.1.1.1:53)");
	}

	#[test]
	fn test_write_csv_roundtrip() {
		let dir = std::env::temp_dir();
		let path = dir.join("dnsrank-report-test.csv");
		let path_str = path.to_str().unwrap();

		let ranking = Ranking {
			ranked: vec![sample_row(1, Some(20))],
			diagnostics: vec![sample_row(0, None)],
		};
		write_csv(path_str, &ranking, false).unwrap();

		let content = std::fs::read_to_string(&path).unwrap();
		assert!(content.starts_with("rank,resolver,label"));
		assert!(content.contains("1,1.1.1.1:53,Cloudflare,20.00"));
		// Diagnostics row has an empty rank and empty latency columns
		assert!(content.contains(",1.1.1.1:53,Cloudflare,,,,0,3"));
		std::fs::remove_file(&path).ok();
	}
}

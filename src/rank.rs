use std::time::Duration;

use crate::aggregate::ResolverAggregate;
use crate::validity::Validity;

/// One finalized resolver's output record.
#[derive(Debug, Clone)]
pub struct ReportRow {
	/// 1-based position in the ranked sequence; 0 for diagnostics rows.
	pub rank: usize,
	/// Resolver socket address in string form.
	pub resolver: String,
	pub label: String,
	pub attempted: usize,
	pub succeeded: usize,
	pub success_rate: f64,
	pub avg_latency: Option<Duration>,
	pub min_latency: Option<Duration>,
	pub max_latency: Option<Duration>,
	pub validity: Validity,
	/// True when the aggregate was force-finalized at the global timeout.
	pub forced: bool,
}

impl ReportRow {
	fn from_aggregate(agg: &ResolverAggregate) -> Self {
		Self {
			rank: 0,
			resolver: agg.resolver.clone(),
			label: agg.label.clone(),
			attempted: agg.attempted,
			succeeded: agg.succeeded,
			success_rate: agg.success_rate(),
			avg_latency: agg.avg_latency(),
			min_latency: agg.min_latency(),
			max_latency: agg.max_latency(),
			validity: agg.validity,
			forced: agg.forced,
		}
	}
}

/// The ranked report plus the unranked diagnostics bucket.
#[derive(Debug, Clone)]
pub struct Ranking {
	/// Rows ordered by ascending average latency, address as tie-break.
	pub ranked: Vec<ReportRow>,
	/// Fully-failing resolvers and rows above the latency ceiling, in
	/// first-seen order.
	pub diagnostics: Vec<ReportRow>,
}

/// Order finalized aggregates into report rows.
///
/// Resolvers with no successful probe have no average and are never
/// ranked; resolvers whose average exceeds `max_avg_latency` are moved to
/// diagnostics as well. The sort is deterministic: equal averages fall
/// back to ascending resolver address.
pub fn rank(aggregates: &[ResolverAggregate], max_avg_latency: Duration) -> Ranking {
	let mut ranked = Vec::new();
	let mut diagnostics = Vec::new();

	for agg in aggregates {
		let row = ReportRow::from_aggregate(agg);
		match row.avg_latency {
			Some(avg) if avg <= max_avg_latency => ranked.push(row),
			_ => diagnostics.push(row),
		}
	}

	ranked.sort_by(|a, b| {
		// Ranked rows always carry an average; MAX is a safe fallback
		let avg_a = a.avg_latency.unwrap_or(Duration::MAX);
		let avg_b = b.avg_latency.unwrap_or(Duration::MAX);
		avg_a.cmp(&avg_b).then_with(|| a.resolver.cmp(&b.resolver))
	});
	for (i, row) in ranked.iter_mut().enumerate() {
		row.rank = i + 1;
	}

	Ranking { ranked, diagnostics }
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::probe::{FailReason, ProbeResult};

	fn agg_with_latencies(resolver: &str, latencies_ms: &[u64]) -> ResolverAggregate {
		let mut agg = ResolverAggregate::new(resolver.into(), resolver.into(), latencies_ms.len());
		for &ms in latencies_ms {
			agg.record(&ProbeResult {
				resolver: resolver.to_string(),
				domain: "example.com".to_string(),
				latency: Some(Duration::from_millis(ms)),
				addrs: vec!["93.184.216.34".parse().unwrap()],
				fail: None,
			}, false);
		}
		agg.finalize(Validity::Unknown);
		agg
	}

	fn failing_agg(resolver: &str, probes: usize) -> ResolverAggregate {
		let mut agg = ResolverAggregate::new(resolver.into(), resolver.into(), probes);
		for _ in 0..probes {
			agg.record(&ProbeResult {
				resolver: resolver.to_string(),
				domain: "example.com".to_string(),
				latency: None,
				addrs: vec![],
				fail: Some(FailReason::Timeout),
			}, false);
		}
		agg.finalize(Validity::Unknown);
		agg
	}

	const CEILING: Duration = Duration::from_millis(1000);

	#[test]
	fn test_orders_by_ascending_average() {
		let aggs = vec![
			agg_with_latencies("9.9.9.9:53", &[40, 60]),
			agg_with_latencies("1.1.1.1:53", &[10, 30]),
			agg_with_latencies("8.8.8.8:53", &[20, 40]),
		];
		let ranking = rank(&aggs, CEILING);
		let order: Vec<&str> = ranking.ranked.iter().map(|r| r.resolver.as_str()).collect();
		assert_eq!(order, vec!["1.1.1.1:53", "8.8.8.8:53", "9.9.9.9:53"]);
		assert_eq!(ranking.ranked[0].rank, 1);
		assert_eq!(ranking.ranked[2].rank, 3);
	}

	#[test]
	fn test_tie_break_by_address() {
		// Identical averages: ascending address decides
		let aggs = vec![
			agg_with_latencies("8.8.8.8:53", &[20]),
			agg_with_latencies("1.1.1.1:53", &[20]),
		];
		let ranking = rank(&aggs, CEILING);
		assert_eq!(ranking.ranked[0].resolver, "1.1.1.1:53");
		assert_eq!(ranking.ranked[1].resolver, "8.8.8.8:53");
	}

	#[test]
	fn test_idempotent_ordering() {
		let aggs = vec![
			agg_with_latencies("9.9.9.9:53", &[15]),
			agg_with_latencies("1.1.1.1:53", &[15]),
			agg_with_latencies("8.8.8.8:53", &[5]),
		];
		let first = rank(&aggs, CEILING);
		let second = rank(&aggs, CEILING);
		let order_a: Vec<&str> = first.ranked.iter().map(|r| r.resolver.as_str()).collect();
		let order_b: Vec<&str> = second.ranked.iter().map(|r| r.resolver.as_str()).collect();
		assert_eq!(order_a, order_b);
	}

	#[test]
	fn test_zero_success_goes_to_diagnostics() {
		let aggs = vec![
			failing_agg("203.0.113.1:53", 3),
			agg_with_latencies("1.1.1.1:53", &[20]),
			failing_agg("203.0.113.2:53", 3),
		];
		let ranking = rank(&aggs, CEILING);
		assert_eq!(ranking.ranked.len(), 1);
		// Diagnostics keep first-seen order
		let diag: Vec<&str> = ranking.diagnostics.iter().map(|r| r.resolver.as_str()).collect();
		assert_eq!(diag, vec!["203.0.113.1:53", "203.0.113.2:53"]);
		assert!(ranking.diagnostics.iter().all(|r| r.avg_latency.is_none()));
	}

	#[test]
	fn test_latency_ceiling_moves_rows_to_diagnostics() {
		let aggs = vec![
			agg_with_latencies("1.1.1.1:53", &[20]),
			agg_with_latencies("203.0.113.1:53", &[5000]),
		];
		let ranking = rank(&aggs, CEILING);
		assert_eq!(ranking.ranked.len(), 1);
		assert!(ranking.ranked.iter().all(|r| r.avg_latency.unwrap() <= CEILING));
		assert_eq!(ranking.diagnostics.len(), 1);
		assert_eq!(ranking.diagnostics[0].resolver, "203.0.113.1:53");
	}

	#[test]
	fn test_scenario_full_success_stats() {
		// Latencies {10,20,30} ms: average 20, min 10, max 30
		let aggs = vec![agg_with_latencies("1.1.1.1:53", &[10, 20, 30])];
		let ranking = rank(&aggs, CEILING);
		let row = &ranking.ranked[0];
		assert_eq!(row.avg_latency, Some(Duration::from_millis(20)));
		assert_eq!(row.min_latency, Some(Duration::from_millis(10)));
		assert_eq!(row.max_latency, Some(Duration::from_millis(30)));
	}
}

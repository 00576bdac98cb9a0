use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;

use hickory_proto::op::ResponseCode;

use crate::dns::{build_query, parse_response, QueryFamily};

/// Why a probe failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
	/// The deadline elapsed before a usable response arrived.
	Timeout,
	/// The resolver answered with a protocol-level error, an empty
	/// answer, or the network was unreachable.
	Error,
}

/// Outcome of one timed query against one resolver for one domain.
///
/// Immutable after creation; consumed exactly once by the aggregate for
/// its resolver.
#[derive(Debug, Clone)]
pub struct ProbeResult {
	/// Resolver identity (socket address in string form), the routing key.
	pub resolver: String,
	pub domain: String,
	/// Wall-clock duration from send to receipt. Only present on success.
	pub latency: Option<Duration>,
	/// Address records returned, possibly empty.
	pub addrs: Vec<IpAddr>,
	/// None on success, otherwise the failure reason.
	pub fail: Option<FailReason>,
}

impl ProbeResult {
	pub fn is_success(&self) -> bool {
		self.fail.is_none()
	}

	fn failure(resolver: String, domain: String, reason: FailReason) -> Self {
		Self {
			resolver,
			domain,
			latency: None,
			addrs: Vec::new(),
			fail: Some(reason),
		}
	}
}

/// Issue one timed DNS query with a deadline and produce a `ProbeResult`.
///
/// Binds a dedicated socket per query to avoid response stealing between
/// concurrent probes against the same resolver. Success requires a
/// NoError response carrying at least one address record of the requested
/// family within the deadline. Stateless and safely re-invocable; retry
/// policy lives in the scheduler.
pub async fn send_probe(
	resolver: SocketAddr,
	domain: &str,
	family: QueryFamily,
	deadline: Duration,
) -> ProbeResult {
	let resolver_key = resolver.to_string();

	let txid: u16 = rand::random();
	let query_bytes = match build_query(domain, family, txid) {
		Ok(bytes) => bytes,
		Err(e) => {
			tracing::debug!(%domain, "query build failed: {e}");
			return ProbeResult::failure(resolver_key, domain.to_string(), FailReason::Error);
		}
	};

	let bind_addr = if resolver.is_ipv4() {
		"0.0.0.0:0"
	} else {
		"[::]:0"
	};
	let socket = match UdpSocket::bind(bind_addr).await {
		Ok(s) => s,
		Err(e) => {
			tracing::debug!(resolver = %resolver_key, "socket bind failed: {e}");
			return ProbeResult::failure(resolver_key, domain.to_string(), FailReason::Error);
		}
	};

	// Timing covers send through receipt of the matching response
	let start = Instant::now();
	if socket.send_to(&query_bytes, resolver).await.is_err() {
		return ProbeResult::failure(resolver_key, domain.to_string(), FailReason::Error);
	}

	// Receive until the deadline, re-reading on txid mismatch or garbage.
	// 4096-byte buffer handles EDNS-extended responses.
	let mut buf = vec![0u8; 4096];
	loop {
		let elapsed = start.elapsed();
		if elapsed >= deadline {
			break;
		}
		let remaining = deadline - elapsed;

		match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
			Ok(Ok((len, _src))) => {
				let latency = start.elapsed();
				match parse_response(&buf[..len], txid, family) {
					Ok(answer) => {
						if answer.rcode != ResponseCode::NoError {
							tracing::debug!(
								resolver = %resolver_key, %domain,
								rcode = %answer.rcode, "probe refused",
							);
							return ProbeResult::failure(
								resolver_key, domain.to_string(), FailReason::Error,
							);
						}
						if answer.addrs.is_empty() {
							// NoError but no usable address records
							return ProbeResult::failure(
								resolver_key, domain.to_string(), FailReason::Error,
							);
						}
						return ProbeResult {
							resolver: resolver_key,
							domain: domain.to_string(),
							latency: Some(latency),
							addrs: answer.addrs,
							fail: None,
						};
					}
					Err(_) => {
						// Stray datagram for another query, keep listening
						continue;
					}
				}
			}
			Ok(Err(_)) => {
				// recv error (e.g. ICMP port unreachable surfaced)
				return ProbeResult::failure(
					resolver_key, domain.to_string(), FailReason::Error,
				);
			}
			Err(_) => {
				// Deadline elapsed while waiting
				break;
			}
		}
	}

	ProbeResult::failure(resolver_key, domain.to_string(), FailReason::Timeout)
}

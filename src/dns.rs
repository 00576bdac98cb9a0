use std::net::IpAddr;

use anyhow::{anyhow, Result};
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};

/// Record type requested by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFamily {
	A,
	Aaaa,
}

impl QueryFamily {
	pub fn record_type(self) -> RecordType {
		match self {
			QueryFamily::A => RecordType::A,
			QueryFamily::Aaaa => RecordType::AAAA,
		}
	}
}

/// Answer extracted from a parsed DNS response.
#[derive(Debug)]
pub struct DnsAnswer {
	pub rcode: ResponseCode,
	/// Address records of the requested family from the answer section.
	pub addrs: Vec<IpAddr>,
}

/// Build a recursive forward query for the given domain and family.
///
/// Returns the serialized query bytes ready to send over UDP.
pub fn build_query(domain: &str, family: QueryFamily, txid: u16) -> Result<Vec<u8>> {
	let name = Name::from_ascii(domain)
		.map_err(|e| anyhow!("invalid domain name '{}': {}", domain, e))?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, family.record_type()));

	let bytes = message.to_vec()
		.map_err(|e| anyhow!("failed to serialize DNS query: {}", e))?;
	Ok(bytes)
}

/// Parse a DNS response, validating the transaction ID and extracting the
/// rcode and any address records of the requested family.
///
/// Returns an error if the response cannot be parsed or the txid does not
/// match (a mismatched txid means the datagram belongs to another query).
pub fn parse_response(bytes: &[u8], expected_txid: u16, family: QueryFamily) -> Result<DnsAnswer> {
	let message = Message::from_vec(bytes)
		.map_err(|e| anyhow!("failed to parse DNS response: {}", e))?;

	if message.id() != expected_txid {
		return Err(anyhow!(
			"txid mismatch: expected {}, got {}",
			expected_txid, message.id()
		));
	}

	if message.message_type() != MessageType::Response {
		return Err(anyhow!("received a query instead of a response"));
	}

	let mut addrs = Vec::new();
	for record in message.answers() {
		match (family, record.data()) {
			(QueryFamily::A, RData::A(a)) => addrs.push(IpAddr::V4(a.0)),
			(QueryFamily::Aaaa, RData::AAAA(aaaa)) => addrs.push(IpAddr::V6(aaaa.0)),
			_ => {}
		}
	}

	Ok(DnsAnswer {
		rcode: message.response_code(),
		addrs,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use hickory_proto::rr::rdata::{A, AAAA};
	use hickory_proto::rr::Record;
	use std::net::Ipv4Addr;

	#[test]
	fn test_build_a_query() {
		let bytes = build_query("example.com", QueryFamily::A, 1234).unwrap();
		// DNS header is 12 bytes minimum
		assert!(bytes.len() >= 12);
		// Verify txid in first two bytes (big-endian)
		assert_eq!(bytes[0], (1234 >> 8) as u8);
		assert_eq!(bytes[1], (1234 & 0xff) as u8);
	}

	#[test]
	fn test_build_aaaa_query() {
		let bytes = build_query("example.com", QueryFamily::Aaaa, 5678).unwrap();
		assert!(bytes.len() >= 12);
		assert_eq!(bytes[0], (5678 >> 8) as u8);
		assert_eq!(bytes[1], (5678 & 0xff) as u8);
	}

	#[test]
	fn test_parse_response_with_a_record() {
		let query_bytes = build_query("example.com", QueryFamily::A, 9999).unwrap();
		let mut response = Message::from_vec(&query_bytes).unwrap();
		response.set_message_type(MessageType::Response);
		let name = Name::from_ascii("example.com").unwrap();
		response.add_answer(Record::from_rdata(
			name, 60, RData::A(A(Ipv4Addr::new(93, 184, 216, 34))),
		));
		let response_bytes = response.to_vec().unwrap();

		let answer = parse_response(&response_bytes, 9999, QueryFamily::A).unwrap();
		assert_eq!(answer.rcode, ResponseCode::NoError);
		assert_eq!(answer.addrs, vec!["93.184.216.34".parse::<IpAddr>().unwrap()]);
	}

	#[test]
	fn test_parse_skips_wrong_family() {
		// An AAAA answer must not satisfy an A query
		let query_bytes = build_query("example.com", QueryFamily::A, 4242).unwrap();
		let mut response = Message::from_vec(&query_bytes).unwrap();
		response.set_message_type(MessageType::Response);
		let name = Name::from_ascii("example.com").unwrap();
		response.add_answer(Record::from_rdata(
			name, 60, RData::AAAA(AAAA("2606:2800:220:1::".parse().unwrap())),
		));
		let response_bytes = response.to_vec().unwrap();

		let answer = parse_response(&response_bytes, 4242, QueryFamily::A).unwrap();
		assert!(answer.addrs.is_empty());
	}

	#[test]
	fn test_txid_mismatch() {
		let query_bytes = build_query("example.com", QueryFamily::A, 1111).unwrap();
		let mut response = Message::from_vec(&query_bytes).unwrap();
		response.set_message_type(MessageType::Response);
		let response_bytes = response.to_vec().unwrap();

		let result = parse_response(&response_bytes, 2222, QueryFamily::A);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("txid mismatch"));
	}

	#[test]
	fn test_truncated_buffer() {
		// Only 5 bytes -- too short for a valid DNS message
		let bytes = vec![0u8; 5];
		assert!(parse_response(&bytes, 0, QueryFamily::A).is_err());
	}
}

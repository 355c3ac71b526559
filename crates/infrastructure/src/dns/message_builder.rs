//! DNS Message Builder
//!
//! Constructs DNS query messages in wire format using `hickory-proto`.

use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};
use ipscope_domain::{DomainError, LookupType};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Builds DNS query messages in wire format
pub struct MessageBuilder;

impl MessageBuilder {
    pub fn record_type(lookup: LookupType) -> RecordType {
        match lookup {
            LookupType::A => RecordType::A,
            LookupType::Mx => RecordType::MX,
            LookupType::Txt => RecordType::TXT,
            LookupType::Ptr => RecordType::PTR,
        }
    }

    /// Build a recursive query for `domain` and return its ID with the wire bytes.
    ///
    /// The ID is random; responses with a different ID are discarded by the client.
    pub fn build_query(domain: &str, lookup: LookupType) -> Result<(u16, Vec<u8>), DomainError> {
        let name = Name::from_str(domain).map_err(|e| {
            DomainError::InvalidDomainName(format!("Invalid domain '{}': {}", domain, e))
        })?;

        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(Self::record_type(lookup));
        query.set_query_class(DNSClass::IN);

        let id = fastrand::u16(..);

        let mut message = Message::new(id, MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(query);

        let bytes = Self::serialize_message(&message)?;
        Ok((id, bytes))
    }

    /// `d.c.b.a.in-addr.arpa.` for `a.b.c.d`.
    pub fn reverse_name(ip: Ipv4Addr) -> String {
        let [a, b, c, d] = ip.octets();
        format!("{d}.{c}.{b}.{a}.in-addr.arpa.")
    }

    fn serialize_message(message: &Message) -> Result<Vec<u8>, DomainError> {
        let mut buf = Vec::with_capacity(512);
        let mut encoder = BinEncoder::new(&mut buf);

        message.emit(&mut encoder).map_err(|e| {
            DomainError::InvalidDomainName(format!("Failed to serialize DNS message: {}", e))
        })?;

        Ok(buf)
    }
}

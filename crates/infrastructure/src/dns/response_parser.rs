use bytes::Bytes;
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RData;
use ipscope_application::ports::{HostAddress, MxAnswer, MxExchange};
use ipscope_domain::DomainError;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DnsResponse {
    pub id: u16,

    pub rcode: ResponseCode,

    pub truncated: bool,

    pub message: Message,
}

impl DnsResponse {
    pub fn is_nxdomain(&self) -> bool {
        self.rcode == ResponseCode::NXDomain
    }

    pub fn is_server_error(&self) -> bool {
        matches!(
            self.rcode,
            ResponseCode::ServFail | ResponseCode::Refused | ResponseCode::NotImp
        )
    }

    /// A records of the answer section.
    pub fn host_addresses(&self) -> Vec<HostAddress> {
        self.message
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                RData::A(a) => Some(HostAddress {
                    name: record.name().to_utf8(),
                    address: a.0,
                    ttl: record.ttl(),
                }),
                _ => None,
            })
            .collect()
    }

    /// MX answers plus the A records of the additional section.
    pub fn mx_answer(&self) -> MxAnswer {
        let exchanges = self
            .message
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                RData::MX(mx) => Some(MxExchange {
                    exchange: mx.exchange().to_utf8(),
                    preference: mx.preference(),
                    ttl: record.ttl(),
                }),
                _ => None,
            })
            .collect();

        let additional = self
            .message
            .additionals()
            .iter()
            .filter_map(|record| match record.data() {
                RData::A(a) => Some(HostAddress {
                    name: record.name().to_utf8(),
                    address: a.0,
                    ttl: record.ttl(),
                }),
                _ => None,
            })
            .collect();

        MxAnswer {
            exchanges,
            additional,
        }
    }

    /// One string per TXT record, its character strings concatenated.
    pub fn txt_strings(&self) -> Vec<String> {
        self.message
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                RData::TXT(txt) => Some(
                    txt.iter()
                        .map(|part| String::from_utf8_lossy(part))
                        .collect::<String>(),
                ),
                _ => None,
            })
            .collect()
    }

    pub fn ptr_names(&self) -> Vec<String> {
        self.message
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                RData::PTR(ptr) => Some(ptr.to_utf8()),
                _ => None,
            })
            .collect()
    }
}

pub struct ResponseParser;

impl ResponseParser {
    pub fn parse_bytes(response_bytes: Bytes) -> Result<DnsResponse, DomainError> {
        let message = Message::from_vec(&response_bytes).map_err(|e| {
            DomainError::InvalidDnsResponse(format!("Failed to parse DNS response: {}", e))
        })?;

        let rcode = message.response_code();
        let truncated = message.truncated();

        debug!(
            rcode = ?rcode,
            answers = message.answers().len(),
            additionals = message.additionals().len(),
            truncated = truncated,
            "DNS response parsed"
        );

        Ok(DnsResponse {
            id: message.id(),
            rcode,
            truncated,
            message,
        })
    }

    pub fn parse(response_bytes: &[u8]) -> Result<DnsResponse, DomainError> {
        Self::parse_bytes(Bytes::copy_from_slice(response_bytes))
    }

    pub fn rcode_to_status(rcode: ResponseCode) -> &'static str {
        match rcode {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::NXDomain => "NXDOMAIN",
            ResponseCode::ServFail => "SERVFAIL",
            ResponseCode::Refused => "REFUSED",
            ResponseCode::NotImp => "NOTIMP",
            ResponseCode::FormErr => "FORMERR",
            _ => "UNKNOWN",
        }
    }
}

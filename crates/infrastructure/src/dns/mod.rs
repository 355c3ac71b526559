pub mod client;
pub mod message_builder;
pub mod response_parser;
pub mod transport;
pub mod upstream;

pub use client::{HickoryDnsClient, LookupProfile};
pub use message_builder::MessageBuilder;
pub use response_parser::{DnsResponse, ResponseParser};
pub use upstream::{parse_server_addr, UpstreamPool};

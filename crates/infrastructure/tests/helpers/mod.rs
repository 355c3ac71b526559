#![allow(dead_code)]
#![allow(unused_imports)]

mod dns_server_mock;

pub use dns_server_mock::*;

use ipscope_infrastructure::{HickoryDnsClient, LookupProfile, UpstreamPool};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub fn fast_profile() -> LookupProfile {
    LookupProfile::new(Duration::from_millis(300), 0)
}

pub fn client_for(servers: Vec<SocketAddr>, fallback: Vec<SocketAddr>) -> HickoryDnsClient {
    let pool = Arc::new(UpstreamPool::new(servers, fallback, false));
    HickoryDnsClient::new(pool, fast_profile(), LookupProfile::new(Duration::from_millis(300), 1))
}

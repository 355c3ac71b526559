use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Prefix used to represent a single host.
pub const HOST_PREFIX: u8 = 31;

/// Smallest prefix accepted for a subnet query. Anything wider is refused
/// so a single query cannot expand into a huge address range.
pub const MIN_SUBNET_PREFIX: u8 = 24;
pub const MAX_SUBNET_PREFIX: u8 = 31;

/// Address arithmetic computed once when the basic stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetFacts {
    pub address: Ipv4Addr,
    pub prefix: u8,
    pub netmask: Ipv4Addr,
    pub network: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    pub low: Option<Ipv4Addr>,
    pub high: Option<Ipv4Addr>,
    pub usable_count: u32,
    pub single_host: bool,
}

impl SubnetFacts {
    /// /31 representation of one host. The host itself is the only usable
    /// address.
    pub fn for_host(address: Ipv4Addr) -> Self {
        let (netmask, network, broadcast) = boundaries(address, HOST_PREFIX);
        Self {
            address,
            prefix: HOST_PREFIX,
            netmask,
            network,
            broadcast,
            low: Some(address),
            high: Some(address),
            usable_count: 1,
            single_host: true,
        }
    }

    /// Returns `None` when `prefix` is outside the accepted subnet range.
    pub fn for_subnet(address: Ipv4Addr, prefix: u8) -> Option<Self> {
        if !(MIN_SUBNET_PREFIX..=MAX_SUBNET_PREFIX).contains(&prefix) {
            return None;
        }

        let (netmask, network, broadcast) = boundaries(address, prefix);
        let first = u32::from(network);
        let last = u32::from(broadcast);
        let usable_count = last.saturating_sub(first).saturating_sub(1);

        let (low, high) = if usable_count > 0 {
            (
                Some(Ipv4Addr::from(first + 1)),
                Some(Ipv4Addr::from(last - 1)),
            )
        } else {
            (None, None)
        };

        Some(Self {
            address,
            prefix,
            netmask,
            network,
            broadcast,
            low,
            high,
            usable_count,
            single_host: false,
        })
    }

    pub fn usable_addresses(&self) -> impl Iterator<Item = Ipv4Addr> {
        let range = match (self.low, self.high) {
            (Some(low), Some(high)) => u32::from(low)..=u32::from(high),
            #[allow(clippy::reversed_empty_ranges)]
            _ => 1..=0,
        };
        range.map(Ipv4Addr::from)
    }

    pub fn cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix)
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let ip = u32::from(ip);
        ip >= u32::from(self.network) && ip <= u32::from(self.broadcast)
    }
}

fn boundaries(address: Ipv4Addr, prefix: u8) -> (Ipv4Addr, Ipv4Addr, Ipv4Addr) {
    match Ipv4Network::new(address, prefix) {
        Ok(net) => (net.mask(), net.network(), net.broadcast()),
        Err(_) => (Ipv4Addr::BROADCAST, address, address),
    }
}

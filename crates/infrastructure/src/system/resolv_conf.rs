use crate::dns::parse_server_addr;
use std::net::SocketAddr;
use std::path::Path;
use tracing::{debug, warn};

pub const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";

/// `nameserver` entries of a resolv.conf file, in file order.
/// Unparsable entries are skipped.
pub fn parse_resolv_conf(text: &str) -> Vec<SocketAddr> {
    text.lines()
        .map(|line| line.split(['#', ';']).next().unwrap_or_default().trim())
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("nameserver"), Some(server)) => match parse_server_addr(server) {
                    Ok(addr) => Some(addr),
                    Err(e) => {
                        debug!(server, error = %e, "Skipping resolv.conf entry");
                        None
                    }
                },
                _ => None,
            }
        })
        .collect()
}

/// Nameservers of the operating system. A missing or unreadable file
/// yields an empty list.
pub fn read_system_nameservers(path: impl AsRef<Path>) -> Vec<SocketAddr> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let servers = parse_resolv_conf(&text);
            debug!(path = %path.display(), servers = servers.len(), "System nameservers read");
            servers
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot read system resolver configuration");
            Vec::new()
        }
    }
}

use crate::errors::DomainError;
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

/// Protocol prefixes, `user@` segments, leading dots and dot runs.
static CORRECTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?|ftps?|udp|tcp)://|.*?@+.*?\.*|^\.+|\.{2,}")
        .expect("correction pattern is a valid literal")
});

static DOMAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9]+(?:-[a-z0-9]+)*\.)+[a-z]{2,}$")
        .expect("domain pattern is a valid literal")
});

/// Four 1-3 digit groups with an optional prefix, octet ranges unchecked.
static SIMPLE_IPS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:[0-9]{1,3}\.){3}[0-9]{1,3})(?:/([0-9]+))?$")
        .expect("simple address pattern is a valid literal")
});

static PLACEHOLDER_IP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:0\.){3}|127\.0\.0\.)[0-9]+")
        .expect("placeholder pattern is a valid literal")
});

static BLACKHOLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)blackhole\.").expect("blackhole pattern is a valid literal")
});

/// Cache key derived from raw user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedQuery(Arc<str>);

impl NormalizedQuery {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        let corrected = CORRECTION_PATTERN.replace_all(trimmed, "");
        let mut normalized = corrected.trim().to_lowercase();
        if normalized.ends_with('.') {
            normalized.pop();
        }

        if normalized.is_empty() {
            return Err(DomainError::EmptyQuery);
        }

        Ok(Self(Arc::from(normalized.as_str())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn shape(&self) -> QueryShape {
        QueryShape::of(&self.0)
    }
}

impl FromStr for NormalizedQuery {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for NormalizedQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Domain,
    SingleIp,
    Subnet,
    Invalid,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::SingleIp => "single_ip",
            Self::Subnet => "subnet",
            Self::Invalid => "invalid",
        }
    }
}

/// Syntactic shape of a normalized query, before any lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    Domain,
    Address(Ipv4Addr),
    /// `a.b.c.d/n`. `address` is `None` when an octet is out of range,
    /// `prefix` is `None` when the digits overflow.
    Cidr {
        address: Option<Ipv4Addr>,
        prefix: Option<u8>,
    },
    /// Four digit groups without prefix that do not form a valid address.
    MalformedAddress,
    Invalid,
}

impl QueryShape {
    pub fn of(query: &str) -> Self {
        if is_domain_name(query) {
            return Self::Domain;
        }

        if let Ok(address) = Ipv4Addr::from_str(query) {
            return Self::Address(address);
        }

        let Ok(Some(captures)) = SIMPLE_IPS_PATTERN.captures(query) else {
            return Self::Invalid;
        };

        match captures.get(2) {
            Some(prefix) => Self::Cidr {
                address: captures
                    .get(1)
                    .and_then(|a| Ipv4Addr::from_str(a.as_str()).ok()),
                prefix: prefix.as_str().parse::<u8>().ok(),
            },
            None => Self::MalformedAddress,
        }
    }
}

pub fn is_domain_name(candidate: &str) -> bool {
    DOMAIN_PATTERN
        .is_match(&candidate.to_ascii_lowercase())
        .unwrap_or(false)
}

/// Dotted quad with or without prefix, octets unchecked.
pub fn is_ip_literal(candidate: &str) -> bool {
    SIMPLE_IPS_PATTERN.is_match(candidate).unwrap_or(false)
}

/// `0.0.0.x` and `127.0.0.x` targets that some zones publish as MX filler.
pub fn is_placeholder_ip(candidate: &str) -> bool {
    PLACEHOLDER_IP_PATTERN.is_match(candidate).unwrap_or(false)
}

pub fn is_blackhole_name(candidate: &str) -> bool {
    BLACKHOLE_PATTERN.is_match(candidate).unwrap_or(false)
}

pub fn trim_trailing_dots(name: &str) -> &str {
    name.trim_end_matches('.')
}

pub fn reverse_lookup_name(ip: Ipv4Addr) -> String {
    let octets = ip.octets();
    format!(
        "{}.{}.{}.{}.in-addr.arpa",
        octets[3], octets[2], octets[1], octets[0]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_protocol_and_mailbox() {
        assert_eq!(
            NormalizedQuery::parse("HTTPS://Example.COM").unwrap().as_str(),
            "example.com"
        );
        assert_eq!(
            NormalizedQuery::parse("john.doe@Mail.Example.org").unwrap().as_str(),
            "mail.example.org"
        );
        assert_eq!(
            NormalizedQuery::parse("  tcp://192.0.2.1 ").unwrap().as_str(),
            "192.0.2.1"
        );
    }

    #[test]
    fn test_normalize_strips_dots() {
        assert_eq!(
            NormalizedQuery::parse("..example..com").unwrap().as_str(),
            "examplecom"
        );
        assert_eq!(
            NormalizedQuery::parse("example.com.").unwrap().as_str(),
            "example.com"
        );
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert_eq!(NormalizedQuery::parse("   "), Err(DomainError::EmptyQuery));
        assert_eq!(NormalizedQuery::parse("http://"), Err(DomainError::EmptyQuery));
    }

    #[test]
    fn test_shape_domain() {
        assert_eq!(QueryShape::of("mail.example.com"), QueryShape::Domain);
        assert_eq!(QueryShape::of("my-host.example.de"), QueryShape::Domain);
        assert_eq!(QueryShape::of("-bad.example.com"), QueryShape::Invalid);
        assert_eq!(QueryShape::of("example.com/26"), QueryShape::Invalid);
    }

    #[test]
    fn test_shape_address_and_cidr() {
        assert_eq!(
            QueryShape::of("192.0.2.10"),
            QueryShape::Address(Ipv4Addr::new(192, 0, 2, 10))
        );
        assert_eq!(
            QueryShape::of("192.0.2.64/26"),
            QueryShape::Cidr {
                address: Some(Ipv4Addr::new(192, 0, 2, 64)),
                prefix: Some(26),
            }
        );
        assert_eq!(
            QueryShape::of("300.0.2.64/26"),
            QueryShape::Cidr {
                address: None,
                prefix: Some(26),
            }
        );
        assert_eq!(QueryShape::of("999.1.1.1"), QueryShape::MalformedAddress);
        assert_eq!(QueryShape::of("1.2.3"), QueryShape::Invalid);
    }

    #[test]
    fn test_placeholder_and_blackhole_patterns() {
        assert!(is_placeholder_ip("127.0.0.1"));
        assert!(is_placeholder_ip("0.0.0.0"));
        assert!(!is_placeholder_ip("10.0.0.1"));
        assert!(is_blackhole_name("mx.Blackhole.example.com"));
        assert!(!is_blackhole_name("blackhole-example.com"));
    }

    #[test]
    fn test_reverse_lookup_name() {
        assert_eq!(
            reverse_lookup_name(Ipv4Addr::new(192, 0, 2, 10)),
            "10.2.0.192.in-addr.arpa"
        );
    }
}

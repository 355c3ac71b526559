pub mod dns_client;
pub mod reachability_probe;
pub mod reverse_lookup;

pub use dns_client::{DnsClient, HostAddress, MxAnswer, MxExchange, ResolverProfile};
pub use reachability_probe::{ProbeOutcome, ReachabilityProbe};
pub use reverse_lookup::ReverseLookup;

//! ipscope Infrastructure Layer
//!
//! Adapters behind the application ports: a hickory-proto DNS client, the
//! SMTP reachability probe, the operating system reverse lookup and the
//! pitfall file loader.
pub mod dns;
pub mod pitfall_loader;
pub mod probe;
pub mod system;

pub use dns::{HickoryDnsClient, LookupProfile, UpstreamPool};
pub use pitfall_loader::{load_pitfall_file, load_pitfalls};
pub use probe::TcpReachabilityProbe;
pub use system::{read_system_nameservers, SystemReverseLookup};

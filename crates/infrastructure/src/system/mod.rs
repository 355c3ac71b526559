pub mod resolv_conf;
pub mod reverse_lookup;

pub use resolv_conf::{parse_resolv_conf, read_system_nameservers, RESOLV_CONF_PATH};
pub use reverse_lookup::SystemReverseLookup;

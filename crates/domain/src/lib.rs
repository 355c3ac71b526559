//! ipscope Domain Layer
pub mod config;
pub mod errors;
pub mod lookup;
pub mod options;
pub mod pitfalls;
pub mod query;
pub mod results;
pub mod subnet;

pub use config::{CliOverrides, Config, ConfigError};
pub use errors::DomainError;
pub use lookup::LookupType;
pub use options::{MxOption, MxOptions, ResolutionOptions};
pub use pitfalls::PitfallList;
pub use query::{NormalizedQuery, QueryKind, QueryShape};
pub use results::{
    BasicResult, MxAddOutcome, MxRecordResult, MxResult, RdnsResult, RequestFailure, TxtResult,
};
pub use subnet::SubnetFacts;

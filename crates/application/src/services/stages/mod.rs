pub mod basic;
pub mod mx;
pub mod rdns;
pub mod txt;

pub use basic::BasicStage;
pub use mx::{MxOutcome, MxStage};
pub use rdns::RdnsStage;
pub use txt::TxtStage;

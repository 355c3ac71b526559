#![allow(dead_code)]
#![allow(unused_imports)]

mod mock_ports;

pub use mock_ports::*;

use ipscope_application::services::{EngineSettings, ResolutionEngine, StageSet};
use ipscope_domain::PitfallList;
use std::sync::Arc;

pub struct TestPorts {
    pub dns: MockDnsClient,
    pub probe: MockProbe,
    pub reverse: MockReverseLookup,
}

impl TestPorts {
    pub fn new() -> Self {
        Self {
            dns: MockDnsClient::new(),
            probe: MockProbe::reachable(),
            reverse: MockReverseLookup::new(),
        }
    }

    pub fn stages(&self, pitfalls: PitfallList) -> StageSet {
        StageSet::new(
            Arc::new(self.dns.clone()),
            Arc::new(self.probe.clone()),
            Arc::new(self.reverse.clone()),
            pitfalls,
            25,
            4,
        )
    }

    pub fn engine(&self) -> ResolutionEngine {
        self.engine_with(EngineSettings::default())
    }

    pub fn engine_with(&self, settings: EngineSettings) -> ResolutionEngine {
        ResolutionEngine::new(self.stages(PitfallList::default()), settings)
    }
}

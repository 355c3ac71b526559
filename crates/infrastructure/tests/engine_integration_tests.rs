use async_trait::async_trait;
use ipscope_application::ports::{ReverseLookup, ProbeOutcome, ReachabilityProbe};
use ipscope_application::services::{EngineSettings, ResolutionEngine, StageSet};
use ipscope_domain::{MxOption, MxOptions, PitfallList, QueryKind, ResolutionOptions};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

mod helpers;
use helpers::{client_for, MockAnswer, MockDnsServer, MockZone, TYPE_A, TYPE_MX, TYPE_PTR, TYPE_TXT};

struct NoReverse;

#[async_trait]
impl ReverseLookup for NoReverse {
    async fn reverse(&self, _ip: Ipv4Addr) -> Option<String> {
        None
    }
}

struct AlwaysConnected;

#[async_trait]
impl ReachabilityProbe for AlwaysConnected {
    async fn probe(&self, _host: &str, _port: u16) -> ProbeOutcome {
        ProbeOutcome::Connected
    }
}

fn zone() -> MockZone {
    MockZone::new()
        .with(
            "example.com",
            TYPE_A,
            MockAnswer::A(vec![Ipv4Addr::new(192, 0, 2, 10)]),
        )
        .with(
            "example.com",
            TYPE_MX,
            MockAnswer::Mx {
                exchanges: vec![
                    (10, "mx1.example.com".to_string()),
                    (20, "mx1.example.com".to_string()),
                    (30, "trap.example.net".to_string()),
                ],
                additional: vec![("mx1.example.com".to_string(), Ipv4Addr::new(192, 0, 2, 25))],
            },
        )
        .with(
            "example.com",
            TYPE_TXT,
            MockAnswer::Txt(vec![vec!["v=spf1 -all".to_string()]]),
        )
        .with(
            "10.2.0.192.in-addr.arpa",
            TYPE_PTR,
            MockAnswer::Ptr(vec!["www.example.com".to_string()]),
        )
}

async fn engine_against(server: &MockDnsServer) -> ResolutionEngine {
    let dns = Arc::new(client_for(vec![server.addr()], vec![]));
    let stages = StageSet::new(
        dns,
        Arc::new(AlwaysConnected),
        Arc::new(NoReverse),
        PitfallList::new(["trap.example.net"]),
        25,
        4,
    );
    ResolutionEngine::new(stages, EngineSettings::default())
}

#[tokio::test]
async fn test_domain_resolves_every_stage_over_the_wire() {
    // Arrange
    let server = MockDnsServer::start(zone()).await.unwrap();
    let engine = engine_against(&server).await;
    let mx_options = MxOptions::skip_group().with(MxOption::ResolveIps);
    engine
        .configure(
            ResolutionOptions::basic_only()
                .with_mx(mx_options)
                .with_rdns()
                .with_txt(),
        )
        .unwrap();

    // Act
    let report = engine.get("Example.COM").await.unwrap();

    // Assert
    assert!(report.is_settled());
    assert_eq!(report.kind, QueryKind::Domain);
    assert_eq!(report.basic.resolved_address, Some(Ipv4Addr::new(192, 0, 2, 10)));

    let mx = report.mx.unwrap();
    let entries: Vec<_> = mx.entries().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].domain, "mx1.example.com");
    assert_eq!(entries[0].priority, 10);
    assert!(entries[0].ips.contains_key(&Ipv4Addr::new(192, 0, 2, 25)));

    let rdns = report.rdns.unwrap();
    assert_eq!(rdns.get(Ipv4Addr::new(192, 0, 2, 10)), Some("www.example.com"));

    assert_eq!(report.txt.unwrap().records, vec!["v=spf1 -all"]);

    assert!(engine.shutdown(Duration::from_secs(5)).await);
}

#[tokio::test]
async fn test_unknown_domain_is_unresolvable() {
    let server = MockDnsServer::start(zone()).await.unwrap();
    let engine = engine_against(&server).await;

    let report = engine.get("missing.example.org").await.unwrap();

    assert!(!report.is_resolvable());
    assert!(report.mx.is_none());
}

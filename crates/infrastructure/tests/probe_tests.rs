use ipscope_application::ports::{ProbeOutcome, ReachabilityProbe};
use ipscope_infrastructure::TcpReachabilityProbe;
use std::time::Duration;
use tokio::net::TcpListener;

fn probe() -> TcpReachabilityProbe {
    TcpReachabilityProbe::new(Duration::from_millis(500), Duration::from_secs(1))
}

#[tokio::test]
async fn test_listening_port_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let outcome = probe().probe("127.0.0.1", port).await;

    assert_eq!(outcome, ProbeOutcome::Connected);
}

#[tokio::test]
async fn test_closed_port_is_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let outcome = probe().probe("127.0.0.1", port).await;

    assert_eq!(outcome, ProbeOutcome::Refused);
}

#[tokio::test]
async fn test_unresolvable_host_is_unknown() {
    let outcome = probe().probe("no-such-host.invalid.", 25).await;

    assert_eq!(outcome, ProbeOutcome::UnknownHost);
}

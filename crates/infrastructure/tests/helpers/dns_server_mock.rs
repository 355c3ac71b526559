#![allow(dead_code)]
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::oneshot;

pub const TYPE_A: u16 = 1;
pub const TYPE_PTR: u16 = 12;
pub const TYPE_MX: u16 = 15;
pub const TYPE_TXT: u16 = 16;

const RCODE_SERVFAIL: u8 = 2;
const RCODE_NXDOMAIN: u8 = 3;

/// Scripted answer for one (name, type) pair.
#[derive(Debug, Clone)]
pub enum MockAnswer {
    A(Vec<Ipv4Addr>),
    Mx {
        exchanges: Vec<(u16, String)>,
        additional: Vec<(String, Ipv4Addr)>,
    },
    /// One entry per TXT record, each made of character strings.
    Txt(Vec<Vec<String>>),
    Ptr(Vec<String>),
    NxDomain,
    ServFail,
    /// Never answers, so the client times out.
    Silent,
    /// Empty truncated answer over UDP, the full A answer over TCP.
    TruncatedA(Vec<Ipv4Addr>),
}

#[derive(Debug, Clone, Default)]
pub struct MockZone {
    answers: HashMap<(String, u16), MockAnswer>,
}

impl MockZone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, qtype: u16, answer: MockAnswer) -> Self {
        self.answers.insert((normalize(name), qtype), answer);
        self
    }

    fn lookup(&self, name: &str, qtype: u16) -> MockAnswer {
        self.answers
            .get(&(normalize(name), qtype))
            .cloned()
            .unwrap_or(MockAnswer::NxDomain)
    }
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// In-process DNS server on 127.0.0.1 answering from a [`MockZone`] over
/// UDP and TCP on the same port.
pub struct MockDnsServer {
    addr: SocketAddr,
    queries: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockDnsServer {
    pub async fn start(zone: MockZone) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let listener = TcpListener::bind(addr).await?;

        let zone = Arc::new(zone);
        let queries = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let udp_zone = Arc::clone(&zone);
        let udp_queries = Arc::clone(&queries);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            udp_queries.fetch_add(1, Ordering::SeqCst);
                            if let Some(response) = respond(&udp_zone, &buf[..len], false) {
                                let _ = socket.send_to(&response, peer).await;
                            }
                        }
                    }
                }
            }
        });

        let tcp_zone = Arc::clone(&zone);
        let tcp_queries = Arc::clone(&queries);
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tcp_queries.fetch_add(1, Ordering::SeqCst);
                let zone = Arc::clone(&tcp_zone);
                tokio::spawn(async move {
                    let mut len_buf = [0u8; 2];
                    if stream.read_exact(&mut len_buf).await.is_err() {
                        return;
                    }
                    let mut query = vec![0u8; u16::from_be_bytes(len_buf) as usize];
                    if stream.read_exact(&mut query).await.is_err() {
                        return;
                    }
                    if let Some(response) = respond(&zone, &query, true) {
                        let mut framed = (response.len() as u16).to_be_bytes().to_vec();
                        framed.extend_from_slice(&response);
                        let _ = stream.write_all(&framed).await;
                    }
                });
            }
        });

        Ok(Self {
            addr,
            queries,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queries received over UDP and TCP.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockDnsServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// An address on 127.0.0.1 nothing listens on.
pub async fn closed_udp_port() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.local_addr().unwrap()
}

/// Returns the question name, its type and the offset past the question.
fn parse_question(query: &[u8]) -> Option<(String, u16, usize)> {
    let mut labels = Vec::new();
    let mut pos = 12;
    loop {
        let len = *query.get(pos)? as usize;
        pos += 1;
        if len == 0 {
            break;
        }
        labels.push(String::from_utf8_lossy(query.get(pos..pos + len)?).to_string());
        pos += len;
    }
    let qtype = u16::from_be_bytes([*query.get(pos)?, *query.get(pos + 1)?]);
    Some((labels.join("."), qtype, pos + 4))
}

fn encode_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.trim_end_matches('.').split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

fn push_record(out: &mut Vec<u8>, owner: &[u8], rtype: u16, ttl: u32, rdata: &[u8]) {
    out.extend_from_slice(owner);
    out.extend_from_slice(&rtype.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&ttl.to_be_bytes());
    out.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
    out.extend_from_slice(rdata);
}

fn respond(zone: &MockZone, query: &[u8], over_tcp: bool) -> Option<Vec<u8>> {
    if query.len() < 12 {
        return None;
    }
    let (name, qtype, question_end) = parse_question(query)?;

    // Name pointer to the question
    let question_ptr = [0xc0, 0x0c];
    let mut answers = Vec::new();
    let mut additional = Vec::new();
    let mut answer_count = 0u16;
    let mut additional_count = 0u16;
    let mut rcode = 0u8;
    let mut truncated = false;

    match zone.lookup(&name, qtype) {
        MockAnswer::A(ips) => {
            for ip in ips {
                push_record(&mut answers, &question_ptr, TYPE_A, 300, &ip.octets());
                answer_count += 1;
            }
        }
        MockAnswer::TruncatedA(ips) => {
            if over_tcp {
                for ip in ips {
                    push_record(&mut answers, &question_ptr, TYPE_A, 300, &ip.octets());
                    answer_count += 1;
                }
            } else {
                truncated = true;
            }
        }
        MockAnswer::Mx {
            exchanges,
            additional: glue,
        } => {
            for (preference, exchange) in exchanges {
                let mut rdata = preference.to_be_bytes().to_vec();
                rdata.extend(encode_name(&exchange));
                push_record(&mut answers, &question_ptr, TYPE_MX, 3600, &rdata);
                answer_count += 1;
            }
            for (host, ip) in glue {
                push_record(&mut additional, &encode_name(&host), TYPE_A, 3600, &ip.octets());
                additional_count += 1;
            }
        }
        MockAnswer::Txt(records) => {
            for parts in records {
                let mut rdata = Vec::new();
                for part in parts {
                    rdata.push(part.len() as u8);
                    rdata.extend_from_slice(part.as_bytes());
                }
                push_record(&mut answers, &question_ptr, TYPE_TXT, 300, &rdata);
                answer_count += 1;
            }
        }
        MockAnswer::Ptr(names) => {
            for target in names {
                push_record(&mut answers, &question_ptr, TYPE_PTR, 300, &encode_name(&target));
                answer_count += 1;
            }
        }
        MockAnswer::NxDomain => rcode = RCODE_NXDOMAIN,
        MockAnswer::ServFail => rcode = RCODE_SERVFAIL,
        MockAnswer::Silent => return None,
    }

    let mut response = Vec::with_capacity(512);
    response.extend_from_slice(&query[0..2]); // Transaction ID
    response.push(0x81 | if truncated { 0x02 } else { 0x00 }); // QR=1, TC, RD=1
    response.push(0x80 | rcode); // RA=1
    response.extend_from_slice(&1u16.to_be_bytes());
    response.extend_from_slice(&answer_count.to_be_bytes());
    response.extend_from_slice(&0u16.to_be_bytes());
    response.extend_from_slice(&additional_count.to_be_bytes());
    response.extend_from_slice(&query[12..question_end]);
    response.extend(answers);
    response.extend(additional);
    Some(response)
}

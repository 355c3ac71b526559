use crate::options::{MxOption, MxOptions};
use crate::query::QueryKind;
use crate::subnet::SubnetFacts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;

/// Why a lookup did not produce a complete answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestFailure {
    #[default]
    None,
    Timeout,
    Io,
    NoNameserver,
}

impl RequestFailure {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Outcome of the basic stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicResult {
    pub kind: QueryKind,
    pub resolvable: bool,
    pub invalid_subnet: bool,
    pub facts: Option<SubnetFacts>,
    /// A record picked for a domain query.
    pub resolved_address: Option<Ipv4Addr>,
    pub request_failure: RequestFailure,
}

impl BasicResult {
    /// Placeholder before the basic stage wrote its outcome.
    pub fn pending() -> Self {
        Self::unresolvable(QueryKind::Invalid)
    }

    pub fn unresolvable(kind: QueryKind) -> Self {
        Self {
            kind,
            resolvable: false,
            invalid_subnet: false,
            facts: None,
            resolved_address: None,
            request_failure: RequestFailure::None,
        }
    }

    pub fn invalid_subnet() -> Self {
        Self {
            invalid_subnet: true,
            ..Self::unresolvable(QueryKind::Subnet)
        }
    }

    pub fn single_ip(address: Ipv4Addr) -> Self {
        Self {
            kind: QueryKind::SingleIp,
            resolvable: true,
            invalid_subnet: false,
            facts: Some(SubnetFacts::for_host(address)),
            resolved_address: None,
            request_failure: RequestFailure::None,
        }
    }

    pub fn domain(address: Ipv4Addr) -> Self {
        Self {
            kind: QueryKind::Domain,
            resolved_address: Some(address),
            ..Self::single_ip(address)
        }
    }

    pub fn subnet(facts: SubnetFacts) -> Self {
        Self {
            kind: QueryKind::Subnet,
            resolvable: true,
            invalid_subnet: false,
            facts: Some(facts),
            resolved_address: None,
            request_failure: RequestFailure::None,
        }
    }

    pub fn with_failure(mut self, failure: RequestFailure) -> Self {
        self.request_failure = failure;
        self
    }

    pub fn is_subnet(&self) -> bool {
        self.kind == QueryKind::Subnet
    }

    pub fn usable_count(&self) -> u32 {
        match (&self.facts, self.resolvable) {
            (Some(facts), true) => facts.usable_count,
            _ => 0,
        }
    }

    pub fn usable_addresses(&self) -> Vec<Ipv4Addr> {
        match (&self.facts, self.resolvable) {
            (Some(facts), true) => facts.usable_addresses().collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for BasicResult {
    fn default() -> Self {
        Self::pending()
    }
}

/// One verified MX target. Identity is the lower-cased domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MxRecordResult {
    pub domain: String,
    pub priority: u16,
    pub ttl: u32,
    pub smtp_port: u16,
    /// `None` until a probe ran.
    pub reachable: Option<bool>,
    pub disabled: bool,
    pub pitfall: bool,
    pub blackhole_suspect: bool,
    pub is_doublette: bool,
    pub has_doublette: bool,
    /// Resolved addresses and their probe outcome, `None` when not verified.
    pub ips: BTreeMap<Ipv4Addr, Option<bool>>,
    pub request_start: DateTime<Utc>,
    pub request_end: Option<DateTime<Utc>>,
}

impl MxRecordResult {
    pub const DEFAULT_SMTP_PORT: u16 = 25;

    pub fn new(domain: &str, priority: u16, ttl: u32) -> Self {
        Self {
            domain: domain.trim_end_matches('.').to_lowercase(),
            priority,
            ttl,
            smtp_port: Self::DEFAULT_SMTP_PORT,
            reachable: None,
            disabled: false,
            pitfall: false,
            blackhole_suspect: false,
            is_doublette: false,
            has_doublette: false,
            ips: BTreeMap::new(),
            request_start: Utc::now(),
            request_end: None,
        }
    }

    /// Pitfalls are never considered deliverable.
    pub fn mark_pitfall(&mut self) {
        self.pitfall = true;
        self.set_reachable(false);
    }

    /// An unreachable target is disabled as well.
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = Some(reachable);
        if !reachable {
            self.disabled = true;
        }
    }

    pub fn add_ip(&mut self, ip: Ipv4Addr, reachable: Option<bool>) {
        self.ips.insert(ip, reachable);
    }

    /// Keeps a verified outcome over an unverified one.
    pub fn merge_ips(&mut self, other: &BTreeMap<Ipv4Addr, Option<bool>>) {
        for (ip, reachable) in other {
            let slot = self.ips.entry(*ip).or_insert(*reachable);
            if slot.is_none() {
                *slot = *reachable;
            }
        }
    }

    pub fn finish(&mut self) {
        self.request_end = Some(Utc::now());
    }

    pub fn resolve_duration(&self) -> Option<chrono::Duration> {
        self.request_end.map(|end| end - self.request_start)
    }
}

impl PartialEq for MxRecordResult {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
    }
}

impl Eq for MxRecordResult {}

impl Hash for MxRecordResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MxAddOutcome {
    Added,
    Merged,
    Dropped,
}

/// MX entries of one query, ordered by priority then insertion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MxResult {
    by_priority: BTreeMap<u16, Vec<MxRecordResult>>,
    /// Priority under which each target was first added.
    #[serde(skip)]
    first_seen: HashMap<String, u16>,
    pub request_failure: RequestFailure,
    pub used_fallback_resolvers: bool,
    pub is_retry: bool,
}

impl MxResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_retry() -> Self {
        Self {
            is_retry: true,
            ..Self::default()
        }
    }

    /// Inserts `entry` applying the doublette rules of `options`.
    pub fn add(&mut self, mut entry: MxRecordResult, options: &MxOptions) -> MxAddOutcome {
        if options.is_empty() && entry.pitfall {
            return MxAddOutcome::Dropped;
        }

        match self.first_seen.get(&entry.domain).copied() {
            Some(first_priority) if first_priority != entry.priority => {
                if options.contains(MxOption::MarkDoublettes) {
                    entry.is_doublette = true;
                    entry.has_doublette = true;
                    if let Some(first) = self.find_mut(first_priority, &entry.domain) {
                        first.has_doublette = true;
                    }
                } else {
                    if let Some(first) = self.find_mut(first_priority, &entry.domain) {
                        first.merge_ips(&entry.ips);
                        return MxAddOutcome::Merged;
                    }
                    return MxAddOutcome::Dropped;
                }
            }
            Some(_) => {}
            None => {
                self.first_seen.insert(entry.domain.clone(), entry.priority);
            }
        }

        let bucket = self.by_priority.entry(entry.priority).or_default();
        if let Some(existing) = bucket.iter_mut().find(|e| e.domain == entry.domain) {
            existing.merge_ips(&entry.ips);
            MxAddOutcome::Merged
        } else {
            bucket.push(entry);
            MxAddOutcome::Added
        }
    }

    fn find_mut(&mut self, priority: u16, domain: &str) -> Option<&mut MxRecordResult> {
        self.by_priority
            .get_mut(&priority)
            .and_then(|bucket| bucket.iter_mut().find(|e| e.domain == domain))
    }

    pub fn entries(&self) -> impl Iterator<Item = &MxRecordResult> {
        self.by_priority.values().flatten()
    }

    pub fn enabled_entries(&self) -> impl Iterator<Item = &MxRecordResult> {
        self.entries().filter(|e| !e.disabled)
    }

    pub fn at_priority(&self, priority: u16) -> &[MxRecordResult] {
        self.by_priority
            .get(&priority)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn priorities(&self) -> impl Iterator<Item = u16> + '_ {
        self.by_priority.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_priority.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_priority.is_empty()
    }
}

/// Reverse names per usable address. `None` marks a failed lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdnsResult {
    names: BTreeMap<Ipv4Addr, Option<String>>,
}

impl RdnsResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ip: Ipv4Addr, name: Option<String>) {
        self.names.insert(ip, name);
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.names.contains_key(&ip)
    }

    pub fn get(&self, ip: Ipv4Addr) -> Option<&str> {
        self.names.get(&ip).and_then(|name| name.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ipv4Addr, Option<&str>)> {
        self.names.iter().map(|(ip, name)| (*ip, name.as_deref()))
    }

    pub fn resolved_count(&self) -> usize {
        self.names.values().filter(|name| name.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtResult {
    pub records: Vec<String>,
}

impl TxtResult {
    pub fn new(records: Vec<String>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(domain: &str, priority: u16, ips: &[Ipv4Addr]) -> MxRecordResult {
        let mut entry = MxRecordResult::new(domain, priority, 3600);
        for ip in ips {
            entry.add_ip(*ip, None);
        }
        entry
    }

    #[test]
    fn test_doublette_dropped_and_ips_merged_by_default() {
        let mut result = MxResult::new();
        let options = MxOptions::defaults();
        let a = Ipv4Addr::new(192, 0, 2, 1);
        let b = Ipv4Addr::new(192, 0, 2, 2);

        assert_eq!(
            result.add(entry("mx.example.com", 10, &[a]), &options),
            MxAddOutcome::Added
        );
        assert_eq!(
            result.add(entry("MX.example.com.", 20, &[b]), &options),
            MxAddOutcome::Merged
        );

        assert_eq!(result.len(), 1);
        let survivor = &result.at_priority(10)[0];
        assert_eq!(survivor.ips.len(), 2);
        assert!(!survivor.is_doublette);
        assert!(result.at_priority(20).is_empty());
    }

    #[test]
    fn test_mark_doublettes_keeps_both_with_flags() {
        let mut result = MxResult::new();
        let options = MxOptions::defaults().with(MxOption::MarkDoublettes);

        result.add(entry("mx.example.com", 10, &[]), &options);
        result.add(entry("mx.example.com", 20, &[]), &options);

        assert_eq!(result.len(), 2);
        let first = &result.at_priority(10)[0];
        let second = &result.at_priority(20)[0];
        assert!(!first.is_doublette);
        assert!(first.has_doublette);
        assert!(second.is_doublette);
        assert!(second.has_doublette);
    }

    #[test]
    fn test_same_priority_merges() {
        let mut result = MxResult::new();
        let options = MxOptions::defaults().with(MxOption::MarkDoublettes);

        result.add(entry("mx.example.com", 10, &[Ipv4Addr::new(192, 0, 2, 1)]), &options);
        let outcome = result.add(
            entry("mx.example.com", 10, &[Ipv4Addr::new(192, 0, 2, 9)]),
            &options,
        );

        assert_eq!(outcome, MxAddOutcome::Merged);
        assert_eq!(result.len(), 1);
        assert_eq!(result.at_priority(10)[0].ips.len(), 2);
    }

    #[test]
    fn test_empty_options_drop_pitfalls() {
        let mut result = MxResult::new();
        let mut pitfall = entry("mx.trap.example", 5, &[]);
        pitfall.mark_pitfall();

        assert_eq!(
            result.add(pitfall, &MxOptions::empty()),
            MxAddOutcome::Dropped
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_entries_ordered_by_priority() {
        let mut result = MxResult::new();
        let options = MxOptions::defaults();
        result.add(entry("b.example.com", 30, &[]), &options);
        result.add(entry("a.example.com", 10, &[]), &options);
        result.add(entry("c.example.com", 10, &[]), &options);

        let order: Vec<&str> = result.entries().map(|e| e.domain.as_str()).collect();
        assert_eq!(order, vec!["a.example.com", "c.example.com", "b.example.com"]);
    }

    #[test]
    fn test_unreachable_is_disabled() {
        let mut mx = MxRecordResult::new("mx.example.com", 10, 60);
        mx.set_reachable(false);

        assert_eq!(mx.reachable, Some(false));
        assert!(mx.disabled);
    }

    #[test]
    fn test_merge_ips_prefers_verified() {
        let ip = Ipv4Addr::new(192, 0, 2, 1);
        let mut mx = MxRecordResult::new("mx.example.com", 10, 60);
        mx.add_ip(ip, None);

        let mut other = BTreeMap::new();
        other.insert(ip, Some(true));
        mx.merge_ips(&other);

        assert_eq!(mx.ips.get(&ip), Some(&Some(true)));
    }

    #[test]
    fn test_basic_usable_count() {
        assert_eq!(BasicResult::single_ip(Ipv4Addr::new(192, 0, 2, 10)).usable_count(), 1);
        assert_eq!(BasicResult::invalid_subnet().usable_count(), 0);
        assert!(BasicResult::pending().usable_addresses().is_empty());
    }
}

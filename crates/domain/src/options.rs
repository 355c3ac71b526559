use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Toggles that shape how the MX stage filters and verifies entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MxOption {
    /// Probe the root domain on the SMTP port when no MX entry exists.
    CheckRoot,
    /// Keep doublettes and flag them instead of dropping them.
    MarkDoublettes,
    /// Retry once on a timeout or transient I/O failure.
    Retry,
    ResolveIps,
    SkipBlackholes,
    SkipDisabled,
    SkipDoublettes,
    SkipPitfalls,
    /// Treat a refused SMTP connection as unreachable.
    SkipRefused,
    SkipUnreachable,
    VerifyDomain,
    VerifyIps,
}

impl MxOption {
    pub const ALL: [MxOption; 12] = [
        Self::CheckRoot,
        Self::MarkDoublettes,
        Self::Retry,
        Self::ResolveIps,
        Self::SkipBlackholes,
        Self::SkipDisabled,
        Self::SkipDoublettes,
        Self::SkipPitfalls,
        Self::SkipRefused,
        Self::SkipUnreachable,
        Self::VerifyDomain,
        Self::VerifyIps,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckRoot => "CHECK_ROOT",
            Self::MarkDoublettes => "MARK_DOUBLETTES",
            Self::Retry => "RETRY",
            Self::ResolveIps => "RESOLVE_IPS",
            Self::SkipBlackholes => "SKIP_BLACKHOLES",
            Self::SkipDisabled => "SKIP_DISABLED",
            Self::SkipDoublettes => "SKIP_DOUBLETTES",
            Self::SkipPitfalls => "SKIP_PITFALLS",
            Self::SkipRefused => "SKIP_REFUSED",
            Self::SkipUnreachable => "SKIP_UNREACHABLE",
            Self::VerifyDomain => "VERIFY_DOMAIN",
            Self::VerifyIps => "VERIFY_IPS",
        }
    }
}

impl FromStr for MxOption {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_").to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|option| option.as_str() == wanted)
            .ok_or_else(|| DomainError::InvalidMxOption(s.trim().to_string()))
    }
}

impl fmt::Display for MxOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of [`MxOption`]s. Two sets are equal when they hold the same
/// options regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MxOptions(BTreeSet<MxOption>);

impl MxOptions {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// SkipBlackholes, SkipDisabled, SkipDoublettes, SkipPitfalls, Retry and
    /// VerifyDomain.
    pub fn defaults() -> Self {
        let mut options = Self::skip_group();
        options.insert(MxOption::Retry);
        options.insert(MxOption::VerifyDomain);
        options
    }

    pub fn defaults_with_unreachable() -> Self {
        Self::defaults().with(MxOption::SkipUnreachable)
    }

    pub fn all() -> Self {
        MxOption::ALL.into_iter().collect()
    }

    pub fn resolve_group() -> Self {
        [
            MxOption::Retry,
            MxOption::ResolveIps,
            MxOption::VerifyDomain,
            MxOption::VerifyIps,
        ]
        .into_iter()
        .collect()
    }

    /// SkipBlackholes, SkipDisabled, SkipDoublettes and SkipPitfalls.
    /// SkipRefused and SkipUnreachable stay opt-in and are not part of it.
    pub fn skip_group() -> Self {
        [
            MxOption::SkipBlackholes,
            MxOption::SkipDisabled,
            MxOption::SkipDoublettes,
            MxOption::SkipPitfalls,
        ]
        .into_iter()
        .collect()
    }

    pub fn with(mut self, option: MxOption) -> Self {
        self.0.insert(option);
        self
    }

    pub fn insert(&mut self, option: MxOption) -> bool {
        self.0.insert(option)
    }

    pub fn remove(&mut self, option: MxOption) -> bool {
        self.0.remove(&option)
    }

    pub fn contains(&self, option: MxOption) -> bool {
        self.0.contains(&option)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = MxOption> + '_ {
        self.0.iter().copied()
    }

    /// IP verification implies domain verification.
    pub fn verifies_domain(&self) -> bool {
        self.contains(MxOption::VerifyDomain) || self.contains(MxOption::VerifyIps)
    }

    /// IP verification implies IP resolution.
    pub fn resolves_ips(&self) -> bool {
        self.contains(MxOption::ResolveIps) || self.contains(MxOption::VerifyIps)
    }

    pub fn verifies_ips(&self) -> bool {
        self.contains(MxOption::VerifyIps)
    }
}

impl FromIterator<MxOption> for MxOptions {
    fn from_iter<I: IntoIterator<Item = MxOption>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parses names separated by commas and/or whitespace, e.g.
/// `"SKIP_PITFALLS, verify-domain RETRY"`.
impl FromStr for MxOptions {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(MxOption::from_str)
            .collect()
    }
}

impl fmt::Display for MxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(MxOption::as_str).collect();
        f.write_str(&names.join(","))
    }
}

/// Which stages a query should run, and how MX entries are treated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOptions {
    #[serde(default)]
    pub resolve_mx: bool,
    #[serde(default)]
    pub mx_options: MxOptions,
    #[serde(default)]
    pub resolve_rdns: bool,
    #[serde(default)]
    pub resolve_txt: bool,
}

impl ResolutionOptions {
    pub fn basic_only() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            resolve_mx: true,
            mx_options: MxOptions::defaults(),
            resolve_rdns: true,
            resolve_txt: true,
        }
    }

    pub fn with_mx(mut self, mx_options: MxOptions) -> Self {
        self.resolve_mx = true;
        self.mx_options = mx_options;
        self
    }

    pub fn with_rdns(mut self) -> Self {
        self.resolve_rdns = true;
        self
    }

    pub fn with_txt(mut self) -> Self {
        self.resolve_txt = true;
        self
    }

    pub fn requests_any_stage(&self) -> bool {
        self.resolve_mx || self.resolve_rdns || self.resolve_txt
    }
}

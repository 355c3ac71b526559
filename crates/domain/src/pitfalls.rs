use std::collections::HashSet;

/// MX targets known to be dysfunctional even though they look valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PitfallList {
    domains: HashSet<String>,
}

impl PitfallList {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_end_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn contains(&self, domain: &str) -> bool {
        if self.domains.is_empty() {
            return false;
        }
        self.domains
            .contains(&domain.trim_end_matches('.').to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

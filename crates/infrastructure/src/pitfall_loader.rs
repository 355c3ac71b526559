//! Pitfall list sources: inline domains from the configuration plus an
//! optional file, either TOML (`pitfalls = ["a.example", ...]`) or plain
//! text with one domain per line and `#` comments.

use ipscope_domain::config::MxConfig;
use ipscope_domain::{ConfigError, PitfallList};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct PitfallFile {
    #[serde(default)]
    pitfalls: Vec<String>,
}

fn looks_like_toml(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .any(|line| line.starts_with("pitfalls") && line.contains('='))
}

pub fn parse_pitfalls(text: &str) -> Result<Vec<String>, ConfigError> {
    if looks_like_toml(text) {
        let file: PitfallFile =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        return Ok(file.pitfalls);
    }

    Ok(text
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn load_pitfall_file(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_pitfalls(&text)
}

/// Inline pitfalls merged with the pitfall file, if one is configured.
pub fn load_pitfalls(config: &MxConfig) -> Result<PitfallList, ConfigError> {
    let mut domains = config.pitfalls.clone();
    if let Some(path) = &config.pitfall_file {
        let from_file = load_pitfall_file(path)?;
        info!(path = %path, count = from_file.len(), "Pitfall file loaded");
        domains.extend(from_file);
    }
    Ok(PitfallList::new(domains))
}

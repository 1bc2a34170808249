use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::gateway::DEFAULT_TAIL_LINES;

pub const DEFAULT_LOG_BUFFER_LINES: usize = 5_000;

/// Settings read from the optional YAML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
    pub namespace: Option<String>,
    #[serde(alias = "tail")]
    pub tail_lines: i64,
    pub log_buffer_lines: usize,
    pub log_filter: Option<String>,
    /// Kind tokens shown in the kind list, in order. Empty shows every kind.
    pub kinds: Vec<String>,
    /// Extra kind tokens, e.g. `web: deploy`.
    pub aliases: BTreeMap<String, String>,
    #[serde(skip)]
    pub source: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            tail_lines: DEFAULT_TAIL_LINES,
            log_buffer_lines: DEFAULT_LOG_BUFFER_LINES,
            log_filter: None,
            kinds: Vec::new(),
            aliases: BTreeMap::new(),
            source: None,
        }
    }
}

impl BrowserConfig {
    /// Loads the first config file found, or defaults when there is none.
    pub fn discover() -> Result<Self> {
        match discover_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut parsed = Self::parse(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        parsed.source = Some(path.display().to_string());
        Ok(parsed)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut parsed: Self = serde_yaml::from_str(raw)?;
        if parsed.tail_lines <= 0 {
            parsed.tail_lines = DEFAULT_TAIL_LINES;
        }
        if parsed.log_buffer_lines == 0 {
            parsed.log_buffer_lines = DEFAULT_LOG_BUFFER_LINES;
        }
        Ok(parsed)
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KUBENAV_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("kubenav.yaml"),
        PathBuf::from("kubenav.yml"),
        PathBuf::from(".kubenav.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/kubenav/config.yaml"),
            PathBuf::from(&home).join(".config/kubenav/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

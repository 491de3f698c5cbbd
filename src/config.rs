//! Scan configuration.
//!
//! A config file lists the roots to scan and how to treat what is found
//! there. Every field has a default, so an empty file is valid.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::analysis::DEFAULT_MAX_DEPTH;

/// File names probed, in order, when no config path is given.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["classscan.yaml", ".classscan.yaml"];

/// What to do with files that contain syntax errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxErrorPolicy {
    /// Log the error, drop it from the result, extract nothing from the file.
    #[default]
    Skip,
    /// Keep an error entry in the result, extract nothing from the file.
    Report,
    /// Keep an error entry and extract classes from the recovered tree.
    Recover,
}

impl SyntaxErrorPolicy {
    /// Whether syntax error entries belong in the aggregated result.
    pub fn reports(&self) -> bool {
        !matches!(self, SyntaxErrorPolicy::Skip)
    }
}

impl fmt::Display for SyntaxErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxErrorPolicy::Skip => write!(f, "skip"),
            SyntaxErrorPolicy::Report => write!(f, "report"),
            SyntaxErrorPolicy::Recover => write!(f, "recover"),
        }
    }
}

impl std::str::FromStr for SyntaxErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(SyntaxErrorPolicy::Skip),
            "report" => Ok(SyntaxErrorPolicy::Report),
            "recover" => Ok(SyntaxErrorPolicy::Recover),
            _ => Err(format!("unknown syntax error policy: {}", s)),
        }
    }
}

/// Top-level scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directories to scan.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
    /// Keep only classes with a base containing this name.
    #[serde(default)]
    pub marker_base: Option<String>,
    #[serde(default)]
    pub syntax_errors: SyntaxErrorPolicy,
    /// Glob patterns for paths to leave out (e.g. `**/venv/**`).
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            marker_base: None,
            syntax_errors: SyntaxErrorPolicy::default(),
            exclude: Vec::new(),
            parallel: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ScanConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        // An empty document deserializes to `null`, not to an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ScanConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Find a config file in `dir`, if one exists.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Check that the config can be used for a scan.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(marker) = &self.marker_base {
            if marker.trim().is_empty() {
                anyhow::bail!("marker_base must not be empty");
            }
        }
        if self.max_depth == 0 {
            anyhow::bail!("max_depth must be at least 1");
        }
        for pattern in &self.exclude {
            Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid exclude pattern {:?}: {}", pattern, e))?;
        }
        Ok(())
    }

    /// Compile the exclude patterns.
    pub fn exclude_set(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
roots: ["./nodes", "./more"]
marker_base: NodeBase
syntax_errors: report
exclude: ["**/venv/**"]
parallel: true
"#;
        let config = ScanConfig::parse_str(yaml).unwrap();
        assert_eq!(config.roots, vec![PathBuf::from("./nodes"), PathBuf::from("./more")]);
        assert_eq!(config.marker_base.as_deref(), Some("NodeBase"));
        assert_eq!(config.syntax_errors, SyntaxErrorPolicy::Report);
        assert!(config.parallel);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(ScanConfig::parse_str("").unwrap(), ScanConfig::default());
        assert_eq!(ScanConfig::parse_str("{}").unwrap(), ScanConfig::default());
    }

    #[test]
    fn test_rejects_unknown_policy() {
        assert!(ScanConfig::parse_str("syntax_errors: ignore").is_err());
        assert!("ignore".parse::<SyntaxErrorPolicy>().is_err());
        assert_eq!("Recover".parse::<SyntaxErrorPolicy>(), Ok(SyntaxErrorPolicy::Recover));
    }

    #[test]
    fn test_validate_rejects_bad_glob() {
        let config = ScanConfig {
            exclude: vec!["a/[".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exclude_set_matches() {
        let config = ScanConfig {
            exclude: vec!["**/venv/**".to_string()],
            ..Default::default()
        };
        let set = config.exclude_set().unwrap();
        assert!(set.is_match("proj/venv/lib/site.py"));
        assert!(!set.is_match("proj/nodes/calc.py"));
    }

    #[test]
    fn test_discover() {
        let temp = TempDir::new().unwrap();
        assert!(ScanConfig::discover(temp.path()).is_none());
        std::fs::write(temp.path().join(".classscan.yaml"), "parallel: true\n").unwrap();
        let found = ScanConfig::discover(temp.path()).unwrap();
        assert!(found.ends_with(".classscan.yaml"));
        assert!(ScanConfig::parse_file(found).unwrap().parallel);
    }
}

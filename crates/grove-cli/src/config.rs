//! `grove.toml` loading.
//!
//! Every field is optional. A file that cannot be read or parsed is reported
//! and replaced by the defaults rather than aborting the command.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use grove_syntax::ParserOptions;
use serde::Deserialize;

pub(crate) const CONFIG_FILE: &str = "grove.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroveConfig {
    pub parser: ParserSection,
    pub log: LogSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserSection {
    pub max_versions: usize,
    pub max_skipped_tokens: usize,
    pub max_insertions: usize,
    pub timeout_ms: Option<u64>,
    pub check_interval: usize,
    pub reuse: bool,
}

impl Default for ParserSection {
    fn default() -> Self {
        let defaults = ParserOptions::default();
        Self {
            max_versions: defaults.max_versions,
            max_skipped_tokens: defaults.max_skipped_tokens,
            max_insertions: defaults.max_insertions,
            timeout_ms: None,
            check_interval: defaults.check_interval,
            reuse: defaults.reuse,
        }
    }
}

impl ParserSection {
    pub fn options(&self) -> ParserOptions {
        ParserOptions {
            max_versions: self.max_versions.max(1),
            max_skipped_tokens: self.max_skipped_tokens,
            max_insertions: self.max_insertions,
            timeout: self.timeout_ms.map(Duration::from_millis),
            cancellation: None,
            check_interval: self.check_interval.max(1),
            reuse: self.reuse,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub level: Option<String>,
}

impl LogSection {
    pub fn level(&self) -> Result<Option<tracing::Level>, String> {
        self.level
            .as_deref()
            .map(|level| {
                level
                    .parse::<tracing::Level>()
                    .map_err(|_| format!("unknown log level `{level}`"))
            })
            .transpose()
    }
}

/// A loaded configuration and the problem that forced defaults, if any.
///
/// Logging is configured from the file, so problems are handed back for
/// the caller to report once the subscriber is installed.
#[derive(Debug, Default)]
pub struct Loaded {
    pub config: GroveConfig,
    pub source: Option<PathBuf>,
    pub problem: Option<String>,
}

impl GroveConfig {
    /// Loads `explicit`, or `grove.toml` in the working directory if there
    /// is one.
    pub fn load(explicit: Option<&Path>) -> Loaded {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = PathBuf::from(CONFIG_FILE);
                if !candidate.is_file() {
                    return Loaded::default();
                }
                candidate
            }
        };
        match fs::read_to_string(&path) {
            Ok(contents) => Self::from_contents(&contents, &path),
            Err(err) => Loaded {
                config: Self::default(),
                problem: Some(format!("Failed to read grove config at {}: {err}", path.display())),
                source: Some(path),
            },
        }
    }

    pub fn from_contents(contents: &str, path: &Path) -> Loaded {
        match toml::from_str::<Self>(contents) {
            Ok(config) => Loaded {
                config,
                source: Some(path.to_path_buf()),
                problem: None,
            },
            Err(err) => Loaded {
                config: Self::default(),
                source: Some(path.to_path_buf()),
                problem: Some(format!("Failed to parse grove config at {}: {err}", path.display())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(contents: &str) -> Loaded {
        GroveConfig::from_contents(contents, Path::new("grove.toml"))
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let loaded = load("");
        assert!(loaded.problem.is_none());
        assert_eq!(loaded.config.parser, ParserSection::default());
        let options = loaded.config.parser.options();
        assert_eq!(options.max_versions, ParserOptions::default().max_versions);
        assert!(options.timeout.is_none());
        assert!(options.reuse);
    }

    #[test]
    fn test_sections_override_defaults() {
        let loaded = load(
            r#"
[parser]
max_versions = 2
timeout_ms = 250
reuse = false

[log]
level = "debug"
"#,
        );
        assert!(loaded.problem.is_none());
        let options = loaded.config.parser.options();
        assert_eq!(options.max_versions, 2);
        assert_eq!(options.max_insertions, ParserOptions::default().max_insertions);
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
        assert!(!options.reuse);
        assert_eq!(loaded.config.log.level(), Ok(Some(tracing::Level::DEBUG)));
    }

    #[test]
    fn test_zero_limits_are_clamped() {
        let loaded = load("[parser]\nmax_versions = 0\ncheck_interval = 0\n");
        let options = loaded.config.parser.options();
        assert_eq!(options.max_versions, 1);
        assert_eq!(options.check_interval, 1);
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let loaded = load("[parser\nmax_versions = 2\n");
        assert_eq!(loaded.config.parser, ParserSection::default());
        let problem = loaded.problem.unwrap();
        assert!(problem.starts_with("Failed to parse grove config at grove.toml"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let loaded = load("[parser]\nmax_version = 2\n");
        assert!(loaded.problem.is_some());
        assert_eq!(loaded.config.parser.max_versions, ParserOptions::default().max_versions);
    }

    #[test]
    fn test_bad_log_level() {
        let log = LogSection {
            level: Some("loud".to_string()),
        };
        assert_eq!(log.level(), Err("unknown log level `loud`".to_string()));
        assert_eq!(LogSection::default().level(), Ok(None));
    }

    #[test]
    fn test_missing_explicit_file_is_reported() {
        let loaded = GroveConfig::load(Some(Path::new("/nonexistent/grove.toml")));
        assert!(loaded
            .problem
            .unwrap()
            .starts_with("Failed to read grove config at /nonexistent/grove.toml"));
    }
}

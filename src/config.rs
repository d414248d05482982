//! Scan configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{SqlSpotError, SqlSpotResult};
use crate::parser::SqlDialect;

/// Name of the per-project config file looked up in the working directory.
pub const PROJECT_CONFIG: &str = "sqlspot.toml";

/// Scanner configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Dialect handed to the SQL parser
    pub dialect: SqlDialect,

    /// File extensions the scanner visits
    pub extensions: Vec<String>,

    /// Directory names never entered
    pub skip_dirs: Vec<String>,

    /// Attach the commit hash of the enclosing checkout
    pub git_provenance: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::PostgreSql,
            extensions: ["rs", "sql", "txt", "yaml", "yml"]
                .into_iter()
                .map(String::from)
                .collect(),
            skip_dirs: ["target", "node_modules", ".git", "vendor", "__pycache__", "dist"]
                .into_iter()
                .map(String::from)
                .collect(),
            git_provenance: true,
        }
    }
}

impl ScanConfig {
    /// Create a new configuration builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> SqlSpotResult<Self> {
        toml::from_str(content).map_err(|e| SqlSpotError::Config(e.to_string()))
    }

    /// Load one config file.
    pub fn from_file(path: &Path) -> SqlSpotResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| SqlSpotError::io(path, e))?;
        Self::from_toml(&content).map_err(|e| match e {
            SqlSpotError::Config(msg) => {
                SqlSpotError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Load from `explicit`, else the first existing default location, else defaults.
    ///
    /// An explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> SqlSpotResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_locations().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Whether the scanner should read a file with this extension.
    pub fn wants_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Whether the scanner should skip a directory with this name.
    pub fn skips_dir(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|d| d == name)
    }
}

/// `./sqlspot.toml`, then `<config dir>/sqlspot/config.toml`.
pub fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(PROJECT_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("sqlspot").join("config.toml"));
    }
    paths
}

/// Builder for ScanConfig
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn dialect(mut self, dialect: SqlDialect) -> Self {
        self.config.dialect = dialect;
        self
    }

    /// Replace the visited extensions
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Add one directory name to skip
    pub fn skip_dir(mut self, name: impl Into<String>) -> Self {
        self.config.skip_dirs.push(name.into());
        self
    }

    pub fn git_provenance(mut self, enabled: bool) -> Self {
        self.config.git_provenance = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ScanConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(ScanConfig::from_toml("").unwrap(), ScanConfig::default());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config = ScanConfig::from_toml(
            r#"
dialect = "mysql"
git_provenance = false
"#,
        )
        .unwrap();
        assert_eq!(config.dialect, SqlDialect::MySql);
        assert!(!config.git_provenance);
        assert!(config.wants_extension("SQL"));
        assert!(config.skips_dir("node_modules"));
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let err = ScanConfig::from_toml("dialect = \"cobol\"").unwrap_err();
        assert!(matches!(err, SqlSpotError::Config(_)));
        assert!(ScanConfig::from_toml("colour = true").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_io_error() {
        let err = ScanConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, SqlSpotError::Io { .. }));
    }

    #[test]
    fn test_builder() {
        let config = ScanConfig::builder()
            .dialect(SqlDialect::Sqlite)
            .extensions(["sql"])
            .skip_dir("fixtures")
            .git_provenance(false)
            .build();
        assert!(config.wants_extension("sql"));
        assert!(!config.wants_extension("rs"));
        assert!(config.skips_dir("fixtures"));
        assert!(config.skips_dir("target"));
    }
}

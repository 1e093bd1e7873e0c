//! Shell configuration, loaded from TOML.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, ShellError};

/// Runtime limits and startup behavior of a shell instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Maximum nesting of evaluations (sub-evaluations, blocks, aliases).
    pub max_depth: usize,
    /// Output lines retained before the oldest are dropped (0 = unbounded).
    pub max_output_lines: usize,
    /// Upper bound on iterations of the `repeat` command.
    pub max_iterations: usize,
    /// Emit every top-level input as an `Input` line before evaluating it.
    pub echo_input: bool,
    /// Register the built-in commands at init.
    pub builtins: bool,
    /// Aliases bound at init (name -> target statement).
    pub aliases: BTreeMap<String, String>,
    /// Statements evaluated at init, in order.
    pub startup: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_output_lines: 1000,
            max_iterations: 1000,
            echo_input: false,
            builtins: true,
            aliases: BTreeMap::new(),
            startup: Vec::new(),
        }
    }
}

impl ShellConfig {
    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ShellConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        log::debug!("Loaded shell config from {}", path.display());
        Self::from_toml(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ShellError::Config("max_depth must be at least 1".into()));
        }
        if let Some(name) = self.aliases.keys().find(|n| n.trim().is_empty()) {
            return Err(ShellError::Config(format!("invalid alias name: '{name}'")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let c = ShellConfig::default();
        assert_eq!(c.max_depth, 64);
        assert_eq!(c.max_output_lines, 1000);
        assert!(c.builtins);
        assert!(!c.echo_input);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(ShellConfig::from_toml("").unwrap(), ShellConfig::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let c = ShellConfig::from_toml(
            r#"
            max_depth = 8
            echo_input = true
            startup = ["var greeting hello"]

            [aliases]
            say = "print"
            "#,
        )
        .unwrap();
        assert_eq!(c.max_depth, 8);
        assert!(c.echo_input);
        assert_eq!(c.max_iterations, 1000);
        assert_eq!(c.startup, vec!["var greeting hello".to_string()]);
        assert_eq!(c.aliases.get("say").map(String::as_str), Some("print"));
    }

    #[test]
    fn zero_depth_rejected() {
        let err = ShellConfig::from_toml("max_depth = 0").unwrap_err();
        assert!(matches!(err, ShellError::Config(_)));
    }

    #[test]
    fn unknown_key_rejected() {
        let err = ShellConfig::from_toml("max_dept = 3").unwrap_err();
        assert!(matches!(err, ShellError::TomlParse(_)));
    }

    #[test]
    fn from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "max_output_lines = 5").unwrap();
        let c = ShellConfig::from_file(f.path()).unwrap();
        assert_eq!(c.max_output_lines, 5);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ShellConfig::from_file(Path::new("/nonexistent/ember.toml")).unwrap_err();
        assert!(matches!(err, ShellError::Io(_)));
    }
}

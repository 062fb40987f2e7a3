//! Pipeline configuration management for `kiln.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── clean      # [clean]
//! │   ├── serve      # [serve]
//! │   ├── transform  # [markup], [styles]
//! │   └── watch      # [watch]
//! ├── error.rs       # ConfigError
//! └── mod.rs         # PipelineConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section       | Purpose                                          |
//! |---------------|--------------------------------------------------|
//! | `[serve]`     | Development server (interface, port, reload)     |
//! | `[watch]`     | Debounce window for file events                  |
//! | `[clean]`     | Output entries that survive a clean              |
//! | `[markup]`    | Template compiler command                        |
//! | `[styles]`    | Sass command and browser targets                 |
//!
//! The file is optional: a project without `kiln.toml` builds with the
//! defaults of every section.

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{CleanConfig, MarkupConfig, ServeConfig, StyleTargets, StylesConfig, WatchConfig};

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    cli::{Cli, ServeArgs},
    debug,
    utils::path::normalize_path,
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing kiln.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Project root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// File watcher settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Clean settings
    #[serde(default)]
    pub clean: CleanConfig,

    /// Template compiler
    #[serde(default)]
    pub markup: MarkupConfig,

    /// Stylesheet compiler
    #[serde(default)]
    pub styles: StylesConfig,
}

impl PipelineConfig {
    /// Load configuration from CLI arguments.
    ///
    /// The config file is resolved against the project root and may be
    /// absent, in which case every section takes its defaults.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let root = normalize_path(&cli.root);
        let config_path = root.join(&cli.config);

        let mut config = if config_path.is_file() {
            debug!("config"; "loading {}", config_path.display());
            Self::from_path(&config_path)?
        } else {
            debug!("config"; "{} not found, using defaults", config_path.display());
            Self::default()
        };

        config.root = root;
        if let Some(serve) = cli.serve_args() {
            config.apply_serve_args(&serve);
        }
        config.validate()?;

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Default configuration rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_serve_args(&mut self, args: &ServeArgs) {
        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Check values serde cannot express constraints for.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clean.validate().map_err(ConfigError::Validation)?;

        if self.markup.command.is_empty() {
            return Err(ConfigError::Validation(
                "markup.command must name a program".into(),
            ));
        }
        if self.styles.command.is_empty() {
            return Err(ConfigError::Validation(
                "styles.command must name a program".into(),
            ));
        }
        if self.serve.port != 0 && self.serve.port == self.serve.reload_port {
            return Err(ConfigError::Validation(format!(
                "serve.port and serve.reload_port are both {}",
                self.serve.port
            )));
        }

        Ok(())
    }
}

/// Parse a config snippet for section tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> PipelineConfig {
    PipelineConfig::from_str(content).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.watch.debounce_ms, 300);
        assert_eq!(config.clean.keep, vec!["img"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(matches!(
            PipelineConfig::from_str("[serve]\nport = 1\nwatch = true"),
            Err(ConfigError::Toml(_))
        ));
        assert!(PipelineConfig::from_str("[deploy]\nforce = true").is_err());
    }

    #[test]
    fn test_load_without_config_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_str().unwrap();
        let cli = Cli::parse_from(["kiln", "--root", root, "clean"]);

        let config = PipelineConfig::load(&cli).unwrap();
        assert_eq!(config.root, temp.path().canonicalize().unwrap());
        assert_eq!(config.serve.port, 3000);
    }

    #[test]
    fn test_load_applies_cli_overrides() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("kiln.toml"),
            "[serve]\nport = 4000\ninterface = \"0.0.0.0\"\n",
        )
        .unwrap();
        let root = temp.path().to_str().unwrap();

        let cli = Cli::parse_from(["kiln", "--root", root, "watch", "--port", "5000"]);
        let config = PipelineConfig::load(&cli).unwrap();
        assert_eq!(config.serve.port, 5000);
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        // commands without a server keep the file values
        let cli = Cli::parse_from(["kiln", "--root", root, "styles"]);
        assert_eq!(PipelineConfig::load(&cli).unwrap().serve.port, 4000);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kiln.toml"), "[serve\nport = 1").unwrap();
        let root = temp.path().to_str().unwrap();

        let cli = Cli::parse_from(["kiln", "--root", root]);
        assert!(matches!(
            PipelineConfig::load(&cli),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = test_parse_config("[markup]\ncommand = []");
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config = test_parse_config("[serve]\nport = 4000\nreload_port = 4000");
        assert!(config.validate().is_err());

        config = test_parse_config("[clean]\nkeep = [\"../src\"]");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_root_relative() {
        let config = PipelineConfig::with_root("/site");
        assert_eq!(
            config.root_relative("/site/dist/css/main.min.css"),
            PathBuf::from("dist/css/main.min.css")
        );
        assert_eq!(config.root_join("dist"), PathBuf::from("/site/dist"));
    }
}

//! `[markup]` and `[styles]` collaborator settings.
//!
//! ```toml
//! [markup]
//! command = ["pug", "--path", "$KILN_SOURCE"]
//!
//! [styles]
//! command = ["sass", "--stdin", "--indented", "--load-path", "$KILN_SOURCE_DIR"]
//!
//! [styles.targets]    # browser majors for vendor prefixing
//! chrome = 80
//! safari = 13
//! ```

use lightningcss::targets::Browsers;
use serde::{Deserialize, Serialize};

/// Template compiler command (stdin → stdout).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupConfig {
    pub command: Vec<String>,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            command: vec!["pug".into(), "--path".into(), "$KILN_SOURCE".into()],
        }
    }
}

/// Sass command and CSS post-processing targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    pub command: Vec<String>,
    pub targets: StyleTargets,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "sass".into(),
                "--stdin".into(),
                "--indented".into(),
                "--load-path".into(),
                "$KILN_SOURCE_DIR".into(),
            ],
            targets: StyleTargets::default(),
        }
    }
}

/// Oldest browser major versions to prefix for. Unset browsers get no
/// prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleTargets {
    pub chrome: Option<u32>,
    pub edge: Option<u32>,
    pub firefox: Option<u32>,
    pub safari: Option<u32>,
    pub ios_saf: Option<u32>,
}

impl Default for StyleTargets {
    fn default() -> Self {
        Self {
            chrome: Some(80),
            edge: Some(80),
            firefox: Some(78),
            safari: Some(13),
            ios_saf: Some(13),
        }
    }
}

impl StyleTargets {
    /// lightningcss encodes versions as `major << 16 | minor << 8`.
    pub fn to_browsers(self) -> Browsers {
        let version = |major: Option<u32>| major.map(|m| m << 16);
        Browsers {
            chrome: version(self.chrome),
            edge: version(self.edge),
            firefox: version(self.firefox),
            safari: version(self.safari),
            ios_saf: version(self.ios_saf),
            ..Browsers::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_markup_command_default() {
        let config = test_parse_config("");
        assert_eq!(config.markup.command[0], "pug");
    }

    #[test]
    fn test_styles_override() {
        let config = test_parse_config(
            "[styles]\ncommand = [\"npx\", \"sass\", \"--stdin\"]\n[styles.targets]\nchrome = 100\nsafari = 15",
        );
        assert_eq!(config.styles.command, vec!["npx", "sass", "--stdin"]);
        assert_eq!(config.styles.targets.chrome, Some(100));
        // fields missing from an explicit table fall back to defaults
        assert_eq!(config.styles.targets.firefox, Some(78));

        let browsers = config.styles.targets.to_browsers();
        assert_eq!(browsers.chrome, Some(100 << 16));
        assert_eq!(browsers.safari, Some(15 << 16));
        assert_eq!(browsers.opera, None);
    }
}

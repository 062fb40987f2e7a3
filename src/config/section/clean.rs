//! `[clean]` section configuration.
//!
//! ```toml
//! [clean]
//! keep = ["img"]   # top-level entries of dist/ that survive `kiln clean`
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanConfig {
    /// Names of direct children of the output root to preserve.
    pub keep: Vec<String>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            keep: vec!["img".into()],
        }
    }
}

impl CleanConfig {
    /// Every entry must be a single plain path component.
    pub fn validate(&self) -> Result<(), String> {
        for name in &self.keep {
            let plain = !name.is_empty()
                && name != "."
                && name != ".."
                && !name.contains(['/', '\\']);
            if !plain {
                return Err(format!(
                    "clean.keep: `{name}` must be a plain directory or file name"
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_clean_keep_default() {
        assert_eq!(test_parse_config("").clean.keep, vec!["img"]);
    }

    #[test]
    fn test_clean_keep_validation() {
        let ok = CleanConfig {
            keep: vec!["img".into(), "fonts".into()],
        };
        assert!(ok.validate().is_ok());

        for bad in ["", "..", "img/icons", "../src"] {
            let config = CleanConfig {
                keep: vec![bad.into()],
            };
            assert!(config.validate().is_err(), "{bad} should be rejected");
        }
    }
}

//! Embedded static resources.
//!
//! # Usage
//!
//! ```ignore
//! use embed::serve::{RELOAD_JS, ReloadVars};
//!
//! let js = RELOAD_JS.render(&ReloadVars { ws_port: 35729 });
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod serve {
    use super::{Template, TemplateVars};

    /// URL the dev server answers with the reload client.
    pub const RELOAD_JS_URL: &str = "/__kiln/reload.js";

    /// Variables for reload.js.
    pub struct ReloadVars {
        pub ws_port: u16,
    }

    impl TemplateVars for ReloadVars {
        fn apply(&self, content: &str) -> String {
            content.replace("__KILN_WS_PORT__", &self.ws_port.to_string())
        }
    }

    /// Live reload client with WebSocket port injection.
    pub const RELOAD_JS: Template<ReloadVars> = Template::new(include_str!("serve/reload.js"));

    /// Script tag injected into served HTML.
    pub fn reload_tag() -> String {
        format!(r#"<script src="{RELOAD_JS_URL}" defer></script>"#)
    }
}

#[cfg(test)]
mod tests {
    use super::serve::*;

    #[test]
    fn test_reload_js_port_injection() {
        let js = RELOAD_JS.render(&ReloadVars { ws_port: 35731 });
        assert!(js.contains("35731"));
        assert!(!js.contains("__KILN_WS_PORT__"));
    }

    #[test]
    fn test_reload_tag() {
        assert_eq!(
            reload_tag(),
            r#"<script src="/__kiln/reload.js" defer></script>"#
        );
    }
}

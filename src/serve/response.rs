//! HTTP response handlers.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::embed::serve::{RELOAD_JS, ReloadVars, reload_tag};
use crate::utils::mime::{self, types};

/// Respond with a static file, injecting the reload client into HTML.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = maybe_inject_reload(body, content_type);

    send_body(request, 200, content_type, body)
}

/// Respond with 404 page (custom `404.html` or plain text).
pub fn respond_not_found(request: Request, serve_root: &Path) -> Result<()> {
    let custom_404 = serve_root.join("404.html");
    let has_custom = custom_404.is_file();

    if is_head_request(&request) {
        let content_type = if has_custom { types::HTML } else { types::PLAIN };
        return send_head(request, 404, content_type);
    }

    if has_custom && let Ok(body) = fs::read(&custom_404) {
        let body = maybe_inject_reload(body, types::HTML);
        return send_body(request, 404, types::HTML, body);
    }

    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with reload.js from memory.
pub fn respond_reload_js(request: Request, ws_port: u16) -> Result<()> {
    let body = RELOAD_JS.render(&ReloadVars { ws_port });
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes())
}

/// Inject the reload client if the response is HTML.
pub fn maybe_inject_reload(body: Vec<u8>, content_type: &str) -> Vec<u8> {
    if mime::is_html(content_type) {
        inject_reload_script(&body)
    } else {
        body
    }
}

/// Inject the reload script tag before `</body>`
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let script = reload_tag();
    let script_bytes = script.as_bytes();

    const PATTERN: &[u8] = b"</body>";

    let pos = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        // No </body> found, append to end (browsers handle this gracefully)
        .unwrap_or(content.len());

    let mut result = Vec::with_capacity(content.len() + script_bytes.len());
    result.extend_from_slice(&content[..pos]);
    result.extend_from_slice(script_bytes);
    result.extend_from_slice(&content[pos..]);
    result
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let mut response = Response::empty(StatusCode(status));
    add_headers(&mut response, content_type);
    request.respond(response)?;
    Ok(())
}

fn send_body(request: Request, status: u16, content_type: &'static str, body: Vec<u8>) -> Result<()> {
    let mut response = Response::from_data(body).with_status_code(StatusCode(status));
    add_headers(&mut response, content_type);
    request.respond(response)?;
    Ok(())
}

/// Content type plus no-store, so a reload always sees fresh output.
fn add_headers<R: std::io::Read>(response: &mut Response<R>, content_type: &'static str) {
    for (key, value) in [("Content-Type", content_type), ("Cache-Control", "no-store")] {
        if let Ok(header) = Header::from_bytes(key, value) {
            response.add_header(header);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_before_last_body_tag() {
        let html = b"<html><body><p>x</p></BODY></html>".to_vec();
        let out = String::from_utf8(maybe_inject_reload(html, types::HTML)).unwrap();
        assert_eq!(
            out,
            "<html><body><p>x</p><script src=\"/__kiln/reload.js\" defer></script></BODY></html>"
        );
    }

    #[test]
    fn test_inject_without_body_appends() {
        let out = maybe_inject_reload(b"<p>fragment</p>".to_vec(), types::HTML);
        assert!(String::from_utf8(out).unwrap().ends_with("</script>"));
    }

    #[test]
    fn test_non_html_untouched() {
        let css = b"body{margin:0}".to_vec();
        assert_eq!(maybe_inject_reload(css.clone(), types::CSS), css);
    }
}

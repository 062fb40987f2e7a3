//! Development server with live reload support.
//!
//! Serves the output root over HTTP. HTML responses get the reload client
//! injected before `</body>`; the client itself is answered from memory at
//! [`RELOAD_JS_URL`].

mod lifecycle;
mod path;
mod response;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_http::{Request, Server};

use crate::config::ServeConfig;
use crate::embed::serve::RELOAD_JS_URL;
use crate::{debug, log};

/// Worker threads answering requests.
const REQUEST_THREADS: usize = 4;

/// Bound server ready to accept requests
pub struct DevServer {
    server: Arc<Server>,
    addr: SocketAddr,
    serve_root: PathBuf,
    ws_port: u16,
}

impl DevServer {
    /// Bind the HTTP listener for `serve_root`, retrying successive ports.
    pub fn bind(config: &ServeConfig, serve_root: &Path, ws_port: u16) -> Result<Self> {
        let (server, addr) = lifecycle::bind_with_retry(config.interface, config.port)?;
        let server = Arc::new(server);
        crate::core::register_server(Arc::clone(&server));

        log!("serve"; "http://{}", addr);
        debug!("serve"; "serving {}", serve_root.display());

        Ok(Self {
            server,
            addr,
            serve_root: serve_root.to_path_buf(),
            ws_port,
        })
    }

    /// Get the bound address.
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle for stopping [`run`](Self::run) from another thread.
    pub fn handle(&self) -> Arc<Server> {
        Arc::clone(&self.server)
    }

    /// Start the request loop (blocking) until the server is unblocked.
    pub fn run(self) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("kiln-http-{i}"))
            .build()
            .context("Failed to create request thread pool")?;

        let serve_root = Arc::new(self.serve_root);
        for request in self.server.incoming_requests() {
            let serve_root = Arc::clone(&serve_root);
            let ws_port = self.ws_port;
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &serve_root, ws_port) {
                    log!("serve"; "request error: {e}");
                }
            });
        }

        debug!("serve"; "request loop stopped");
        Ok(())
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, serve_root: &Path, ws_port: u16) -> Result<()> {
    let url = request.url().split('?').next().unwrap_or_default();
    if url == RELOAD_JS_URL {
        return response::respond_reload_js(request, ws_port);
    }

    if let Some(path) = path::resolve_path(request.url(), serve_root) {
        return response::respond_file(request, &path);
    }

    response::respond_not_found(request, serve_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::{IpAddr, Ipv4Addr, TcpStream};
    use tempfile::TempDir;

    fn start(root: &Path) -> (SocketAddr, Arc<Server>, std::thread::JoinHandle<()>) {
        let config = ServeConfig {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            reload_port: 0,
        };
        let server = DevServer::bind(&config, root, 35729).unwrap();
        let addr = server.addr();
        let handle = server.handle();
        let thread = std::thread::spawn(move || server.run().unwrap());
        (addr, handle, thread)
    }

    fn get(addr: SocketAddr, path: &str) -> (u16, String, String) {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
        )
        .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).unwrap();

        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        let status = head.split(' ').nth(1).unwrap().parse().unwrap();
        (status, head.to_ascii_lowercase(), body.to_string())
    }

    #[test]
    fn test_serves_output_with_reload_client() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("css")).unwrap();
        fs::write(
            temp.path().join("index.html"),
            "<html><body><h1>hi</h1></body></html>",
        )
        .unwrap();
        fs::write(temp.path().join("css/main.min.css"), "a{color:red}").unwrap();

        let (addr, handle, thread) = start(temp.path());

        let (status, head, body) = get(addr, "/");
        assert_eq!(status, 200);
        assert!(head.contains("content-type: text/html"));
        assert!(body.contains("<h1>hi</h1><script src=\"/__kiln/reload.js\" defer></script></body>"));

        let (status, head, body) = get(addr, "/css/main.min.css?t=1");
        assert_eq!(status, 200);
        assert!(head.contains("content-type: text/css"));
        assert_eq!(body, "a{color:red}");

        let (status, _, body) = get(addr, "/__kiln/reload.js");
        assert_eq!(status, 200);
        assert!(body.contains("35729"));

        let (status, _, _) = get(addr, "/missing.html");
        assert_eq!(status, 404);

        let (status, _, _) = get(addr, "/../secret.txt");
        assert_eq!(status, 404);

        handle.unblock();
        thread.join().unwrap();
    }
}

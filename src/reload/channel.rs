//! WebSocket reload channel.
//!
//! One acceptor thread performs the handshake for each incoming browser
//! and greets it with `connected`. One reader thread polls every client
//! so closed tabs are dropped promptly. Broadcasts run on the caller's
//! thread.

use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::{HotReloadMessage, ReloadKind, ReloadNotifier};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Poll interval of the acceptor and reader threads.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Connected browsers and the listener that admits them.
pub struct ReloadChannel {
    clients: Clients,
    port: u16,
    running: Arc<AtomicBool>,
}

impl ReloadChannel {
    /// Bind the WebSocket listener and start accepting clients.
    ///
    /// Tries `base_port` and up to nine successive ports.
    pub fn start(interface: IpAddr, base_port: u16) -> Result<Self> {
        let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        listener
            .set_nonblocking(true)
            .context("Failed to configure reload listener")?;

        let channel = Self {
            clients: Arc::new(Mutex::new(Vec::new())),
            port,
            running: Arc::new(AtomicBool::new(true)),
        };

        let clients = Arc::clone(&channel.clients);
        let running = Arc::clone(&channel.running);
        std::thread::spawn(move || accept_loop(&listener, &clients, &running));

        let clients = Arc::clone(&channel.clients);
        let running = Arc::clone(&channel.running);
        std::thread::spawn(move || client_reader_loop(&clients, &running));

        crate::debug!("reload"; "listening on ws://{}", SocketAddr::new(interface, port));
        Ok(channel)
    }

    /// Port actually bound.
    pub const fn port(&self) -> u16 {
        self.port
    }

    #[cfg(test)]
    pub(crate) fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Send a message to every connected client, dropping the ones whose
    /// socket fails.
    pub fn broadcast(&self, msg: &HotReloadMessage) {
        let mut clients = self.clients.lock();
        let count = clients.len();

        if count == 0 {
            crate::debug!("reload"; "no clients connected");
            return;
        }

        let frame = Message::Text(msg.to_json().into());
        clients.retain_mut(|ws| match ws.send(frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                crate::debug!("reload"; "client disconnected: {}", e);
                false
            }
        });
        crate::debug!("reload"; "broadcast to {} clients", count);
    }

    /// Close every client and stop the background threads.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        let mut clients = self.clients.lock();
        for mut ws in clients.drain(..) {
            let _ = ws.close(None);
        }
    }
}

impl ReloadNotifier for ReloadChannel {
    fn notify(&self, kind: ReloadKind) {
        self.broadcast(&kind.into());
    }
}

// =============================================================================
// Background threads
// =============================================================================

fn accept_loop(listener: &TcpListener, clients: &Clients, running: &AtomicBool) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, addr)) => {
                crate::debug!("reload"; "client connected: {}", addr);
                // Set blocking for the handshake
                let _ = stream.set_nonblocking(false);
                add_client(stream, clients);
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                crate::log!("reload"; "accept error: {}", e);
                std::thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

fn add_client(stream: TcpStream, clients: &Clients) {
    match tungstenite::accept(stream) {
        Ok(mut ws) => {
            let connected = HotReloadMessage::connected();
            if let Err(e) = ws.send(Message::Text(connected.to_json().into())) {
                crate::log!("reload"; "failed to send connected message: {}", e);
                return;
            }
            // Non-blocking from here on so the reader thread can poll
            let _ = ws.get_ref().set_nonblocking(true);

            let mut clients = clients.lock();
            clients.push(ws);
            crate::debug!("reload"; "client registered (total: {})", clients.len());
        }
        Err(e) => {
            crate::log!("reload"; "handshake failed: {}", e);
        }
    }
}

/// Drain client frames and drop clients that closed or errored.
fn client_reader_loop(clients: &Clients, running: &AtomicBool) {
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(POLL_INTERVAL);

        let mut clients = clients.lock();
        clients.retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                true
            }
            Err(_) => false,
        });
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => {
                last_error = Some(e);
            }
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Instant;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    fn read_message(ws: &mut WebSocket<tungstenite::stream::MaybeTlsStream<TcpStream>>) -> HotReloadMessage {
        let frame = ws.read().unwrap();
        HotReloadMessage::from_json(frame.to_text().unwrap()).unwrap()
    }

    #[test]
    fn test_notify_without_clients_is_noop() {
        let channel = ReloadChannel::start(LOCALHOST, 0).unwrap();
        assert_eq!(channel.client_count(), 0);
        channel.notify(ReloadKind::full("nobody listening"));
        assert_eq!(channel.client_count(), 0);
        channel.shutdown();
    }

    #[test]
    fn test_client_receives_messages() {
        let channel = ReloadChannel::start(LOCALHOST, 0).unwrap();
        let url = format!("ws://127.0.0.1:{}", channel.port());
        let (mut client, _) = tungstenite::connect(url).unwrap();

        assert!(matches!(
            read_message(&mut client),
            HotReloadMessage::Connected { .. }
        ));
        assert!(wait_for(|| channel.client_count() == 1));

        channel.notify(ReloadKind::css("css/main.min.css"));
        assert_eq!(
            read_message(&mut client),
            HotReloadMessage::css("css/main.min.css")
        );

        channel.notify(ReloadKind::full("index.pug"));
        assert_eq!(
            read_message(&mut client),
            HotReloadMessage::reload_with_reason("index.pug")
        );

        channel.shutdown();
    }

    #[test]
    fn test_closed_client_is_dropped() {
        let channel = ReloadChannel::start(LOCALHOST, 0).unwrap();
        let url = format!("ws://127.0.0.1:{}", channel.port());
        let (mut client, _) = tungstenite::connect(url).unwrap();
        let _ = read_message(&mut client);
        assert!(wait_for(|| channel.client_count() == 1));

        client.close(None).unwrap();
        let _ = client.flush();
        assert!(wait_for(|| channel.client_count() == 0));

        channel.shutdown();
    }

    #[test]
    fn test_port_retry() {
        let taken = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let base = taken.local_addr().unwrap().port();

        let (_listener, port) = try_bind_port(LOCALHOST, base, 10).unwrap();
        assert_ne!(port, base);
        assert!(port > base && port < base + 10);
    }
}

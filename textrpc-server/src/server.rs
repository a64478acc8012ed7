//! TCP server implementation.

use crate::dispatcher::Dispatcher;
use crate::error::ServerError;
use crate::metrics::Metrics;
use crate::session::Session;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use textrpc_protocol::{
    Decoder, Encoder, Response, DEFAULT_HOST, DEFAULT_PORT, SERVER_READ_BUFFER_SIZE,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::broadcast;

/// Pending connection queue length passed to `listen(2)`.
const LISTEN_BACKLOG: u32 = 1024;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Host name or address to bind to.
    pub host: String,
    /// Port to bind to. Zero picks a free port.
    pub port: u16,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Bytes read for the single request of a connection.
    pub read_buffer_size: usize,
    /// Metrics instance (if metrics are enabled).
    pub metrics: Option<Arc<Metrics>>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("read_buffer_size", &self.read_buffer_size)
            .field("metrics_enabled", &self.metrics.is_some())
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_connections: 1000,
            read_buffer_size: SERVER_READ_BUFFER_SIZE,
            metrics: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    /// Sets the metrics instance.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Returns the endpoint as `host:port`.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub requests_total: AtomicU64,
    pub malformed_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// TCP server for textrpc.
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Dispatcher,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    shutdown_requested: AtomicBool,
    running: AtomicBool,
}

impl Server {
    /// Resolves the configured endpoint and binds the listening socket.
    ///
    /// Address reuse is enabled so a restarted server can rebind a port that
    /// still has connections in TIME_WAIT.
    pub async fn bind(config: ServerConfig, dispatcher: Dispatcher) -> Result<Self, ServerError> {
        let endpoint = config.endpoint();
        let addr = tokio::net::lookup_host(&endpoint)
            .await
            .map_err(|e| ServerError::AddressResolution(format!("{}: {}", endpoint, e)))?
            .next()
            .ok_or_else(|| ServerError::AddressResolution(endpoint.clone()))?;

        let listener = Self::listen(addr).map_err(|source| ServerError::Bind {
            addr: endpoint.clone(),
            source,
        })?;
        let local_addr = listener.local_addr()?;

        let dispatcher = match config.metrics {
            Some(ref metrics) => dispatcher.with_metrics(metrics.clone()),
            None => dispatcher,
        };

        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            config,
            listener,
            local_addr,
            dispatcher,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            shutdown_requested: AtomicBool::new(false),
            running: AtomicBool::new(false),
        })
    }

    fn listen(addr: SocketAddr) -> std::io::Result<TcpListener> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        socket.listen(LISTEN_BACKLOG)
    }

    /// Returns the address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the dispatcher shared by every connection.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runs the accept loop until [`Server::shutdown`] is called.
    pub async fn run(&self) -> Result<(), ServerError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        if self.shutdown_requested.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.running.store(true, Ordering::SeqCst);

        tracing::info!(
            "Server listening on {} ({} functions)",
            self.local_addr,
            self.dispatcher.registry().len()
        );

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((tcp_stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("Connection limit reached, rejecting {}", addr);
                                self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                                continue;
                            }

                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            if let Some(ref metrics) = self.config.metrics {
                                metrics.connections_total.inc();
                                metrics.connections_active.inc();
                            }

                            let dispatcher = self.dispatcher.clone();
                            let stats = self.stats.clone();
                            let config = self.config.clone();

                            tokio::spawn(async move {
                                let session = Self::handle_connection(
                                    tcp_stream,
                                    addr,
                                    dispatcher,
                                    &config,
                                    &stats,
                                )
                                .await;

                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                if let Some(ref metrics) = config.metrics {
                                    metrics.connections_active.dec();
                                }

                                tracing::debug!(
                                    "[{}] Session {} finished: {:?} {} ({} bytes in, {} bytes out, {:?})",
                                    addr,
                                    session.id,
                                    session.state(),
                                    session.function().unwrap_or("-"),
                                    session.bytes_read(),
                                    session.bytes_written(),
                                    session.age()
                                );
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Serves the single request of a connection, then closes it.
    async fn handle_connection(
        mut stream: TcpStream,
        addr: SocketAddr,
        dispatcher: Dispatcher,
        config: &ServerConfig,
        stats: &ServerStats,
    ) -> Session {
        tracing::info!("Client connected: {}", addr);
        let mut session = Session::new(addr);

        match Self::serve(&mut stream, &mut session, dispatcher, config, stats).await {
            Ok(()) => session.complete(),
            Err(e) => {
                tracing::debug!("[{}] Connection error: {}", addr, e);
                stats.errors_total.fetch_add(1, Ordering::Relaxed);
                session.fail();
            }
        }

        if let Err(e) = stream.shutdown().await {
            tracing::debug!("[{}] Shutdown error: {}", addr, e);
        }
        tracing::info!("Client disconnected: {}", addr);
        session
    }

    async fn serve(
        stream: &mut TcpStream,
        session: &mut Session,
        dispatcher: Dispatcher,
        config: &ServerConfig,
        stats: &ServerStats,
    ) -> Result<(), ServerError> {
        let addr = session.remote_addr;
        let mut buf = vec![0u8; config.read_buffer_size];
        let n = stream.read(&mut buf).await?;
        session.record_read(n);
        tracing::debug!("[{}] Received {} bytes", addr, n);

        let payload = &buf[..n];
        if Decoder::is_empty_payload(payload) {
            tracing::debug!("[{}] Empty request, nothing to answer", addr);
            return Ok(());
        }

        let request = match Decoder::decode_request(payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("[{}] Malformed request: {}", addr, e);
                stats.malformed_total.fetch_add(1, Ordering::Relaxed);
                if let Some(ref metrics) = config.metrics {
                    metrics.malformed_requests_total.inc();
                }
                let bytes = Encoder::encode_response(&Response::malformed(&e));
                stream.write_all(&bytes).await?;
                session.record_write(bytes.len());
                session.fail();
                return Ok(());
            }
        };

        tracing::info!("[{}] => {} {:?}", addr, request.function, request.args);
        session.set_function(request.function.clone());
        stats.requests_total.fetch_add(1, Ordering::Relaxed);

        let response = tokio::task::spawn_blocking(move || dispatcher.dispatch(&request))
            .await
            .map_err(|e| ServerError::HandlerFailed(e.to_string()))?;

        tracing::info!("[{}] <= {} bytes", addr, response.as_str().len());
        let bytes = Encoder::encode_response(&response);
        stream.write_all(&bytes).await?;
        session.record_write(bytes.len());
        Ok(())
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        let _ = self.shutdown.send(());
    }

    /// Returns a receiver notified on shutdown.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use textrpc_client::{Client, ConnectionConfig, ListingMode};
    use textrpc_core::{builtin_registry, LsCommand};
    use tokio::task::JoinHandle;

    async fn start_server(config: ServerConfig) -> (Arc<Server>, JoinHandle<()>) {
        let dispatcher = Dispatcher::new(builtin_registry(LsCommand::default()).unwrap());
        let server = Arc::new(Server::bind(config, dispatcher).await.unwrap());
        let runner = server.clone();
        let handle = tokio::spawn(async move {
            runner.run().await.unwrap();
        });
        (server, handle)
    }

    async fn test_server() -> (Arc<Server>, JoinHandle<()>) {
        start_server(ServerConfig::new("127.0.0.1", 0)).await
    }

    /// Sends raw bytes and reads the reply until the server closes.
    async fn raw_exchange(addr: SocketAddr, payload: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(payload).await.unwrap();
        if payload.is_empty() {
            stream.shutdown().await.unwrap();
        }
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.unwrap();
        reply
    }

    fn client(server: &Server) -> Client {
        Client::new(ConnectionConfig::new("127.0.0.1", server.local_addr().port()))
    }

    #[tokio::test]
    async fn test_server_not_running_before_run() {
        let dispatcher = Dispatcher::new(builtin_registry(LsCommand::default()).unwrap());
        let server = Server::bind(ServerConfig::new("127.0.0.1", 0), dispatcher)
            .await
            .unwrap();
        assert!(!server.is_running());
        assert_ne!(server.local_addr().port(), 0);
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_connection_limit_refuses_extra_connections() {
        let (server, _handle) =
            start_server(ServerConfig::new("127.0.0.1", 0).with_max_connections(1)).await;
        let addr = server.local_addr();

        // An idle connection holds the only slot while its read is pending.
        let held = TcpStream::connect(addr).await.unwrap();
        wait_for(|| server.stats().connections_active.load(Ordering::Relaxed) == 1).await;

        let mut refused = TcpStream::connect(addr).await.unwrap();
        let mut reply = Vec::new();
        let _ = refused.read_to_end(&mut reply).await;
        assert!(reply.is_empty());
        assert_eq!(server.stats().connections_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(server.stats().connections_total.load(Ordering::Relaxed), 1);
        assert_eq!(server.dispatcher().counter().current(), 0);

        // Closing the held connection frees the slot again.
        drop(held);
        wait_for(|| server.stats().connections_active.load(Ordering::Relaxed) == 0).await;
        let reply = raw_exchange(addr, br#"{"function": "rot13", "args": ["abc"]}"#).await;
        assert_eq!(reply, b"nop\r\n");
        assert_eq!(server.stats().connections_rejected.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_rot13_over_the_wire() {
        let (server, _handle) = test_server().await;
        let reply = raw_exchange(
            server.local_addr(),
            br#"{"function": "rot13", "args": ["abc"]}"#,
        )
        .await;
        assert_eq!(reply, b"nop\r\n");
        assert_eq!(server.dispatcher().counter().current(), 1);
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let (server, _handle) = test_server().await;
        let reply = raw_exchange(
            server.local_addr(),
            br#"{"function": "nope", "args": []}"#,
        )
        .await;
        assert_eq!(reply, b"Unknown function\r\n");
        assert_eq!(server.dispatcher().counter().current(), 0);
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let (server, _handle) = test_server().await;
        let reply = raw_exchange(server.local_addr(), b"not json").await;
        let reply = String::from_utf8(reply).unwrap();
        assert!(reply.starts_with("Malformed request: "));
        assert!(reply.ends_with("\r\n"));

        let reply = raw_exchange(server.local_addr(), br#"{"function": "rot13"}"#).await;
        assert!(String::from_utf8(reply).unwrap().starts_with("Malformed request: "));

        assert_eq!(server.dispatcher().counter().current(), 0);
        assert_eq!(server.stats().malformed_total.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_empty_probe_gets_no_reply() {
        let (server, _handle) = test_server().await;
        let reply = raw_exchange(server.local_addr(), b"").await;
        assert!(reply.is_empty());

        let reply = raw_exchange(server.local_addr(), b" \r\n").await;
        assert!(reply.is_empty());
        assert_eq!(server.stats().requests_total.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_counted_exactly() {
        let (server, _handle) = test_server().await;
        let addr = server.local_addr();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                tokio::spawn(async move {
                    raw_exchange(addr, br#"{"function": "rot13", "args": ["n"]}"#).await
                })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap(), b"a\r\n");
        }

        let reply = raw_exchange(addr, br#"{"function": "calls", "args": []}"#).await;
        assert_eq!(reply, b"21 calls so far ...\r\n");
    }

    #[tokio::test]
    async fn test_client_round_trip() {
        let (server, _handle) = test_server().await;
        let client = client(&server);

        assert_eq!(client.rot13("Hello").await.unwrap(), "Uryyb");
        assert_eq!(client.max_even(&["1", "8", "0x10", "7"]).await.unwrap(), "16");
        assert_eq!(
            client.functions().await.unwrap(),
            "help functions rot13 max_even calls file_exists list_files list_files2 list_files3"
        );
        assert_eq!(client.calls().await.unwrap(), "4 calls so far ...");

        let response = client.call::<&str>("missing", &[]).await.unwrap();
        assert!(response.is_unknown_function());
    }

    #[tokio::test]
    async fn test_client_file_functions() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.txt"), b"b").unwrap();
        let root = dir.path().to_string_lossy().into_owned();

        let (server, _handle) = test_server().await;
        let client = client(&server);

        assert_eq!(client.file_exists("a.txt", Some(root.as_str())).await.unwrap(), "True");
        assert_eq!(client.file_exists("zz.txt", Some(root.as_str())).await.unwrap(), "False");

        let flat = client.list_files(&root, ListingMode::Flat).await.unwrap();
        assert_eq!(flat, "a.txt");

        let walk = client.list_files(&root, ListingMode::Walk).await.unwrap();
        assert!(walk.contains("a.txt"));
        assert!(walk.contains("b.txt"));
    }

    #[tokio::test]
    async fn test_metrics_wired_through() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let config = ServerConfig::new("127.0.0.1", 0).with_metrics(metrics.clone());
        let (server, _handle) = start_server(config).await;

        raw_exchange(
            server.local_addr(),
            br#"{"function": "rot13", "args": ["abc"]}"#,
        )
        .await;
        raw_exchange(server.local_addr(), b"{").await;

        assert_eq!(
            metrics.requests_total.with_label_values(&["rot13"]).get(),
            1.0
        );
        assert_eq!(metrics.malformed_requests_total.get(), 1.0);
        assert_eq!(metrics.connections_total.get(), 2.0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_run() {
        let (server, handle) = test_server().await;
        server.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_bind_reports_unresolvable_host() {
        let dispatcher = Dispatcher::new(builtin_registry(LsCommand::default()).unwrap());
        let config = ServerConfig::new("host.invalid", 0);
        let err = Server::bind(config, dispatcher).await.err().unwrap();
        assert!(err.is_startup_error());
    }
}

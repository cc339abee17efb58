//! Host transport with separated reader/writer tasks.
//!
//! ```text
//!   HostChannel::connect()   (exactly once per channel)
//!         │
//!         ├── writer_task  ← receives PendingRequest via mpsc, serialises → stream
//!         └── reader_task  ← reads JSON lines from stream
//!                               ├── response (has id)   → matched oneshot::Sender
//!                               ├── signal              → signal subscribers, in order
//!                               └── command             → command subscribers, in order
//! ```
//!
//! This is the only module that knows how bytes reach the host. Everything
//! above it talks in method names and JSON values.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{Inbound, Request, HELLO, PROTOCOL_VERSION};
use super::BridgeError;

pub type HostReader = Box<dyn AsyncRead + Send + Unpin>;
pub type HostWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Handler for one named host signal. Receives the raw signal arguments.
pub type SignalHandler = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Handler for inbound host commands. Receives the command name and arguments.
pub type CommandHandler = Arc<dyn Fn(&str, &[Value]) + Send + Sync>;

/// A way of reaching the host process.
///
/// Swapping the transport is how tests substitute a fake host.
pub trait Transport: Send + Sync {
    /// Open a byte stream to the host
    fn open(&self) -> BoxFuture<'_, io::Result<(HostReader, HostWriter)>>;

    /// Human-readable endpoint for logs
    fn describe(&self) -> String;
}

/// Host listening on a local TCP port
pub struct TcpTransport {
    address: String,
}

impl TcpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Transport for TcpTransport {
    fn open(&self) -> BoxFuture<'_, io::Result<(HostReader, HostWriter)>> {
        Box::pin(async move {
            let stream = TcpStream::connect(&self.address).await?;
            stream.set_nodelay(true)?;
            let (read_half, write_half) = stream.into_split();
            Ok((Box::new(read_half) as HostReader, Box::new(write_half) as HostWriter))
        })
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.address)
    }
}

/// No host at all. Every connection attempt fails, which puts the bridge in
/// mock mode.
pub struct NoHost;

impl Transport for NoHost {
    fn open(&self) -> BoxFuture<'_, io::Result<(HostReader, HostWriter)>> {
        Box::pin(async {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no host transport configured",
            ))
        })
    }

    fn describe(&self) -> String {
        "none".to_string()
    }
}

struct PendingRequest {
    id: u64,
    payload: String,
    reply: oneshot::Sender<Result<Value, BridgeError>>,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, BridgeError>>>>>;

#[derive(Default)]
struct Subscribers {
    signals: HashMap<String, Vec<SignalHandler>>,
    commands: Vec<CommandHandler>,
}

type SharedSubscribers = Arc<StdMutex<Subscribers>>;

/// Live connection to the host
struct Link {
    tx: mpsc::Sender<PendingRequest>,
    pending: PendingMap,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for Link {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Link {
    fn start(reader: HostReader, writer: HostWriter, subscribers: SharedSubscribers) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<PendingRequest>(64);

        let writer = tokio::spawn(writer_task(writer, rx, pending.clone()));
        let reader = tokio::spawn(reader_task(
            BufReader::new(reader),
            pending.clone(),
            subscribers,
            closed.clone(),
        ));

        Self {
            tx,
            pending,
            next_id: AtomicU64::new(1),
            closed,
            tasks: vec![writer, reader],
        }
    }

    async fn call(
        &self,
        method: &str,
        params: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value, BridgeError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BridgeError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = Request::new(id, method, params).encode()?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                id,
                payload,
                reply: reply_tx,
            })
            .await
            .map_err(|_| BridgeError::Closed)?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(reply) => reply.map_err(|_| BridgeError::Closed)?,
            Err(_) => {
                // A late reply is logged as unknown by the reader
                self.pending.lock().await.remove(&id);
                Err(BridgeError::Timeout(id))
            }
        }
    }
}

/// Single connection to the host, established at most once.
pub struct HostChannel {
    transport: Box<dyn Transport>,
    connect_timeout: Duration,
    request_timeout: Duration,
    link: OnceCell<Option<Link>>,
    subscribers: SharedSubscribers,
}

impl HostChannel {
    pub fn new(
        transport: Box<dyn Transport>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            connect_timeout,
            request_timeout,
            link: OnceCell::new(),
            subscribers: Arc::new(StdMutex::new(Subscribers::default())),
        }
    }

    /// Attempt the handshake if nobody has yet. Concurrent callers share the
    /// same attempt. Returns whether the host is reachable.
    pub async fn connect(&self) -> bool {
        self.link().await.is_some()
    }

    /// Whether a previous `connect()` reached the host
    pub fn is_connected(&self) -> bool {
        matches!(self.link.get(), Some(Some(link)) if !link.closed.load(Ordering::Acquire))
    }

    async fn link(&self) -> Option<&Link> {
        self.link.get_or_init(|| self.establish()).await.as_ref()
    }

    async fn establish(&self) -> Option<Link> {
        let endpoint = self.transport.describe();
        debug!("Connecting to host at {}", endpoint);

        match tokio::time::timeout(self.connect_timeout, self.handshake()).await {
            Ok(Ok(link)) => {
                info!("Connected to host at {}", endpoint);
                Some(link)
            }
            Ok(Err(e)) => {
                warn!("Host unavailable at {} ({}); running in mock mode", endpoint, e);
                None
            }
            Err(_) => {
                warn!(
                    "Host at {} did not answer within {:?}; running in mock mode",
                    endpoint, self.connect_timeout
                );
                None
            }
        }
    }

    async fn handshake(&self) -> Result<Link, BridgeError> {
        let (reader, writer) = self.transport.open().await?;
        let link = Link::start(reader, writer, self.subscribers.clone());

        let hello = link.call(HELLO, Vec::new(), self.connect_timeout).await?;
        let version = hello
            .get("protocol")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok());
        if version != Some(PROTOCOL_VERSION) {
            return Err(BridgeError::ProtocolMismatch {
                expected: PROTOCOL_VERSION,
                actual: hello.get("protocol").cloned().unwrap_or(Value::Null).to_string(),
            });
        }

        Ok(link)
    }

    /// Call a host method. Fails with `TransportUnavailable` in mock mode.
    pub async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, BridgeError> {
        let Some(link) = self.link().await else {
            return Err(BridgeError::TransportUnavailable);
        };
        link.call(method, params, self.request_timeout).await
    }

    #[cfg(test)]
    pub(crate) async fn pending_requests(&self) -> usize {
        match self.link.get() {
            Some(Some(link)) => link.pending.lock().await.len(),
            _ => 0,
        }
    }

    /// Register a handler for a named signal. Handlers run on the reader task
    /// in the order signals arrive and must not block.
    pub fn subscribe(&self, signal: &str, handler: SignalHandler) {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subs.signals
            .entry(signal.to_string())
            .or_default()
            .push(handler);
    }

    /// Register a handler for inbound host commands
    pub fn subscribe_commands(&self, handler: CommandHandler) {
        let mut subs = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subs.commands.push(handler);
    }
}

fn signal_handlers(subscribers: &SharedSubscribers, signal: &str) -> Vec<SignalHandler> {
    let subs = subscribers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    subs.signals.get(signal).cloned().unwrap_or_default()
}

fn command_handlers(subscribers: &SharedSubscribers) -> Vec<CommandHandler> {
    let subs = subscribers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    subs.commands.clone()
}

async fn fail_pending(pending: &PendingMap) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(BridgeError::Closed));
    }
}

// ── reader task ───────────────────────────────────────────────────────────────

async fn reader_task(
    mut reader: BufReader<HostReader>,
    pending: PendingMap,
    subscribers: SharedSubscribers,
    closed: Arc<AtomicBool>,
) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("host reader: connection closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let frame = match Inbound::decode(trimmed) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("host reader: dropping malformed frame '{}': {}", trimmed, e);
                        continue;
                    }
                };

                match frame {
                    Inbound::Response { id, result, error } => {
                        let mut map = pending.lock().await;
                        if let Some(tx) = map.remove(&id) {
                            let reply = match error {
                                Some(message) => {
                                    debug!("host reader: response id={} err={}", id, message);
                                    Err(BridgeError::OperationFailed(message))
                                }
                                None => Ok(result.unwrap_or(Value::Null)),
                            };
                            let _ = tx.send(reply);
                        } else {
                            debug!("host reader: response for unknown id={}", id);
                        }
                    }
                    Inbound::Signal { signal, args } => {
                        debug!("host reader: signal {}", signal);
                        for handler in signal_handlers(&subscribers, &signal) {
                            handler(&args);
                        }
                    }
                    Inbound::Command { command, args } => {
                        debug!("host reader: command {}", command);
                        for handler in command_handlers(&subscribers) {
                            handler(&command, &args);
                        }
                    }
                }
            }
            Err(e) => {
                warn!("host reader: read error: {}", e);
                break;
            }
        }
    }

    closed.store(true, Ordering::Release);
    fail_pending(&pending).await;
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task(
    mut writer: HostWriter,
    mut rx: mpsc::Receiver<PendingRequest>,
    pending: PendingMap,
) {
    while let Some(req) = rx.recv().await {
        if req.reply.is_closed() {
            debug!("host writer: caller gave up on id={}, not sending", req.id);
            continue;
        }
        // Register before writing so the reader can always match the reply
        {
            let mut map = pending.lock().await;
            map.insert(req.id, req.reply);
        }
        debug!("host writer: send id={} payload={}", req.id, req.payload.trim());

        let written = match writer.write_all(req.payload.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("host writer: write error: {}", e);
            let mut map = pending.lock().await;
            if let Some(tx) = map.remove(&req.id) {
                let _ = tx.send(Err(BridgeError::Io(e)));
            }
            break;
        }
    }
    debug!("host writer: task exiting");
}

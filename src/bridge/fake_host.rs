//! Scripted in-memory host for tests.
//!
//! Speaks the real wire protocol over a `tokio::io::duplex` pipe, so the
//! channel, bridge and controllers are exercised end to end without a socket.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;

use super::channel::{HostChannel, HostReader, HostWriter, Transport};
use super::protocol::{Request, HELLO, PROTOCOL_VERSION};

#[derive(Clone)]
enum Reply {
    Value(Value),
    Error(String),
    Hang,
}

/// What the fake host answers
#[derive(Clone)]
pub struct HostScript {
    replies: HashMap<String, Reply>,
    side_effects: HashMap<String, Vec<(String, Vec<Value>)>>,
    protocol: Value,
    silent: bool,
}

impl Default for HostScript {
    fn default() -> Self {
        Self {
            replies: HashMap::new(),
            side_effects: HashMap::new(),
            protocol: json!(PROTOCOL_VERSION),
            silent: false,
        }
    }
}

impl HostScript {
    pub fn reply(mut self, method: &str, value: Value) -> Self {
        self.replies.insert(method.to_string(), Reply::Value(value));
        self
    }

    pub fn fail(mut self, method: &str, message: &str) -> Self {
        self.replies
            .insert(method.to_string(), Reply::Error(message.to_string()));
        self
    }

    /// Never answer this method
    pub fn hang(mut self, method: &str) -> Self {
        self.replies.insert(method.to_string(), Reply::Hang);
        self
    }

    /// Emit a signal before answering this method
    pub fn emit_on(mut self, method: &str, signal: &str, args: Vec<Value>) -> Self {
        self.side_effects
            .entry(method.to_string())
            .or_default()
            .push((signal.to_string(), args));
        self
    }

    /// Answer the handshake with a different protocol version
    pub fn protocol(self, version: u32) -> Self {
        self.protocol_value(json!(version))
    }

    /// Answer the handshake with an arbitrary `protocol` value
    pub fn protocol_value(mut self, value: Value) -> Self {
        self.protocol = value;
        self
    }

    /// Accept the connection but never answer anything
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

enum Outbound {
    Line(String),
    Close,
}

struct Shared {
    script: HostScript,
    connections: AtomicUsize,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

pub struct FakeHost {
    shared: Arc<Shared>,
}

struct FakeTransport {
    shared: Arc<Shared>,
}

impl Transport for FakeTransport {
    fn open(&self) -> BoxFuture<'_, io::Result<(HostReader, HostWriter)>> {
        Box::pin(async move {
            let (client, server) = tokio::io::duplex(64 * 1024);
            self.shared.connections.fetch_add(1, Ordering::SeqCst);

            let (tx, rx) = mpsc::unbounded_channel();
            *self.shared.outbound.lock().unwrap() = Some(tx);
            tokio::spawn(serve(server, self.shared.clone(), rx));

            let (read_half, write_half) = tokio::io::split(client);
            Ok((Box::new(read_half) as HostReader, Box::new(write_half) as HostWriter))
        })
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}

impl FakeHost {
    pub fn start(script: HostScript) -> Self {
        Self {
            shared: Arc::new(Shared {
                script,
                connections: AtomicUsize::new(0),
                outbound: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn transport(&self) -> Box<dyn Transport> {
        Box::new(FakeTransport {
            shared: self.shared.clone(),
        })
    }

    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Methods called so far, excluding the handshake and `ping`
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn called(&self, method: &str) -> bool {
        self.calls().iter().any(|(m, _)| m == method)
    }

    fn send(&self, outbound: Outbound) {
        if let Some(tx) = self.shared.outbound.lock().unwrap().as_ref() {
            let _ = tx.send(outbound);
        }
    }

    pub async fn emit(&self, signal: &str, args: Vec<Value>) {
        self.send(Outbound::Line(signal_line(signal, args)));
    }

    pub async fn command(&self, command: &str, args: Vec<Value>) {
        let line = json!({ "command": command, "args": args }).to_string();
        self.send(Outbound::Line(line));
    }

    pub async fn disconnect(&self) {
        self.send(Outbound::Close);
    }

    /// Round-trip a request so every frame emitted before this call has been
    /// dispatched by the channel's reader
    pub async fn settle(&self, channel: &HostChannel) {
        let _ = channel.request("ping", Vec::new()).await;
    }
}

fn signal_line(signal: &str, args: Vec<Value>) -> String {
    json!({ "signal": signal, "args": args }).to_string()
}

async fn serve(
    stream: DuplexStream,
    shared: Arc<Shared>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let mut out = Vec::new();
        tokio::select! {
            biased;
            msg = outbound.recv() => match msg {
                Some(Outbound::Line(line)) => out.push(line),
                Some(Outbound::Close) | None => return,
            },
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { return };
                let Ok(req) = serde_json::from_str::<Request>(&line) else { continue };
                if shared.script.silent {
                    continue;
                }
                out.extend(answer(&shared, req));
            }
        }

        for line in out {
            if write_half.write_all(format!("{}\n", line).as_bytes()).await.is_err() {
                return;
            }
        }
    }
}

fn answer(shared: &Shared, req: Request) -> Vec<String> {
    if req.method == HELLO {
        let hello = json!({ "id": req.id, "result": { "protocol": shared.script.protocol } });
        return vec![hello.to_string()];
    }
    if req.method != "ping" {
        shared
            .calls
            .lock()
            .unwrap()
            .push((req.method.clone(), req.params.clone()));
    }

    let mut out: Vec<String> = shared
        .script
        .side_effects
        .get(&req.method)
        .into_iter()
        .flatten()
        .map(|(signal, args)| signal_line(signal, args.clone()))
        .collect();

    match shared.script.replies.get(&req.method) {
        Some(Reply::Value(value)) => out.push(json!({ "id": req.id, "result": value }).to_string()),
        Some(Reply::Error(message)) => {
            out.push(json!({ "id": req.id, "error": message }).to_string())
        }
        Some(Reply::Hang) => {}
        None => out.push(json!({ "id": req.id, "result": null }).to_string()),
    }
    out
}

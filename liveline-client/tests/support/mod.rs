//! Shared test support: a scripted in-memory network, a provider bundle
//! built around it, and small helpers for driving the client on a local
//! single-threaded runtime.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use liveline_client::{
    encode_frame, try_decode_frame, ClientConfig, EventKind, LifecycleEvent, Operation,
    RealtimeClient,
};
use liveline_core::{
    JsonCodec, NetworkProvider, Providers, TcpListenerTrait, TokioTaskProvider, TokioTimeProvider,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// What the next connect against an endpoint should do.
pub enum ConnectOutcome {
    /// Hand out a working in-memory stream.
    Accept,
    /// Fail with connection refused.
    Refuse,
    /// Never resolve, to exercise connect timeouts.
    Hang,
}

/// Scripted network: each endpoint has a queue of connect outcomes; once
/// the queue is empty further connects are accepted. Every attempt is
/// recorded in order.
#[derive(Clone, Default)]
pub struct ScriptedNetwork {
    inner: Rc<RefCell<ScriptInner>>,
}

#[derive(Default)]
struct ScriptInner {
    scripts: HashMap<String, VecDeque<ConnectOutcome>>,
    attempts: Vec<String>,
    accepted: Vec<ServerConn>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue connect outcomes for an endpoint.
    pub fn script(&self, endpoint: &str, outcomes: Vec<ConnectOutcome>) {
        self.inner
            .borrow_mut()
            .scripts
            .entry(endpoint.to_string())
            .or_default()
            .extend(outcomes);
    }

    /// Every connect attempt so far, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.inner.borrow().attempts.clone()
    }

    /// Wait for the next accepted connection's server half.
    pub async fn next_accepted(&self) -> ServerConn {
        loop {
            let conn = {
                let mut inner = self.inner.borrow_mut();
                if inner.accepted.is_empty() {
                    None
                } else {
                    Some(inner.accepted.remove(0))
                }
            };
            if let Some(conn) = conn {
                return conn;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}

/// Server half of an accepted in-memory connection.
pub struct ServerConn {
    pub endpoint: String,
    stream: DuplexStream,
    buf: Vec<u8>,
}

impl ServerConn {
    /// Read and decode the next operation frame from the client.
    pub async fn read_op(&mut self) -> Option<Operation> {
        let codec = JsonCodec;
        loop {
            match try_decode_frame(&codec, &self.buf) {
                Ok(Some((op, consumed))) => {
                    self.buf.drain(..consumed);
                    return Some(op);
                }
                Ok(None) => {}
                Err(_) => return None,
            }
            let mut chunk = vec![0u8; 1024];
            match self.stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return None,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Read exactly `count` operations (or fewer if the stream ends).
    pub async fn read_ops(&mut self, count: usize) -> Vec<Operation> {
        let mut ops = Vec::new();
        for _ in 0..count {
            match self.read_op().await {
                Some(op) => ops.push(op),
                None => break,
            }
        }
        ops
    }

    /// Push a server-side operation frame to the client.
    pub async fn write_op(&mut self, op: &Operation) {
        let frame = encode_frame(&JsonCodec, op).expect("frame should encode");
        self.stream
            .write_all(&frame)
            .await
            .expect("server write should succeed");
    }
}

/// Listener stub; the scripted network only supports outbound connects.
pub struct ScriptedListener;

#[async_trait(?Send)]
impl TcpListenerTrait for ScriptedListener {
    type TcpStream = DuplexStream;

    async fn accept(&self) -> io::Result<(DuplexStream, String)> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "scripted network has no listeners",
        ))
    }

    fn local_addr(&self) -> io::Result<String> {
        Ok("scripted".to_string())
    }
}

#[async_trait(?Send)]
impl NetworkProvider for ScriptedNetwork {
    type TcpStream = DuplexStream;
    type TcpListener = ScriptedListener;

    async fn bind(&self, _addr: &str) -> io::Result<ScriptedListener> {
        Ok(ScriptedListener)
    }

    async fn connect(&self, addr: &str) -> io::Result<DuplexStream> {
        enum Action {
            Accept,
            Refuse,
            Hang,
        }
        let action = {
            let mut inner = self.inner.borrow_mut();
            inner.attempts.push(addr.to_string());
            match inner.scripts.get_mut(addr).and_then(VecDeque::pop_front) {
                Some(ConnectOutcome::Refuse) => Action::Refuse,
                Some(ConnectOutcome::Hang) => Action::Hang,
                Some(ConnectOutcome::Accept) | None => Action::Accept,
            }
        };
        match action {
            Action::Refuse => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted refusal",
            )),
            Action::Hang => std::future::pending().await,
            Action::Accept => {
                let (client_end, server_end) = tokio::io::duplex(64 * 1024);
                self.inner.borrow_mut().accepted.push(ServerConn {
                    endpoint: addr.to_string(),
                    stream: server_end,
                    buf: Vec::new(),
                });
                Ok(client_end)
            }
        }
    }
}

/// Provider bundle wiring the scripted network to real time and tasks.
#[derive(Clone)]
pub struct TestProviders {
    network: ScriptedNetwork,
    time: TokioTimeProvider,
    task: TokioTaskProvider,
}

impl TestProviders {
    pub fn new(network: ScriptedNetwork) -> Self {
        Self {
            network,
            time: TokioTimeProvider::new(),
            task: TokioTaskProvider,
        }
    }
}

impl Providers for TestProviders {
    type Network = ScriptedNetwork;
    type Time = TokioTimeProvider;
    type Task = TokioTaskProvider;

    fn network(&self) -> &Self::Network {
        &self.network
    }

    fn time(&self) -> &Self::Time {
        &self.time
    }

    fn task(&self) -> &Self::Task {
        &self.task
    }
}

/// Client configuration with short timings suitable for tests.
pub fn test_config(endpoints: &[&str]) -> ClientConfig {
    ClientConfig {
        endpoints: endpoints.iter().map(|s| s.to_string()).collect(),
        rotation_threshold: 2,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(40),
        connection_timeout: Duration::from_millis(100),
        redial_delay: Duration::from_millis(5),
        restart_cooldown: Duration::from_millis(25),
        // Long enough to stay out of the way unless a test shortens it.
        liveness_interval: Duration::from_millis(500),
        max_queue_size: 100,
    }
}

/// Recorded lifecycle events for assertions.
pub struct EventLog {
    events: Rc<RefCell<Vec<LifecycleEvent>>>,
}

impl EventLog {
    /// Subscribe to every event kind on the client.
    pub fn attach(client: &RealtimeClient) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::Connected,
            EventKind::Reconnected,
            EventKind::Disconnected,
            EventKind::ConnectFailed,
        ] {
            let sink = Rc::clone(&events);
            client.on(kind, move |event| sink.borrow_mut().push(event.clone()));
        }
        Self { events }
    }

    pub fn snapshot(&self) -> Vec<LifecycleEvent> {
        self.events.borrow().clone()
    }

    pub fn contains(&self, event: &LifecycleEvent) -> bool {
        self.events.borrow().iter().any(|e| e == event)
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.borrow().iter().filter(|e| e.kind() == kind).count()
    }
}

/// Poll a condition until it holds or the timeout expires.
pub async fn eventually<F: FnMut() -> bool>(mut cond: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    cond()
}

/// Install a tracing subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Run a future on a current-thread runtime inside a `LocalSet`, which the
/// client's spawn_local-based tasks require.
pub fn run_local<F: Future>(future: F) -> F::Output {
    init_tracing();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build current-thread runtime");
    let local = tokio::task::LocalSet::new();
    rt.block_on(local.run_until(future))
}

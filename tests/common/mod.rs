//! Shared plumbing for the integration tests.
//!
//! Provides the demo protocol, a TCP test server, connectors for the TCP
//! and loopback transports, and small helpers for asserting on published
//! state sequences.
#![allow(dead_code, reason = "each test binary uses a subset of these helpers")]

pub mod proto;
pub mod server;

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use hawser::{
    ClientState,
    ConnectionParameters,
    Connector,
    Login,
    LoopbackPeer,
    LoopbackTransport,
    Message,
    StateStream,
    TcpTransport,
    TcpTransportConfig,
    Transport,
    TransportError,
};

use proto::DemoMessage;
use server::GOOD_PASSWORD;

/// Connection parameters for the demo protocol.
#[derive(Clone, Debug)]
pub struct DemoParams {
    pub addr: SocketAddr,
    pub user: String,
    pub password: String,
    pub connect_timeout: Duration,
}

impl DemoParams {
    pub fn new(addr: SocketAddr, user: &str, password: &str) -> Self {
        Self {
            addr,
            user: user.to_owned(),
            password: password.to_owned(),
            connect_timeout: Duration::from_secs(1),
        }
    }
}

impl ConnectionParameters for DemoParams {
    fn connect_timeout(&self) -> Duration { self.connect_timeout }
}

/// Connector opening framed TCP transports to a demo server.
pub struct TcpDemoConnector {
    config: TcpTransportConfig,
}

impl TcpDemoConnector {
    pub fn new(config: TcpTransportConfig) -> Self { Self { config } }
}

impl Default for TcpDemoConnector {
    fn default() -> Self { Self::new(TcpTransportConfig::default()) }
}

#[async_trait]
impl Connector for TcpDemoConnector {
    type Message = DemoMessage;
    type Params = DemoParams;

    async fn open(
        &self,
        params: &DemoParams,
    ) -> Result<Arc<dyn Transport<DemoMessage>>, TransportError> {
        let transport = TcpTransport::connect(params.addr, self.config).await?;
        Ok(Arc::new(transport))
    }

    fn login_message(&self, params: &DemoParams) -> DemoMessage {
        DemoMessage::login(&params.user, &params.password)
    }

    fn classify(&self, response: &DemoMessage) -> Login {
        match response {
            DemoMessage::LoginOk { .. } => Login::Accepted,
            _ => Login::Rejected,
        }
    }
}

/// Connector opening in-process loopback transports, each served by a
/// spawned task speaking the demo protocol.
///
/// The loopback server understands one extra convention: a `Hello` whose
/// text is `"stage:N"` pushes `N` uncorrelated events *before* sending
/// the correlated response, which lets tests stage out-of-order traffic
/// deterministically.
pub struct LoopbackDemoConnector {
    receive_queue_capacity: usize,
}

impl LoopbackDemoConnector {
    pub fn new(receive_queue_capacity: usize) -> Self { Self { receive_queue_capacity } }
}

#[async_trait]
impl Connector for LoopbackDemoConnector {
    type Message = DemoMessage;
    type Params = DemoParams;

    async fn open(
        &self,
        _params: &DemoParams,
    ) -> Result<Arc<dyn Transport<DemoMessage>>, TransportError> {
        let (transport, peer) = LoopbackTransport::pair(self.receive_queue_capacity);
        tokio::spawn(serve_loopback(peer));
        Ok(Arc::new(transport))
    }

    fn login_message(&self, params: &DemoParams) -> DemoMessage {
        DemoMessage::login(&params.user, &params.password)
    }

    fn classify(&self, response: &DemoMessage) -> Login {
        match response {
            DemoMessage::LoginOk { .. } => Login::Accepted,
            _ => Login::Rejected,
        }
    }
}

/// Every transport a [`RecordingLoopbackConnector`] has opened, shared
/// with the test so teardown can be asserted after the fact.
pub type OpenedTransports = Arc<Mutex<Vec<Arc<dyn Transport<DemoMessage>>>>>;

/// A [`LoopbackDemoConnector`] that records every transport it opens.
pub struct RecordingLoopbackConnector {
    inner: LoopbackDemoConnector,
    opened: OpenedTransports,
}

impl RecordingLoopbackConnector {
    pub fn new(receive_queue_capacity: usize) -> (Self, OpenedTransports) {
        let opened: OpenedTransports = Arc::new(Mutex::new(Vec::new()));
        let connector = Self {
            inner: LoopbackDemoConnector::new(receive_queue_capacity),
            opened: Arc::clone(&opened),
        };
        (connector, opened)
    }
}

#[async_trait]
impl Connector for RecordingLoopbackConnector {
    type Message = DemoMessage;
    type Params = DemoParams;

    async fn open(
        &self,
        params: &DemoParams,
    ) -> Result<Arc<dyn Transport<DemoMessage>>, TransportError> {
        let transport = self.inner.open(params).await?;
        self.opened
            .lock()
            .expect("opened transports")
            .push(Arc::clone(&transport));
        Ok(transport)
    }

    fn login_message(&self, params: &DemoParams) -> DemoMessage {
        self.inner.login_message(params)
    }

    fn classify(&self, response: &DemoMessage) -> Login { self.inner.classify(response) }
}

async fn serve_loopback(mut peer: LoopbackPeer<DemoMessage>) {
    let Some(login) = peer.recv().await else {
        return;
    };
    match &login {
        DemoMessage::Login { password, .. } if password == GOOD_PASSWORD => {
            peer.send(DemoMessage::login_ok(login.message_id()));
        }
        _ => {
            peer.send(DemoMessage::login_refused(login.message_id(), "bad credentials"));
            return;
        }
    }

    while let Some(request) = peer.recv().await {
        let DemoMessage::Hello { id, text } = &request else {
            continue;
        };
        if let Some(staged) = text
            .strip_prefix("stage:")
            .and_then(|n| n.parse::<usize>().ok())
        {
            for n in 0..staged {
                peer.send(DemoMessage::event(&format!("staged event {n}")));
            }
        }
        peer.send(DemoMessage::hello_ok(*id));
    }
}

/// Drain every state already published to `stream`, as short names.
pub fn drain_state_names(stream: &mut StateStream<DemoMessage, DemoParams>) -> Vec<&'static str> {
    let mut names = Vec::new();
    while let Some(state) = stream.try_recv() {
        names.push(state.name());
    }
    names
}

/// Shorthand for asserting on a state snapshot.
pub fn state_name(state: &ClientState<DemoMessage, DemoParams>) -> &'static str { state.name() }

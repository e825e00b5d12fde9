#![doc(html_root_url = "https://docs.rs/hawser/latest")]
//! Transport-agnostic RPC client runtime.
//!
//! `hawser` gives unrelated RPC client implementations one look and feel:
//! a uniform connection lifecycle, a correlated request/response protocol,
//! and an observable stream of lifecycle states, layered over a pluggable
//! byte-level transport.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Client                                      │
//! │  lifecycle state machine + state publisher  │
//! ├─────────────────────────────────────────────┤
//! │ Handler: Disconnected | Connected           │
//! │  login negotiation / transport delegation   │
//! ├─────────────────────────────────────────────┤
//! │ Transport (plug-in)                         │
//! │  receive · send · send_and_forget           │
//! │  send_and_wait + bounded correlation queue  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! A protocol plugs in by implementing [`Connector`]: how to open a
//! transport from its [`ConnectionParameters`], what the login message is,
//! and how to recognise the server's verdict. Everything else — the
//! `connect`/`disconnect`/`close` state machine, the published state
//! sequence, the correlation of responses to requests — is provided here
//! and behaves identically across transports.
//!
//! Two reference transports ship with the crate: [`TcpTransport`]
//! (length-delimited frames, a dedicated reader task, and an
//! outstanding-request map for correlation) and [`LoopbackTransport`]
//! (an in-process duplex pair for tests and embedded servers).

pub mod client;
pub mod connector;
pub mod error;
pub mod handler;
pub mod message;
pub mod transport;

pub use client::{Client, ClientConfig, ClientState, ConnectFailure, ConnectResult, StateStream};
pub use connector::{ConnectionParameters, Connector, Login};
pub use error::{ClientError, TransportError};
pub use handler::{ConnectedHandler, DisconnectedHandler, Handler, HandlerConnect};
pub use message::{Message, MessageId, WireMessage};
pub use transport::{
    LoopbackPeer,
    LoopbackTransport,
    OutstandingRequests,
    ReadOutcome,
    ReceiveQueue,
    TcpTransport,
    TcpTransportConfig,
    Transport,
};

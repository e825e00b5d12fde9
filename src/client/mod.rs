//! The public client facade.
//!
//! [`Client`] owns the current handler, runs the lifecycle state machine,
//! and publishes every transition on a hot [`StateStream`].

mod publisher;
mod runtime;
mod state;

pub use publisher::StateStream;
pub use runtime::{Client, ClientConfig, ConnectResult};
pub use state::{ClientState, ConnectFailure};

//! Live updates over a single multiplexed connection
//!
//! - [`transport`]: how a connection is opened (WebSocket or in-process)
//! - [`multiplexer`]: topic registry, fan-out and reconnect loop
//! - [`subscription`]: scoped registrations with a swappable handler
//! - [`message`]: wire formats

pub mod message;
pub mod multiplexer;
pub mod subscription;
pub mod transport;

pub use message::{ControlMessage, InboundMessage, SessionEvent, SessionStub, SESSIONS_TOPIC};
pub use multiplexer::{Multiplexer, MultiplexerOptions, ReadyState, SubscriberId};
pub use subscription::{typed, Subscription};
pub use transport::{ChannelTransport, Transport, WsTransport};

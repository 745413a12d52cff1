// Core modules - one responsibility per file
pub mod channels; // Channel keys and builders
pub mod codec; // impl WsCodec (Socket.IO over WebSocket)
pub mod events; // fixed inbound event set
pub mod types; // closed wire enums

pub mod builder; // config -> REST client / stream supervisor
pub mod stream; // connection actor, subscriptions, event routing

pub use builder::{
    build_public_rest_client, build_rest_client, build_stream, build_stream_with_config,
    CoindcxStream, EXCHANGE_NAME,
};
pub use channels::{Channel, AUTHENTICATED_CHANNEL, ORDERBOOK_DEPTHS};
pub use codec::{HandshakeInfo, SocketIoCodec, SocketIoFrame};
pub use events::StreamEvent;
pub use stream::{
    ConnectionState, ConnectionSupervisor, EventHandler, EventRouter, HandlerId,
    SubscriptionManager,
};
pub use types::*;

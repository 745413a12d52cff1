pub mod core;
pub mod exchanges;

pub use crate::core::config::{Credentials, ExchangeConfig, StreamConfig};
pub use crate::core::errors::{ExchangeError, SubscriptionError};
pub use crate::core::kernel::{HmacSigner, ReqwestRest, RestClient, Signer};
pub use crate::exchanges::coindcx::{
    build_public_rest_client, build_rest_client, build_stream, build_stream_with_config, Channel,
    CoindcxStream, ConnectionState, ConnectionSupervisor, HandlerId, StreamEvent,
};

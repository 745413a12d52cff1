// Realtime stream engine
mod keepalive; // periodic ping, one task per connection
pub mod router; // event name -> handlers
pub mod state; // ConnectionState
pub mod subscriptions; // desired channel set, join/leave/replay
pub mod supervisor; // connection actor and its handle

pub use router::{EventHandler, EventRouter, HandlerId};
pub use state::ConnectionState;
pub use subscriptions::SubscriptionManager;
pub use supervisor::ConnectionSupervisor;

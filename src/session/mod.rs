pub mod bus;
pub mod countdown;
pub mod manager;
pub mod registry;

pub use bus::{EventBus, SessionEvent, Subscription};
pub use countdown::CountdownService;
pub use manager::{GameSessionManager, SessionGuard};
pub use registry::{ConnectionId, ConnectionRegistry, ConnectionSender};

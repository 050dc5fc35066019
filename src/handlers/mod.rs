pub mod rest;
pub mod ws;

pub use rest::{create_session_handler, get_session_handler};
pub use ws::websocket_handler;

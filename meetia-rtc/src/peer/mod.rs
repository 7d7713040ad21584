mod peer_connection;
mod peer_event;
mod peer_manager;
mod peer_state;
mod rtc_peer;

pub use peer_connection::*;
pub use peer_event::*;
pub use peer_manager::*;
pub use peer_state::*;
pub use rtc_peer::*;

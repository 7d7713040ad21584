mod connection_handle;
mod signal_transport;
mod transport_event;

pub use connection_handle::*;
pub use signal_transport::*;
pub use transport_event::*;

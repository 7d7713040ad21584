pub mod mock_relay;

pub use fake_peer::*;
pub use mock_relay::*;
pub use signal_helpers::*;

mod classify;
mod registry;
mod remote_track;

pub use classify::*;
pub use registry::*;
pub use remote_track::*;

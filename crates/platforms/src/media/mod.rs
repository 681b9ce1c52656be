pub mod live_status;
pub mod platform;

pub use live_status::{LiveDetails, LiveStatus, format_timestamp};
pub use platform::Platform;

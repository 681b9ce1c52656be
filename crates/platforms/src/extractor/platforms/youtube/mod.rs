mod builder;
mod candidates;
pub mod detect;
mod resolver;

pub use builder::{BASE_URL, YouTube, channel_url, watch_url};
pub use candidates::build_live_page_candidates;
pub use detect::detect_live;
pub use resolver::{CHANNEL_ID_REGEX, ChannelResolver, is_channel_id};

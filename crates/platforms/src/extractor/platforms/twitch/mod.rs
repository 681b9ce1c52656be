mod builder;
mod models;

pub use builder::{BASE_URL, CLIENT_ID, GQL_API_URL, Twitch, URL_REGEX, normalize_login};

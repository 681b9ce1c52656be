pub mod error;
pub mod factory;
pub mod platforms;
pub mod status_fetcher;
pub mod utils;

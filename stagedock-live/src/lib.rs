//! StageDock live status synchronization.
//!
//! [`monitor::LiveMonitor`] polls every tracked creator on a timer, persists
//! the normalized status through a [`store::CreatorStore`], and publishes
//! went-live transitions that [`notification::NotificationService`] fans out
//! to the configured notifiers.

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod store;

pub use error::{Error, Result};

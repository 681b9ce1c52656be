//! Live monitor.
//!
//! Periodically fetches the live status of every tracked creator, persists
//! it, and emits events on live transitions.

mod events;
mod service;
mod state;

pub use events::{LiveTransition, MonitorEvent, MonitorEventBroadcaster, TickReport};
pub use service::LiveMonitor;
pub use state::{Transition, TransitionTracker};

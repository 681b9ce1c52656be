//! Monitor events for the notification system.
//!
//! Events are emitted by the [`LiveMonitor`](super::LiveMonitor) and consumed
//! by the [`NotificationService`](crate::notification::NotificationService)
//! or any other subscriber.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagedock_platforms::Platform;
use tokio::sync::broadcast;

/// A notifiable offline-to-live edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveTransition {
    pub creator_id: String,
    pub display_name: String,
    pub platform: Platform,
    /// Stream URL, or the creator's live channel page when none was reported.
    pub url: String,
    pub title: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LiveTransition {
    pub fn platform_label(&self) -> &'static str {
        self.platform.label()
    }
}

/// Outcome counters of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick sequence number, starting at 1.
    pub tick: u64,
    /// Creators processed.
    pub checked: usize,
    /// Creators whose status was written to the store.
    pub updated: usize,
    /// Creators whose status was unavailable this tick.
    pub skipped: usize,
    /// Creators that failed (unsupported platform, store error, panic).
    pub failed: usize,
    /// Notifiable transitions detected this tick.
    pub transitions: Vec<LiveTransition>,
}

impl TickReport {
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }
}

/// Events emitted by the live monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MonitorEvent {
    /// Creator went live and has notifications enabled.
    WentLive(LiveTransition),
    /// Creator went offline.
    WentOffline {
        creator_id: String,
        display_name: String,
        platform: Platform,
        timestamp: DateTime<Utc>,
    },
    /// A tick finished.
    TickCompleted(TickReport),
}

impl MonitorEvent {
    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            MonitorEvent::WentLive(transition) => match &transition.title {
                Some(title) => format!(
                    "{} is live on {}: {}",
                    transition.display_name,
                    transition.platform_label(),
                    title
                ),
                None => format!(
                    "{} is live on {}",
                    transition.display_name,
                    transition.platform_label()
                ),
            },
            MonitorEvent::WentOffline {
                display_name,
                platform,
                ..
            } => {
                format!("{} went offline on {}", display_name, platform.label())
            }
            MonitorEvent::TickCompleted(report) => format!(
                "tick {}: {} checked, {} updated, {} skipped, {} failed",
                report.tick, report.checked, report.updated, report.skipped, report.failed
            ),
        }
    }

    /// Check if this event should trigger a notification.
    pub fn should_notify(&self) -> bool {
        matches!(self, MonitorEvent::WentLive(_))
    }
}

/// Broadcaster for monitor events.
pub struct MonitorEventBroadcaster {
    sender: broadcast::Sender<MonitorEvent>,
}

impl MonitorEventBroadcaster {
    /// Create a new broadcaster with default capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new broadcaster with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to monitor events.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    /// Publish a monitor event.
    pub fn publish(
        &self,
        event: MonitorEvent,
    ) -> Result<usize, broadcast::error::SendError<MonitorEvent>> {
        self.sender.send(event)
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MonitorEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MonitorEventBroadcaster {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

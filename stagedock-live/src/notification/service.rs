//! Notification service: routes went-live transitions to every notifier.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Notifier;
use crate::monitor::{LiveTransition, MonitorEvent, TickReport};

/// Fans went-live transitions out to the registered notifiers.
pub struct NotificationService {
    notifiers: Vec<Arc<dyn Notifier>>,
    cancellation_token: CancellationToken,
}

impl NotificationService {
    pub fn new() -> Self {
        Self {
            notifiers: Vec::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.add_notifier(notifier);
        self
    }

    pub fn add_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        info!(channel = notifier.channel_type(), "Registered notification channel");
        self.notifiers.push(notifier);
    }

    pub fn notifier_count(&self) -> usize {
        self.notifiers.len()
    }

    /// Deliver one transition to every notifier concurrently.
    ///
    /// Returns how many notifiers succeeded; failures are logged.
    pub async fn dispatch(&self, transition: &LiveTransition) -> usize {
        let platform_label = transition.platform_label();
        let sends = self.notifiers.iter().map(|notifier| async move {
            let result = notifier
                .notify_went_live(&transition.display_name, platform_label, &transition.url)
                .await;
            (notifier.channel_type(), result)
        });

        let mut delivered = 0;
        for (channel, result) in join_all(sends).await {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    channel,
                    creator_id = %transition.creator_id,
                    error = %e,
                    "Failed to deliver went-live notification"
                ),
            }
        }

        debug!(
            creator_id = %transition.creator_id,
            delivered,
            total = self.notifiers.len(),
            "Dispatched went-live notification"
        );
        delivered
    }

    /// Deliver every transition of a tick report.
    pub async fn dispatch_report(&self, report: &TickReport) {
        for transition in &report.transitions {
            self.dispatch(transition).await;
        }
    }

    /// Listen for monitor events until stopped or the channel closes.
    ///
    /// On stop, events already buffered in `rx` are still dispatched, and the
    /// returned handle completes only after every dispatch has finished.
    pub fn start(self: &Arc<Self>, mut rx: broadcast::Receiver<MonitorEvent>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let cancellation_token = service.cancellation_token.clone();

        tokio::spawn(async move {
            let mut dispatches = JoinSet::new();
            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(event) => service.spawn_dispatch(&mut dispatches, event),
                                Err(TryRecvError::Lagged(n)) => {
                                    warn!("Monitor event listener lagged by {} events", n);
                                }
                                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                            }
                        }
                        debug!("Monitor event listener shutting down");
                        break;
                    }
                    Some(result) = dispatches.join_next(), if !dispatches.is_empty() => {
                        if let Err(e) = result {
                            warn!(error = %e, "Notification dispatch task failed");
                        }
                    }
                    result = rx.recv() => {
                        match result {
                            Ok(event) => service.spawn_dispatch(&mut dispatches, event),
                            Err(RecvError::Lagged(n)) => {
                                warn!("Monitor event listener lagged by {} events", n);
                            }
                            Err(RecvError::Closed) => {
                                debug!("Monitor event channel closed");
                                break;
                            }
                        }
                    }
                }
            }

            while let Some(result) = dispatches.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Notification dispatch task failed");
                }
            }
        })
    }

    fn spawn_dispatch(self: &Arc<Self>, dispatches: &mut JoinSet<()>, event: MonitorEvent) {
        if !event.should_notify() {
            return;
        }
        if let MonitorEvent::WentLive(transition) = event {
            let service = Arc::clone(self);
            dispatches.spawn(async move {
                service.dispatch(&transition).await;
            });
        }
    }

    /// Stop the event listener.
    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::monitor::MonitorEventBroadcaster;
    use async_trait::async_trait;
    use chrono::Utc;
    use stagedock_platforms::Platform;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingNotifier {
        calls: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn channel_type(&self) -> &'static str {
            "recording"
        }

        async fn notify_went_live(
            &self,
            display_name: &str,
            platform_label: &str,
            url: &str,
        ) -> Result<()> {
            self.calls.lock().unwrap().push((
                display_name.to_string(),
                platform_label.to_string(),
                url.to_string(),
            ));
            if self.fail {
                return Err(crate::Error::notification("boom"));
            }
            Ok(())
        }
    }

    fn transition() -> LiveTransition {
        LiveTransition {
            creator_id: "c1".to_string(),
            display_name: "Alice".to_string(),
            platform: Platform::Twitch,
            url: "https://www.twitch.tv/alice".to_string(),
            title: Some("Ranked Grind".to_string()),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_survives_failing_notifier() {
        let failing = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let ok = Arc::new(RecordingNotifier::default());
        let service = NotificationService::new()
            .with_notifier(failing.clone())
            .with_notifier(ok.clone());

        let delivered = service.dispatch(&transition()).await;

        assert_eq!(delivered, 1);
        assert_eq!(failing.calls.lock().unwrap().len(), 1);
        assert_eq!(
            ok.calls.lock().unwrap().as_slice(),
            &[(
                "Alice".to_string(),
                "Twitch".to_string(),
                "https://www.twitch.tv/alice".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_dispatch_report() {
        let ok = Arc::new(RecordingNotifier::default());
        let service = NotificationService::new().with_notifier(ok.clone());

        let mut report = TickReport::new(1);
        report.transitions.push(transition());
        service.dispatch_report(&report).await;
        service.dispatch_report(&TickReport::new(2)).await;

        assert_eq!(ok.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listener_dispatches_went_live_only() {
        let ok = Arc::new(RecordingNotifier::default());
        let service = Arc::new(NotificationService::new().with_notifier(ok.clone()));
        let broadcaster = MonitorEventBroadcaster::new();
        let handle = service.start(broadcaster.subscribe());

        broadcaster
            .publish(MonitorEvent::TickCompleted(TickReport::new(1)))
            .unwrap();
        broadcaster
            .publish(MonitorEvent::WentLive(transition()))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while ok.calls.lock().unwrap().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        service.stop();
        handle.await.unwrap();
        assert_eq!(ok.calls.lock().unwrap().len(), 1);
    }

    struct SlowNotifier {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for SlowNotifier {
        fn channel_type(&self) -> &'static str {
            "slow"
        }

        async fn notify_went_live(&self, display_name: &str, _: &str, _: &str) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.delivered.lock().unwrap().push(display_name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stop_flushes_buffered_and_in_flight_events() {
        let slow = Arc::new(SlowNotifier {
            delivered: Mutex::new(Vec::new()),
        });
        let service = Arc::new(NotificationService::new().with_notifier(slow.clone()));
        let broadcaster = MonitorEventBroadcaster::new();
        let handle = service.start(broadcaster.subscribe());

        for name in ["Alice", "Bob", "Carol"] {
            let mut went_live = transition();
            went_live.display_name = name.to_string();
            broadcaster.publish(MonitorEvent::WentLive(went_live)).unwrap();
        }
        // Stop before the listener has had a chance to run.
        service.stop();
        handle.await.unwrap();

        let mut delivered = slow.delivered.lock().unwrap().clone();
        delivered.sort();
        assert_eq!(delivered, vec!["Alice", "Bob", "Carol"]);
    }
}

//! Live monitor service implementation.
//!
//! The LiveMonitor polls every tracked creator once per tick, persists the
//! fetched status, and turns offline-to-live edges into notification events.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use stagedock_platforms::FetcherRegistry;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::MonitorConfig;
use crate::domain::TrackedCreator;
use crate::store::{CreatorStore, LiveStatusRecord};
use crate::{Error, Result};

use super::events::{LiveTransition, MonitorEvent, MonitorEventBroadcaster, TickReport};
use super::state::{Transition, TransitionTracker};

/// Result of syncing one creator.
enum SyncOutcome {
    /// Status persisted, with the notifiable transition if one fired.
    Updated(Option<LiveTransition>),
    /// Status unavailable, nothing persisted.
    Skipped,
}

struct MonitorInner<S: CreatorStore + 'static> {
    store: Arc<S>,
    fetchers: FetcherRegistry,
    tracker: TransitionTracker,
    event_broadcaster: MonitorEventBroadcaster,
    tick_counter: AtomicU64,
    config: MonitorConfig,
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The live monitor service.
pub struct LiveMonitor<S: CreatorStore + 'static> {
    inner: Arc<MonitorInner<S>>,
    running: Mutex<Option<RunningLoop>>,
}

impl<S: CreatorStore + 'static> LiveMonitor<S> {
    /// Create a new live monitor with the default configuration.
    pub fn new(store: Arc<S>, fetchers: FetcherRegistry) -> Result<Self> {
        Self::with_config(store, fetchers, MonitorConfig::default())
    }

    /// Create a new live monitor with custom configuration.
    ///
    /// Request rate limits are applied by the fetchers' transport, see
    /// [`MonitorConfig::fetcher_registry`].
    pub fn with_config(
        store: Arc<S>,
        fetchers: FetcherRegistry,
        config: MonitorConfig,
    ) -> Result<Self> {
        config.validate()?;

        let inner = MonitorInner {
            store,
            fetchers,
            tracker: TransitionTracker::new(),
            event_broadcaster: MonitorEventBroadcaster::with_capacity(config.event_capacity),
            tick_counter: AtomicU64::new(0),
            config,
        };

        Ok(Self {
            inner: Arc::new(inner),
            running: Mutex::new(None),
        })
    }

    /// Subscribe to monitor events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<MonitorEvent> {
        self.inner.event_broadcaster.subscribe()
    }

    pub fn event_broadcaster(&self) -> &MonitorEventBroadcaster {
        &self.inner.event_broadcaster
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Whether went-live notifications are currently held back.
    pub fn is_suppressed(&self) -> bool {
        self.inner.tracker.is_suppressed()
    }

    /// Last observed live flag for a creator.
    pub fn last_known_live(&self, creator_id: &str) -> Option<bool> {
        self.inner.tracker.previous(creator_id)
    }

    /// Drop the remembered state of a creator that is no longer tracked.
    pub fn forget_creator(&self, creator_id: &str) {
        self.inner.tracker.forget(creator_id);
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.cancel.is_cancelled() && !r.handle.is_finished())
    }

    /// Start the polling loop.
    ///
    /// The first tick runs immediately with went-live notifications
    /// suppressed, so creators already live at startup do not notify. Calling
    /// this while the loop is running does nothing.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if let Some(current) = running.as_ref()
            && !current.cancel.is_cancelled()
            && !current.handle.is_finished()
        {
            debug!("Live monitor already running");
            return;
        }

        let token = self.inner.tracker.suppress();
        let cancel = CancellationToken::new();
        let inner = Arc::clone(&self.inner);
        let loop_cancel = cancel.clone();
        let handle = tokio::spawn(async move { inner.run_loop(loop_cancel, token).await });

        info!(
            poll_interval = ?self.inner.config.poll_interval,
            "Live monitor started"
        );
        *running = Some(RunningLoop { cancel, handle });
    }

    /// Stop scheduling ticks. A tick already in flight runs to completion.
    pub fn stop(&self) {
        if let Some(current) = self.running.lock().as_ref() {
            current.cancel.cancel();
            info!("Live monitor stopping");
        }
    }

    /// Stop the loop and wait for an in-flight tick to finish.
    pub async fn shutdown(&self) {
        let current = self.running.lock().take();
        if let Some(RunningLoop { cancel, handle }) = current {
            cancel.cancel();
            if let Err(e) = handle.await {
                warn!(error = %e, "Live monitor loop ended abnormally");
            }
            info!("Live monitor stopped");
        }
    }

    /// Run a single tick over every tracked creator.
    pub async fn run_tick(&self) -> Result<TickReport> {
        self.inner.run_tick().await
    }
}

impl<S: CreatorStore + 'static> MonitorInner<S> {
    async fn run_loop(self: Arc<Self>, cancel: CancellationToken, suppression_token: u64) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut first_tick = true;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Live monitor loop cancelled");
                    break;
                }
                _ = interval.tick() => {}
            }

            if let Err(e) = self.run_tick().await {
                warn!(error = %e, "Tick failed");
            }

            if first_tick {
                first_tick = false;
                if self.tracker.release(suppression_token) {
                    debug!("Went-live notifications enabled");
                }
            }
        }
    }

    async fn run_tick(self: &Arc<Self>) -> Result<TickReport> {
        let tick = self.tick_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let creators = self.store.list_tracked_creators().await?;
        debug!(tick, count = creators.len(), "Starting tick");

        let (ids, handles): (Vec<_>, Vec<_>) = creators
            .into_iter()
            .map(|creator| {
                let inner = Arc::clone(self);
                let id = creator.id.clone();
                (id, tokio::spawn(async move { inner.sync_creator(creator).await }))
            })
            .unzip();

        let results = join_all(handles).await;

        let mut report = TickReport::new(tick);
        for (creator_id, result) in ids.into_iter().zip(results) {
            report.checked += 1;
            match result {
                Ok(Ok(SyncOutcome::Updated(transition))) => {
                    report.updated += 1;
                    report.transitions.extend(transition);
                }
                Ok(Ok(SyncOutcome::Skipped)) => report.skipped += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(creator_id = %creator_id, error = %e, "Failed to sync creator");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(creator_id = %creator_id, error = %e, "Creator sync task panicked");
                }
            }
        }

        info!(
            tick,
            checked = report.checked,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            went_live = report.transitions.len(),
            "Tick completed"
        );
        self.publish(MonitorEvent::TickCompleted(report.clone()));

        Ok(report)
    }

    async fn sync_creator(&self, creator: TrackedCreator) -> Result<SyncOutcome> {
        let fetcher = self
            .fetchers
            .get(creator.platform)
            .ok_or_else(|| Error::UnsupportedPlatform(creator.platform.to_string()))?;

        let status = match fetcher.fetch_status(&creator.channel_identifier).await {
            Ok(status) => status,
            Err(e) => {
                debug!(
                    creator_id = %creator.id,
                    platform = %creator.platform,
                    error = %e,
                    "Live status unavailable, keeping previous state"
                );
                return Ok(SyncOutcome::Skipped);
            }
        };

        let record = LiveStatusRecord::from_status(&creator, &status, Utc::now());
        self.store.upsert_live_status(&record).await?;
        trace!(creator_id = %creator.id, is_live = record.is_live, "Stored live status");

        Ok(SyncOutcome::Updated(self.evaluate_transition(&creator, &record)))
    }

    fn evaluate_transition(
        &self,
        creator: &TrackedCreator,
        record: &LiveStatusRecord,
    ) -> Option<LiveTransition> {
        match self.tracker.observe(&creator.id, record.is_live) {
            Transition::Unchanged => None,
            Transition::WentLive { suppressed: true } => {
                debug!(
                    creator_id = %creator.id,
                    "Creator already live at startup, not notifying"
                );
                None
            }
            Transition::WentLive { suppressed: false } => {
                info!(
                    creator_id = %creator.id,
                    display_name = %creator.display_name,
                    platform = %creator.platform,
                    "Creator went live"
                );
                if !creator.notify_enabled {
                    debug!(creator_id = %creator.id, "Notifications disabled for creator");
                    return None;
                }

                let transition = LiveTransition {
                    creator_id: creator.id.clone(),
                    display_name: creator.display_name.clone(),
                    platform: creator.platform,
                    url: record
                        .stream_url
                        .clone()
                        .unwrap_or_else(|| creator.channel_url(true)),
                    title: record.title.clone(),
                    timestamp: record.updated_at,
                };
                self.publish(MonitorEvent::WentLive(transition.clone()));
                Some(transition)
            }
            Transition::WentOffline => {
                info!(
                    creator_id = %creator.id,
                    display_name = %creator.display_name,
                    "Creator went offline"
                );
                self.publish(MonitorEvent::WentOffline {
                    creator_id: creator.id.clone(),
                    display_name: creator.display_name.clone(),
                    platform: creator.platform,
                    timestamp: record.updated_at,
                });
                None
            }
        }
    }

    fn publish(&self, event: MonitorEvent) {
        // Err only means nobody is subscribed.
        if self.event_broadcaster.publish(event).is_err() {
            trace!("No subscribers for monitor event");
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::Instrument;

use crate::error::AppError;
use crate::identity::{ChangeKind, ProfileChange};
use crate::services::ProfileMirror;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncJob {
    All,
    One(String),
    Remove(String),
}

impl From<ProfileChange> for SyncJob {
    fn from(change: ProfileChange) -> Self {
        match change.kind {
            ChangeKind::Added | ChangeKind::Modified => SyncJob::One(change.uid),
            ChangeKind::Removed => SyncJob::Remove(change.uid),
        }
    }
}

/// A source of profile sync work. `None` ends the trigger.
#[async_trait]
pub trait SyncTrigger: Send + 'static {
    fn name(&self) -> &'static str;

    async fn next(&mut self) -> Option<SyncJob>;
}

/// Fires a single full pass, then ends.
#[derive(Default)]
pub struct StartupPass {
    fired: bool,
}

#[async_trait]
impl SyncTrigger for StartupPass {
    fn name(&self) -> &'static str {
        "startup"
    }

    async fn next(&mut self) -> Option<SyncJob> {
        if self.fired {
            return None;
        }
        self.fired = true;
        Some(SyncJob::All)
    }
}

/// A full pass every `period`, starting one period from now.
pub struct IntervalTrigger {
    ticker: Interval,
}

impl IntervalTrigger {
    pub fn new(period: Duration) -> Self {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { ticker }
    }
}

#[async_trait]
impl SyncTrigger for IntervalTrigger {
    fn name(&self) -> &'static str {
        "interval"
    }

    async fn next(&mut self) -> Option<SyncJob> {
        self.ticker.tick().await;
        Some(SyncJob::All)
    }
}

/// Per-document jobs from the change webhook. Ends when every sender is dropped.
pub struct ChangeFeed {
    changes: mpsc::Receiver<ProfileChange>,
}

impl ChangeFeed {
    pub fn new(changes: mpsc::Receiver<ProfileChange>) -> Self {
        Self { changes }
    }
}

#[async_trait]
impl SyncTrigger for ChangeFeed {
    fn name(&self) -> &'static str {
        "change_feed"
    }

    async fn next(&mut self) -> Option<SyncJob> {
        self.changes.recv().await.map(SyncJob::from)
    }
}

pub async fn run_job(mirror: &ProfileMirror, job: SyncJob) -> Result<(), AppError> {
    match job {
        SyncJob::All => {
            mirror.sync_all().await?;
        }
        SyncJob::One(uid) => {
            let outcome = mirror.sync_one(&uid).await?;
            tracing::debug!("Synced {}: {:?}", uid, outcome);
        }
        SyncJob::Remove(uid) => {
            if mirror.remove(&uid).await? {
                tracing::info!("Removed local profile {} after external deletion", uid);
            }
        }
    }
    Ok(())
}

/// Runs jobs from `trigger` until it ends. Job failures are logged and the
/// loop continues.
pub async fn drive<T: SyncTrigger>(mirror: Arc<ProfileMirror>, mut trigger: T) {
    let trigger_name = trigger.name();
    tracing::info!("Profile sync trigger '{}' started", trigger_name);

    while let Some(job) = trigger.next().await {
        let span = tracing::info_span!("profile_sync", "otel.name" = "profile_sync", trigger = trigger_name, job = ?job);
        async {
            if let Err(e) = run_job(&mirror, job).await {
                tracing::error!("Profile sync job failed: {}", e);
            }
        }
        .instrument(span)
        .await;
    }

    tracing::info!("Profile sync trigger '{}' finished", trigger_name);
}

/// Spawns the three profile sync triggers as independent tasks.
pub fn spawn_profile_sync(
    mirror: Arc<ProfileMirror>,
    period: Duration,
    changes: mpsc::Receiver<ProfileChange>,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(drive(mirror.clone(), StartupPass::default())),
        tokio::spawn(drive(mirror.clone(), IntervalTrigger::new(period))),
        tokio::spawn(drive(mirror, ChangeFeed::new(changes))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn startup_pass_fires_once() {
        let mut trigger = StartupPass::default();
        assert_eq!(trigger.next().await, Some(SyncJob::All));
        assert_eq!(trigger.next().await, None);
    }

    #[tokio::test]
    async fn change_feed_maps_kinds_and_ends_with_senders() {
        let (tx, rx) = mpsc::channel(4);
        let mut feed = ChangeFeed::new(rx);

        tx.send(ProfileChange { uid: "a".into(), kind: ChangeKind::Modified }).await.unwrap();
        tx.send(ProfileChange { uid: "b".into(), kind: ChangeKind::Removed }).await.unwrap();
        drop(tx);

        assert_eq!(feed.next().await, Some(SyncJob::One("a".into())));
        assert_eq!(feed.next().await, Some(SyncJob::Remove("b".into())));
        assert_eq!(feed.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_waits_a_full_period_first() {
        let mut trigger = IntervalTrigger::new(Duration::from_secs(30));
        let started = Instant::now();
        assert_eq!(trigger.next().await, Some(SyncJob::All));
        assert!(started.elapsed() >= Duration::from_secs(30));
    }
}

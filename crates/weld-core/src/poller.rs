//! ELT sync status poller
//!
//! Refetches a sync's per-stream status on a fixed interval while live
//! activity is plausible, and stops on its own once a bounded window elapses.
//!
//! ## Policy
//!
//! - Polling starts enabled with a 5 minute window, fetching every 5 seconds.
//! - The window's deadline is a timer of its own, independent of fetches.
//! - Pause stops polling; resume opens a fresh 1 minute window from now
//!   (the original deadline is not restored).
//! - A manual refresh fetches once without touching the polling state.
//! - Dropping the handle aborts the task, so no timers outlive their owner.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiResult, EltSyncStatus, JobStatus, SourceStream};

/// Time between fetches while polling
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Window opened when the poller starts
pub const INITIAL_POLL_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Window opened when polling is resumed
pub const RESUME_POLL_WINDOW: Duration = Duration::from_secs(60);

/// Commands sent to the poller task
#[derive(Debug, Clone)]
pub enum PollerCommand {
    /// Stop polling until resumed
    Pause,
    /// Poll again for the default resume window
    Resume,
    /// Poll again for a specific window
    ResumeFor(Duration),
    /// Fetch once now
    Refresh,
    /// Stop the task
    Shutdown,
}

/// Events emitted by the poller task
#[derive(Debug, Clone)]
pub enum PollerEvent {
    /// A fresh status snapshot; replaces any previous one
    Snapshot(EltSyncStatus),
    /// A fetch failed; polling carries on
    Error(String),
    /// Polling was switched on or off
    PollingChanged(bool),
}

/// Handle to a running poller task
pub struct PollerHandle {
    /// Send commands to the poller task
    pub command_tx: mpsc::Sender<PollerCommand>,
    /// Receive events from the poller task
    pub event_rx: mpsc::Receiver<PollerEvent>,
    /// Watch whether polling is currently enabled
    pub polling_rx: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Whether the poller is auto-updating right now
    pub fn is_polling(&self) -> bool {
        *self.polling_rx.borrow()
    }

    /// Send a command; a stopped task is not an error
    pub async fn send(&self, command: PollerCommand) {
        let _ = self.command_tx.send(command).await;
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Poller timing
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    pub initial_window: Duration,
    pub resume_window: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            initial_window: INITIAL_POLL_WINDOW,
            resume_window: RESUME_POLL_WINDOW,
        }
    }
}

/// Bounded polling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollWindow {
    deadline: Option<Instant>,
}

impl PollWindow {
    /// Window that is not polling
    pub fn idle() -> Self {
        Self::default()
    }

    /// Window open from `now` for `duration`
    pub fn open(now: Instant, duration: Duration) -> Self {
        Self {
            deadline: Some(now + duration),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether fetches should still be issued at `now`
    pub fn is_active(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now < deadline)
    }

    pub fn close(&mut self) {
        self.deadline = None;
    }
}

/// Spawn a poller for one sync using the API client
pub fn spawn_sync_status_poller(
    client: ApiClient,
    elt_sync_id: String,
    config: PollerConfig,
) -> PollerHandle {
    spawn_status_poller(
        move || {
            let client = client.clone();
            let elt_sync_id = elt_sync_id.clone();
            async move { client.get_elt_sync_status(&elt_sync_id).await }
        },
        config,
    )
}

/// Spawn a poller around any status fetch
///
/// Returns a handle to control and observe the task.
pub fn spawn_status_poller<F, Fut>(fetch: F, config: PollerConfig) -> PollerHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ApiResult<EltSyncStatus>> + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(64);
    let (polling_tx, polling_rx) = watch::channel(false);

    let task = tokio::spawn(poller_task_loop(
        fetch, config, command_rx, event_tx, polling_tx,
    ));

    PollerHandle {
        command_tx,
        event_rx,
        polling_rx,
        task,
    }
}

async fn poller_task_loop<F, Fut>(
    fetch: F,
    config: PollerConfig,
    mut command_rx: mpsc::Receiver<PollerCommand>,
    event_tx: mpsc::Sender<PollerEvent>,
    polling_tx: watch::Sender<bool>,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = ApiResult<EltSyncStatus>>,
{
    let mut window = PollWindow::open(Instant::now(), config.initial_window);
    let mut ticker = time::interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(window = ?config.initial_window, "status polling started");
    if !set_polling(&polling_tx, &event_tx, true).await {
        return;
    }
    if !publish(fetch(), &event_tx).await {
        return;
    }

    loop {
        let polling = window.is_active(Instant::now());
        let deadline = window.deadline();
        let expiry = async move {
            match deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            cmd = command_rx.recv() => {
                match cmd {
                    Some(PollerCommand::Shutdown) | None => break,
                    Some(PollerCommand::Pause) => {
                        window.close();
                        info!("status polling paused");
                        if !set_polling(&polling_tx, &event_tx, false).await {
                            break;
                        }
                    }
                    Some(PollerCommand::Resume) => {
                        window = PollWindow::open(Instant::now(), config.resume_window);
                        ticker.reset();
                        info!(window = ?config.resume_window, "status polling resumed");
                        if !set_polling(&polling_tx, &event_tx, true).await {
                            break;
                        }
                    }
                    Some(PollerCommand::ResumeFor(duration)) => {
                        window = PollWindow::open(Instant::now(), duration);
                        ticker.reset();
                        info!(window = ?duration, "status polling resumed");
                        if !set_polling(&polling_tx, &event_tx, true).await {
                            break;
                        }
                    }
                    Some(PollerCommand::Refresh) => {
                        if !publish(fetch(), &event_tx).await {
                            break;
                        }
                    }
                }
            }

            _ = expiry => {
                window.close();
                info!("status polling window elapsed");
                if !set_polling(&polling_tx, &event_tx, false).await {
                    break;
                }
            }

            _ = ticker.tick(), if polling => {
                if !publish(fetch(), &event_tx).await {
                    break;
                }
            }
        }
    }

    let _ = polling_tx.send(false);
    debug!("status poller stopped");
}

/// Returns false once nobody is listening
async fn publish<Fut>(fetch: Fut, event_tx: &mpsc::Sender<PollerEvent>) -> bool
where
    Fut: Future<Output = ApiResult<EltSyncStatus>>,
{
    let event = match fetch.await {
        Ok(status) => PollerEvent::Snapshot(status),
        Err(e) => PollerEvent::Error(e.to_string()),
    };
    event_tx.send(event).await.is_ok()
}

async fn set_polling(
    polling_tx: &watch::Sender<bool>,
    event_tx: &mpsc::Sender<PollerEvent>,
    polling: bool,
) -> bool {
    let _ = polling_tx.send(polling);
    event_tx
        .send(PollerEvent::PollingChanged(polling))
        .await
        .is_ok()
}

/// One row of the status table
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRow {
    pub name: String,
    /// Stream id used for run / full refresh requests, when known
    pub stream_id: Option<String>,
    pub active_sync: Option<JobStatus>,
    pub latest_sync: Option<JobStatus>,
}

/// Join a status snapshot with the sync's streams by name
pub fn stream_rows(status: &EltSyncStatus, streams: &[SourceStream]) -> Vec<StreamRow> {
    status
        .source_streams
        .iter()
        .map(|stream_status| StreamRow {
            name: stream_status.name.clone(),
            stream_id: streams
                .iter()
                .find(|s| s.name == stream_status.name)
                .map(|s| s.id.clone()),
            active_sync: stream_status.active_sync.clone(),
            latest_sync: stream_status.latest_sync.clone(),
        })
        .collect()
}

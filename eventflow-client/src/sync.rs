use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{error::Elapsed, timeout};

use eventflow_core::{CollectionKind, StateEvent};

use crate::{ClientContext, Gateway, GatewayError};

/// The outcome of a single sync tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Collections that were wholesale-replaced this tick
    pub updated: Vec<CollectionKind>,
    /// Collections whose fetch failed or timed out; they keep their
    /// previous (stale) contents
    pub failed: Vec<CollectionKind>,
}

/// The timer-driven refresh cycle keeping the mirror in sync with the
/// backend.
///
/// Ticks are serialized: the next tick starts one poll interval after the
/// previous one finished, and the first tick fires immediately on start.
pub struct SyncLoop<G> {
    context: ClientContext<G>,
    running: Arc<AtomicBool>,
    warned_offline: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<G> SyncLoop<G>
where
    G: Gateway,
{
    pub fn new(context: &ClientContext<G>) -> Self {
        Self {
            context: context.clone(),
            running: Default::default(),
            warned_offline: Default::default(),
            task: Default::default(),
        }
    }

    /// Begins the polling cycle. Returns false without doing anything if a
    /// loop is already running, so two loops can never overlap.
    pub fn start(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            return false;
        }

        let context = self.context.clone();
        let warned_offline = self.warned_offline.clone();

        let interval = context.config.poll_interval;
        let fetch_timeout = context.config.fetch_timeout;

        let handle = tokio::spawn(async move {
            loop {
                run_tick(&context, fetch_timeout, &warned_offline).await;
                tokio::time::sleep(interval).await;
            }
        });

        *self.task.lock() = Some(handle);

        true
    }

    /// Cancels the polling cycle, if one is running
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }

        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Performs one reconcile cycle immediately, outside the timer.
    /// This is the same operation the loop runs on every tick.
    pub async fn run_tick(&self) -> TickOutcome {
        run_tick(
            &self.context,
            self.context.config.fetch_timeout,
            &self.warned_offline,
        )
        .await
    }
}

async fn run_tick<G>(
    context: &ClientContext<G>,
    fetch_timeout: Duration,
    warned_offline: &AtomicBool,
) -> TickOutcome
where
    G: Gateway,
{
    let gateway = &context.gateway;
    let mirror = &context.mirror;

    // The five fetches run concurrently and are unordered relative to
    // each other; each one is abandoned individually on timeout.
    let (events, users, registrations, teams, notifications) = tokio::join!(
        timeout(fetch_timeout, gateway.list_events()),
        timeout(fetch_timeout, gateway.list_users()),
        timeout(fetch_timeout, gateway.list_registrations()),
        timeout(fetch_timeout, gateway.list_teams()),
        timeout(fetch_timeout, gateway.list_notifications()),
    );

    let mut outcome = TickOutcome::default();

    apply(events, CollectionKind::Events, &mut outcome, |items| {
        mirror.replace_events(items)
    });
    apply(users, CollectionKind::Users, &mut outcome, |items| {
        mirror.replace_users(items)
    });
    apply(
        registrations,
        CollectionKind::Registrations,
        &mut outcome,
        |items| mirror.replace_registrations(items),
    );
    apply(teams, CollectionKind::Teams, &mut outcome, |items| {
        mirror.replace_teams(items)
    });
    apply(
        notifications,
        CollectionKind::Notifications,
        &mut outcome,
        |items| mirror.replace_notifications(items),
    );

    if outcome.updated.is_empty()
        && !outcome.failed.is_empty()
        && !warned_offline.swap(true, Ordering::SeqCst)
    {
        warn!("Cannot reach the backend; collections stay stale until it returns");
        mirror.broadcast(StateEvent::SyncOffline);
    }

    // All replacements of this tick happen before the render signal
    mirror.broadcast(StateEvent::SyncCompleted {
        updated: outcome.updated.clone(),
        failed: outcome.failed.clone(),
    });

    outcome
}

fn apply<T, F>(
    result: Result<Result<Vec<T>, GatewayError>, Elapsed>,
    kind: CollectionKind,
    outcome: &mut TickOutcome,
    replace: F,
) where
    F: FnOnce(Vec<T>),
{
    match result {
        Ok(Ok(items)) => {
            replace(items);
            outcome.updated.push(kind);
        }
        Ok(Err(e)) => {
            debug!("Fetch of {} failed: {}", kind.key(), e);
            outcome.failed.push(kind);
        }
        Err(_) => {
            debug!("Fetch of {} timed out", kind.key());
            outcome.failed.push(kind);
        }
    }
}

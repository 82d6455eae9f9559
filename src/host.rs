//! Host runtime seam
//!
//! The host delivers lifecycle, fetch and message events to a worker
//! generation and owns the decision of which generation controls clients.
//! [`WorkerHost`] is what a worker may ask of its host; [`Registration`] is
//! an in-process host that drives one generation at a time through
//!
//! ```text
//! Installing -> Waiting(skippable) -> Activating -> Activated | Reset
//!     \-> Redundant (install failed)
//! ```

use crate::error::{ShellcacheError, ShellcacheResult};
use crate::worker::Worker;
use async_trait::async_trait;
use futures_util::future::{join_all, BoxFuture};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Requests a worker may make of its host
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Let an installed generation activate without waiting for the
    /// clients of the previous generation to close
    async fn skip_waiting(&self);

    /// Take control of all open clients without a reload
    async fn claim_clients(&self);
}

/// Which event an [`ExtendableEvent`] carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Activate,
    Message,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Activate => write!(f, "activate"),
            Self::Message => write!(f, "message"),
        }
    }
}

/// An event whose completion the handler can postpone.
///
/// Handlers register their asynchronous work with [`wait_until`]; the host
/// must not consider the event finished (or tear the worker down) until
/// [`settle`] returns.
///
/// [`wait_until`]: ExtendableEvent::wait_until
/// [`settle`]: ExtendableEvent::settle
pub struct ExtendableEvent {
    kind: EventKind,
    pending: Vec<BoxFuture<'static, ShellcacheResult<()>>>,
}

impl ExtendableEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            pending: Vec::new(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Extend the event's lifetime until `work` completes
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = ShellcacheResult<()>> + Send + 'static,
    {
        self.pending.push(Box::pin(work));
    }

    /// Number of registered extensions
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drive every extension to completion; the first error wins
    pub async fn settle(self) -> ShellcacheResult<()> {
        let kind = self.kind;
        let results = join_all(self.pending).await;
        debug!("{} event settled ({} extensions)", kind, results.len());
        results.into_iter().collect()
    }
}

/// Lifecycle state of the generation held by a [`Registration`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Waiting { skippable: bool },
    Activating,
    Activated,
    /// Activated, but reconciliation failed and every store was cleared
    Reset,
    /// Install failed; the generation never takes control
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installing => write!(f, "installing"),
            Self::Waiting { skippable: true } => write!(f, "waiting (skippable)"),
            Self::Waiting { skippable: false } => write!(f, "waiting"),
            Self::Activating => write!(f, "activating"),
            Self::Activated => write!(f, "activated"),
            Self::Reset => write!(f, "reset"),
            Self::Redundant => write!(f, "redundant"),
        }
    }
}

/// In-process host for one worker registration
#[derive(Default)]
pub struct Registration {
    current: Mutex<Option<(Uuid, LifecycleState)>>,
    skip_requested: AtomicBool,
    clients_claimed: AtomicBool,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the most recent generation, if any
    pub async fn state(&self) -> Option<LifecycleState> {
        let current = *self.current.lock().await;
        current.map(|(_, state)| state)
    }

    /// Whether a generation has claimed the open clients
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    async fn transition(&self, worker: &Worker, state: LifecycleState) {
        debug!("Generation {} is {}", worker.generation(), state);
        *self.current.lock().await = Some((worker.generation(), state));
    }

    /// Install a new generation and leave it waiting
    pub async fn install(&self, worker: &Worker) -> ShellcacheResult<LifecycleState> {
        self.skip_requested.store(false, Ordering::SeqCst);
        self.transition(worker, LifecycleState::Installing).await;

        let mut event = ExtendableEvent::new(EventKind::Install);
        worker.on_install(&mut event);
        if let Err(e) = event.settle().await {
            warn!("Install of generation {} failed: {}", worker.generation(), e);
            self.transition(worker, LifecycleState::Redundant).await;
            return Err(e);
        }

        let state = LifecycleState::Waiting {
            skippable: self.skip_requested.load(Ordering::SeqCst),
        };
        self.transition(worker, state).await;
        Ok(state)
    }

    /// Activate the waiting generation
    pub async fn activate(&self, worker: &Worker) -> ShellcacheResult<LifecycleState> {
        match *self.current.lock().await {
            Some((generation, LifecycleState::Waiting { .. })) if generation == worker.generation() => {}
            _ => return Err(ShellcacheError::NothingWaiting),
        }
        self.transition(worker, LifecycleState::Activating).await;

        let mut event = ExtendableEvent::new(EventKind::Activate);
        worker.on_activate(&mut event);
        let state = match event.settle().await {
            Ok(()) => LifecycleState::Activated,
            Err(e) => {
                warn!("Generation {} activated after a reset: {}", worker.generation(), e);
                LifecycleState::Reset
            }
        };

        self.transition(worker, state).await;
        info!("Generation {} is {}", worker.generation(), state);
        Ok(state)
    }

    /// Install, then activate straight away if the worker asked to skip waiting
    pub async fn update(&self, worker: &Worker) -> ShellcacheResult<LifecycleState> {
        match self.install(worker).await? {
            LifecycleState::Waiting { skippable: true } => self.activate(worker).await,
            state => Ok(state),
        }
    }

    /// Deliver a control-channel message, activating a waiting generation
    /// if the message asked to skip waiting
    pub async fn post_message(
        &self,
        worker: &Worker,
        data: &str,
    ) -> ShellcacheResult<Option<LifecycleState>> {
        let mut event = ExtendableEvent::new(EventKind::Message);
        worker.on_message(&mut event, data);
        event.settle().await?;

        let waiting = matches!(
            *self.current.lock().await,
            Some((generation, LifecycleState::Waiting { .. })) if generation == worker.generation()
        );
        if waiting && self.skip_requested.load(Ordering::SeqCst) {
            self.activate(worker).await?;
        }

        Ok(self.state().await)
    }
}

#[async_trait]
impl WorkerHost for Registration {
    async fn skip_waiting(&self) {
        self.skip_requested.store(true, Ordering::SeqCst);
    }

    async fn claim_clients(&self) {
        self.clients_claimed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_worker, StubFetcher};
    use crate::store::MemoryStorage;
    use std::sync::Arc;

    #[tokio::test]
    async fn settle_waits_for_all_work() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut event = ExtendableEvent::new(EventKind::Install);
        let seen = flag.clone();
        event.wait_until(async move {
            tokio::task::yield_now().await;
            seen.store(true, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(event.pending(), 1);
        event.settle().await.unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn settle_reports_first_error() {
        let mut event = ExtendableEvent::new(EventKind::Activate);
        event.wait_until(async { Ok(()) });
        event.wait_until(async { Err(ShellcacheError::Internal("boom".into())) });

        assert!(matches!(
            event.settle().await,
            Err(ShellcacheError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn update_installs_and_activates() {
        let registration = Arc::new(Registration::new());
        let fetcher = Arc::new(
            StubFetcher::new()
                .serve("https://app.test/main.js", "js")
                .serve("https://app.test/", "<html>"),
        );
        let worker = test_worker(
            Arc::new(MemoryStorage::new()),
            fetcher,
            registration.clone(),
            &[("/", "h0"), ("main.js", "h1")],
            &["main.js"],
        );

        let state = registration.update(&worker).await.unwrap();

        assert_eq!(state, LifecycleState::Activated);
        assert!(registration.clients_claimed());
    }

    #[tokio::test]
    async fn failed_install_is_redundant() {
        let registration = Arc::new(Registration::new());
        let worker = test_worker(
            Arc::new(MemoryStorage::new()),
            Arc::new(StubFetcher::new()),
            registration.clone(),
            &[("main.js", "h1")],
            &["main.js"],
        );

        assert!(registration.update(&worker).await.is_err());
        assert_eq!(registration.state().await, Some(LifecycleState::Redundant));
        assert!(!registration.clients_claimed());
    }

    #[tokio::test]
    async fn activate_requires_waiting_generation() {
        let registration = Arc::new(Registration::new());
        let worker = test_worker(
            Arc::new(MemoryStorage::new()),
            Arc::new(StubFetcher::new()),
            registration.clone(),
            &[("main.js", "h1")],
            &[],
        );

        assert!(matches!(
            registration.activate(&worker).await,
            Err(ShellcacheError::NothingWaiting)
        ));
    }

    #[tokio::test]
    async fn skip_waiting_message_activates_waiting_generation() {
        let registration = Arc::new(Registration::new());
        let worker = test_worker(
            Arc::new(MemoryStorage::new()),
            Arc::new(StubFetcher::new()),
            registration.clone(),
            &[("main.js", "h1")],
            &[],
        );

        // Install without the worker's own skip request
        registration.install(&worker).await.unwrap();
        *registration.current.lock().await =
            Some((worker.generation(), LifecycleState::Waiting { skippable: false }));
        registration.skip_requested.store(false, Ordering::SeqCst);

        let state = registration.post_message(&worker, "skipWaiting").await.unwrap();
        assert_eq!(state, Some(LifecycleState::Activated));
    }

    #[test]
    fn state_display() {
        assert_eq!(
            LifecycleState::Waiting { skippable: true }.to_string(),
            "waiting (skippable)"
        );
        assert_eq!(LifecycleState::Reset.to_string(), "reset");
    }
}

//! Task cache service.
//!
//! This module provides the [`TaskService`] struct, the single source of truth
//! for the tasks the signed-in user currently sees. It keeps an in-memory
//! mirror of the owner's remote task collection and:
//! - applies local writes immediately and notifies subscribers before the
//!   backend has confirmed anything
//! - pushes each write to the gateway in the background and reports the
//!   outcome through a [`WriteReceipt`]
//! - replaces the whole list every time the gateway delivers a snapshot
//! - shares one remote subscription among any number of change subscribers

pub mod receipt;
pub mod session;
pub mod snapshot;
pub mod tasks;

use log::{debug, error, info, warn};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinHandle;

use crate::auth::IdentityProvider;
use crate::backend::{OwnerQuery, TaskGateway};
use crate::config::Config;
use crate::entities::TaskWithSyncStatus;

pub use receipt::{RemoteOutcome, WriteReceipt};
pub use session::SessionBinding;

/// Errors surfaced synchronously to callers of the task service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskServiceError {
    #[error("User not authenticated")]
    NotAuthenticated,
}

pub type ChangeCallback = Arc<dyn Fn(&[TaskWithSyncStatus]) + Send + Sync>;

pub(crate) struct Inner {
    pub(crate) tasks: Vec<TaskWithSyncStatus>,
    initialized: bool,
    listeners: BTreeMap<u64, ChangeCallback>,
    next_listener_id: u64,
    remote: Option<JoinHandle<()>>,
    /// Bumped on every `destroy` so background work from an earlier session
    /// can tell it is stale.
    pub(crate) generation: u64,
    outbox: VecDeque<Notification>,
    delivering: bool,
}

impl Inner {
    /// Queues the current list for every registered listener.
    pub(crate) fn notify(&mut self) {
        let notification = Notification {
            tasks: self.tasks.clone(),
            listeners: self.listeners.values().cloned().collect(),
        };
        self.outbox.push_back(notification);
    }

    fn close_remote(&mut self) {
        if let Some(handle) = self.remote.take() {
            handle.abort();
            debug!("Remote snapshot subscription closed");
        }
    }
}

/// Point-in-time copy of the task list plus the listeners to hand it to.
struct Notification {
    tasks: Vec<TaskWithSyncStatus>,
    listeners: Vec<ChangeCallback>,
}

impl Notification {
    fn deliver(self) {
        for listener in &self.listeners {
            listener(&self.tasks);
        }
    }
}

/// Clears the delivering flag if a listener panics mid-drain.
struct DrainGuard<'a> {
    state: &'a Mutex<Inner>,
    finished: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            lock_state(self.state).delivering = false;
        }
    }
}

/// Delivers queued notifications in the order they were queued.
///
/// Must be called without the state lock held. Only one caller drains at a
/// time; anyone arriving while a drain is running (another thread, or a
/// listener calling back into the service) leaves its notification for the
/// running drain to deliver.
pub(crate) fn deliver_notifications(state: &Mutex<Inner>) {
    {
        let mut inner = lock_state(state);
        if inner.delivering || inner.outbox.is_empty() {
            return;
        }
        inner.delivering = true;
    }

    let mut guard = DrainGuard { state, finished: false };
    loop {
        let next = {
            let mut inner = lock_state(state);
            match inner.outbox.pop_front() {
                Some(notification) => notification,
                None => {
                    inner.delivering = false;
                    guard.finished = true;
                    return;
                }
            }
        };
        next.deliver();
    }
}

pub(crate) fn lock_state(state: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Service that mirrors the signed-in user's remote task collection.
///
/// Clones share the same state.
///
/// # Example
/// ```rust,no_run
/// use daily_organizer::auth::{Identity, StaticSession};
/// use daily_organizer::backend::memory::MemoryGateway;
/// use daily_organizer::entities::{Complexity, Task, Urgency};
/// use daily_organizer::sync::TaskService;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let gateway = Arc::new(MemoryGateway::new(true));
/// let session = Arc::new(StaticSession::signed_in(Identity::new("user-1")));
/// let service = TaskService::new(gateway, session, "tasks");
///
/// service.initialize().await;
/// let _subscription = service.on_change(|tasks| println!("{} task(s)", tasks.len()));
///
/// let receipt = service.add_task(Task::new("Buy milk", Complexity::Low, Urgency::High))?;
/// println!("remote outcome: {:?}", receipt.settled().await);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TaskService {
    gateway: Arc<dyn TaskGateway>,
    identity: Arc<dyn IdentityProvider>,
    collection: String,
    state: Arc<Mutex<Inner>>,
}

impl TaskService {
    /// Creates a service bound to `collection` on the given gateway.
    ///
    /// Nothing is fetched until [`initialize`](Self::initialize) is called.
    pub fn new(gateway: Arc<dyn TaskGateway>, identity: Arc<dyn IdentityProvider>, collection: impl Into<String>) -> Self {
        Self {
            gateway,
            identity,
            collection: collection.into(),
            state: Arc::new(Mutex::new(Inner {
                tasks: Vec::new(),
                initialized: false,
                listeners: BTreeMap::new(),
                next_listener_id: 0,
                remote: None,
                generation: 0,
                outbox: VecDeque::new(),
                delivering: false,
            })),
        }
    }

    /// Creates a service using the collection named in `config`.
    pub fn from_config(config: &Config, gateway: Arc<dyn TaskGateway>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::new(gateway, identity, config.gateway.collection.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_state(&self.state)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Returns true while a remote snapshot subscription is open.
    pub fn has_remote_subscription(&self) -> bool {
        self.lock().remote.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Prepares the gateway and opens the remote snapshot subscription.
    ///
    /// Gateway setup errors are logged and the service stays usable for local
    /// data. On an initialized service this only opens the remote
    /// subscription if none is open, which picks up a user who signed in
    /// after an earlier `initialize` found nobody.
    pub async fn initialize(&self) {
        let generation = {
            let mut inner = self.lock();
            if inner.initialized {
                self.open_remote(&mut inner);
                return;
            }
            inner.initialized = true;
            inner.generation
        };

        if let Err(e) = self.gateway.connect().await {
            error!("Gateway setup failed ({}): {e}", self.gateway.gateway_type());
        }

        let mut inner = self.lock();
        if !inner.initialized || inner.generation != generation {
            debug!("Service torn down while connecting, not subscribing");
            return;
        }
        self.open_remote(&mut inner);
        info!("Task service initialized");
    }

    /// Opens the shared snapshot subscription unless one is already open.
    fn open_remote(&self, inner: &mut Inner) {
        if inner.remote.is_some() {
            return;
        }
        let Some(user) = self.identity.current_user() else {
            warn!("No signed-in user, remote subscription not opened");
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("No async runtime available, remote subscription not opened");
            return;
        };

        let mut stream = match self.gateway.subscribe(OwnerQuery::new(self.collection.clone(), user.uid.clone())) {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to subscribe to remote tasks: {e}");
                return;
            }
        };

        let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.state);
        let generation = inner.generation;
        let owner = user.uid;
        inner.remote = Some(runtime.spawn(async move {
            while let Some(event) = stream.recv().await {
                let Some(state) = weak.upgrade() else {
                    break;
                };
                match event {
                    Ok(remote) => snapshot::apply_snapshot(&state, generation, &owner, remote),
                    Err(e) if e.is_transient() => warn!("Remote subscription terminated: {e}"),
                    Err(e) => error!("Remote subscription error: {e}"),
                }
            }
            debug!("Remote snapshot stream ended");
        }));
        debug!("Remote snapshot subscription opened");
    }

    /// Registers a change subscriber.
    ///
    /// The callback runs immediately with the current list and again after
    /// every change. When registered from inside another callback, the first
    /// call waits until that callback returns. The remote subscription is shared by all subscribers and
    /// closes when the last one unsubscribes.
    pub fn on_change<F>(&self, callback: F) -> ChangeSubscription
    where
        F: Fn(&[TaskWithSyncStatus]) + Send + Sync + 'static,
    {
        let callback: ChangeCallback = Arc::new(callback);
        let id = {
            let mut inner = self.lock();
            let id = inner.next_listener_id;
            inner.next_listener_id += 1;
            inner.listeners.insert(id, callback.clone());
            if inner.initialized {
                self.open_remote(&mut inner);
            }
            let first = Notification {
                tasks: inner.tasks.clone(),
                listeners: vec![callback],
            };
            inner.outbox.push_back(first);
            id
        };
        deliver_notifications(&self.state);

        ChangeSubscription {
            id,
            state: Arc::downgrade(&self.state),
            active: true,
        }
    }

    /// Looks a task up in the local list.
    pub fn get_task_by_id(&self, id: &str) -> Option<TaskWithSyncStatus> {
        self.lock().tasks.iter().find(|t| t.id() == id).cloned()
    }

    /// Returns a copy of the whole local list.
    pub fn get_tasks(&self) -> Vec<TaskWithSyncStatus> {
        self.lock().tasks.clone()
    }

    /// Tears the session down: clears tasks and subscribers and closes the
    /// remote subscription.
    ///
    /// Must be called on sign-out so the next user never sees stale tasks.
    /// Writes already in flight are not cancelled; their results are ignored.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        if !inner.initialized {
            return;
        }
        inner.tasks.clear();
        inner.close_remote();
        inner.listeners.clear();
        inner.outbox.clear();
        inner.initialized = false;
        inner.generation += 1;
        info!("Task service destroyed, local state cleared");
    }
}

/// Handle returned by [`TaskService::on_change`].
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping the subscription unregisters the callback"]
pub struct ChangeSubscription {
    id: u64,
    state: Weak<Mutex<Inner>>,
    active: bool,
}

impl ChangeSubscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !std::mem::take(&mut self.active) {
            return;
        }
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut inner = lock_state(&state);
        if inner.listeners.remove(&self.id).is_some() && inner.listeners.is_empty() {
            inner.close_remote();
        }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

//! Identity provider abstraction.
//!
//! The task cache only needs to know who is signed in right now and to hear
//! about sign-in / sign-out transitions. Credential handling lives elsewhere.

use log::info;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// The signed-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

pub type AuthCallback = Arc<dyn Fn(Option<Identity>) + Send + Sync>;

/// Handle returned by [`IdentityProvider::on_auth_state_changed`].
///
/// The listener stays registered until `unsubscribe` is called or the handle
/// is dropped.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct AuthSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl AuthSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<Identity>;

    /// Register a listener for sign-in state changes. The listener is called
    /// once immediately with the current user.
    fn on_auth_state_changed(&self, callback: AuthCallback) -> AuthSubscription;
}

#[derive(Default)]
struct SessionState {
    user: Option<Identity>,
    listeners: HashMap<u64, AuthCallback>,
    next_listener_id: u64,
}

/// Identity provider holding the session in memory.
#[derive(Clone, Default)]
pub struct StaticSession {
    inner: Arc<Mutex<SessionState>>,
}

impl StaticSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(identity: Identity) -> Self {
        let session = Self::new();
        session.lock().user = Some(identity);
        session
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sign_in(&self, identity: Identity) {
        info!("Signed in as {}", identity.uid);
        self.set_user(Some(identity));
    }

    pub fn sign_out(&self) {
        info!("Signed out");
        self.set_user(None);
    }

    fn set_user(&self, user: Option<Identity>) {
        let listeners: Vec<AuthCallback> = {
            let mut state = self.lock();
            state.user = user.clone();
            state.listeners.values().cloned().collect()
        };
        for listener in listeners {
            listener(user.clone());
        }
    }
}

impl IdentityProvider for StaticSession {
    fn current_user(&self) -> Option<Identity> {
        self.lock().user.clone()
    }

    fn on_auth_state_changed(&self, callback: AuthCallback) -> AuthSubscription {
        let (id, current) = {
            let mut state = self.lock();
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.insert(id, callback.clone());
            (id, state.user.clone())
        };
        callback(current);

        let weak: Weak<Mutex<SessionState>> = Arc::downgrade(&self.inner);
        AuthSubscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().unwrap_or_else(PoisonError::into_inner).listeners.remove(&id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_fire_on_transitions_until_dropped() {
        let session = StaticSession::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let sub = session.on_auth_state_changed(Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        session.sign_in(Identity::new("u1"));
        session.sign_out();
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        sub.unsubscribe();
        session.sign_in(Identity::new("u2"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(session.current_user().map(|u| u.uid), Some("u2".to_string()));
    }
}

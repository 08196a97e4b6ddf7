//! Ties the task cache lifecycle to sign-in state.

use log::{error, info};
use std::sync::{Arc, Mutex, PoisonError};

use super::TaskService;
use crate::auth::{AuthSubscription, Identity, IdentityProvider};

/// Keeps a [`TaskService`] in step with the identity provider.
///
/// Signing in initializes the service, signing out destroys it, and switching
/// directly between users does both, so the next user never sees the previous
/// user's tasks. The binding lasts until it is dropped.
pub struct SessionBinding {
    _subscription: AuthSubscription,
}

impl SessionBinding {
    pub fn bind(service: TaskService, identity: &dyn IdentityProvider) -> Self {
        let current_uid: Mutex<Option<String>> = Mutex::new(None);

        let subscription = identity.on_auth_state_changed(Arc::new(move |user: Option<Identity>| {
            let mut current = current_uid.lock().unwrap_or_else(PoisonError::into_inner);
            let next = user.map(|u| u.uid);
            if *current == next {
                return;
            }

            if current.is_some() {
                info!("Session ended, tearing down task cache");
                service.destroy();
            }
            *current = next.clone();

            if let Some(uid) = next {
                info!("Session started for {uid}, initializing task cache");
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let service = service.clone();
                        runtime.spawn(async move { service.initialize().await });
                    }
                    Err(_) => error!("No async runtime available, task cache not initialized"),
                }
            }
        }));

        Self {
            _subscription: subscription,
        }
    }
}

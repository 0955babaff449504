use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthApi};
use crate::config::SessionConfig;
use crate::models::Profile;
use crate::navigation::{NavigateOptions, Navigator};
use crate::notify::{notify_failure, NotificationKind, Notifier};

/// Who is logged in, as far as this process knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub is_authenticated: bool,
    pub profile: Option<Profile>,
    /// True while any profile fetch is in flight.
    pub is_loading: bool,
}

/// Single source of truth for the session. Only its own operations mutate
/// the state; everyone else reads a snapshot or subscribes to changes.
pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    sign_in_path: String,
    state: watch::Sender<Session>,
    fetches_in_flight: AtomicUsize,
}

impl SessionStore {
    pub fn new(
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        config: &SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(Session::default());
        SessionStore {
            api,
            navigator,
            notifier,
            sign_in_path: config.sign_in_path.clone(),
            state,
            fetches_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Ask the API who is logged in. On failure the current profile is left
    /// as it was and the error is returned to the caller.
    pub async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        let _loading = LoadingGuard::enter(self);
        match self.api.fetch_profile().await {
            Ok(profile) => {
                debug!("Fetched profile for '{}'", profile.email);
                self.state.send_modify(|session| {
                    session.profile = Some(profile.clone());
                    session.is_authenticated = true;
                });
                Ok(profile)
            }
            Err(e) => {
                debug!("Profile fetch failed: {}", e);
                Err(e)
            }
        }
    }

    /// Fetch the profile again, e.g. after credentials were refreshed.
    pub async fn refetch_profile(&self) -> Result<Profile, ApiError> {
        debug!("Refetching profile");
        self.fetch_profile().await
    }

    /// Forget the session locally without talking to the API.
    pub fn clear(&self) {
        self.state.send_modify(|session| {
            session.profile = None;
            session.is_authenticated = false;
        });
    }

    /// Log out remotely, then clear the local session whatever the outcome.
    pub async fn revoke(&self) -> Result<(), ApiError> {
        let result = self.api.logout().await;
        self.clear();
        result
    }

    /// User-initiated sign-out. The local effect always happens; a remote
    /// failure is only reported to the user.
    pub async fn sign_out(&self) {
        match self.revoke().await {
            Ok(()) => {
                info!("Signed out");
                self.notifier
                    .notify(NotificationKind::Success, "Successfully logged out");
            }
            Err(e) => {
                warn!("Remote logout failed, session cleared locally: {}", e);
                notify_failure(self.notifier.as_ref(), "Could not log out!", ": ", &e);
            }
        }
        self.navigator
            .navigate_to(&self.sign_in_path, NavigateOptions::replace());
    }
}

/// Marks a fetch as in flight until dropped.
struct LoadingGuard<'a> {
    store: &'a SessionStore,
}

impl<'a> LoadingGuard<'a> {
    fn enter(store: &'a SessionStore) -> Self {
        store.state.send_modify(|session| {
            store.fetches_in_flight.fetch_add(1, Ordering::SeqCst);
            session.is_loading = true;
        });
        LoadingGuard { store }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let store = self.store;
        store.state.send_modify(|session| {
            let remaining = store.fetches_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
            session.is_loading = remaining > 0;
        });
    }
}

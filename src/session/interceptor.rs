//! Single-flight credential refresh for the shared API client.
//!
//! A request that fails because no credentials were sent triggers one
//! refresh; failures seen while that refresh runs are passed through to
//! their callers. When the refresh cannot recover the session the user is
//! sent to the sign-in page.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::store::SessionStore;
use crate::api::{
    AlreadyAttached, ApiClient, ApiError, AuthApi, AuthFailure, Interception,
    InterceptorRegistration, ResponseInterceptor,
};
use crate::config::SessionConfig;
use crate::navigation::{NavigateOptions, Navigator};
use crate::utils::log_throttle::LogThrottle;

const IN_FLIGHT_LOG_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// The state plus a counter of refreshes started, so that a finishing
/// refresh only resets the state it set itself.
#[derive(Debug)]
struct RefreshSlot {
    state: RefreshState,
    epoch: u64,
}

#[derive(Debug)]
enum RefreshOutcome {
    Refreshed,
    /// The refresh endpoint answered, but refused.
    Rejected(ApiError),
    /// The refresh endpoint could not be reached or timed out.
    Failed(ApiError),
}

/// Watches every failed response of the API client and keeps the session
/// alive by refreshing credentials once per failure burst.
///
/// Create one per protected scope and [`mount`](AuthInterceptor::mount) it;
/// the returned registration detaches it when dropped.
pub struct AuthInterceptor {
    session: Arc<SessionStore>,
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    slot: Mutex<RefreshSlot>,
    attached: AtomicBool,
    refresh_timeout: Duration,
    sign_in_path: String,
    log_throttle: LogThrottle,
}

impl AuthInterceptor {
    pub fn new(
        session: Arc<SessionStore>,
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
        config: &SessionConfig,
    ) -> Self {
        AuthInterceptor {
            session,
            api,
            navigator,
            slot: Mutex::new(RefreshSlot {
                state: RefreshState::Idle,
                epoch: 0,
            }),
            attached: AtomicBool::new(false),
            refresh_timeout: config.refresh_timeout(),
            sign_in_path: config.sign_in_path.clone(),
            log_throttle: LogThrottle::new(IN_FLIGHT_LOG_WINDOW),
        }
    }

    /// Attach to `client` and bring the session up to date.
    ///
    /// An instance is live in at most one chain at a time; mounting it again
    /// before its registration is dropped fails and refetches nothing.
    pub async fn mount(
        self: &Arc<Self>,
        client: &ApiClient,
    ) -> Result<InterceptorRegistration, AlreadyAttached> {
        let registration = InterceptorRegistration::attach(client, self.clone())?;
        if let Err(e) = self.session.refetch_profile().await {
            debug!("Profile refetch on mount failed: {}", e);
        }
        Ok(registration)
    }

    pub fn state(&self) -> RefreshState {
        self.slot().state
    }

    pub fn is_refreshing(&self) -> bool {
        self.state() == RefreshState::Refreshing
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn slot(&self) -> MutexGuard<'_, RefreshSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `Refreshing` if idle. The lock is released before any await,
    /// so the check and the transition cannot interleave with another task.
    fn try_begin_refresh(&self) -> Option<RefreshGuard<'_>> {
        let mut slot = self.slot();
        if slot.state == RefreshState::Refreshing {
            return None;
        }
        slot.state = RefreshState::Refreshing;
        slot.epoch += 1;
        Some(RefreshGuard {
            interceptor: self,
            epoch: slot.epoch,
        })
    }

    fn reset(&self) {
        self.slot().state = RefreshState::Idle;
    }

    async fn refresh(&self) -> RefreshOutcome {
        match timeout(self.refresh_timeout, self.api.refresh_token()).await {
            Ok(Ok(())) => RefreshOutcome::Refreshed,
            Ok(Err(e @ ApiError::Status { .. })) => RefreshOutcome::Rejected(e),
            Ok(Err(e)) => RefreshOutcome::Failed(e),
            Err(_) => RefreshOutcome::Failed(ApiError::Timeout(self.refresh_timeout)),
        }
    }

    async fn complete(&self, outcome: RefreshOutcome) {
        if !self.is_attached() {
            debug!(
                event_name = "session.refresh.discarded",
                event_domain = "session",
                "refresh finished after detach: {:?}",
                outcome
            );
            return;
        }

        match outcome {
            RefreshOutcome::Refreshed => {
                info!(
                    event_name = "session.refresh.succeeded",
                    event_domain = "session",
                    "credentials refreshed"
                );
                if let Err(e) = self.session.refetch_profile().await {
                    warn!("Profile refetch after refresh failed: {}", e);
                }
            }
            RefreshOutcome::Rejected(e) => {
                warn!(
                    event_name = "session.refresh.rejected",
                    event_domain = "session",
                    "refresh refused, signing out: {}",
                    e
                );
                if let Err(e) = self.session.revoke().await {
                    debug!("Remote logout after refused refresh failed: {}", e);
                }
                self.redirect_to_sign_in();
            }
            RefreshOutcome::Failed(e) => {
                warn!(
                    event_name = "session.refresh.failed",
                    event_domain = "session",
                    "refresh failed, clearing session: {}",
                    e
                );
                self.session.clear();
                self.redirect_to_sign_in();
            }
        }
    }

    fn redirect_to_sign_in(&self) {
        self.navigator
            .navigate_to(&self.sign_in_path, NavigateOptions::replace());
    }
}

#[async_trait::async_trait]
impl ResponseInterceptor for AuthInterceptor {
    fn name(&self) -> &str {
        "auth-refresh"
    }

    async fn on_error(&self, error: ApiError) -> Interception {
        if !self.is_attached() {
            return Interception::PassThrough(error);
        }

        match error.auth_failure() {
            Some(AuthFailure::Refreshable) => {
                let Some(guard) = self.try_begin_refresh() else {
                    // Another request already started a refresh.
                    self.reset();
                    if let Some(suppressed_count) =
                        self.log_throttle.should_emit("session.refresh.in_flight")
                    {
                        debug!(
                            event_name = "session.refresh.in_flight",
                            event_domain = "session",
                            suppressed_count,
                            "refresh already in flight, passing failure through"
                        );
                    }
                    return Interception::PassThrough(error);
                };

                info!(
                    event_name = "session.refresh.started",
                    event_domain = "session",
                    "credentials missing, refreshing"
                );
                let outcome = self.refresh().await;
                self.complete(outcome).await;
                drop(guard);
                Interception::Handled
            }
            Some(AuthFailure::Terminal) => {
                if self.is_refreshing() {
                    return Interception::PassThrough(error);
                }
                warn!(
                    event_name = "session.credentials.rejected",
                    event_domain = "session",
                    "credentials rejected, redirecting to sign-in: {}",
                    error
                );
                self.redirect_to_sign_in();
                Interception::Handled
            }
            None => Interception::PassThrough(error),
        }
    }

    fn on_attach(&self) -> bool {
        self.attached
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn on_detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

/// Returns the interceptor to `Idle` when the refresh that created it ends,
/// however it ends.
struct RefreshGuard<'a> {
    interceptor: &'a AuthInterceptor,
    epoch: u64,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.interceptor.slot();
        if slot.epoch == self.epoch {
            slot.state = RefreshState::Idle;
        }
    }
}

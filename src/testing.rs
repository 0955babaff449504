//! In-process fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use serde_json::{json, Value};
use tokio::sync::{oneshot, Notify};

use crate::api::{ApiError, AuthApi, CREDENTIALS_NOT_PROVIDED};
use crate::models::{Profile, RegisterRequest, SignInRequest, TokenSet};
use crate::notify::{NotificationKind, Notifier};

pub fn profile(name: &str) -> Profile {
    Profile {
        id: format!("id-{}", name),
        first_name: name.to_string(),
        last_name: "Tester".to_string(),
        email: format!("{}@photondam.io", name),
        created_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

pub fn status_error(code: u16, body: Value) -> ApiError {
    ApiError::Status {
        status: StatusCode::from_u16(code).expect("valid status code"),
        body,
    }
}

pub fn credentials_not_provided() -> ApiError {
    status_error(401, json!({ "detail": CREDENTIALS_NOT_PROVIDED }))
}

pub fn invalid_token() -> ApiError {
    status_error(401, json!({ "detail": "Invalid token." }))
}

/// A call that can be held open by the test until it is released.
#[derive(Default)]
struct Gate {
    started: Notify,
    release: Mutex<Option<oneshot::Receiver<()>>>,
}

impl Gate {
    fn hold(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.release.lock().unwrap() = Some(rx);
        tx
    }

    async fn pass(&self) {
        self.started.notify_one();
        let release = self.release.lock().unwrap().take();
        if let Some(release) = release {
            // a dropped sender releases the call as well
            let _ = release.await;
        }
    }
}

/// Scripted [`AuthApi`]. Queued results are consumed in order; an empty
/// queue means success for refresh/logout/login/register and a 500 for the
/// profile endpoint.
#[derive(Default)]
pub struct FakeAuthApi {
    profiles: Mutex<VecDeque<Result<Profile, ApiError>>>,
    refreshes: Mutex<VecDeque<Result<(), ApiError>>>,
    logout_failure: Mutex<Option<ApiError>>,
    login_failure: Mutex<Option<ApiError>>,
    register_failure: Mutex<Option<ApiError>>,
    profile_gate: Gate,
    refresh_gate: Gate,
    profile_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    login_calls: AtomicUsize,
    register_calls: AtomicUsize,
}

impl FakeAuthApi {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeAuthApi::default())
    }

    pub fn push_profile(&self, result: Result<Profile, ApiError>) {
        self.profiles.lock().unwrap().push_back(result);
    }

    pub fn push_refresh(&self, result: Result<(), ApiError>) {
        self.refreshes.lock().unwrap().push_back(result);
    }

    pub fn fail_logout(&self, error: ApiError) {
        *self.logout_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_login(&self, error: ApiError) {
        *self.login_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_register(&self, error: ApiError) {
        *self.register_failure.lock().unwrap() = Some(error);
    }

    /// Keep the next profile call open until the returned sender fires.
    pub fn hold_profile(&self) -> oneshot::Sender<()> {
        self.profile_gate.hold()
    }

    /// Keep the next refresh call open until the returned sender fires.
    pub fn hold_refresh(&self) -> oneshot::Sender<()> {
        self.refresh_gate.hold()
    }

    pub async fn profile_started(&self) {
        self.profile_gate.started.notified().await;
    }

    pub async fn refresh_started(&self) {
        self.refresh_gate.started.notified().await;
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, _credentials: &SignInRequest) -> Result<TokenSet, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        match self.login_failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(TokenSet::default()),
        }
    }

    async fn refresh_token(&self) -> Result<(), ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_gate.pass().await;
        let next = self.refreshes.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profile_gate.pass().await;
        let next = self.profiles.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(status_error(500, Value::Null)))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        match self.logout_failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn register_user(&self, data: &RegisterRequest) -> Result<Value, ApiError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        match self.register_failure.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(json!({ "email": data.email })),
        }
    }
}

/// Keeps every notification for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(NotificationKind, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((kind, message.to_string()));
    }
}

//! The shared HTTP client every API call goes through.
//!
//! Failed calls are run through an ordered chain of response interceptors
//! before the caller sees them. An interceptor either hands the error on or
//! takes ownership of it, in which case the caller receives
//! [`ApiError::Intercepted`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use super::error::ApiError;
use crate::config::ApiConfig;
use crate::models::TokenSet;

/// What an interceptor decided to do with a failed response.
#[derive(Debug)]
pub enum Interception {
    /// Hand the (possibly unchanged) error to the next interceptor or the caller.
    PassThrough(ApiError),
    /// The interceptor dealt with the failure; the caller gets `ApiError::Intercepted`.
    Handled,
}

/// Observes failed responses of an [`ApiClient`].
#[async_trait::async_trait]
pub trait ResponseInterceptor: Send + Sync {
    fn name(&self) -> &str;

    async fn on_error(&self, error: ApiError) -> Interception;

    /// Called before the interceptor joins a client's chain. Returning
    /// false refuses the attachment.
    fn on_attach(&self) -> bool {
        true
    }

    /// Called once when the interceptor is removed from the client.
    fn on_detach(&self) {}
}

/// The interceptor refused to join a chain, because it is already live in one.
#[derive(Debug, thiserror::Error)]
#[error("interceptor '{0}' is already attached")]
pub struct AlreadyAttached(pub String);

/// Identifies one attachment of an interceptor to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

type Chain = Vec<(InterceptorId, Arc<dyn ResponseInterceptor>)>;

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    tokens: RwLock<TokenSet>,
    interceptors: Mutex<Chain>,
    next_id: AtomicU64,
}

/// Cheap to clone; all clones share credentials and interceptors.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// Build a client with a cookie jar and the configured request timeout.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout())
            .build()?;
        Ok(Self::with_http_client(http, &config.base_url))
    }

    pub fn with_http_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        ApiClient {
            inner: Arc::new(ClientInner {
                http,
                base_url: base_url.into(),
                tokens: RwLock::new(TokenSet::default()),
                interceptors: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    // -- Credentials

    pub fn tokens(&self) -> TokenSet {
        self.inner
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_tokens(&self, tokens: TokenSet) {
        *self
            .inner
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner) = tokens;
    }

    pub fn merge_tokens(&self, tokens: TokenSet) {
        self.inner
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(tokens);
    }

    pub fn clear_tokens(&self) {
        self.set_tokens(TokenSet::default());
    }

    // -- Interceptors

    /// Append an interceptor to the chain.
    pub fn attach(
        &self,
        interceptor: Arc<dyn ResponseInterceptor>,
    ) -> Result<InterceptorId, AlreadyAttached> {
        if !interceptor.on_attach() {
            return Err(AlreadyAttached(interceptor.name().to_string()));
        }
        let id = InterceptorId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(interceptor = interceptor.name(), id = id.0, "attaching interceptor");
        self.chain().push((id, interceptor));
        Ok(id)
    }

    /// Remove an interceptor. Returns false if it was not attached.
    pub fn detach(&self, id: InterceptorId) -> bool {
        let removed = {
            let mut chain = self.chain();
            chain
                .iter()
                .position(|(attached, _)| *attached == id)
                .map(|index| chain.remove(index).1)
        };
        match removed {
            Some(interceptor) => {
                interceptor.on_detach();
                debug!(interceptor = interceptor.name(), id = id.0, "detached interceptor");
                true
            }
            None => false,
        }
    }

    pub fn interceptor_count(&self) -> usize {
        self.chain().len()
    }

    fn chain(&self) -> std::sync::MutexGuard<'_, Chain> {
        self.inner
            .interceptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // -- Requests

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let value = self.request(Method::GET, path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        let value = self.request(Method::POST, path, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Like `post`, but failures bypass the interceptor chain.
    pub async fn post_unobserved<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        let value = self.execute(Method::POST, path, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Send a request and run any failure through the interceptor chain.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        match self.execute(method, path, body).await {
            Ok(value) => Ok(value),
            Err(error) => Err(self.intercept(error).await),
        }
    }

    async fn intercept(&self, mut error: ApiError) -> ApiError {
        // Snapshot so interceptors may attach/detach while we await them.
        let chain: Vec<Arc<dyn ResponseInterceptor>> =
            self.chain().iter().map(|(_, i)| i.clone()).collect();

        for interceptor in chain {
            match interceptor.on_error(error).await {
                Interception::PassThrough(e) => error = e,
                Interception::Handled => {
                    debug!(interceptor = interceptor.name(), "failure handled by interceptor");
                    return ApiError::Intercepted;
                }
            }
        }
        error
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = join_url(&self.inner.base_url, path);
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("api_request", method = %method, path, request_id = %request_id);

        async move {
            let mut builder = self
                .inner
                .http
                .request(method, &url)
                .header("x-request-id", &request_id);
            if let Some(access) = self.tokens().access {
                builder = builder.bearer_auth(access);
            }
            if let Some(body) = body {
                builder = builder.json(&body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let body = parse_body(&response.text().await?);

            if status.is_success() {
                debug!(status = status.as_u16(), "request succeeded");
                Ok(body)
            } else {
                debug!(status = status.as_u16(), "request failed");
                Err(ApiError::Status { status, body })
            }
        }
        .instrument(span)
        .await
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Empty bodies become `null`; bodies that are not JSON are kept as a string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Keeps an interceptor attached for as long as it lives.
///
/// Detaches exactly once: on [`InterceptorRegistration::detach`] or on drop,
/// whichever comes first.
#[must_use = "dropping the registration detaches the interceptor"]
pub struct InterceptorRegistration {
    client: ApiClient,
    id: InterceptorId,
    released: bool,
}

impl InterceptorRegistration {
    pub fn attach(
        client: &ApiClient,
        interceptor: Arc<dyn ResponseInterceptor>,
    ) -> Result<Self, AlreadyAttached> {
        let id = client.attach(interceptor)?;
        Ok(InterceptorRegistration {
            client: client.clone(),
            id,
            released: false,
        })
    }

    pub fn id(&self) -> InterceptorId {
        self.id
    }

    pub fn detach(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.client.detach(self.id);
    }
}

impl Drop for InterceptorRegistration {
    fn drop(&mut self) {
        self.release();
    }
}

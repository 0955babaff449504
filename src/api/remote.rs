use serde_json::Value;
use tracing::{debug, info};

use super::client::ApiClient;
use super::error::ApiError;
use crate::config::EndpointsConfig;
use crate::models::{Profile, RegisterRequest, SignInRequest, TokenSet};

/// The remote authentication API, as seen by the session layer.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &SignInRequest) -> Result<TokenSet, ApiError>;

    /// Obtain fresh credentials. Implementations must not route this call
    /// through the response interceptors that trigger it.
    async fn refresh_token(&self) -> Result<(), ApiError>;

    async fn fetch_profile(&self) -> Result<Profile, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;

    async fn register_user(&self, data: &RegisterRequest) -> Result<Value, ApiError>;
}

/// [`AuthApi`] over the shared [`ApiClient`].
#[derive(Clone)]
pub struct HttpAuthApi {
    client: ApiClient,
    endpoints: EndpointsConfig,
}

impl HttpAuthApi {
    pub fn new(client: ApiClient, endpoints: EndpointsConfig) -> Self {
        HttpAuthApi { client, endpoints }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &SignInRequest) -> Result<TokenSet, ApiError> {
        debug!("Signing in '{}'", credentials.email);
        let tokens: Option<TokenSet> = self
            .client
            .post(&self.endpoints.login, Some(credentials))
            .await?;
        let tokens = tokens.unwrap_or_default();
        if tokens.is_empty() {
            debug!("Login returned no tokens; relying on cookies");
        }
        self.client.set_tokens(tokens.clone());
        info!("Signed in '{}'", credentials.email);
        Ok(tokens)
    }

    async fn refresh_token(&self) -> Result<(), ApiError> {
        let refresh = self.client.tokens().refresh;
        let body = refresh.map(|token| serde_json::json!({ "refresh": token }));
        let response: Value = self
            .client
            .post_unobserved(&self.endpoints.refresh, body.as_ref())
            .await?;
        // A 2xx is a successful refresh whatever the body says; tokens are
        // only picked up when the body carries them.
        match serde_json::from_value::<TokenSet>(response) {
            Ok(tokens) => self.client.merge_tokens(tokens),
            Err(e) => debug!("Refresh response carried no tokens: {}", e),
        }
        debug!("Credentials refreshed");
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<Profile, ApiError> {
        self.client.get(&self.endpoints.profile).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        // Unobserved: a 401 here is the logout's own answer, not a session
        // to rescue.
        let result = self
            .client
            .post_unobserved::<Value, Value>(&self.endpoints.logout, None)
            .await;
        // The local credentials are gone either way.
        self.client.clear_tokens();
        result.map(|_| ())
    }

    async fn register_user(&self, data: &RegisterRequest) -> Result<Value, ApiError> {
        self.client.post(&self.endpoints.register, Some(data)).await
    }
}

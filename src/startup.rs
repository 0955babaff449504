//! Wiring for the command-line session check.
//!
//! Builds the API client, the session store and the refresh interceptor from
//! the configuration, signs in, prints the profile and signs out again.

use std::sync::Arc;

use tracing::{error, info};

use crate::api::{ApiClient, AuthApi, HttpAuthApi};
use crate::config::ConfigV1;
use crate::flows::AuthFlows;
use crate::models::SignInRequest;
use crate::navigation::{MemoryNavigator, Navigator};
use crate::notify::{Notifier, TracingNotifier};
use crate::session::{AuthInterceptor, SessionStore};

pub const EMAIL_VAR: &str = "PHOTONDAM_EMAIL";
pub const PASSWORD_VAR: &str = "PHOTONDAM_PASSWORD";

/// Read the sign-in credentials from the environment.
pub fn credentials_from_env() -> Result<SignInRequest, Box<dyn std::error::Error>> {
    let email = std::env::var(EMAIL_VAR).map_err(|_| format!("{} is not set", EMAIL_VAR))?;
    let password =
        std::env::var(PASSWORD_VAR).map_err(|_| format!("{} is not set", PASSWORD_VAR))?;
    Ok(SignInRequest { email, password })
}

/// Sign in, mount the refresh interceptor, print the profile as JSON and
/// sign out.
///
/// # Errors
///
/// Returns an error if the client cannot be built, the sign-in fails or no
/// profile could be loaded.
pub async fn run(
    config: Arc<ConfigV1>,
    credentials: SignInRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(&config.api)?;
    let api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(
        client.clone(),
        config.endpoints.clone(),
    ));
    let navigator: Arc<dyn Navigator> =
        Arc::new(MemoryNavigator::new(config.session.sign_in_path.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let session = Arc::new(SessionStore::new(
        api.clone(),
        navigator.clone(),
        notifier.clone(),
        &config.session,
    ));

    info!("Signing in to {}", client.base_url());
    let flows = AuthFlows::new(api.clone(), navigator.clone(), notifier, &config.session);
    flows.sign_in(&credentials).await?;

    let interceptor = Arc::new(AuthInterceptor::new(
        session.clone(),
        api,
        navigator,
        &config.session,
    ));
    let registration = interceptor.mount(&client).await?;

    let result: Result<(), Box<dyn std::error::Error>> = match session.profile() {
        Some(profile) => {
            println!("{}", serde_json::to_string_pretty(&profile)?);
            if let Some(joined) = profile.joined_at() {
                info!("{} joined on {}", profile.full_name(), joined.format("%Y-%m-%d"));
            }
            Ok(())
        }
        None => {
            error!("Signed in, but no profile could be loaded");
            Err("no profile available".into())
        }
    };

    registration.detach();
    session.sign_out().await;
    result
}

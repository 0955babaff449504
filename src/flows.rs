//! Sign-in and registration: validate the form, call the API, tell the user
//! and move on.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::api::{ApiError, AuthApi};
use crate::config::SessionConfig;
use crate::models::{RegisterRequest, SignInRequest, TokenSet};
use crate::navigation::{NavigateOptions, Navigator};
use crate::notify::{notify_failure, NotificationKind, Notifier};

/// Validation messages keyed by form field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        f.write_str(&fields.join("; "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("invalid form: {0}")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub fn validate_sign_in(form: &SignInRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    if form.email.is_empty() {
        errors.add("email", "Type the e-mail.");
    }
    if form.password.is_empty() {
        errors.add("password", "Type the password.");
    }
    errors.into_result()
}

pub fn validate_registration(form: &RegisterRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    if form.first_name.trim().is_empty() {
        errors.add("first_name", "Type the first name.");
    }
    if form.last_name.trim().is_empty() {
        errors.add("last_name", "Type the last name.");
    }
    if !is_valid_email(&form.email) {
        errors.add("email", "Invalid email address.");
    }
    if form.password != form.re_password {
        errors.add("password", "Passwords do not match.");
        errors.add("re_password", "Passwords do not match.");
    }
    errors.into_result()
}

/// `local@domain.tld` with no whitespace. Deliverability is the server's problem.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let mut labels = domain.split('.');
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && labels.all(|label| !label.is_empty())
}

/// The unauthenticated entry points of the dashboard.
pub struct AuthFlows {
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    home_path: String,
    sign_in_path: String,
}

impl AuthFlows {
    pub fn new(
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        config: &SessionConfig,
    ) -> Self {
        AuthFlows {
            api,
            navigator,
            notifier,
            home_path: config.home_path.clone(),
            sign_in_path: config.sign_in_path.clone(),
        }
    }

    pub async fn sign_in(&self, form: &SignInRequest) -> Result<TokenSet, FlowError> {
        validate_sign_in(form).map_err(FlowError::Invalid)?;

        match self.api.login(form).await {
            Ok(tokens) => {
                self.notifier
                    .notify(NotificationKind::Success, "Successfully signed in");
                self.navigator
                    .navigate_to(&self.home_path, NavigateOptions::replace());
                Ok(tokens)
            }
            Err(e) => {
                notify_failure(self.notifier.as_ref(), "Could not log in!", ": ", &e);
                Err(e.into())
            }
        }
    }

    pub async fn register(&self, form: &RegisterRequest) -> Result<Value, FlowError> {
        validate_registration(form).map_err(FlowError::Invalid)?;

        match self.api.register_user(form).await {
            Ok(created) => {
                info!("Registered '{}'", form.email);
                self.notifier
                    .notify(NotificationKind::Success, "User successfully created!");
                self.navigator
                    .navigate_to(&self.sign_in_path, NavigateOptions::replace());
                Ok(created)
            }
            Err(e) => {
                notify_failure(self.notifier.as_ref(), "Could not create user!", " error: ", &e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::MemoryNavigator;
    use crate::testing::{status_error, FakeAuthApi, RecordingNotifier};
    use serde_json::json;

    fn flows(api: Arc<FakeAuthApi>) -> (AuthFlows, Arc<MemoryNavigator>, Arc<RecordingNotifier>) {
        let navigator = Arc::new(MemoryNavigator::new("/sign-in"));
        let notifier = Arc::new(RecordingNotifier::default());
        let flows = AuthFlows::new(
            api,
            navigator.clone(),
            notifier.clone(),
            &SessionConfig::default(),
        );
        (flows, navigator, notifier)
    }

    fn registration() -> RegisterRequest {
        RegisterRequest {
            first_name: "Ana".into(),
            last_name: "Lima".into(),
            email: "ana@photondam.io".into(),
            password: "s3cret!".into(),
            re_password: "s3cret!".into(),
            active: true,
        }
    }

    #[test]
    fn test_sign_in_requires_both_fields() {
        let errors = validate_sign_in(&SignInRequest::default()).unwrap_err();
        assert_eq!(errors.get("email"), Some("Type the e-mail."));
        assert_eq!(errors.get("password"), Some("Type the password."));
    }

    #[test]
    fn test_mismatched_passwords_flag_both_fields() {
        let form = RegisterRequest {
            re_password: "other".into(),
            ..registration()
        };
        let errors = validate_registration(&form).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("password"), Some("Passwords do not match."));
        assert_eq!(errors.get("re_password"), Some("Passwords do not match."));
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("ana@photondam.io"));
        assert!(!is_valid_email("ana@photondam"));
        assert!(!is_valid_email("@photondam.io"));
        assert!(!is_valid_email("ana @photondam.io"));
        assert!(!is_valid_email("ana@@photondam.io"));
        assert!(is_valid_email("ana@mail.photondam.io"));
        assert!(!is_valid_email("a@b..c"));
        assert!(!is_valid_email("ana@.photondam.io"));
        assert!(!is_valid_email("ana@photondam.io."));
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_api() {
        let api = FakeAuthApi::new();
        let (flows, _, notifier) = flows(api.clone());

        let result = flows.sign_in(&SignInRequest::default()).await;

        assert!(matches!(result, Err(FlowError::Invalid(_))));
        assert_eq!(api.login_calls(), 0);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_success_goes_home() {
        let api = FakeAuthApi::new();
        let (flows, navigator, notifier) = flows(api.clone());

        let form = SignInRequest {
            email: "ana@photondam.io".into(),
            password: "pw".into(),
        };
        flows.sign_in(&form).await.expect("sign in");

        assert_eq!(api.login_calls(), 1);
        assert_eq!(navigator.current(), "/");
        assert_eq!(
            notifier.messages(),
            vec![(NotificationKind::Success, "Successfully signed in".to_string())]
        );
    }

    #[tokio::test]
    async fn test_sign_in_failure_reports_each_field() {
        let api = FakeAuthApi::new();
        api.fail_login(status_error(
            400,
            json!({"detail": "No active account found with the given credentials"}),
        ));
        let (flows, navigator, notifier) = flows(api);

        let form = SignInRequest {
            email: "ana@photondam.io".into(),
            password: "wrong".into(),
        };
        let result = flows.sign_in(&form).await;

        assert!(matches!(result, Err(FlowError::Api(_))));
        assert_eq!(navigator.current(), "/sign-in");
        assert_eq!(
            notifier.messages(),
            vec![(
                NotificationKind::Error,
                "Could not log in! Detail: No active account found with the given credentials"
                    .to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_register_success_redirects_to_sign_in() {
        let api = FakeAuthApi::new();
        let (flows, navigator, notifier) = flows(api.clone());
        navigator.navigate_to("/sign-up", NavigateOptions::default());

        let created = flows.register(&registration()).await.expect("register");

        assert_eq!(created, json!({"email": "ana@photondam.io"}));
        assert_eq!(api.register_calls(), 1);
        assert_eq!(navigator.current(), "/sign-in");
        assert_eq!(
            notifier.messages(),
            vec![(NotificationKind::Success, "User successfully created!".to_string())]
        );
    }

    #[tokio::test]
    async fn test_register_failure_reports_each_field() {
        let api = FakeAuthApi::new();
        api.fail_register(status_error(
            400,
            json!({"email": ["user with this email already exists."]}),
        ));
        let (flows, _, notifier) = flows(api);

        let result = flows.register(&registration()).await;

        assert!(matches!(result, Err(FlowError::Api(_))));
        assert_eq!(
            notifier.messages(),
            vec![(
                NotificationKind::Error,
                "Could not create user! Email error: user with this email already exists."
                    .to_string()
            )]
        );
    }
}

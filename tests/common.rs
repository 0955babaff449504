use std::sync::{Arc, Mutex};

use figment::{
    providers::{Format, Yaml},
    Figment,
};
use photondam::api::{ApiClient, AuthApi, HttpAuthApi};
use photondam::config::{extract_config, ConfigV1};
use photondam::flows::AuthFlows;
use photondam::navigation::MemoryNavigator;
use photondam::notify::{NotificationKind, Notifier};
use photondam::session::{AuthInterceptor, SessionStore};

pub const TEST_CONFIG: &str = r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "json"
api:
  base_url: "{base_url}"
  timeout_in_ms: 3000
session:
  refresh_timeout_in_ms: 2000
"#;

pub fn test_config(base_url: &str) -> ConfigV1 {
    let yaml = TEST_CONFIG.replace("{base_url}", base_url);
    extract_config(Figment::new().merge(Yaml::string(&yaml))).expect("test config should parse")
}

#[allow(dead_code)]
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

/// Everything a signed-in page would hold, pointed at a mock server.
#[allow(dead_code)]
pub struct App {
    pub client: ApiClient,
    pub navigator: Arc<MemoryNavigator>,
    pub notifier: Arc<RecordingNotifier>,
    pub session: Arc<SessionStore>,
    pub flows: AuthFlows,
    pub interceptor: Arc<AuthInterceptor>,
}

pub fn build_app(base_url: &str) -> App {
    let config = test_config(base_url);
    let client = ApiClient::new(&config.api).expect("client should build");
    let api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(client.clone(), config.endpoints.clone()));
    let navigator = Arc::new(MemoryNavigator::new("/sign-in"));
    let notifier = Arc::new(RecordingNotifier::default());
    let session = Arc::new(SessionStore::new(
        api.clone(),
        navigator.clone(),
        notifier.clone(),
        &config.session,
    ));
    let flows = AuthFlows::new(api.clone(), navigator.clone(), notifier.clone(), &config.session);
    let interceptor = Arc::new(AuthInterceptor::new(
        session.clone(),
        api,
        navigator.clone(),
        &config.session,
    ));

    App {
        client,
        navigator,
        notifier,
        session,
        flows,
        interceptor,
    }
}

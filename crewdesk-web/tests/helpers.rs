//! Integration test helpers
//!
//! Spawns the full application on a random port with spy services so tests can
//! assert both the HTTP outcome and whether storage was touched.

#![allow(dead_code)]

use async_trait::async_trait;
use crewdesk_applications::auth::{IdentityResult, SignIn};
use crewdesk_applications::devices::{
    BulkField, Device, DeviceDraft, DeviceStore, DeviceStoreResult, MemoryDeviceStore, NewDevice,
};
use crewdesk_applications::lending::{LendingError, LendingPayload, LendingResult};
use crewdesk_applications::{
    IdentityProvider, IdentityRecord, LendingNotifier, LocalIdentityProvider, Role,
    VerifiedClaims,
};
use crewdesk_core::CrewdeskConfig;
use crewdesk_web::{create_app, AppState, WebConfig};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::net::TcpListener;

pub const PASSWORD: &str = "password123";

// Ensure tracing is only initialised once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
});

/// Device store counting every call
#[derive(Default)]
pub struct SpyDeviceStore {
    inner: MemoryDeviceStore,
    calls: AtomicUsize,
}

impl SpyDeviceStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceStore for SpyDeviceStore {
    async fn list(&self) -> DeviceStoreResult<Vec<Device>> {
        self.hit();
        self.inner.list().await
    }

    async fn get(&self, id: &str) -> DeviceStoreResult<Device> {
        self.hit();
        self.inner.get(id).await
    }

    async fn insert(&self, draft: DeviceDraft) -> DeviceStoreResult<Device> {
        self.hit();
        self.inner.insert(draft).await
    }

    async fn update(&self, device: &Device) -> DeviceStoreResult<()> {
        self.hit();
        self.inner.update(device).await
    }

    async fn set_field(&self, id: &str, field: BulkField, value: &str) -> DeviceStoreResult<()> {
        self.hit();
        self.inner.set_field(id, field, value).await
    }
}

/// Identity provider counting every call
pub struct SpyIdentityProvider {
    inner: Arc<LocalIdentityProvider>,
    calls: AtomicUsize,
}

impl SpyIdentityProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for SpyIdentityProvider {
    async fn verify_token(&self, token: &str) -> IdentityResult<VerifiedClaims> {
        self.hit();
        self.inner.verify_token(token).await
    }

    async fn refresh_token(&self, token: &str) -> IdentityResult<String> {
        self.hit();
        self.inner.refresh_token(token).await
    }

    async fn set_role_claim(&self, uid: &str, role: Role) -> IdentityResult<()> {
        self.hit();
        self.inner.set_role_claim(uid, role).await
    }

    async fn delete_user(&self, uid: &str) -> IdentityResult<()> {
        self.hit();
        self.inner.delete_user(uid).await
    }

    async fn get_user(&self, uid: &str) -> IdentityResult<IdentityRecord> {
        self.hit();
        self.inner.get_user(uid).await
    }

    async fn list_users(&self) -> IdentityResult<Vec<IdentityRecord>> {
        self.hit();
        self.inner.list_users().await
    }

    async fn register(&self, email: &str, password: &str) -> IdentityResult<IdentityRecord> {
        self.hit();
        self.inner.register(email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<SignIn> {
        self.hit();
        self.inner.sign_in(email, password).await
    }
}

/// Notifier recording payloads; can be switched to fail
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<LendingPayload>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<LendingPayload> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl LendingNotifier for RecordingNotifier {
    async fn notify(&self, payload: &LendingPayload) -> LendingResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LendingError::Delivery("webhook unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Test services, shared by the spawned server and the test body
pub struct TestServices {
    pub provider: Arc<LocalIdentityProvider>,
    pub identity: Arc<SpyIdentityProvider>,
    pub devices: Arc<SpyDeviceStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
}

impl TestServices {
    pub fn new() -> Self {
        LazyLock::force(&TRACING);

        let provider = Arc::new(
            LocalIdentityProvider::builder("integration-test-secret")
                .hash_cost(8, 1)
                .build(),
        );
        let identity = Arc::new(SpyIdentityProvider {
            inner: provider.clone(),
            calls: AtomicUsize::new(0),
        });
        let devices = Arc::new(SpyDeviceStore::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let config = WebConfig {
            port: 0,
            dev_mode: true,
            ..WebConfig::default()
        };
        let state = AppState::from_services(
            config,
            CrewdeskConfig::default(),
            identity.clone(),
            devices.clone(),
            notifier.clone(),
        );

        Self {
            provider,
            identity,
            devices,
            notifier,
            state,
        }
    }

    /// Create an account with a preset role and return `(uid, token)`
    pub async fn account(&self, email: &str, role: Option<Role>) -> (String, String) {
        let record = self.provider.seed_account(email, PASSWORD, role).unwrap();
        let sign_in = self.provider.sign_in(email, PASSWORD).await.unwrap();
        (record.uid, sign_in.token)
    }

    pub async fn role_of(&self, uid: &str) -> Option<Role> {
        self.provider.get_user(uid).await.unwrap().role
    }

    /// Insert a device directly into the store, bypassing the spy counter
    pub async fn device(&self, description: &str) -> Device {
        let draft = NewDevice {
            location: Some("Keller".to_string()),
            description: Some(description.to_string()),
            price: Some(100.0),
            ..Default::default()
        }
        .into_draft()
        .unwrap();
        self.devices.inner.insert(draft).await.unwrap()
    }

    pub async fn stored_device(&self, id: &str) -> Device {
        self.devices.inner.get(id).await.unwrap()
    }
}

/// Running test application
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub services: TestServices,
}

impl TestApp {
    fn request(&self, method: reqwest::Method, path: &str, token: Option<&str>) -> reqwest::RequestBuilder {
        let builder = self
            .api_client
            .request(method, format!("{}{}", &self.address, path));
        match token {
            Some(token) => builder.header(reqwest::header::COOKIE, format!("token={}", token)),
            None => builder,
        }
    }

    /// POST a JSON body to an API path
    pub async fn post_json(&self, path: &str, token: Option<&str>, body: &Value) -> reqwest::Response {
        self.request(reqwest::Method::POST, path, token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// POST a raw body with a JSON content type
    pub async fn post_raw(&self, path: &str, token: Option<&str>, body: &'static str) -> reqwest::Response {
        self.request(reqwest::Method::POST, path, token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        self.request(reqwest::Method::DELETE, path, token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_page(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        self.request(reqwest::Method::GET, path, token)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

/// Start the application on a random port
pub async fn spawn_app() -> TestApp {
    let services = TestServices::new();
    let app = create_app(services.state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        api_client: client,
        services,
    }
}

/// Assert a `307` redirect to `location`
pub fn assert_is_redirect_to(response: &reqwest::Response, location: &str) {
    assert_eq!(response.status().as_u16(), 307);
    assert_eq!(response.headers().get("Location").unwrap(), location);
}

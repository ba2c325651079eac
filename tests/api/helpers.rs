use std::sync::{Arc, LazyLock};

use fake::{
    Fake,
    faker::internet::en::{Password, SafeEmail, Username},
};
use mangashelf::{
    configuration::Config,
    context::{ClientContext, SharedClientContext},
    model::MangaSummary,
    storage::MemoryStore,
    telemetry::{get_subscriber, init_subscriber},
};
use secrecy::SecretString;

use crate::fake_backend::{FakeBackend, IMGBB_KEY};

static TRACING: LazyLock<()> = LazyLock::new(|| {
    let name = "test".to_string();
    let level = "debug".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(name, level, std::io::stdout);
        init_subscriber(subscriber).unwrap();
    } else {
        let subscriber = get_subscriber(name, level, std::io::sink);
        init_subscriber(subscriber).unwrap();
    }
});

pub struct TestUser {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl TestUser {
    pub fn generate(id: u64) -> Self {
        Self {
            id,
            username: Username().fake(),
            email: SafeEmail().fake(),
            password: Password(8..16).fake(),
        }
    }

    pub fn password(&self) -> SecretString {
        self.password.clone().into()
    }
}

pub struct TestApp {
    pub backend: Arc<FakeBackend>,
    pub store: MemoryStore,
    pub ctx: SharedClientContext,
}

impl TestApp {
    /// Client over the same store and backend, as after a restart.
    pub fn restart(&self) -> TestApp {
        self.ctx.teardown();
        build(self.backend.clone(), self.store.clone())
    }

    pub async fn sign_in(&self, user: &TestUser) {
        self.backend
            .add_user(user.id, &user.username, &user.email, &user.password);

        let outcome = self.ctx.session.login(&user.email, user.password()).await;
        assert!(outcome.success, "login failed: {:?}", outcome.error);
    }

    pub async fn sign_in_as_new_user(&self) -> TestUser {
        let user = TestUser::generate(7);
        self.sign_in(&user).await;
        user
    }
}

pub fn test_config(backend: &FakeBackend) -> Config {
    let mut config = Config::new().expect("Failed to read configuration");
    config.api.base_url = backend.api_url.clone();
    config.api.timeout_secs = 5;
    config.imgbb.upload_url = backend.imgbb_url.clone();
    config.imgbb.api_key = IMGBB_KEY.to_string().into();
    config
}

fn build(backend: Arc<FakeBackend>, store: MemoryStore) -> TestApp {
    let ctx = ClientContext::init(test_config(&backend), Arc::new(store.clone()))
        .expect("Failed to build client context");

    TestApp {
        backend,
        store,
        ctx,
    }
}

pub async fn spawn_app() -> TestApp {
    LazyLock::force(&TRACING);

    let backend = Arc::new(FakeBackend::spawn().await);
    build(backend, MemoryStore::new())
}

/// Ids long enough not to be mistaken for legacy mock entries.
pub fn manga(n: u32) -> MangaSummary {
    MangaSummary {
        id: format!("5d1e7a40-0000-4000-8000-{n:012}"),
        title: format!("Manga {n}"),
        image_url: format!("https://covers.example/{n}.jpg"),
        author: "Author".into(),
        chapter_count: 10,
    }
}

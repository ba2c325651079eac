//! Credential lifecycle: login, registration, refresh and logout.
//!
//! The manager is the only writer of `manga_user`, `manga_token` and
//! `manga_refresh`. Every operation reports its outcome as a value; nothing
//! here returns an error to the caller.

use std::{
    borrow::Cow,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use jsonwebtoken::{DecodingKey, Validation, decode};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use validator::{Validate, ValidateEmail, ValidateLength, ValidationError, ValidationErrors};

use crate::{
    api::{
        RemoteClient,
        auth::{self, AuthResponse},
    },
    model::{DEFAULT_POINTS, User},
    profile,
    storage::{self, SharedStore, keys},
};

pub const LOGIN_FAILED: &str = "بيانات الدخول غير صحيحة";
pub const REGISTER_FAILED: &str = "فشل إنشاء الحساب";
pub const CONNECTION_FAILED: &str = "خطأ في الاتصال بالخادم";

/// Tokens this close to `exp` are treated as expired.
const EXPIRY_LEEWAY_SECS: i64 = 30;

#[derive(Default)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl AuthOutcome {
    fn ok() -> Self {
        AuthOutcome {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        AuthOutcome {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Which flow produced the credentials; decides how stale local data is
/// purged and how missing user fields are filled in.
enum Flow<'a> {
    Login { email: &'a str },
    Register { username: &'a str, email: &'a str },
}

struct Credentials<'a> {
    email: &'a str,
    password: &'a SecretString,
    username: Option<&'a str>,
}

impl Validate for Credentials<'_> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.email.validate_email() {
            errors.add(
                "email",
                ValidationError::new("email_email")
                    .with_message(Cow::from("Incorrect email format")),
            );
        }
        if !self.email.validate_length(Some(1), Some(100), None) {
            errors.add(
                "email",
                ValidationError::new("email_length")
                    .with_message(Cow::from("Email length must be between 1 and 100")),
            );
        }

        if !self
            .password
            .expose_secret()
            .validate_length(Some(1), None, None)
        {
            errors.add(
                "password",
                ValidationError::new("password_length")
                    .with_message(Cow::from("Password must not be empty")),
            );
        }

        if let Some(username) = self.username {
            if !username.trim().validate_length(Some(1), Some(150), None) {
                errors.add(
                    "username",
                    ValidationError::new("username_length")
                        .with_message(Cow::from("Username length must be between 1 and 150")),
                );
            }
        }

        if !errors.errors().is_empty() {
            return Err(errors);
        }

        Ok(())
    }
}

#[derive(serde::Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

pub struct SessionManager {
    client: RemoteClient,
    store: SharedStore,
    state: RwLock<Session>,
}

impl SessionManager {
    /// Restores a persisted session. Both a user and a non-empty token must
    /// be stored, otherwise the manager starts as a guest.
    #[tracing::instrument(name = "hydrate session", skip_all)]
    pub fn hydrate(client: RemoteClient, store: SharedStore) -> Self {
        let user: Option<User> = storage::get_non_empty(store.as_ref(), keys::USER)
            .and_then(|_| storage::read_json(store.as_ref(), keys::USER));
        let token = storage::get_non_empty(store.as_ref(), keys::TOKEN);

        let session = match (user, token) {
            (Some(user), Some(token)) => Session {
                user: Some(user),
                access_token: Some(token.into()),
                refresh_token: storage::get_non_empty(store.as_ref(), keys::REFRESH)
                    .map(SecretString::from),
            },
            _ => Session::default(),
        };

        Self {
            client,
            store,
            state: RwLock::new(session),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        self.read().user.clone()
    }

    /// `Authorization: Bearer <token>` when a token is held, otherwise an
    /// empty map.
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(token) = &self.read().access_token {
            let bearer = format!("Bearer {}", token.expose_secret());
            if let Ok(mut value) = HeaderValue::from_str(&bearer) {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    #[tracing::instrument(name = "login", skip(self, password))]
    pub async fn login(&self, email: &str, password: SecretString) -> AuthOutcome {
        let credentials = Credentials {
            email,
            password: &password,
            username: None,
        };
        if let Err(errors) = credentials.validate() {
            return AuthOutcome::failed(errors.to_string());
        }

        match auth::login(&self.client, email, &password).await {
            Ok((status, body)) if status.is_success() && body.success => {
                self.adopt(body, Flow::Login { email });
                AuthOutcome::ok()
            }
            Ok((_, body)) => AuthOutcome::failed(body.error.unwrap_or_else(|| LOGIN_FAILED.into())),
            Err(error) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Login error");
                AuthOutcome::failed(CONNECTION_FAILED)
            }
        }
    }

    #[tracing::instrument(name = "register", skip(self, password))]
    pub async fn register(&self, username: &str, email: &str, password: SecretString) -> AuthOutcome {
        let credentials = Credentials {
            email,
            password: &password,
            username: Some(username),
        };
        if let Err(errors) = credentials.validate() {
            return AuthOutcome::failed(errors.to_string());
        }

        match auth::register(&self.client, username, email, &password).await {
            Ok((status, body)) if status.is_success() && body.success => {
                self.adopt(body, Flow::Register { username, email });
                AuthOutcome::ok()
            }
            Ok((_, body)) => {
                AuthOutcome::failed(body.error.unwrap_or_else(|| REGISTER_FAILED.into()))
            }
            Err(error) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Register error");
                AuthOutcome::failed(CONNECTION_FAILED)
            }
        }
    }

    fn adopt(&self, body: AuthResponse, flow: Flow<'_>) {
        let remote = body.user.unwrap_or_default();
        let (fallback_name, fallback_email) = match &flow {
            Flow::Login { email } => (
                email.split('@').next().unwrap_or_default().to_string(),
                email.to_string(),
            ),
            Flow::Register { username, email } => (username.to_string(), email.to_string()),
        };

        let user = User {
            id: remote.id.unwrap_or_default(),
            name: remote.username.unwrap_or(fallback_name),
            email: remote.email.unwrap_or(fallback_email),
            is_staff: remote.is_staff.unwrap_or(false),
            is_superuser: remote.is_superuser.unwrap_or(false),
            points: remote.points.filter(|p| *p != 0).unwrap_or(DEFAULT_POINTS),
            equipped_title: remote.equipped_title.filter(|t| !t.is_empty()),
        };

        let purge = match flow {
            Flow::Register { .. } => true,
            Flow::Login { .. } => {
                let previous: Option<User> = storage::read_json(self.store.as_ref(), keys::USER);
                previous.is_some_and(|previous| previous.id != user.id)
            }
        };
        if purge {
            tracing::info!(user_id = %user.id, "Purging local data of previous user");
            if let Err(error) = storage::purge_user_scoped(self.store.as_ref()) {
                tracing::error!(err.msg = %error, err.details = ?error, "Failed purging local data");
            }
        }

        let tokens = body.tokens.unwrap_or_default();
        let access = tokens.access.unwrap_or_default();
        let refresh = tokens.refresh.unwrap_or_default();

        let persisted = storage::write_json(self.store.as_ref(), keys::USER, &user)
            .and_then(|_| self.store.set(keys::TOKEN, &access))
            .and_then(|_| self.store.set(keys::REFRESH, &refresh));
        if let Err(error) = persisted {
            tracing::error!(err.msg = %error, err.details = ?error, "Failed persisting session");
        }
        if let Some(title) = &user.equipped_title {
            profile::restore_remote(self.store.as_ref(), title);
        }

        let mut session = self.write();
        session.user = Some(user);
        session.access_token = Some(access).filter(|t| !t.is_empty()).map(SecretString::from);
        session.refresh_token = Some(refresh).filter(|t| !t.is_empty()).map(SecretString::from);
    }

    /// Clears the session and all user-scoped local data. The backend is not
    /// contacted; tokens simply expire.
    #[tracing::instrument(name = "logout", skip_all)]
    pub fn logout(&self) {
        *self.write() = Session::default();

        let cleared = storage::clear_credentials(self.store.as_ref())
            .and_then(|_| storage::purge_user_scoped(self.store.as_ref()));
        if let Err(error) = cleared {
            tracing::error!(err.msg = %error, err.details = ?error, "Failed clearing local data");
        }
    }

    /// Forgets the in-memory session without touching persisted state.
    pub fn forget(&self) {
        *self.write() = Session::default();
    }

    /// Exchanges the refresh token for a new pair. On failure the session is
    /// left as is; callers see the next 401 and must log in again.
    #[tracing::instrument(name = "refresh access token", skip_all)]
    pub async fn refresh_access_token(&self) -> bool {
        let Some(refresh_token) = self.read().refresh_token.clone() else {
            return false;
        };

        match auth::refresh(&self.client, &refresh_token).await {
            Ok(tokens) => {
                let persisted = self
                    .store
                    .set(keys::TOKEN, &tokens.access)
                    .and_then(|_| self.store.set(keys::REFRESH, &tokens.refresh));
                if let Err(error) = persisted {
                    tracing::error!(err.msg = %error, err.details = ?error, "Failed persisting tokens");
                }

                let mut session = self.write();
                session.access_token = Some(tokens.access.into());
                session.refresh_token = Some(tokens.refresh.into());
                true
            }
            Err(error) => {
                tracing::error!(err.msg = %error, err.details = ?error, "Token refresh error");
                false
            }
        }
    }

    /// Reads `exp` from the access token without verifying it. Opaque
    /// tokens and tokens without `exp` are never considered expired.
    pub fn access_token_expired(&self) -> bool {
        let Some(token) = self.read().access_token.clone() else {
            return false;
        };

        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        match decode::<ExpiryClaim>(
            token.expose_secret(),
            &DecodingKey::from_secret(&[]),
            &validation,
        ) {
            Ok(data) => data
                .claims
                .exp
                .is_some_and(|exp| exp - EXPIRY_LEEWAY_SECS <= chrono::Utc::now().timestamp()),
            Err(_) => false,
        }
    }

    /// Refreshes only when the access token is about to expire. Returns
    /// whether a usable token is held afterwards.
    pub async fn ensure_fresh_token(&self) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        if !self.access_token_expired() {
            return true;
        }
        self.refresh_access_token().await
    }
}

use reqwest::{Method, StatusCode, header::HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_option_number_from_string;

use crate::error::Error;

use super::{RemoteClient, send_json};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Serialize)]
struct ProfileUpdate<'a> {
    equipped_title: &'a str,
}

#[derive(Deserialize, Debug, Default)]
pub struct RemoteUser {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub points: Option<i64>,
    pub equipped_title: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Tokens {
    pub access: Option<String>,
    pub refresh: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    pub user: Option<RemoteUser>,
    pub tokens: Option<Tokens>,
    pub error: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RefreshResponse {
    pub access: String,
    pub refresh: String,
}

/// Ids come back as numbers from some deployments and UUID strings from
/// others.
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(id)) => Some(id),
        Some(serde_json::Value::Number(id)) => Some(id.to_string()),
        _ => None,
    })
}

/// Posts credentials. Non-2xx answers still carry a JSON body with an
/// `error` field, so the status is returned alongside the decoded body.
#[tracing::instrument(name = "[POST] auth login", skip(client, password))]
pub async fn login(
    client: &RemoteClient,
    email: &str,
    password: &SecretString,
) -> Result<(StatusCode, AuthResponse), Error> {
    let body = LoginRequest {
        email,
        password: password.expose_secret(),
    };

    let response = client
        .request(Method::POST, "/auth/login/", &HeaderMap::new())
        .json(&body)
        .send()
        .await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tracing::instrument(name = "[POST] auth register", skip(client, password))]
pub async fn register(
    client: &RemoteClient,
    username: &str,
    email: &str,
    password: &SecretString,
) -> Result<(StatusCode, AuthResponse), Error> {
    let body = RegisterRequest {
        username,
        email,
        password: password.expose_secret(),
    };

    let response = client
        .request(Method::POST, "/auth/register/", &HeaderMap::new())
        .json(&body)
        .send()
        .await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tracing::instrument(name = "[POST] auth refresh", skip_all)]
pub async fn refresh(
    client: &RemoteClient,
    refresh_token: &SecretString,
) -> Result<RefreshResponse, Error> {
    let body = RefreshRequest {
        refresh: refresh_token.expose_secret(),
    };

    send_json(
        client
            .request(Method::POST, "/auth/refresh/", &HeaderMap::new())
            .json(&body),
    )
    .await
}

#[tracing::instrument(name = "[GET] auth profile", skip_all)]
pub async fn profile(client: &RemoteClient, auth: &HeaderMap) -> Result<RemoteUser, Error> {
    send_json(client.request(Method::GET, "/auth/profile/", auth)).await
}

#[tracing::instrument(name = "[PATCH] auth profile", skip(client, auth))]
pub async fn update_profile(
    client: &RemoteClient,
    auth: &HeaderMap,
    equipped_title: &str,
) -> Result<RemoteUser, Error> {
    send_json(
        client
            .request(Method::PATCH, "/auth/profile/", auth)
            .json(&ProfileUpdate { equipped_title }),
    )
    .await
}

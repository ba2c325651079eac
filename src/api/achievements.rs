use reqwest::{Method, header::HeaderMap};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_string_from_number;

use crate::error::Error;

use super::{ListBody, RemoteClient, send_json};

#[derive(Deserialize, Debug)]
pub struct RemoteAchievement {
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UserAchievement {
    pub achievement: Option<RemoteAchievement>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UnlockedAchievement {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_ar: Option<String>,
    #[serde(default)]
    pub reward_points: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CheckResponse {
    #[serde(default)]
    pub newly_unlocked: Vec<UnlockedAchievement>,
}

/// Slugs of the achievements the user already holds.
#[tracing::instrument(name = "[GET] achievements my", skip_all)]
pub async fn my(client: &RemoteClient, auth: &HeaderMap) -> Result<Vec<String>, Error> {
    let body: ListBody<UserAchievement> =
        send_json(client.request(Method::GET, "/achievements/my/", auth)).await?;

    Ok(body
        .into_results()
        .into_iter()
        .filter_map(|row| row.achievement.and_then(|a| a.slug))
        .filter(|slug| !slug.is_empty())
        .collect())
}

#[tracing::instrument(name = "[POST] achievements check", skip_all)]
pub async fn check(client: &RemoteClient, auth: &HeaderMap) -> Result<CheckResponse, Error> {
    send_json(client.request(Method::POST, "/achievements/check/", auth)).await
}

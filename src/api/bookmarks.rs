use reqwest::{Method, header::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_string_from_number;

use crate::{error::Error, model::MangaSummary};

use super::{ListBody, RemoteClient, send_json};

#[derive(Deserialize, Debug)]
pub struct BookmarkRow {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub manga: String,
    #[serde(default)]
    pub manga_title: String,
    #[serde(default)]
    pub manga_cover: Option<String>,
    #[serde(default)]
    pub manga_author: Option<String>,
    #[serde(default)]
    pub manga_chapter_count: Option<u32>,
    #[serde(default)]
    pub chapter_count: Option<u32>,
}

impl From<BookmarkRow> for MangaSummary {
    fn from(row: BookmarkRow) -> Self {
        MangaSummary {
            id: row.manga,
            title: row.manga_title,
            image_url: row.manga_cover.unwrap_or_default(),
            author: row.manga_author.unwrap_or_default(),
            chapter_count: row.manga_chapter_count.or(row.chapter_count).unwrap_or(0),
        }
    }
}

#[derive(Serialize)]
struct ToggleRequest<'a> {
    manga_id: &'a str,
}

#[derive(Deserialize, Debug)]
pub struct ToggleResponse {
    pub bookmarked: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[tracing::instrument(name = "[GET] bookmarks", skip_all)]
pub async fn list(client: &RemoteClient, auth: &HeaderMap) -> Result<Vec<MangaSummary>, Error> {
    let body: ListBody<BookmarkRow> =
        send_json(client.request(Method::GET, "/bookmarks/", auth)).await?;

    Ok(body.into_results().into_iter().map(MangaSummary::from).collect())
}

#[tracing::instrument(name = "[POST] bookmarks toggle", skip(client, auth))]
pub async fn toggle(
    client: &RemoteClient,
    auth: &HeaderMap,
    manga_id: &str,
) -> Result<ToggleResponse, Error> {
    send_json(
        client
            .request(Method::POST, "/bookmarks/toggle/", auth)
            .json(&ToggleRequest { manga_id }),
    )
    .await
}

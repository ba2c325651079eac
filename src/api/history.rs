use reqwest::{Method, header::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::{
    deserialize_option_number_from_string, deserialize_string_from_number,
};

use crate::{error::Error, model::HistoryItem};

use super::{ListBody, RemoteClient, send_json};

#[derive(Deserialize, Debug)]
pub struct HistoryRow {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub chapter_id: String,
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub manga_id: String,
    #[serde(default)]
    pub manga_title: String,
    #[serde(default)]
    pub manga_cover: Option<String>,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub chapter_number: Option<f64>,
    #[serde(default)]
    pub last_read: Option<String>,
}

impl From<HistoryRow> for HistoryItem {
    fn from(row: HistoryRow) -> Self {
        let timestamp = row
            .last_read
            .as_deref()
            .and_then(|value| chrono::DateTime::parse_from_rfc3339(value).ok())
            .map(|value| value.timestamp_millis())
            .unwrap_or(0);

        HistoryItem {
            manga_id: row.manga_id,
            manga_title: row.manga_title,
            chapter_id: row.chapter_id,
            chapter_number: row.chapter_number,
            image_url: row.manga_cover.unwrap_or_default(),
            timestamp,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct RecordRead<'a> {
    pub chapter_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manga_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RecordReadResponse {
    #[serde(default)]
    pub points_awarded: bool,
    #[serde(default)]
    pub total_points: Option<i64>,
}

/// Rows come back most recent first, one per chapter read.
#[tracing::instrument(name = "[GET] reading history", skip_all)]
pub async fn list(client: &RemoteClient, auth: &HeaderMap) -> Result<Vec<HistoryItem>, Error> {
    let body: ListBody<HistoryRow> =
        send_json(client.request(Method::GET, "/reading-history/", auth)).await?;

    Ok(body.into_results().into_iter().map(HistoryItem::from).collect())
}

#[tracing::instrument(name = "[POST] reading history", skip(client, auth))]
pub async fn record(
    client: &RemoteClient,
    auth: &HeaderMap,
    read: &RecordRead<'_>,
) -> Result<RecordReadResponse, Error> {
    send_json(
        client
            .request(Method::POST, "/reading-history/", auth)
            .json(read),
    )
    .await
}
